//! Comment-list envelope parsing.
//!
//! Both platforms answer with the same shape:
//! `{ total, comments: [{ cid, text, create_time, digg_count, user: { nickname } }], cursor, has_more }`.
//! The HTTP status is never consulted; the body alone decides the outcome.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::http::HttpClient;
use crate::request::SignedRequest;

pub const UNKNOWN_USER: &str = "unknown user";
pub const NO_CONTENT: &str = "no content";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub nickname: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Comment {
    fn from_value(v: &Value) -> Self {
        Self {
            nickname: non_empty_str(v.get("user").and_then(|u| u.get("nickname")))
                .unwrap_or(UNKNOWN_USER)
                .to_string(),
            text: non_empty_str(v.get("text")).unwrap_or(NO_CONTENT).to_string(),
            id: v.get("cid").and_then(id_string),
            like_count: v.get("digg_count").and_then(as_u64),
            created_at: v
                .get("create_time")
                .and_then(as_u64)
                .and_then(|secs| i64::try_from(secs).ok())
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        }
    }
}

/// One page of a comment thread.
///
/// `total` is what the platform reports for the whole thread and may differ
/// from `comments.len()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommentPage {
    pub total: u64,
    pub comments: Vec<Comment>,
    pub cursor: u64,
    pub has_more: bool,
}

impl CommentPage {
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }
}

fn non_empty_str(v: Option<&Value>) -> Option<&str> {
    v.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Accepts numbers and numeric strings; the platforms use both.
fn as_u64(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_flag(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        other => as_u64(other).is_some_and(|n| n != 0),
    }
}

/// What a comment-list body turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// Transport failure or blank body.
    Missing,
    /// Not a JSON object, typically a block or captcha page.
    Malformed,
    Page(CommentPage),
}

impl PageOutcome {
    /// Single-page view: a malformed body reads as an empty page.
    pub fn into_page(self) -> Option<CommentPage> {
        match self {
            PageOutcome::Missing => None,
            PageOutcome::Malformed => Some(CommentPage::default()),
            PageOutcome::Page(page) => Some(page),
        }
    }
}

pub fn classify_comment_body(body: &str) -> PageOutcome {
    if body.trim().is_empty() {
        return PageOutcome::Missing;
    }

    let envelope: Value = match serde_json::from_str(body) {
        Ok(v @ Value::Object(_)) => v,
        Ok(_) => {
            warn!(body_len = body.len(), "comment envelope is not an object");
            return PageOutcome::Malformed;
        }
        Err(e) => {
            warn!(error = %e, body_len = body.len(), "comment envelope is not valid JSON");
            return PageOutcome::Malformed;
        }
    };

    let comments: Vec<Comment> = envelope
        .get("comments")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().map(Comment::from_value).collect())
        .unwrap_or_default();

    let page = CommentPage {
        total: envelope.get("total").and_then(as_u64).unwrap_or(0),
        comments,
        cursor: envelope.get("cursor").and_then(as_u64).unwrap_or(0),
        has_more: envelope.get("has_more").is_some_and(as_flag),
    };

    debug!(
        total = page.total,
        count = page.comments.len(),
        cursor = page.cursor,
        has_more = page.has_more,
        "comment page parsed"
    );
    PageOutcome::Page(page)
}

/// Parse a comment-list body.
///
/// - blank body: `None`
/// - not a JSON object: empty page with `total = 0`
/// - `comments` missing, `null` or `[]`: empty page carrying `total`
pub fn parse_comment_page(body: &str) -> Option<CommentPage> {
    classify_comment_body(body).into_page()
}

pub struct CommentFetcher<'a> {
    http: &'a HttpClient,
}

impl<'a> CommentFetcher<'a> {
    pub fn new(http: &'a HttpClient) -> Self {
        Self { http }
    }

    /// Dispatch a signed request. Transport failures are logged and become
    /// `Missing`; they are not retried here.
    pub async fn fetch(&self, request: &SignedRequest) -> PageOutcome {
        let response = match self.http.get_raw(&request.url, request.headers.clone()).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "comment fetch failed");
                return PageOutcome::Missing;
            }
        };

        if !response.has_body() {
            warn!(status = response.status, "comment endpoint returned no body");
            return PageOutcome::Missing;
        }

        classify_comment_body(&response.body)
    }
}
