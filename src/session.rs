use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wreq::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};

use crate::config::RetryPolicy;
use crate::cookies::CookieJar;
use crate::error::{CommentFerryError, Result};
use crate::http::HttpClient;

/// Anti-bot session cookie the comment API checks.
pub const SESSION_COOKIE: &str = "ttwid";

const BOOTSTRAP_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";
const BOOTSTRAP_ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9,en;q=0.8";

lazy_static::lazy_static! {
    static ref RENDER_DATA_RE: Regex =
        Regex::new(r#"(?s)<script id="RENDER_DATA" type="application/json">(.*?)</script>"#)
            .unwrap();
}

/// Session identifiers for one pipeline invocation. Never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionCredentials {
    pub session_cookie: String,
    pub device_id: String,
}

impl SessionCredentials {
    /// Returns `None` unless both identifiers are non-empty.
    pub fn new(session_cookie: &str, device_id: &str) -> Option<Self> {
        if session_cookie.is_empty() || device_id.is_empty() {
            return None;
        }
        Some(Self {
            session_cookie: session_cookie.to_string(),
            device_id: device_id.to_string(),
        })
    }

    pub fn cookie_header(&self) -> String {
        format!("{}={};", SESSION_COOKIE, self.session_cookie)
    }
}

/// Pull the session cookie out of a response's `Set-Cookie` lines.
pub fn extract_session_cookie<S: AsRef<str>>(set_cookies: &[S]) -> Option<String> {
    CookieJar::from_set_cookie_headers(set_cookies)
        .value_of(SESSION_COOKIE)
        .map(String::from)
}

/// Pull the device id (`app.odin.user_unique_id`) out of the URL-encoded
/// `RENDER_DATA` payload embedded in a Douyin page.
pub fn extract_web_id(body: &str) -> Option<String> {
    let encoded = RENDER_DATA_RE.captures(body)?.get(1)?.as_str();
    let decoded = urlencoding::decode(encoded).ok()?;
    let data: Value = serde_json::from_str(&decoded).ok()?;

    let id = data.get("app")?.get("odin")?.get("user_unique_id")?;
    let id = match id {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!id.is_empty()).then_some(id)
}

pub struct SessionBootstrapper<'a> {
    http: &'a HttpClient,
    user_agent: &'a str,
    policy: RetryPolicy,
}

impl<'a> SessionBootstrapper<'a> {
    pub fn new(http: &'a HttpClient, user_agent: &'a str, policy: RetryPolicy) -> Self {
        Self {
            http,
            user_agent,
            policy,
        }
    }

    /// Visit `referer_url` until both session identifiers come back.
    ///
    /// Every failure (transport error or missing identifier) waits one backoff
    /// interval and retries the whole request. Stops with
    /// `BootstrapExhausted` when the policy runs out, or `Cancelled` as soon
    /// as `cancel` fires.
    pub async fn bootstrap(
        &self,
        referer_url: &str,
        cancel: &CancellationToken,
    ) -> Result<SessionCredentials> {
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(CommentFerryError::Cancelled);
            }
            attempt += 1;

            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Err(CommentFerryError::Cancelled),
                r = self.attempt(referer_url) => r,
            };

            match outcome {
                Ok(credentials) => {
                    info!(attempt, "session identifiers obtained");
                    return Ok(credentials);
                }
                Err(e) => warn!(attempt, error = %e, "session bootstrap attempt failed"),
            }

            if self.policy.exhausted(attempt) {
                return Err(CommentFerryError::BootstrapExhausted { attempts: attempt });
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(CommentFerryError::Cancelled),
                _ = tokio::time::sleep(self.policy.backoff) => {}
            }
        }
    }

    async fn attempt(&self, referer_url: &str) -> Result<SessionCredentials> {
        let response = self.http.get_raw(referer_url, self.headers()?).await?;

        let cookie = extract_session_cookie(&response.set_cookies);
        let device_id = extract_web_id(&response.body);
        debug!(
            status = response.status,
            has_cookie = cookie.is_some(),
            has_device_id = device_id.is_some(),
            "bootstrap response inspected"
        );

        match (cookie, device_id) {
            (Some(cookie), Some(device_id)) => SessionCredentials::new(&cookie, &device_id)
                .ok_or_else(|| CommentFerryError::MissingField("session identifiers".to_string())),
            (None, _) => Err(CommentFerryError::MissingField(SESSION_COOKIE.to_string())),
            (_, None) => Err(CommentFerryError::MissingField("webid".to_string())),
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(self.user_agent)
                .map_err(|_| CommentFerryError::ValidationError("Invalid user_agent".to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static(BOOTSTRAP_ACCEPT));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(BOOTSTRAP_ACCEPT_LANGUAGE),
        );
        Ok(headers)
    }
}
