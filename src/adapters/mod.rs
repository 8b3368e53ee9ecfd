//! Platform Adapters
//!
//! Each adapter knows one platform's comment-list endpoint: how to find the
//! content id in a URL, which query template and headers the endpoint
//! expects, and how the signature is attached.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use url::Url;
use wreq::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};

use crate::error::{CommentFerryError, Result};
use crate::session::SessionCredentials;
use crate::signer::SignatureScheme;
use crate::token::EphemeralToken;

pub mod douyin;
pub mod tiktok;

pub use douyin::DouyinAdapter;
pub use tiktok::TikTokAdapter;

pub(crate) const SEC_CH_UA: &str =
    r#""Google Chrome";v="123", "Not:A-Brand";v="8", "Chromium";v="123""#;

/// Identifier of a single video whose comments are fetched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: &str) -> Result<Self> {
        let id = id.trim();
        if id.is_empty() {
            return Err(CommentFerryError::InvalidUrl("Empty content id".to_string()));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything a single comment-list call is built from.
#[derive(Debug, Clone, Copy)]
pub struct EndpointParams<'a> {
    pub content_id: &'a ContentId,
    pub credentials: Option<&'a SessionCredentials>,
    pub token: &'a EphemeralToken,
    pub cursor: u64,
    pub count: u32,
    pub user_agent: &'a str,
}

impl<'a> EndpointParams<'a> {
    pub(crate) fn require_credentials(&self, platform: &str) -> Result<&'a SessionCredentials> {
        self.credentials.ok_or_else(|| {
            CommentFerryError::MissingField(format!("{} session credentials", platform))
        })
    }
}

pub trait PlatformAdapter: Send + Sync {
    /// Returns the unique identifier for this platform (e.g., "douyin", "tiktok")
    fn platform_id(&self) -> &'static str;

    /// Whether `host` belongs to this platform.
    fn matches_host(&self, host: &str) -> bool;

    /// Parse a content URL and extract the platform-specific content id.
    fn parse_input(&self, input: &str) -> Result<ContentId>;

    /// Which signer the comment-list query must be signed with.
    fn signature_scheme(&self) -> SignatureScheme;

    /// True if session identifiers must be bootstrapped before calling the API.
    fn requires_session_bootstrap(&self) -> bool;

    /// Page visited to bootstrap the session; also sent as `Referer`.
    fn referer_url(&self, id: &ContentId) -> String;

    /// Unsigned comment-list URL.
    fn build_endpoint(&self, params: &EndpointParams<'_>) -> Result<String>;

    /// Request headers for the comment-list call.
    fn header_set(&self, params: &EndpointParams<'_>) -> Result<HeaderMap>;

    /// Append the signature to an unsigned URL.
    fn attach_signature(&self, unsigned_url: &str, signature: &str) -> String;
}

/// Trailing non-empty path segment of `url`.
pub(crate) fn last_path_segment(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(String::from)
}

pub(crate) fn parse_url(input: &str) -> Result<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CommentFerryError::InvalidUrl("Empty input".to_string()));
    }
    Ok(Url::parse(trimmed)?)
}

pub(crate) fn api_base(api_base: Option<&str>, default: &str) -> String {
    api_base.unwrap_or(default).trim_end_matches('/').to_string()
}

/// Join query pairs in order, values verbatim. The signature covers this
/// exact string, so nothing is re-encoded or reordered.
pub(crate) fn join_query(pairs: &[(&str, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Chrome-on-Windows fetch headers shared by both comment endpoints.
pub(crate) fn browser_headers(user_agent: &str, accept: &'static str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static("sec-ch-ua"), HeaderValue::from_static(SEC_CH_UA));
    headers.insert(ACCEPT, HeaderValue::from_static(accept));
    headers.insert(HeaderName::from_static("sec-ch-ua-mobile"), HeaderValue::from_static("?0"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent)
            .map_err(|_| CommentFerryError::ValidationError("Invalid user_agent".to_string()))?,
    );
    headers.insert(
        HeaderName::from_static("sec-ch-ua-platform"),
        HeaderValue::from_static("\"Windows\""),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(HeaderName::from_static("sec-fetch-mode"), HeaderValue::from_static("cors"));
    headers.insert(HeaderName::from_static("sec-fetch-dest"), HeaderValue::from_static("empty"));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
    );
    Ok(headers)
}

/// `host` is `domain` itself or one of its subdomains.
pub(crate) fn host_in_domain(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// All supported adapters, routed to `api_base` when given.
pub fn all_adapters(api_base: Option<&str>) -> Vec<Arc<dyn PlatformAdapter>> {
    vec![
        Arc::new(DouyinAdapter::new(api_base)),
        Arc::new(TikTokAdapter::new(api_base)),
    ]
}

/// Pick the adapter for a content URL by its host.
pub fn adapter_for_url(input: &str, api_base: Option<&str>) -> Result<Arc<dyn PlatformAdapter>> {
    let url = parse_url(input)?;
    let host = url.host_str().unwrap_or("").to_ascii_lowercase();

    all_adapters(api_base)
        .into_iter()
        .find(|a| a.matches_host(&host))
        .ok_or_else(|| CommentFerryError::UnsupportedPlatform(format!("host: {}", host)))
}
