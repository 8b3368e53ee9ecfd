//! Douyin web comment list (`/aweme/v1/web/comment/list/`).
//!
//! Needs a bootstrapped session: the `ttwid` cookie travels in the `Cookie`
//! header and the device id goes into `webid`. Queries are signed with
//! `a_bogus`.

use wreq::header::{HeaderMap, HeaderValue, COOKIE, REFERER};

use crate::adapters::{
    api_base, browser_headers, host_in_domain, join_query, last_path_segment, parse_url,
    ContentId, EndpointParams, PlatformAdapter,
};
use crate::error::{CommentFerryError, Result};
use crate::signer::SignatureScheme;

pub const DOUYIN_BASE: &str = "https://www.douyin.com";
pub const COMMENT_LIST_PATH: &str = "/aweme/v1/web/comment/list/";
pub const DISCOVER_PATH: &str = "/discover";

const VERIFY_FP: &str = "verify_lwg2oa43_Ga6DRjOO_v2cd_4NL7_AHTp_qMKyKlDdoqra";
const ACCEPT_JSON: &str = "application/json, text/plain, */*";

/// Extract the aweme id from a Douyin URL.
///
/// `modal_id` in the query wins (discover/search overlays); otherwise the
/// last path segment is the id (`/video/{id}`, `/share/video/{id}`).
pub fn extract_aweme_id(input: &str) -> Result<ContentId> {
    let url = parse_url(input)?;

    if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == "modal_id") {
        if !v.is_empty() {
            return ContentId::new(&v);
        }
    }

    last_path_segment(&url)
        .ok_or_else(|| CommentFerryError::InvalidUrl(format!("Cannot extract aweme id from: {}", input)))
        .and_then(|id| ContentId::new(&id))
}

pub struct DouyinAdapter {
    api_base: String,
}

impl DouyinAdapter {
    pub fn new(api_base_override: Option<&str>) -> Self {
        Self {
            api_base: api_base(api_base_override, DOUYIN_BASE),
        }
    }
}

impl Default for DouyinAdapter {
    fn default() -> Self {
        Self::new(None)
    }
}

impl PlatformAdapter for DouyinAdapter {
    fn platform_id(&self) -> &'static str {
        "douyin"
    }

    fn matches_host(&self, host: &str) -> bool {
        host_in_domain(host, "douyin.com") || host_in_domain(host, "iesdouyin.com")
    }

    fn parse_input(&self, input: &str) -> Result<ContentId> {
        extract_aweme_id(input)
    }

    fn signature_scheme(&self) -> SignatureScheme {
        SignatureScheme::ABogus
    }

    fn requires_session_bootstrap(&self) -> bool {
        true
    }

    fn referer_url(&self, id: &ContentId) -> String {
        format!("{}{}?modal_id={}", self.api_base, DISCOVER_PATH, id)
    }

    fn build_endpoint(&self, params: &EndpointParams<'_>) -> Result<String> {
        let credentials = params.require_credentials(self.platform_id())?;

        // Fingerprint fields mimic Chrome 123 on Windows 10.
        let pairs: Vec<(&str, String)> = vec![
            ("device_platform", "webapp".into()),
            ("aid", "6383".into()),
            ("channel", "channel_pc_web".into()),
            ("aweme_id", params.content_id.to_string()),
            ("cursor", params.cursor.to_string()),
            ("count", params.count.to_string()),
            ("item_type", "0".into()),
            ("insert_ids", String::new()),
            ("whale_cut_token", String::new()),
            ("cut_version", "1".into()),
            ("rcFT", String::new()),
            ("update_version_code", "170400".into()),
            ("pc_client_type", "1".into()),
            ("version_code", "170400".into()),
            ("version_name", "17.4.0".into()),
            ("cookie_enabled", "true".into()),
            ("screen_width", "1920".into()),
            ("screen_height", "1080".into()),
            ("browser_language", "zh-CN".into()),
            ("browser_platform", "Win32".into()),
            ("browser_name", "Chrome".into()),
            ("browser_version", "123.0.0.0".into()),
            ("browser_online", "true".into()),
            ("engine_name", "Blink".into()),
            ("engine_version", "123.0.0.0".into()),
            ("os_name", "Windows".into()),
            ("os_version", "10".into()),
            ("cpu_core_num", "16".into()),
            ("device_memory", "8".into()),
            ("platform", "PC".into()),
            ("downlink", "10".into()),
            ("effective_type", "4g".into()),
            ("round_trip_time", "50".into()),
            ("webid", credentials.device_id.clone()),
            ("verifyFp", VERIFY_FP.into()),
            ("fp", VERIFY_FP.into()),
            ("msToken", params.token.to_string()),
        ];

        Ok(format!(
            "{}{}?{}",
            self.api_base,
            COMMENT_LIST_PATH,
            join_query(&pairs)
        ))
    }

    fn header_set(&self, params: &EndpointParams<'_>) -> Result<HeaderMap> {
        let credentials = params.require_credentials(self.platform_id())?;
        let mut headers = browser_headers(params.user_agent, ACCEPT_JSON)?;

        headers.insert(
            REFERER,
            HeaderValue::from_str(&self.referer_url(params.content_id))
                .map_err(|_| CommentFerryError::ValidationError("Invalid referer".to_string()))?,
        );
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&credentials.cookie_header())
                // Avoid echoing cookie content in errors/logs.
                .map_err(|_| CommentFerryError::ValidationError("Invalid cookies".to_string()))?,
        );
        Ok(headers)
    }

    fn attach_signature(&self, unsigned_url: &str, signature: &str) -> String {
        format!("{}&a_bogus={}", unsigned_url, signature)
    }
}
