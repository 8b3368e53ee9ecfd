use wreq::header::HeaderMap;

use crate::adapters::{
    api_base, browser_headers, host_in_domain, join_query, last_path_segment, parse_url,
    ContentId, EndpointParams, PlatformAdapter,
};
use crate::error::{CommentFerryError, Result};
use crate::signer::SignatureScheme;

pub const TIKTOK_BASE: &str = "https://www.tiktok.com";
pub const COMMENT_LIST_PATH: &str = "/api/comment/list/";

/// Companion value the web client sends next to `X-Bogus`. The endpoint only
/// checks that it is present and well-formed.
const STATIC_SIGNATURE: &str = "_02B4Z6wo000016M20awAAIDAnp.LMKuZmC-jNtUAAI6L17";

/// `browser_version` is the user agent without its `Mozilla/` prefix,
/// percent-encoded.
pub(crate) fn browser_version(user_agent: &str) -> String {
    let version = user_agent.strip_prefix("Mozilla/").unwrap_or(user_agent);
    urlencoding::encode(version).into_owned()
}

pub struct TikTokAdapter {
    api_base: String,
}

impl TikTokAdapter {
    pub fn new(api_base_override: Option<&str>) -> Self {
        Self {
            api_base: api_base(api_base_override, TIKTOK_BASE),
        }
    }
}

impl Default for TikTokAdapter {
    fn default() -> Self {
        Self::new(None)
    }
}

impl PlatformAdapter for TikTokAdapter {
    fn platform_id(&self) -> &'static str {
        "tiktok"
    }

    fn matches_host(&self, host: &str) -> bool {
        host_in_domain(host, "tiktok.com")
    }

    /// `/@user/video/{id}` and short forms alike: the id is the last segment.
    fn parse_input(&self, input: &str) -> Result<ContentId> {
        let url = parse_url(input)?;
        let id = last_path_segment(&url).ok_or_else(|| {
            CommentFerryError::InvalidUrl(format!("Cannot extract video id from: {}", input))
        })?;
        ContentId::new(&id)
    }

    fn signature_scheme(&self) -> SignatureScheme {
        SignatureScheme::XBogus
    }

    fn requires_session_bootstrap(&self) -> bool {
        false
    }

    fn referer_url(&self, id: &ContentId) -> String {
        format!("{}/video/{}", self.api_base, id)
    }

    fn build_endpoint(&self, params: &EndpointParams<'_>) -> Result<String> {
        let pairs: Vec<(&str, String)> = vec![
            ("WebIdLastTime", "1715249710".into()),
            ("aid", "1988".into()),
            ("app_language", "ja-JP".into()),
            ("app_name", "tiktok_web".into()),
            ("aweme_id", params.content_id.to_string()),
            ("browser_language", "zh-CN".into()),
            ("browser_name", "Mozilla".into()),
            ("browser_online", "true".into()),
            ("browser_platform", "Win32".into()),
            ("browser_version", browser_version(params.user_agent)),
            ("channel", "tiktok_web".into()),
            ("cookie_enabled", "true".into()),
            ("count", params.count.to_string()),
            ("current_region", "JP".into()),
            ("cursor", params.cursor.to_string()),
            ("device_id", "7366941338308609569".into()),
            ("device_platform", "web_pc".into()),
            ("enter_from", "tiktok_web".into()),
            ("focus_state", "true".into()),
            ("fromWeb", "1".into()),
            ("from_page", "video".into()),
            ("history_len", "2".into()),
            ("is_fullscreen", "false".into()),
            ("is_non_personalized", "false".into()),
            ("is_page_visible", "true".into()),
            ("odinId", "7367172442253296673".into()),
            ("os", "windows".into()),
            ("priority_region", String::new()),
            ("referer", String::new()),
            ("region", "GB".into()),
            ("screen_height", "1080".into()),
            ("screen_width", "1920".into()),
            ("tz_name", "Asia%2FShanghai".into()),
            ("webcast_language", "zh-Hans".into()),
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
        browser_headers(params.user_agent, "*/*")
    }

    fn attach_signature(&self, unsigned_url: &str, signature: &str) -> String {
        format!(
            "{}&X-Bogus={}&_signature={}",
            unsigned_url, signature, STATIC_SIGNATURE
        )
    }
}
