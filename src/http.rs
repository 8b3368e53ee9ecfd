use regex::Regex;
use std::time::Duration;
use strum::VariantArray;
use wreq::{
    header::{HeaderMap, SET_COOKIE},
    Client,
};
use wreq_util::{Emulation, EmulationOS, EmulationOption};

use crate::config::CrawlerConfig;
use crate::error::{CommentFerryError, Result};

pub struct HttpClient {
    client: Client,
}

/// A response reduced to what the pipeline looks at. The status code is kept
/// for logging only; callers decide success from the body.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub set_cookies: Vec<String>,
    pub body: String,
}

impl RawResponse {
    pub fn has_body(&self) -> bool {
        !self.body.trim().is_empty()
    }
}

/// Extract version number from Emulation variant name (e.g., "Chrome123" -> Some(("Chrome", 123)))
fn parse_emulation_variant(emulation: Emulation) -> Option<(&'static str, u32)> {
    let name = format!("{:?}", emulation);

    let patterns = [
        ("Chrome", "Chrome"),
        ("Edge", "Edge"),
        ("Firefox", "Firefox"),
        ("Safari", "Safari"),
        ("Opera", "Opera"),
    ];

    for (prefix, browser_type) in patterns {
        if let Some(version_str) = name.strip_prefix(prefix) {
            // Handle variants like "Chrome123", "Safari18_3" (take first number)
            let version: String = version_str
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if let Ok(ver) = version.parse::<u32>() {
                return Some((browser_type, ver));
            }
        }
    }
    None
}

/// Find the closest matching Emulation variant for a given browser type and version
fn find_closest_emulation(browser_type: &str, target_version: u32) -> Emulation {
    let mut best_match: Option<(Emulation, i64)> = None;

    for &emulation in Emulation::VARIANTS {
        if let Some((emu_browser, emu_version)) = parse_emulation_variant(emulation) {
            if emu_browser == browser_type {
                let distance = (emu_version as i64 - target_version as i64).abs();
                if best_match.map_or(true, |(_, best)| distance < best) {
                    best_match = Some((emulation, distance));
                }
            }
        }
    }

    // Fallback: latest Chrome version available
    best_match.map(|(e, _)| e).unwrap_or_else(|| {
        Emulation::VARIANTS
            .iter()
            .filter_map(|&e| {
                parse_emulation_variant(e)
                    .filter(|(browser, _)| *browser == "Chrome")
                    .map(|(_, ver)| (e, ver))
            })
            .max_by_key(|(_, ver)| *ver)
            .map(|(e, _)| e)
            .unwrap_or(Emulation::VARIANTS[0])
    })
}

lazy_static::lazy_static! {
    static ref EDGE_RE: Regex = Regex::new(r"Edg/(\d+)").unwrap();
    static ref CHROME_RE: Regex = Regex::new(r"Chrome/(\d+)").unwrap();
    static ref FIREFOX_RE: Regex = Regex::new(r"Firefox/(\d+)").unwrap();
    static ref SAFARI_VERSION_RE: Regex = Regex::new(r"Version/(\d+)").unwrap();
}

fn major_version(ua: &str, pattern: &Regex) -> Option<u32> {
    pattern.captures(ua)?.get(1)?.as_str().parse::<u32>().ok()
}

/// Pick the TLS/HTTP2 fingerprint that matches the user agent we sign with.
pub fn parse_user_agent(ua: &str) -> (Emulation, EmulationOS) {
    let os = if ua.contains("Macintosh") || ua.contains("Mac OS") {
        EmulationOS::MacOS
    } else if ua.contains("Linux") && !ua.contains("Android") {
        EmulationOS::Linux
    } else {
        EmulationOS::Windows
    };

    // Edge UA contains both "Chrome" and "Edg"
    if let Some(ver) = major_version(ua, &EDGE_RE) {
        return (find_closest_emulation("Edge", ver), os);
    }

    if let Some(ver) = major_version(ua, &CHROME_RE) {
        return (find_closest_emulation("Chrome", ver), os);
    }

    if ua.contains("Firefox") {
        let ver = major_version(ua, &FIREFOX_RE).unwrap_or(999);
        return (find_closest_emulation("Firefox", ver), os);
    }

    if ua.contains("Safari") {
        let ver = major_version(ua, &SAFARI_VERSION_RE).unwrap_or(999);
        return (find_closest_emulation("Safari", ver), os);
    }

    (find_closest_emulation("Chrome", 999), os)
}

impl HttpClient {
    pub fn from_config(config: &CrawlerConfig) -> Result<Self> {
        Self::with_options(
            &config.user_agent,
            config.http_timeout(),
            config.accept_invalid_certs,
        )
    }

    pub fn with_options(
        user_agent: &str,
        timeout: Duration,
        accept_invalid_certs: bool,
    ) -> Result<Self> {
        let (emulation, os) = parse_user_agent(user_agent);
        tracing::debug!(emulation = ?emulation, "browser emulation selected");
        let emulation_opt = EmulationOption::builder()
            .emulation(emulation)
            .emulation_os(os)
            .build();

        if accept_invalid_certs {
            tracing::warn!("TLS certificate verification disabled");
        }

        let client = Client::builder()
            .emulation(emulation_opt)
            .timeout(timeout)
            .cert_verification(!accept_invalid_certs)
            .build()
            .map_err(|e| CommentFerryError::NetworkError(e.to_string()))?;

        Ok(Self { client })
    }

    /// GET `url` with exactly `headers`. Any HTTP status is a successful
    /// transport outcome; only connection-level failures are errors.
    pub async fn get_raw(&self, url: &str, headers: HeaderMap) -> Result<RawResponse> {
        let response = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await?;

        let status = response.status().as_u16();
        let set_cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(String::from)
            .collect();

        let body = response.text().await?;

        tracing::debug!(status, body_len = body.len(), "response received");

        Ok(RawResponse {
            status,
            set_cookies,
            body,
        })
    }
}
