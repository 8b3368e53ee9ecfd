use std::time::Duration;

use crate::token::DEFAULT_TOKEN_LENGTH;

/// Browser identity every request is made (and signed) under.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 3;
pub const DEFAULT_SIGNER_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_PORT: u16 = 17237;

pub(crate) fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| {
            let v = v.trim();
            !v.is_empty() && v != "0" && v != "false" && v != "False"
        })
        .unwrap_or(false)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// How long session bootstrap keeps trying before giving up.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// `None` retries until cancelled.
    pub max_attempts: Option<u32>,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(10),
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn unbounded(backoff: Duration) -> Self {
        Self {
            max_attempts: None,
            backoff,
        }
    }

    pub fn attempts(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            backoff,
        }
    }

    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max)
    }
}

#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Routes every platform request to this base URL instead of the
    /// production hosts. Used by hermetic tests and local replay setups.
    pub api_base_override: Option<String>,
    pub http_timeout_secs: u64,
    /// Skips TLS certificate verification on every request. Off unless
    /// explicitly requested.
    pub accept_invalid_certs: bool,
    pub bootstrap: RetryPolicy,
    pub token_length: usize,
    pub page_size: u32,
    pub max_pages: u32,
    pub user_agent: String,
    pub signer_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            api_base_override: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            accept_invalid_certs: false,
            bootstrap: RetryPolicy::default(),
            token_length: DEFAULT_TOKEN_LENGTH,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: 1,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            signer_timeout_secs: DEFAULT_SIGNER_TIMEOUT_SECS,
        }
    }
}

impl CrawlerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_attempts = match env_parse::<u32>("COMMENTFERRY_BOOTSTRAP_MAX_ATTEMPTS") {
            Some(0) => None,
            Some(n) => Some(n),
            None => defaults.bootstrap.max_attempts,
        };
        let backoff = env_parse::<u64>("COMMENTFERRY_BOOTSTRAP_BACKOFF_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.bootstrap.backoff);

        Self {
            api_base_override: env_string("COMMENTFERRY_API_BASE"),
            http_timeout_secs: env_parse("COMMENTFERRY_HTTP_TIMEOUT_SECS")
                .filter(|s: &u64| *s > 0)
                .unwrap_or(defaults.http_timeout_secs),
            accept_invalid_certs: env_flag("COMMENTFERRY_ACCEPT_INVALID_CERTS"),
            bootstrap: RetryPolicy {
                max_attempts,
                backoff,
            },
            token_length: env_parse("COMMENTFERRY_TOKEN_LENGTH")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.token_length),
            page_size: env_parse("COMMENTFERRY_PAGE_SIZE")
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.page_size),
            max_pages: env_parse("COMMENTFERRY_MAX_PAGES")
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.max_pages),
            user_agent: env_string("COMMENTFERRY_USER_AGENT").unwrap_or(defaults.user_agent),
            signer_timeout_secs: env_parse("COMMENTFERRY_SIGNER_TIMEOUT_SECS")
                .filter(|s: &u64| *s > 0)
                .unwrap_or(defaults.signer_timeout_secs),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
