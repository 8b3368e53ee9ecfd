#![allow(dead_code)]

pub mod http;
pub mod mock_platform;

use commentferry_lib::config::{CrawlerConfig, RetryPolicy};
use std::time::Duration;

/// Pipeline settings pointed at a mock server, with a fast bounded bootstrap.
pub fn test_config(base_url: &str) -> CrawlerConfig {
    CrawlerConfig {
        api_base_override: Some(base_url.to_string()),
        bootstrap: RetryPolicy::attempts(5, Duration::from_millis(20)),
        ..CrawlerConfig::default()
    }
}
