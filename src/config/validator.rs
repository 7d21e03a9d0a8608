use crate::error::{AppError, Result};

use crate::fetch::decode::DEFAULT_HISTORY_LIMIT;

use super::CollectorConfig;

/// Remote ceiling is 5 requests per second.
pub const MIN_REQUEST_INTERVAL_MS: u64 = 200;

/// Validate a config and report every problem at once.
pub fn validate(config: &CollectorConfig) -> Result<()> {
    let mut issues = Vec::new();

    validate_pacing(config, &mut issues);
    validate_history(config, &mut issues);
    validate_paths(config, &mut issues);

    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::message(format!(
            "collector config invalid:\n  - {}",
            issues.join("\n  - ")
        )))
    }
}

fn validate_pacing(config: &CollectorConfig, issues: &mut Vec<String>) {
    if config.request_interval_ms < MIN_REQUEST_INTERVAL_MS {
        issues.push(format!(
            "request_interval_ms must be at least {MIN_REQUEST_INTERVAL_MS} (got {})",
            config.request_interval_ms
        ));
    }
    if config.request_timeout_ms == Some(0) {
        issues.push("request_timeout_ms must be positive or null".to_string());
    }
    if config.login_timeout_ms == Some(0) {
        issues.push("login_timeout_ms must be positive or null".to_string());
    }
}

fn validate_history(config: &CollectorConfig, issues: &mut Vec<String>) {
    if config.history_limit == 0 || config.history_limit > DEFAULT_HISTORY_LIMIT {
        issues.push(format!(
            "history_limit must be between 1 and {DEFAULT_HISTORY_LIMIT} (got {})",
            config.history_limit
        ));
    }
    if config.screen_no.trim().is_empty() {
        issues.push("screen_no must not be empty".to_string());
    }
}

fn validate_paths(config: &CollectorConfig, issues: &mut Vec<String>) {
    if config.output_path.as_os_str().is_empty() {
        issues.push("output_path must not be empty".to_string());
    }
    if config.broker.fixture.as_os_str().is_empty() {
        issues.push("broker.fixture must not be empty".to_string());
    }
    if let Some(url) = &config.quote_listing_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            issues.push(format!("quote_listing_url must be http(s): {url}"));
        }
    }
}
