use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fetch::decode::DEFAULT_HISTORY_LIMIT;
use crate::fetch::request::DEFAULT_SCREEN_NO;
use crate::records::DEFAULT_OUTPUT_FILE;

pub mod loader;
pub mod validator;

pub use loader::{load_config, resolve_config_path, CONFIG_ENV_VAR};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Replay document standing in for a live connection.
    pub fixture: PathBuf,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            fixture: PathBuf::from("assets/fixtures/replay_sample.json"),
        }
    }
}

/// Runtime settings for one collection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub broker: BrokerConfig,
    pub output_path: PathBuf,
    pub request_interval_ms: u64,
    /// `null` waits for every completion indefinitely.
    pub request_timeout_ms: Option<u64>,
    pub login_timeout_ms: Option<u64>,
    pub history_limit: usize,
    pub screen_no: String,
    /// CSV of codes replacing the market enumeration.
    pub universe_file: Option<PathBuf>,
    pub quote_listing_url: Option<String>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CollectorConfig {
    pub fn builtin() -> Self {
        Self {
            broker: BrokerConfig::default(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_FILE),
            request_interval_ms: 300,
            request_timeout_ms: Some(30_000),
            login_timeout_ms: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            screen_no: DEFAULT_SCREEN_NO.to_string(),
            universe_file: None,
            quote_listing_url: None,
        }
    }

    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn login_timeout(&self) -> Option<Duration> {
        self.login_timeout_ms.map(Duration::from_millis)
    }
}
