use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::{Context, Result};

use super::{validator, CollectorConfig};

/// Overrides the config location.
pub const CONFIG_ENV_VAR: &str = "KR_COLLECTOR_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "assets/configs/collector.json";

pub fn resolve_config_path(root: &Path) -> PathBuf {
    match std::env::var_os(CONFIG_ENV_VAR) {
        Some(path) => PathBuf::from(path),
        None => root.join(DEFAULT_CONFIG_PATH),
    }
}

/// Load the collector config, falling back to the builtin defaults when no
/// file exists. Relative paths are resolved against `root`.
pub fn load_config(root: &Path) -> Result<CollectorConfig> {
    let path = resolve_config_path(root);
    let config = if path.exists() {
        load_config_file(&path)?
    } else {
        info!("no config at {}, using builtin defaults", path.display());
        CollectorConfig::builtin()
    };

    let config = anchor_paths(config, root);
    validator::validate(&config)?;
    Ok(config)
}

pub fn load_config_file(path: &Path) -> Result<CollectorConfig> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read collector config at {}", path.display()))?;
    let config: CollectorConfig = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse collector config at {}", path.display()))?;
    Ok(config)
}

fn anchor_paths(mut config: CollectorConfig, root: &Path) -> CollectorConfig {
    let anchor = |path: PathBuf| {
        if path.is_relative() {
            root.join(path)
        } else {
            path
        }
    };

    config.broker.fixture = anchor(config.broker.fixture);
    config.output_path = anchor(config.output_path);
    config.universe_file = config.universe_file.map(anchor);
    config
}
