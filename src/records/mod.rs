use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Context, Result};

pub mod history;

pub use history::{FetchResult, OhlcvRecord, StockHistory};

/// Default document name the screening pass reads.
pub const DEFAULT_OUTPUT_FILE: &str = "all_stock_data.json";

/// Facade over the persisted fetch document.
pub struct Records {
    output_path: PathBuf,
}

impl Records {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Ensure the parent directory exists before anything is written.
    pub fn prepare(&self) -> Result<()> {
        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory {}", parent.display())
                })?;
            }
        }
        Ok(())
    }

    /// Write the whole result as one pretty-printed UTF-8 JSON document.
    pub fn save(&self, result: &FetchResult) -> Result<PathBuf> {
        self.prepare()?;
        let json = serde_json::to_string_pretty(result)?;
        fs::write(&self.output_path, json).with_context(|| {
            format!("Failed to write {}", self.output_path.display())
        })?;
        Ok(self.output_path.clone())
    }

    pub fn load(&self) -> Result<FetchResult> {
        Self::load_from(&self.output_path)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<FetchResult> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let result: FetchResult = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(result)
    }
}
