//! Engine configuration.
//!
//! [`EngineConfig`] carries the tuning knobs of the execution engine and the
//! fetch collaborator. Defaults match the hardware (worker count) and the
//! original scraper's retry policy. The struct deserializes from TOML so
//! embedding applications can load it from their own config files.

use serde::{Deserialize, Serialize};

use crate::error::{BindError, Result};

/// Tuning knobs for [`Scraper`](crate::Scraper) and the HTTP fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Worker pool size for top-level scrape tasks.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Default retry count for URL sources (per-source override wins).
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-agent override; `None` uses `docbind/<version>`.
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            retries: default_retries(),
            timeout_secs: default_timeout_secs(),
            user_agent: None,
        }
    }
}

impl EngineConfig {
    /// Parse a config from a TOML string; missing keys fall back to defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw)
            .map_err(|e| BindError::configuration(format!("invalid engine config: {e}")))
    }

    /// Load a config from a TOML file.
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BindError::configuration(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    30
}
