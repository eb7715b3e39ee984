use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_HISTORY_WINDOW: usize = 100;
pub const DEFAULT_DETAIL_CONCURRENCY: usize = 6;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Env vars consulted for the API token, in order.
pub const TOKEN_ENV_VARS: &[&str] = &["GITDOC_TOKEN", "GITHUB_TOKEN"];

/// Client configuration, stored as JSON in `<config_dir>/gitdoc/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GitdocConfig {
    /// Number of most recent commits scanned for deletions. Deletions older
    /// than this are not detected.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Concurrent commit-detail requests during a scan.
    #[serde(default = "default_detail_concurrency")]
    pub detail_concurrency: usize,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_history_window() -> usize {
    DEFAULT_HISTORY_WINDOW
}

fn default_detail_concurrency() -> usize {
    DEFAULT_DETAIL_CONCURRENCY
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

impl Default for GitdocConfig {
    fn default() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
            detail_concurrency: DEFAULT_DETAIL_CONCURRENCY,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            api_base: default_api_base(),
        }
    }
}

impl GitdocConfig {
    /// Default location: `<config_dir>/gitdoc/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("gitdoc").join("config.json"))
    }

    /// Load from `path`. A missing file yields defaults; a malformed one is
    /// an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let config: GitdocConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing config: {}", path.display()))?;
        Ok(config)
    }

    /// Load from `path` if given, else from [`Self::default_path`].
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => match Self::default_path() {
                Some(p) => Self::load(&p),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

/// API token from the environment, if any.
pub fn token_from_env() -> Option<String> {
    TOKEN_ENV_VARS
        .iter()
        .filter_map(|k| std::env::var(k).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}
