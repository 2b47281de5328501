//! Engine configuration loaded from `~/.config/streamscout/config.toml`.
//!
//! Every field has a default, so a missing file (or a file that only sets
//! one key) is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Browser-like user agent sent with page and playlist requests.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Tunables for one engine instance.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Timeout for a single playlist fetch, in seconds.
    pub fetch_timeout_secs: u64,
    /// Budget for one whole resolution walk, in seconds.
    pub deadline_secs: u64,
    /// Playlist fetches allowed in flight at once. `1` means a plain
    /// depth-first walk.
    pub max_concurrent_fetches: usize,
    /// Order the final map by height, highest first.
    pub sort_by_quality: bool,
    /// URL tokens that mark advertising media.
    pub ad_keywords: Vec<String>,
    /// User agent for outgoing requests.
    pub user_agent: String,
    /// Videos shorter than this are rejected. `0` disables the check.
    pub min_duration_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 15,
            deadline_secs: 60,
            max_concurrent_fetches: 1,
            sort_by_quality: true,
            ad_keywords: vec!["ads".into(), "promo".into(), "advert".into()],
            user_agent: DEFAULT_USER_AGENT.to_string(),
            min_duration_secs: 60,
        }
    }
}

impl EngineConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    /// Load the user config, falling back to defaults when absent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_path())
    }

    /// Load from an explicit path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "fetch_timeout_secs",
                message: "must be at least 1".into(),
            });
        }
        if self.max_concurrent_fetches == 0 {
            return Err(ConfigError::Invalid {
                field: "max_concurrent_fetches",
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Return the path to the engine config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("streamscout")
        .join("config.toml")
}
