//! Configuration file parsing for ccstatus.
//!
//! Reads configuration from `~/.ccstatus/config.toml` and provides defaults
//! for missing fields. Also resolves the on-disk layout shared by the
//! status line and the stats report.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Heartbeat tracking settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Gap (seconds) between heartbeats after which the user is considered away
    pub idle_gap_secs: i64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self { idle_gap_secs: 600 }
    }
}

/// Usage reset window settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResetConfig {
    /// Length of the quota window anchored at the first use of the day
    pub window_secs: i64,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self { window_secs: 18_000 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// How long a looked-up branch name is reused
    pub cache_ttl_secs: u64,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self { cache_ttl_secs: 5 }
    }
}

/// Recent message block layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub message_max_lines: usize,
    pub message_line_width: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            message_max_lines: 3,
            message_line_width: 80,
        }
    }
}

/// Main configuration struct for ccstatus.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tracking: TrackingConfig,
    pub reset: ResetConfig,
    pub git: GitConfig,
    pub display: DisplayConfig,
}

impl Config {
    /// Load configuration from `~/.ccstatus/config.toml`.
    ///
    /// - If the file doesn't exist, returns default configuration.
    /// - If the file contains invalid TOML, logs a warning and returns default.
    /// - If some fields are missing, uses defaults for those fields.
    pub fn load() -> Config {
        let config_path = match Self::config_path() {
            Some(path) => path,
            None => {
                warn!("could not determine home directory, using default config");
                return Config::default();
            }
        };

        if !config_path.exists() {
            return Config::default();
        }

        match fs::read_to_string(&config_path) {
            Ok(contents) => Self::from_toml(&contents).unwrap_or_else(|e| {
                warn!(path = %config_path.display(), error = %e, "invalid TOML, using default config");
                Config::default()
            }),
            Err(e) => {
                warn!(path = %config_path.display(), error = %e, "could not read config, using default config");
                Config::default()
            }
        }
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_str)?;
        Ok(config)
    }

    pub fn git_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.git.cache_ttl_secs)
    }

    /// Returns the path to the config file.
    ///
    /// Respects `CCSTATUS_CONFIG` env var override.
    fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("CCSTATUS_CONFIG") {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|home| home.join(".ccstatus").join("config.toml"))
    }

    /// Returns the tracker root: `~/.claude/session-tracker/`
    ///
    /// Respects `CCSTATUS_TRACKER_DIR` env var override for test isolation.
    pub fn tracker_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var("CCSTATUS_TRACKER_DIR") {
            return Ok(PathBuf::from(dir));
        }
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".claude").join("session-tracker"))
    }

    /// Returns the active sessions directory: `<tracker>/sessions/`
    pub fn sessions_dir() -> Result<PathBuf> {
        Ok(Self::tracker_dir()?.join("sessions"))
    }

    /// Returns the directory holding reset markers: `~/.claude/cache/`
    ///
    /// Respects `CCSTATUS_CACHE_DIR` env var override for test isolation.
    pub fn cache_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var("CCSTATUS_CACHE_DIR") {
            return Ok(PathBuf::from(dir));
        }
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".claude").join("cache"))
    }
}
