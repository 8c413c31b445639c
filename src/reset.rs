//! Daily usage-reset countdown.
//!
//! The first render of each calendar day writes a marker anchoring a fixed
//! quota window; later renders that day count down from the same anchor.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Immutable per-day anchor for the reset countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetMarker {
    pub date: String,
    /// Epoch seconds of the first heartbeat of the day
    pub first_use: i64,
    /// Window length in seconds
    pub reset_window: i64,
}

impl ResetMarker {
    pub fn new(date: &str, first_use: i64, reset_window: i64) -> Self {
        Self {
            date: date.to_string(),
            first_use,
            reset_window,
        }
    }

    /// Seconds until the window ends, floored at zero.
    pub fn remaining(&self, now: i64) -> i64 {
        (self.first_use + self.reset_window - now).max(0)
    }

    /// Returns today's marker, creating and persisting one on first use.
    ///
    /// A marker file whose date does not match `today` (or that fails to
    /// decode) is overwritten with a fresh anchor at `now`.
    pub fn load_or_create(cache_dir: &Path, today: &str, now: i64, reset_window: i64) -> Result<Self> {
        let path = marker_path(cache_dir, today);

        if let Ok(contents) = fs::read_to_string(&path) {
            match serde_json::from_str::<ResetMarker>(&contents) {
                Ok(marker) if marker.date == today => return Ok(marker),
                Ok(_) => debug!(path = %path.display(), "stale reset marker, replacing"),
                Err(e) => debug!(path = %path.display(), error = %e, "corrupt reset marker, replacing"),
            }
        }

        let marker = ResetMarker::new(today, now, reset_window);
        fs::create_dir_all(cache_dir)
            .with_context(|| format!("Failed to create cache directory: {:?}", cache_dir))?;
        let json = serde_json::to_string(&marker).context("Failed to serialize reset marker")?;

        // Readers treat an undecodable marker as corrupt and re-anchor it, so
        // the file must never be observed half-written.
        let temp_path = path.with_extension(format!("json.{}.tmp", std::process::id()));
        fs::write(&temp_path, json)
            .with_context(|| format!("Failed to write temp reset marker: {:?}", temp_path))?;
        fs::rename(&temp_path, &path)
            .with_context(|| format!("Failed to rename reset marker: {:?}", path))?;
        Ok(marker)
    }
}

/// `<cache_dir>/reset-YYYY-MM-DD.json`
pub fn marker_path(cache_dir: &Path, date: &str) -> PathBuf {
    cache_dir.join(format!("reset-{}.json", date))
}

/// Formats a countdown as `XhYm`, `Ym`, or `now`.
pub fn format_countdown(remaining: i64) -> String {
    let hours = remaining / 3600;
    let minutes = (remaining % 3600) / 60;
    if hours > 0 {
        format!("{}h{}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        "now".to_string()
    }
}
