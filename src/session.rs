//! Session record model and file I/O for ccstatus.
//!
//! A session record accumulates active time from heartbeats. Heartbeats only
//! arrive when the status line is rendered, so active time is inferred from
//! how densely they arrive: a gap shorter than the idle threshold extends the
//! current interval, a longer one starts a new interval.

use anyhow::{bail, Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A contiguous span of inferred activity. `end == None` means still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: i64,
    pub end: Option<i64>,
}

impl Interval {
    pub fn open(start: i64) -> Self {
        Self { start, end: None }
    }

    /// Duration of a closed interval; open intervals contribute nothing.
    pub fn closed_seconds(&self) -> i64 {
        self.end.map(|end| (end - self.start).max(0)).unwrap_or(0)
    }
}

/// Persisted per-session activity record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session identifier from Claude Code
    pub id: String,
    /// Local calendar day (`YYYY-MM-DD`) the session was created on
    pub date: String,
    /// Epoch seconds of the first heartbeat
    pub start: i64,
    /// Epoch seconds of the most recent heartbeat
    pub last_heartbeat: i64,
    /// Sum of closed interval durations, recomputed on every heartbeat
    pub total_seconds: i64,
    #[serde(default)]
    pub intervals: Vec<Interval>,
}

impl SessionRecord {
    /// Creates a record for a session seen for the first time.
    pub fn new(id: String, date: String, now: i64) -> Self {
        Self {
            id,
            date,
            start: now,
            last_heartbeat: now,
            total_seconds: 0,
            intervals: vec![Interval::open(now)],
        }
    }

    /// Applies one heartbeat at `now`.
    ///
    /// A gap of at least `idle_gap` closes an open interval at the previous
    /// heartbeat, not at `now`, since nothing was observed in between.
    pub fn heartbeat(&mut self, now: i64, idle_gap: i64) {
        let gap = now - self.last_heartbeat;
        let last_heartbeat = self.last_heartbeat;

        match self.intervals.last_mut() {
            Some(last) if gap < idle_gap => last.end = Some(now.max(last.start)),
            Some(last) => {
                if last.end.is_none() {
                    last.end = Some(last_heartbeat);
                }
                self.intervals.push(Interval::open(now));
            }
            None => self.intervals.push(Interval::open(now)),
        }

        self.last_heartbeat = now;
        self.recompute_total();
    }

    pub fn recompute_total(&mut self) {
        self.total_seconds = self.intervals.iter().map(Interval::closed_seconds).sum();
    }

    /// Parse a record from a JSON string.
    pub fn from_json(json: &str) -> Result<SessionRecord> {
        serde_json::from_str(json).context("Failed to parse session JSON")
    }

    /// Loads a record from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file: {:?}", path))?;
        Self::from_json(&contents)
    }

    /// Load all records from a directory.
    ///
    /// Non-JSON files, interrupted writes (`.json.tmp`) and records that fail
    /// to decode are skipped. A missing directory yields no records.
    pub fn load_all(sessions_dir: &Path) -> Result<Vec<SessionRecord>> {
        let mut records = Vec::new();

        if !sessions_dir.exists() {
            return Ok(records);
        }

        let entries = fs::read_dir(sessions_dir)
            .with_context(|| format!("Failed to read sessions directory: {:?}", sessions_dir))?;

        for entry in entries {
            let path = entry?.path();

            if !is_record_file(&path) {
                continue;
            }

            match SessionRecord::from_file(&path) {
                Ok(record) => records.push(record),
                Err(e) => debug!(path = %path.display(), error = %e, "skipping session file"),
            }
        }

        Ok(records)
    }

    /// Writes the record to a JSON file atomically.
    ///
    /// Writes to a temporary file first, then renames to the final path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize session")?;
        let temp_path = path.with_extension("json.tmp");

        fs::write(&temp_path, &json)
            .with_context(|| format!("Failed to write temp file: {:?}", temp_path))?;

        fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to rename temp file to {:?}", path))?;

        Ok(())
    }

    pub fn write_to_dir(&self, sessions_dir: &Path) -> Result<()> {
        self.write_to_file(&record_path(sessions_dir, &self.id))
    }
}

/// Lock file serializing heartbeats within a sessions directory.
pub const LOCK_FILE: &str = ".heartbeat.lock";

/// Returns the record file path for a session ID.
pub fn record_path(sessions_dir: &Path, session_id: &str) -> PathBuf {
    sessions_dir.join(format!("{}.json", session_id))
}

/// Session IDs become file names, so only plain names are accepted: ASCII
/// letters, digits, `-`, `_` and `.`, not starting with a dot.
pub fn is_valid_session_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && !session_id.starts_with('.')
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn is_record_file(path: &Path) -> bool {
    let is_json = path.extension().map(|e| e == "json").unwrap_or(false);
    let is_temp = path
        .file_name()
        .map(|n| n.to_string_lossy().ends_with(".tmp"))
        .unwrap_or(false);
    is_json && !is_temp
}

/// Records a heartbeat for `session_id` and persists the updated record.
///
/// The load-update-write cycle holds an exclusive lock on the directory's
/// [`LOCK_FILE`] so two renders racing on the same session cannot drop each
/// other's update. The lock is released when the file handle drops. An
/// unreadable or corrupt record is replaced by a fresh one.
pub fn record_heartbeat(
    sessions_dir: &Path,
    session_id: &str,
    today: &str,
    now: i64,
    idle_gap: i64,
) -> Result<SessionRecord> {
    if !is_valid_session_id(session_id) {
        bail!("Invalid session ID: {:?}", session_id);
    }

    fs::create_dir_all(sessions_dir)
        .with_context(|| format!("Failed to create sessions directory: {:?}", sessions_dir))?;

    let lock_path = sessions_dir.join(LOCK_FILE);
    let lock = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .with_context(|| format!("Failed to open lock file: {:?}", lock_path))?;
    FileExt::lock_exclusive(&lock)
        .with_context(|| format!("Failed to lock {:?}", lock_path))?;

    let path = record_path(sessions_dir, session_id);
    let record = match load_existing(&path) {
        Some(mut record) => {
            record.heartbeat(now, idle_gap);
            record
        }
        None => SessionRecord::new(session_id.to_string(), today.to_string(), now),
    };
    record.write_to_file(&path)?;
    Ok(record)
}

fn load_existing(path: &Path) -> Option<SessionRecord> {
    if !path.exists() {
        return None;
    }
    match SessionRecord::from_file(path) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt session record, starting fresh");
            None
        }
    }
}

/// Today's accumulated time across all sessions in the active directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TodaySummary {
    pub total_seconds: i64,
    /// Sessions whose last heartbeat is within the idle gap
    pub active_sessions: usize,
}

impl TodaySummary {
    pub fn from_records(records: &[SessionRecord], today: &str, now: i64, idle_gap: i64) -> Self {
        records
            .iter()
            .filter(|r| r.date == today)
            .fold(TodaySummary::default(), |mut acc, r| {
                acc.total_seconds += r.total_seconds;
                if now - r.last_heartbeat < idle_gap {
                    acc.active_sessions += 1;
                }
                acc
            })
    }

    /// Loads the summary from disk; an unreadable directory counts as nothing.
    pub fn load(sessions_dir: &Path, today: &str, now: i64, idle_gap: i64) -> Self {
        match SessionRecord::load_all(sessions_dir) {
            Ok(records) => Self::from_records(&records, today, now, idle_gap),
            Err(e) => {
                debug!(error = %e, "could not load sessions for today's total");
                Self::default()
            }
        }
    }

    /// Formats as `1h5m`/`5m`, with `[N sessions]` when several are active.
    pub fn display(&self) -> String {
        let time = format_hours_minutes(self.total_seconds);
        if self.active_sessions > 1 {
            format!("{} [{} sessions]", time, self.active_sessions)
        } else {
            time
        }
    }
}

/// Formats seconds as `XhYm`, or `Ym` below one hour.
pub fn format_hours_minutes(seconds: i64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{}h{}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// Extracts the project name from a path (last component).
pub fn extract_project_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}
