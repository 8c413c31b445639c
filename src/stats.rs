//! Historical time-usage report.
//!
//! Buckets every session record (active and archived) by calendar date and
//! prints per-day and grand totals for a selected date range.

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

pub const USAGE: &str = "Usage: ccstatus-stats [today|week|month|all|YYYY-MM-DD]";

const RULE: &str = "----------------------------------------";

/// The two fields a report needs from a session record.
#[derive(Debug, Deserialize)]
struct RecordSummary {
    #[serde(default)]
    date: String,
    #[serde(default)]
    total_seconds: i64,
}

/// Per-day aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyStat {
    pub date: NaiveDate,
    pub total_seconds: i64,
    pub session_count: usize,
}

/// Loads and buckets all records under the tracker directory, sorted by date.
///
/// Reads `<tracker>/sessions/*.json` and `<tracker>/archive/<dir>/*.json`.
/// Missing directories contribute nothing; undecodable files are skipped.
/// Any other directory read failure is returned.
pub fn load_all_stats(tracker_dir: &Path) -> Result<Vec<DailyStat>> {
    let mut buckets: BTreeMap<NaiveDate, DailyStat> = BTreeMap::new();

    collect_dir(&tracker_dir.join("sessions"), &mut buckets)?;

    let archive_dir = tracker_dir.join("archive");
    match fs::read_dir(&archive_dir) {
        Ok(entries) => {
            for entry in entries {
                let entry = entry.with_context(|| format!("Failed to read {:?}", archive_dir))?;
                if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                    collect_dir(&entry.path(), &mut buckets)?;
                }
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read archive directory: {:?}", archive_dir))
        }
    }

    Ok(buckets.into_values().collect())
}

fn collect_dir(dir: &Path, buckets: &mut BTreeMap<NaiveDate, DailyStat>) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e).with_context(|| format!("Failed to read sessions directory: {:?}", dir)),
    };

    for entry in entries {
        let path = entry.with_context(|| format!("Failed to read {:?}", dir))?.path();
        if path.extension().map(|e| e != "json").unwrap_or(true) {
            continue;
        }

        let Some(summary) = read_summary(&path) else {
            continue;
        };
        let Ok(date) = NaiveDate::parse_from_str(&summary.date, "%Y-%m-%d") else {
            debug!(path = %path.display(), date = %summary.date, "skipping record with bad date");
            continue;
        };

        let stat = buckets.entry(date).or_insert(DailyStat {
            date,
            total_seconds: 0,
            session_count: 0,
        });
        stat.total_seconds += summary.total_seconds;
        stat.session_count += 1;
    }

    Ok(())
}

fn read_summary(path: &Path) -> Option<RecordSummary> {
    let contents = fs::read_to_string(path).ok()?;
    match serde_json::from_str::<RecordSummary>(&contents) {
        Ok(summary) if !summary.date.is_empty() => Some(summary),
        Ok(_) => None,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "skipping unreadable record");
            None
        }
    }
}

/// Which dates a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Today,
    Week,
    Month,
    All,
    Date(NaiveDate),
}

impl FromStr for Selector {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(Selector::Today),
            "week" => Ok(Selector::Week),
            "month" => Ok(Selector::Month),
            "all" => Ok(Selector::All),
            other => NaiveDate::parse_from_str(other, "%Y-%m-%d").map(Selector::Date),
        }
    }
}

/// A titled, inclusive date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRange {
    pub title: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Selector {
    /// Resolves against `today`; `All` spans the known stats (today if none).
    pub fn range(&self, today: NaiveDate, stats: &[DailyStat]) -> ReportRange {
        let (title, start, end) = match *self {
            Selector::Today => ("Today".to_string(), today, today),
            Selector::Week => ("This Week".to_string(), week_start(today), today),
            Selector::Month => ("This Month".to_string(), today.with_day(1).unwrap_or(today), today),
            Selector::All => {
                let first = stats.first().map(|s| s.date).unwrap_or(today);
                let last = stats.last().map(|s| s.date).unwrap_or(today);
                ("All Time".to_string(), first, last)
            }
            Selector::Date(date) => (format!("Date {}", date), date, date),
        };
        ReportRange { title, start, end }
    }
}

/// Monday of the week containing `day` (six days back on a Sunday).
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_monday() as i64)
}

/// Renders the report for `range` over `stats`.
pub fn render_report(range: &ReportRange, stats: &[DailyStat]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", range.title);
    let _ = writeln!(out, "Range: {} to {}", range.start, range.end);
    let _ = writeln!(out, "{}", RULE);

    let mut total_seconds = 0;
    let mut total_sessions = 0;
    for stat in stats
        .iter()
        .filter(|s| s.date >= range.start && s.date <= range.end)
    {
        let _ = writeln!(
            out,
            "{} ({}): {:>2}h {:>2}m ({} sessions)",
            stat.date,
            stat.date.format("%a"),
            stat.total_seconds / 3600,
            (stat.total_seconds % 3600) / 60,
            stat.session_count
        );
        total_seconds += stat.total_seconds;
        total_sessions += stat.session_count;
    }

    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(
        out,
        "Total: {}h {}m ({} sessions)",
        total_seconds / 3600,
        (total_seconds % 3600) / 60,
        total_sessions
    );
    out
}
