//! Status line composition.
//!
//! Five independent lookups (branch, today's hours, context usage, reset
//! countdown, recent messages) run on scoped threads and are joined before
//! the line is formatted. Nothing here returns an error: every lookup has a
//! degraded default.

use std::path::Path;
use std::thread;

use chrono::{DateTime, Local};
use serde::Deserialize;
use tracing::debug;

use crate::config::{Config, DisplayConfig};
use crate::context::ContextUsage;
use crate::git::BranchCache;
use crate::reset::{format_countdown, ResetMarker};
use crate::session::{extract_project_name, TodaySummary};
use crate::transcript;

pub const COLOR_RESET: &str = "\x1b[0m";
pub const COLOR_GREEN: &str = "\x1b[38;2;152;195;121m";
pub const COLOR_GRAY: &str = "\x1b[38;2;64;64;64m";

/// Model family -> (color, icon).
const MODEL_STYLES: &[(&str, &str, &str)] = &[
    ("Opus", "\x1b[38;2;195;158;83m", "💛"),
    ("Sonnet", "\x1b[38;2;118;170;185m", "💠"),
    ("Haiku", "\x1b[38;2;255;182;193m", "🌸"),
];

/// Number of recent user messages shown under the status line.
const RECENT_MESSAGES: usize = 2;
const MESSAGE_SEPARATOR: &str = "\n---\n";

/// Input JSON piped by Claude Code on each status line refresh.
#[derive(Debug, Default, Deserialize)]
pub struct StatusInput {
    #[serde(default)]
    pub model: ModelInfo,
    pub session_id: String,
    #[serde(default)]
    pub workspace: WorkspaceInfo,
    #[serde(default)]
    pub transcript_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModelInfo {
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct WorkspaceInfo {
    #[serde(default)]
    pub current_dir: String,
}

impl StatusInput {
    /// Parses stdin; `None` for malformed input or an empty session ID.
    pub fn parse(json: &str) -> Option<Self> {
        match serde_json::from_str::<StatusInput>(json) {
            Ok(input) if !input.session_id.is_empty() => Some(input),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "malformed status line input");
                None
            }
        }
    }

    fn transcript(&self) -> Option<&Path> {
        self.transcript_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(Path::new)
    }
}

/// Where a render reads from and when it happens.
#[derive(Debug, Clone)]
pub struct RenderEnv<'a> {
    pub config: &'a Config,
    pub sessions_dir: Option<&'a Path>,
    pub cache_dir: Option<&'a Path>,
    pub now: DateTime<Local>,
}

impl RenderEnv<'_> {
    pub fn today(&self) -> String {
        self.now.format("%Y-%m-%d").to_string()
    }

    pub fn epoch(&self) -> i64 {
        self.now.timestamp()
    }
}

/// Results of the concurrent lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFields {
    pub branch: Option<String>,
    pub today: TodaySummary,
    pub context: ContextUsage,
    /// Seconds until reset; `None` when no marker could be kept
    pub reset_remaining: Option<i64>,
    pub messages: Vec<String>,
}

/// Runs the five lookups concurrently and waits for all of them.
pub fn gather(input: &StatusInput, env: &RenderEnv<'_>, branches: &BranchCache) -> StatusFields {
    let today = env.today();
    let now = env.epoch();
    let idle_gap = env.config.tracking.idle_gap_secs;
    let window = env.config.reset.window_secs;
    let transcript = input.transcript();
    let model = input.model.display_name.as_str();

    thread::scope(|s| {
        let branch = s.spawn(|| {
            let cwd = input.workspace.current_dir.as_str();
            if cwd.is_empty() {
                None
            } else {
                branches.branch(Path::new(cwd))
            }
        });
        let hours = s.spawn(|| {
            env.sessions_dir
                .map(|dir| TodaySummary::load(dir, &today, now, idle_gap))
                .unwrap_or_default()
        });
        let context = s.spawn(|| {
            let tokens = transcript.map(transcript::latest_context_tokens).unwrap_or(0);
            ContextUsage::new(tokens, model)
        });
        let reset = s.spawn(|| {
            let dir = env.cache_dir?;
            match ResetMarker::load_or_create(dir, &today, now, window) {
                Ok(marker) => Some(marker.remaining(now)),
                Err(e) => {
                    debug!(error = %e, "reset marker unavailable");
                    None
                }
            }
        });
        let messages = s.spawn(|| {
            transcript
                .map(|path| transcript::recent_user_messages(path, &input.session_id, RECENT_MESSAGES))
                .unwrap_or_default()
        });

        StatusFields {
            branch: branch.join().unwrap_or_default(),
            today: hours.join().unwrap_or_default(),
            context: context.join().unwrap_or_else(|_| ContextUsage::new(0, model)),
            reset_remaining: reset.join().unwrap_or_default(),
            messages: messages.join().unwrap_or_default(),
        }
    })
}

/// Formats the status line followed by the optional message block.
pub fn render(input: &StatusInput, fields: &StatusFields, display: &DisplayConfig) -> String {
    let branch = fields
        .branch
        .as_ref()
        .map(|b| format!(" ⚡ {}", b))
        .unwrap_or_default();
    let reset = fields
        .reset_remaining
        .map(|r| format!(" | ↻ {}", format_countdown(r)))
        .unwrap_or_default();

    let mut out = format!(
        "{}[{}] 📂 {}{}{}{} | {}{}\n",
        COLOR_RESET,
        format_model(&input.model.display_name),
        extract_project_name(&input.workspace.current_dir),
        branch,
        fields.context.display(),
        reset,
        fields.today.display(),
        COLOR_RESET
    );
    out.push_str(&format_user_messages(
        &fields.messages,
        display.message_max_lines,
        display.message_line_width,
    ));
    out
}

/// Colours and decorates known model families.
pub fn format_model(model: &str) -> String {
    MODEL_STYLES
        .iter()
        .find(|(family, _, _)| model.contains(family))
        .map(|(_, color, icon)| format!("{}{} {}{}", color, icon, model, COLOR_RESET))
        .unwrap_or_else(|| model.to_string())
}

/// Renders the recent-message block, one `｜`-prefixed line each.
///
/// Messages are joined with a `---` separator; escaped `\n` sequences count
/// as line breaks. Lines beyond `max_lines` collapse into a `+N more lines`
/// marker and long lines are cut to `width` characters.
pub fn format_user_messages(messages: &[String], max_lines: usize, width: usize) -> String {
    if messages.is_empty() {
        return String::new();
    }

    let joined = messages.join(MESSAGE_SEPARATOR).replace("\\n", "\n");
    let lines: Vec<&str> = joined.split('\n').collect();

    let mut out = String::new();
    for line in lines.iter().take(max_lines) {
        out.push_str(&format!(
            "{}｜{}{}{}\n",
            COLOR_RESET,
            COLOR_GREEN,
            truncate_line(line.trim(), width),
            COLOR_RESET
        ));
    }
    if lines.len() > max_lines {
        out.push_str(&format!(
            "{}｜... (+{} more lines){}\n",
            COLOR_RESET,
            lines.len() - max_lines,
            COLOR_RESET
        ));
    }
    out
}

/// Truncate to `width` characters, ending in "..." if cut.
pub fn truncate_line(line: &str, width: usize) -> String {
    if line.chars().count() <= width {
        line.to_string()
    } else if width <= 3 {
        ".".repeat(width)
    } else {
        let kept: String = line.chars().take(width - 3).collect();
        format!("{}...", kept)
    }
}
