//! ccstatus: Claude Code status line.
//!
//! Claude Code pipes a JSON description of the session to stdin on every
//! refresh. This binary prints one status line (model, project, branch,
//! context usage, reset countdown, today's hours) plus the latest user
//! messages, then records a heartbeat for the session.
//!
//! It never fails loudly: malformed input prints nothing, and any lookup
//! that cannot be completed degrades to a blank or default segment.

use std::io::{self, Read, Write};

use chrono::Local;
use clap::Parser;
use tracing::debug;

use ccstatus::config::Config;
use ccstatus::git::BranchCache;
use ccstatus::logging;
use ccstatus::render::{gather, render, RenderEnv, StatusInput};
use ccstatus::session::record_heartbeat;

/// Status line for Claude Code. Reads session JSON from stdin.
#[derive(Parser)]
#[command(
    name = "ccstatus",
    version,
    about,
    long_about = "\
Status line for Claude Code. Reads the session JSON from stdin.\n\n\
Configure in ~/.claude/settings.json:\n  \
\"statusLine\": {\"type\": \"command\", \"command\": \"ccstatus\"}\n\n\
Environment variables:\n  \
CCSTATUS_LOG          Log filter for stderr diagnostics (e.g. debug)\n  \
CCSTATUS_CONFIG       Config file (default ~/.ccstatus/config.toml)\n  \
CCSTATUS_TRACKER_DIR  Session data (default ~/.claude/session-tracker)\n  \
CCSTATUS_CACHE_DIR    Reset markers (default ~/.claude/cache)"
)]
struct Cli {}

fn main() {
    let _ = Cli::parse();
    logging::init("off");

    let mut stdin_buf = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut stdin_buf) {
        debug!(error = %e, "failed to read stdin");
        return;
    }

    let Some(input) = StatusInput::parse(&stdin_buf) else {
        return;
    };

    let config = Config::load();
    let sessions_dir = Config::sessions_dir().ok();
    let cache_dir = Config::cache_dir().ok();
    let env = RenderEnv {
        config: &config,
        sessions_dir: sessions_dir.as_deref(),
        cache_dir: cache_dir.as_deref(),
        now: Local::now(),
    };

    let branches = BranchCache::new(config.git_cache_ttl());
    let fields = gather(&input, &env, &branches);

    if let Some(dir) = env.sessions_dir {
        if let Err(e) = record_heartbeat(
            dir,
            &input.session_id,
            &env.today(),
            env.epoch(),
            config.tracking.idle_gap_secs,
        ) {
            debug!(error = %e, "failed to record heartbeat");
        }
    }

    let mut stdout = io::stdout().lock();
    let _ = stdout.write_all(render(&input, &fields, &config.display).as_bytes());
    let _ = stdout.flush();
}
