//! ccstatus-stats: time-usage report over recorded sessions.
//!
//! Usage: ccstatus-stats [today|week|month|all|YYYY-MM-DD]

use std::process::ExitCode;

use anyhow::Result;
use chrono::Local;
use clap::error::ErrorKind;
use clap::Parser;

use ccstatus::config::Config;
use ccstatus::logging;
use ccstatus::stats::{load_all_stats, render_report, Selector, USAGE};

/// Print daily Claude Code usage totals.
#[derive(Parser)]
#[command(name = "ccstatus-stats", version, about)]
struct Cli {
    /// today, week, month, all, or a date (YYYY-MM-DD)
    #[arg(default_value = "today")]
    range: String,
}

fn main() -> ExitCode {
    logging::init("warn");

    // Anything clap rejects (unknown flags, extra arguments) is reported with
    // the usage line, the same as an unknown range.
    let selector = match Cli::try_parse() {
        Ok(cli) => cli.range.parse::<Selector>().ok(),
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(_) => None,
    };

    match run(selector) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ccstatus-stats: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(selector: Option<Selector>) -> Result<()> {
    let stats = load_all_stats(&Config::tracker_dir()?)?;

    if stats.is_empty() {
        println!("No session data found.");
        return Ok(());
    }

    let Some(selector) = selector else {
        println!("{}", USAGE);
        return Ok(());
    };

    let today = Local::now().date_naive();
    print!("{}", render_report(&selector.range(today, &stats), &stats));
    Ok(())
}
