//! Diagnostic logging to stderr.
//!
//! The status line owns stdout, so everything here goes to stderr and is
//! filtered by `CCSTATUS_LOG` (standard `EnvFilter` syntax).

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "CCSTATUS_LOG";

/// Installs the global subscriber, falling back to `default_filter` when
/// `CCSTATUS_LOG` is unset or invalid. Safe to call more than once.
pub fn init(default_filter: &str) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}
