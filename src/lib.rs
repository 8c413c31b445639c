pub mod config;
pub mod context;
pub mod git;
pub mod logging;
pub mod render;
pub mod reset;
pub mod session;
pub mod stats;
pub mod transcript;

pub use config::Config;
pub use git::{get_current_branch, BranchCache};
pub use render::{StatusFields, StatusInput};
pub use session::{record_heartbeat, SessionRecord, TodaySummary};
pub use stats::{load_all_stats, DailyStat, Selector};
