//! Well-known locations for dashboard state

use std::path::PathBuf;

/// Environment variable that overrides the state directory
pub const STATE_DIR_ENV: &str = "DASHBOARD_STATE_DIR";

/// Directory holding the session file and logs.
///
/// `DASHBOARD_STATE_DIR` wins, then the platform data directory.
pub fn default_state_dir() -> PathBuf {
    std::env::var(STATE_DIR_ENV).map(PathBuf::from).unwrap_or_else(|_| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dashboard")
    })
}
