//! Per-user filesystem locations
//!
//! All persistent state the core touches lives under a single directory in
//! the platform config location (`%APPDATA%` on Windows, `~/.config` on
//! Linux, `~/Library/Application Support` on macOS): the auto-managed
//! `client.env` and the append-only startup log.

use std::path::PathBuf;

/// Directory name under the platform config dir
const APP_DIR: &str = "kiosk-client";

/// Configuration file name, shared by all three file source tiers
pub const CLIENT_ENV_FILE: &str = "client.env";

/// Per-user application directory, e.g. `~/.config/kiosk-client`
///
/// Returns `None` when the platform config directory cannot be determined;
/// callers degrade gracefully (the per-user source tier is skipped and the
/// startup log is disabled).
pub fn user_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR))
}

/// Per-user `client.env`, the lowest-precedence configuration source
pub fn user_config_file() -> Option<PathBuf> {
    user_dir().map(|dir| dir.join(CLIENT_ENV_FILE))
}

/// Append-only startup diagnostics log
pub fn startup_log_file() -> Option<PathBuf> {
    user_dir().map(|dir| dir.join("logs").join("startup.log"))
}
