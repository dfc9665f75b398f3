//! Shared constants used across the shell

/// Label of the single application window
pub const MAIN_WINDOW_LABEL: &str = "main";

/// Tracing filter applied when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "info,kiosk_core=debug";
