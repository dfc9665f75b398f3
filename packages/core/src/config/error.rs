//! Configuration error types
//!
//! Every variant is terminal for the current bootstrap attempt and is
//! surfaced verbatim to the operator; no amount of retrying fixes a broken
//! configuration without intervention, so the gate disables retry for these.
//! The one non-fatal case, `SourceUnreadable`, degrades the affected source
//! to empty and is recorded in the resolution diagnostics instead of
//! aborting resolution.

use thiserror::Error;

use super::ENV_PREFIX;

/// Configuration resolution/validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No source defined APP_URL
    #[error("APP_URL is not set. Set {ENV_PREFIX}APP_URL or APP_URL in client.env.")]
    MissingAppUrl,

    /// APP_URL present but not an absolute http(s) URL with a host
    #[error("APP_URL must be an absolute HTTP or HTTPS URL, got '{value}': {reason}")]
    InvalidAppUrl { value: String, reason: String },

    /// No source defined a non-empty ALLOWED_HOSTS
    #[error("ALLOWED_HOSTS must include at least one host. Set {ENV_PREFIX}ALLOWED_HOSTS or ALLOWED_HOSTS in client.env.")]
    MissingAllowedHosts,

    /// Release builds refuse loopback targets unless explicitly overridden
    #[error("APP_URL host '{host}' is a localhost address, which release builds refuse. Use a non-localhost target, or set {ENV_PREFIX}ALLOW_LOCALHOST_RELEASE=true for diagnostic deployments.")]
    LocalhostNotAllowedInRelease { host: String },

    /// The allowlist must contain the target's own host
    #[error("ALLOWED_HOSTS must include the APP_URL host '{host}'.")]
    AppHostNotAllowlisted { host: String },

    /// A present configuration file could not be read as KEY=VALUE lines.
    /// Non-fatal: the source is treated as empty and a warning is recorded.
    #[error("Configuration source '{source_path}' could not be read: {reason}")]
    SourceUnreadable { source_path: String, reason: String },

    /// A defined key failed to parse (numeric dimension, boolean, hex prefix)
    #[error("{key} {expected}, got '{value}'.")]
    InvalidValue {
        key: String,
        expected: String,
        value: String,
    },
}

impl ConfigError {
    /// Create an invalid-value error
    pub fn invalid_value(
        key: impl Into<String>,
        expected: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            key: key.into(),
            expected: expected.into(),
            value: value.into(),
        }
    }
}
