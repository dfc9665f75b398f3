//! Launch configuration
//!
//! Configuration is resolved once at process start from four ranked sources
//! (process environment, CWD `client.env`, executable-adjacent `client.env`,
//! per-user `client.env`), validated, and frozen into a [`ClientConfig`] for
//! the lifetime of the session. Retry never re-resolves configuration.
//!
//! See [`source`] for the layering rules and [`validate`] for the checks.

pub mod error;
pub mod source;
pub mod validate;

pub use error::ConfigError;
pub use source::{ConfigResolver, ResolvedSources, SourceLayout};
pub use validate::validate_sources;

use std::collections::HashSet;
use url::Url;

/// Prefix for namespaced process environment variables.
/// The raw environment never accepts bare key names; `APP_URL` set by some
/// unrelated tool must not silently become this client's target.
pub const ENV_PREFIX: &str = "KIOSK_CLIENT_";

pub const KEY_APP_URL: &str = "APP_URL";
pub const KEY_ALLOWED_HOSTS: &str = "ALLOWED_HOSTS";
pub const KEY_WINDOW_TITLE: &str = "WINDOW_TITLE";
pub const KEY_WINDOW_WIDTH: &str = "WINDOW_WIDTH";
pub const KEY_WINDOW_HEIGHT: &str = "WINDOW_HEIGHT";
pub const KEY_MIN_WEB_BUILD_HASH: &str = "MIN_WEB_BUILD_HASH";
pub const KEY_ENFORCE_WEB_BUILD: &str = "ENFORCE_WEB_BUILD";
pub const KEY_ALLOW_LOCALHOST_RELEASE: &str = "ALLOW_LOCALHOST_RELEASE";

/// All recognized keys, in resolution/diagnostic order
pub const RECOGNIZED_KEYS: &[&str] = &[
    KEY_APP_URL,
    KEY_ALLOWED_HOSTS,
    KEY_WINDOW_TITLE,
    KEY_WINDOW_WIDTH,
    KEY_WINDOW_HEIGHT,
    KEY_MIN_WEB_BUILD_HASH,
    KEY_ENFORCE_WEB_BUILD,
    KEY_ALLOW_LOCALHOST_RELEASE,
];

pub const DEFAULT_TITLE: &str = "Kiosk Client";
pub const DEFAULT_WIDTH: u32 = 1280;
pub const DEFAULT_HEIGHT: u32 = 800;
pub const DEFAULT_APP_URL: &str = "http://192.168.50.55:3000";
pub const DEFAULT_ALLOWED_HOSTS: &str = "192.168.50.55";

/// Hosts that resolve to the local machine or the webview's internal origin.
/// Blocked as `app_url` targets in release builds unless explicitly allowed.
pub const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1", "tauri.localhost"];

/// Validated launch configuration, immutable once resolved for a session.
///
/// Constructed only by [`validate::validate_sources`]; no partial or
/// best-effort config is ever handed to later pipeline stages.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Target application URL (http or https)
    pub app_url: Url,

    /// Normalized hosts the session may navigate to.
    /// Always contains `app_url`'s host; validated, never silently fixed.
    pub allowed_hosts: HashSet<String>,

    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,

    /// Minimum acceptable web build hash (lower-cased hex prefix)
    pub min_web_build_hash: Option<String>,

    /// Whether a failed parity check blocks launch (default: release builds only)
    pub enforce_web_build: bool,

    /// Operator override for the release localhost guard
    pub allow_localhost_release: bool,
}

impl ClientConfig {
    /// Normalized host component of `app_url`.
    /// Validation guarantees the URL has one.
    pub fn app_host(&self) -> String {
        self.app_url
            .host_str()
            .map(normalize_host)
            .unwrap_or_default()
    }
}

/// Canonical host form used for every allowlist comparison
pub fn normalize_host(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}
