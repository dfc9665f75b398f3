//! Navigation guard
//!
//! Armed once from the validated allowlist and immutable for the session;
//! the allowlist cannot change without a process restart. Every navigation
//! the hosted window attempts is checked here. A blocked navigation keeps
//! the window on its current page, never redirected elsewhere.

use std::collections::HashSet;

use url::Url;

use crate::config::normalize_host;
use crate::diagnostics::{unix_timestamp, StartupLog};

/// Hosts the webview itself uses for its bundled bootstrap page
const INTERNAL_HOSTS: &[&str] = &["tauri.localhost", "localhost", "127.0.0.1", "::1"];

/// Schemes the webview needs for its own machinery (asset loading, blobs)
const INTERNAL_SCHEMES: &[&str] = &["tauri", "asset", "about", "data", "blob"];

/// Session navigation allowlist.
///
/// Host comparison is exact, case-insensitive, and ignores the port:
/// `192.168.50.55:3000` and `192.168.50.55` are the same host.
#[derive(Debug, Clone)]
pub struct NavigationGuard {
    allowed_hosts: HashSet<String>,
    log: StartupLog,
}

impl NavigationGuard {
    /// Arm the guard with normalized hosts from a validated config
    pub fn new(allowed_hosts: HashSet<String>, log: StartupLog) -> Self {
        Self {
            allowed_hosts,
            log,
        }
    }

    /// Decide a navigation attempt, recording blocks in the startup log
    pub fn check(&self, url: &Url) -> bool {
        if self.is_allowed(url) {
            return true;
        }

        let mut hosts: Vec<&str> = self.allowed_hosts.iter().map(String::as_str).collect();
        hosts.sort_unstable();
        tracing::warn!(%url, allowed = %hosts.join(","), "blocked navigation");
        self.log.append(&format!(
            "blocked_navigation timestamp={} url={} allowed_hosts={}",
            unix_timestamp(),
            url,
            hosts.join(",")
        ));
        false
    }

    /// Pure decision: internal schemes always pass, http(s) passes when the
    /// host is webview-internal or allowlisted, everything else is blocked
    pub fn is_allowed(&self, url: &Url) -> bool {
        let scheme = url.scheme();
        if INTERNAL_SCHEMES.contains(&scheme) {
            return true;
        }
        if scheme != "http" && scheme != "https" {
            return false;
        }

        url.host_str()
            .map(normalize_host)
            .map(|host| INTERNAL_HOSTS.contains(&host.as_str()) || self.allowed_hosts.contains(&host))
            .unwrap_or(false)
    }
}
