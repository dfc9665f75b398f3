//! Reachability probe
//!
//! One bounded-timeout GET against the configured target. Any HTTP response
//! at all proves the server process is alive: auth challenges and even 5xx
//! errors count as reachable (a 5xx is logged at warn level with its status).
//! Only transport-level failure
//! (refused, timed out, DNS, TLS) is unreachability. The probe never
//! retries internally; retry is an explicit operator action on the
//! [`crate::gate::LaunchGate`] so the UI can always show progress.

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Timeout applied to the probe request and the parity fetch
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(8);

/// Redirect ceiling for the probe request
const MAX_REDIRECTS: usize = 5;

/// Transport-level reachability failures, classified for the operator.
/// All variants are recoverable via explicit user retry.
#[derive(Error, Debug, Clone)]
pub enum ReachError {
    #[error("Connection refused by {url}. Is the server running?")]
    ConnectionRefused { url: String },

    #[error("No response from {url} within {timeout_secs}s.")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("DNS lookup failed for {url}: {reason}")]
    DnsFailure { url: String, reason: String },

    #[error("TLS handshake with {url} failed: {reason}")]
    TlsFailure { url: String, reason: String },

    /// Transport failure that fits none of the narrower classes
    #[error("Could not reach server at {url}: {reason}")]
    Transport { url: String, reason: String },
}

/// Probe the target once with the given timeout.
///
/// Suspends only for the single HTTP request; the timeout bounds the
/// worst-case wait. Mid-flight cancellation is not supported.
pub async fn probe(url: &Url, timeout: Duration) -> Result<(), ReachError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
        .map_err(|error| ReachError::Transport {
            url: url.to_string(),
            reason: format!("HTTP client init failed: {error}"),
        })?;

    match client.get(url.clone()).send().await {
        Ok(response) => {
            let status = response.status();
            if status.is_server_error() {
                tracing::warn!(%url, %status, "server responded with an error status; treating as reachable");
            } else {
                tracing::debug!(%url, %status, "reachability probe got response");
            }
            Ok(())
        }
        Err(error) => Err(classify(url, timeout, &error)),
    }
}

/// Map a reqwest transport error onto the operator-facing taxonomy by inspecting the
/// error chain. Unmatched failures fall back to `Transport` with the
/// attempted URL preserved for the operator.
fn classify(url: &Url, timeout: Duration, error: &reqwest::Error) -> ReachError {
    let url = url.to_string();

    if error.is_timeout() {
        return ReachError::Timeout {
            url,
            timeout_secs: timeout.as_secs(),
        };
    }

    let chain = error_chain_text(error);

    if chain_has_io_kind(error, std::io::ErrorKind::ConnectionRefused) {
        return ReachError::ConnectionRefused { url };
    }

    let lowered = chain.to_ascii_lowercase();
    if lowered.contains("dns") || lowered.contains("failed to lookup") {
        return ReachError::DnsFailure { url, reason: chain };
    }
    if lowered.contains("tls") || lowered.contains("ssl") || lowered.contains("certificate") {
        return ReachError::TlsFailure { url, reason: chain };
    }

    ReachError::Transport { url, reason: chain }
}

/// Flatten the source chain into one operator-readable line
fn error_chain_text(error: &reqwest::Error) -> String {
    let mut parts = vec![error.to_string()];
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.dedup();
    parts.join(": ")
}

fn chain_has_io_kind(error: &reqwest::Error, kind: std::io::ErrorKind) -> bool {
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if io.kind() == kind {
                return true;
            }
        }
        source = cause.source();
    }
    false
}
