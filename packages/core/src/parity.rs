//! Build parity check
//!
//! After the target proves reachable, the gate fetches the server's
//! deploy-info descriptor and compares its build identifier against the
//! operator-configured minimum. A fetch or parse failure here is a parity
//! failure, never an unreachability: the server is up but its
//! self-description could not be obtained or trusted.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Fixed relative diagnostic path on the target server
pub const DEPLOY_INFO_PATH: &str = "/api/admin/deploy-info";

/// Remote deploy descriptor. `build.hash` is authoritative; `git.hash` is
/// the fallback when the build hash is absent. Unknown fields are ignored
/// and missing sections default to empty, so a partially rolled-out server
/// still parses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeployInfo {
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default)]
    pub git: GitSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildSection {
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitSection {
    #[serde(default)]
    pub hash: Option<String>,
}

impl DeployInfo {
    /// The identifier parity compares: build hash, falling back to git hash
    pub fn observed_hash(&self) -> Option<&str> {
        self.build
            .hash
            .as_deref()
            .or(self.git.hash.as_deref())
            .filter(|hash| !hash.trim().is_empty())
    }
}

/// Why the parity check could not produce a trusted build identifier
#[derive(Error, Debug, Clone)]
pub enum ParityError {
    #[error("Could not fetch deploy info from {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Deploy info from {url} is malformed: {reason}")]
    MalformedResponse { url: String, reason: String },
}

/// Outcome of one parity check. `ok` ignores enforcement; the gate decides
/// whether a failed check blocks launch or only warns.
#[derive(Debug, Clone)]
pub struct ParityResult {
    pub build_hash: Option<String>,
    pub build_time: Option<String>,
    pub ok: bool,
    pub error: Option<ParityError>,
}

impl ParityResult {
    fn failed(error: ParityError) -> Self {
        Self {
            build_hash: None,
            build_time: None,
            ok: false,
            error: Some(error),
        }
    }
}

/// Whether an observed build identifier satisfies the configured minimum:
/// unset minimum always passes; otherwise case-insensitive prefix match.
pub fn hash_satisfies(observed: &str, min_hash: Option<&str>) -> bool {
    match min_hash {
        None => true,
        Some(min) => observed
            .to_ascii_lowercase()
            .starts_with(&min.to_ascii_lowercase()),
    }
}

/// Fetch deploy info from the target and compare against `min_hash`.
///
/// Runs only after the reachability probe succeeded; shares its timeout
/// bound. Never panics, never retries.
pub async fn check(app_url: &Url, min_hash: Option<&str>, timeout: Duration) -> ParityResult {
    let endpoint = match app_url.join(DEPLOY_INFO_PATH) {
        Ok(endpoint) => endpoint,
        Err(error) => {
            return ParityResult::failed(ParityError::FetchFailed {
                url: app_url.to_string(),
                reason: format!("could not derive deploy-info URL: {error}"),
            })
        }
    };

    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(error) => {
            return ParityResult::failed(ParityError::FetchFailed {
                url: endpoint.to_string(),
                reason: format!("HTTP client init failed: {error}"),
            })
        }
    };

    let response = match client.get(endpoint.clone()).send().await {
        Ok(response) => response,
        Err(error) => {
            return ParityResult::failed(ParityError::FetchFailed {
                url: endpoint.to_string(),
                reason: error.to_string(),
            })
        }
    };

    let status = response.status();
    if !status.is_success() {
        return ParityResult::failed(ParityError::FetchFailed {
            url: endpoint.to_string(),
            reason: format!("server responded with status {status}"),
        });
    }

    let info: DeployInfo = match response.json().await {
        Ok(info) => info,
        Err(error) => {
            return ParityResult::failed(ParityError::MalformedResponse {
                url: endpoint.to_string(),
                reason: error.to_string(),
            })
        }
    };

    let Some(observed) = info.observed_hash() else {
        return ParityResult::failed(ParityError::MalformedResponse {
            url: endpoint.to_string(),
            reason: "neither build.hash nor git.hash present".to_string(),
        });
    };

    let ok = hash_satisfies(observed, min_hash);
    tracing::debug!(
        observed,
        required = min_hash.unwrap_or("<unset>"),
        ok,
        "build parity comparison"
    );

    ParityResult {
        build_hash: Some(observed.to_string()),
        build_time: info.build.time.clone(),
        ok,
        error: None,
    }
}
