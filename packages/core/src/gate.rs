//! LaunchGate state machine
//!
//! Orchestrates the bootstrap pipeline into one linear sequence:
//!
//! ```text
//! Initializing -> ConfigError                      (terminal, retry disabled)
//!              -> Probing -> Unreachable           (retry enabled)
//!                         -> ParityBlocked         (retry enabled)
//!                         -> ParityWarning -> Launched
//!                         -> Launched              (terminal, success)
//! ```
//!
//! Configuration is resolved once at construction; retry re-enters `Probing`
//! without re-reading any source. Every transition replaces the whole
//! [`BootstrapState`] snapshot; the presentation layer only ever reads
//! immutable copies, never a partially updated state.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::{
    validate_sources, ClientConfig, ConfigError, ConfigResolver, DEFAULT_HEIGHT, DEFAULT_TITLE,
    DEFAULT_WIDTH,
};
use crate::diagnostics::{unix_timestamp, StartupLog};
use crate::guard::NavigationGuard;
use crate::parity;
use crate::probe::{self, DEFAULT_PROBE_TIMEOUT};

/// Gate phases, serialized for the bootstrap page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GatePhase {
    Initializing,
    ConfigError,
    Probing,
    Unreachable,
    ParityBlocked,
    ParityWarning,
    Launched,
}

/// Immutable snapshot of the launch pipeline's current outcome.
///
/// Produced once per bootstrap attempt and again after every retry; never
/// partially mutated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapState {
    pub phase: GatePhase,
    /// Whether configuration resolved and validated successfully
    pub ready: bool,
    /// Whether `retry_connect` would do anything in this phase
    pub retry_enabled: bool,
    pub config_error: Option<String>,
    pub app_url: Option<String>,
    pub app_host: Option<String>,
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub version: String,
    pub reachable: bool,
    pub reachability_error: Option<String>,
    pub web_build_hash: Option<String>,
    pub web_build_time: Option<String>,
    pub required_web_build_hash: Option<String>,
    pub build_parity_ok: Option<bool>,
    pub build_parity_error: Option<String>,
    pub enforce_web_build: bool,
}

/// Read-only information for the About dialog, safe to call from any state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutInfo {
    pub title: String,
    pub version: String,
    pub app_host: String,
    pub app_url: String,
}

struct GateInner {
    started: bool,
    phase: GatePhase,
    trace: Vec<GatePhase>,
    snapshot: BootstrapState,
}

/// Single owner of the bootstrap pipeline and its state.
///
/// The snapshot lives behind one async mutex: no concurrent bootstrap
/// attempts exist, and a retry issued while an attempt is in flight is
/// dropped as a no-op (see [`retry_connect`]).
///
/// [`retry_connect`]: LaunchGate::retry_connect
pub struct LaunchGate {
    config: Result<ClientConfig, ConfigError>,
    version: String,
    probe_timeout: Duration,
    log: StartupLog,
    inner: Mutex<GateInner>,
}

impl LaunchGate {
    /// Resolve and validate configuration from the standard sources, write
    /// the startup diagnostics, and return the gate in `Initializing`.
    ///
    /// Called exactly once at process start. The pipeline itself does not
    /// run until the first [`bootstrap_state`] call.
    ///
    /// [`bootstrap_state`]: LaunchGate::bootstrap_state
    pub fn initialize(version: &str) -> Self {
        let log = StartupLog::in_user_dir();
        let resolver = ConfigResolver::new();
        let resolved = resolver.resolve();

        log.append("----- Kiosk Client startup -----");
        log.append(&format!("timestamp={}", unix_timestamp()));
        log.append(&format!("version={version}"));
        log.append_all(&resolved.diagnostics);
        for warning in &resolved.warnings {
            tracing::warn!(%warning, "configuration source degraded");
            log.append(&format!("warning={warning}"));
        }

        let config = validate_sources(&resolved);
        match &config {
            Ok(config) => log.append(&format!("startup_config=ok app_url={}", config.app_url)),
            Err(error) => log.append(&format!("startup_config=error:{error}")),
        }

        Self::new(config, version, log)
    }

    /// Gate over an already-resolved configuration (tests, embedding)
    pub fn new(config: Result<ClientConfig, ConfigError>, version: &str, log: StartupLog) -> Self {
        let version = version.to_string();
        let initial = initial_snapshot(&config, &version);

        Self {
            config,
            version,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            log,
            inner: Mutex::new(GateInner {
                started: false,
                phase: GatePhase::Initializing,
                trace: vec![GatePhase::Initializing],
                snapshot: initial,
            }),
        }
    }

    /// Override the probe/parity timeout (tests use short ones)
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Current snapshot. The first call triggers the full pipeline; later
    /// calls are idempotent snapshot reads. Calls issued while an attempt
    /// is in flight wait for it to complete rather than observing a
    /// half-written state.
    pub async fn bootstrap_state(&self) -> BootstrapState {
        let mut inner = self.inner.lock().await;
        if !inner.started {
            inner.started = true;
            self.run_attempt(&mut inner).await;
        }
        inner.snapshot.clone()
    }

    /// Re-enter `Probing` from a retryable phase.
    ///
    /// Configuration is not re-resolved. A retry issued while an attempt is
    /// in flight is dropped as a no-op rather than queued; the in-flight
    /// attempt's snapshot stands.
    pub async fn retry_connect(&self) {
        let Ok(mut inner) = self.inner.try_lock() else {
            tracing::debug!("retry ignored: bootstrap attempt in flight");
            return;
        };

        if !inner.started || !inner.snapshot.retry_enabled {
            tracing::debug!(phase = ?inner.phase, "retry ignored: not in a retryable phase");
            return;
        }

        self.log.append(&format!(
            "retry_connect timestamp={} from={:?}",
            unix_timestamp(),
            inner.phase
        ));
        self.run_attempt(&mut inner).await;
    }

    /// About-dialog info, safe in any state including `ConfigError`
    pub fn about_info(&self) -> AboutInfo {
        match &self.config {
            Ok(config) => AboutInfo {
                title: config.window_title.clone(),
                version: self.version.clone(),
                app_host: config.app_host(),
                app_url: config.app_url.to_string(),
            },
            Err(_) => AboutInfo {
                title: DEFAULT_TITLE.to_string(),
                version: self.version.clone(),
                app_host: "not-configured".to_string(),
                app_url: "not-configured".to_string(),
            },
        }
    }

    /// The validated configuration, if resolution succeeded
    pub fn config(&self) -> Option<&ClientConfig> {
        self.config.as_ref().ok()
    }

    /// Arm the navigation guard from the validated allowlist. With a failed
    /// configuration the guard carries an empty allowlist and blocks every
    /// external navigation.
    pub fn navigation_guard(&self) -> NavigationGuard {
        let allowed_hosts = self
            .config
            .as_ref()
            .map(|config| config.allowed_hosts.clone())
            .unwrap_or_default();
        NavigationGuard::new(allowed_hosts, self.log.clone())
    }

    /// Current phase
    pub async fn phase(&self) -> GatePhase {
        self.inner.lock().await.phase
    }

    /// Ordered phases this gate has passed through, `Initializing` first
    pub async fn phase_trace(&self) -> Vec<GatePhase> {
        self.inner.lock().await.trace.clone()
    }

    /// One bootstrap attempt: probe, then parity, then the gate decision.
    /// Runs with the state lock held, so readers see only complete snapshots.
    async fn run_attempt(&self, inner: &mut GateInner) {
        let config = match &self.config {
            Ok(config) => config,
            Err(error) => {
                tracing::error!(%error, "configuration invalid, launch blocked");
                self.transition(inner, self.base_snapshot(GatePhase::ConfigError));
                self.log.append(&format!("attempt_result=config-error:{error}"));
                return;
            }
        };

        self.transition(inner, self.base_snapshot(GatePhase::Probing));

        if let Err(error) = probe::probe(&config.app_url, self.probe_timeout).await {
            tracing::warn!(%error, url = %config.app_url, "target unreachable");
            let mut snapshot = self.base_snapshot(GatePhase::Unreachable);
            snapshot.reachability_error = Some(error.to_string());
            self.transition(inner, snapshot);
            self.log.append(&format!("attempt_result=unreachable:{error}"));
            return;
        }

        let parity = parity::check(
            &config.app_url,
            config.min_web_build_hash.as_deref(),
            self.probe_timeout,
        )
        .await;

        let phase = if parity.ok {
            GatePhase::Launched
        } else if config.enforce_web_build {
            GatePhase::ParityBlocked
        } else {
            GatePhase::ParityWarning
        };

        let mut snapshot = self.base_snapshot(phase);
        snapshot.reachable = true;
        snapshot.web_build_hash = parity.build_hash.clone();
        snapshot.web_build_time = parity.build_time.clone();
        snapshot.build_parity_ok = Some(parity.ok);
        snapshot.build_parity_error = match (&parity.error, parity.ok) {
            (Some(error), _) => Some(error.to_string()),
            (None, false) => Some(format!(
                "Server build '{}' does not satisfy the required minimum '{}'.",
                parity.build_hash.as_deref().unwrap_or("<unknown>"),
                config.min_web_build_hash.as_deref().unwrap_or("<unset>"),
            )),
            (None, true) => None,
        };
        self.transition(inner, snapshot);
        self.log.append(&format!(
            "attempt_result=reachable parity_ok={} observed={} required={}",
            parity.ok,
            parity.build_hash.as_deref().unwrap_or("<none>"),
            config.min_web_build_hash.as_deref().unwrap_or("<unset>"),
        ));

        // A non-enforcing parity failure surfaces the warning snapshot,
        // then the gate proceeds to Launched with the warning fields intact.
        if phase == GatePhase::ParityWarning {
            let mut launched = inner.snapshot.clone();
            launched.phase = GatePhase::Launched;
            launched.retry_enabled = false;
            self.transition(inner, launched);
        }
    }

    /// Replace the snapshot atomically and record the transition
    fn transition(&self, inner: &mut GateInner, snapshot: BootstrapState) {
        let to = snapshot.phase;
        tracing::info!(from = ?inner.phase, to = ?to, "launch gate transition");
        inner.phase = to;
        inner.trace.push(to);
        inner.snapshot = snapshot;
    }

    fn base_snapshot(&self, phase: GatePhase) -> BootstrapState {
        let mut snapshot = initial_snapshot(&self.config, &self.version);
        snapshot.phase = phase;
        snapshot.retry_enabled = matches!(phase, GatePhase::Unreachable | GatePhase::ParityBlocked);
        snapshot
    }
}

/// Snapshot for a gate that has not probed yet (and the template every
/// later snapshot is rebuilt from; nothing carries over between attempts)
fn initial_snapshot(config: &Result<ClientConfig, ConfigError>, version: &str) -> BootstrapState {
    match config {
        Ok(config) => BootstrapState {
            phase: GatePhase::Initializing,
            ready: true,
            retry_enabled: false,
            config_error: None,
            app_url: Some(config.app_url.to_string()),
            app_host: Some(config.app_host()),
            window_title: config.window_title.clone(),
            window_width: config.window_width,
            window_height: config.window_height,
            version: version.to_string(),
            reachable: false,
            reachability_error: None,
            web_build_hash: None,
            web_build_time: None,
            required_web_build_hash: config.min_web_build_hash.clone(),
            build_parity_ok: None,
            build_parity_error: None,
            enforce_web_build: config.enforce_web_build,
        },
        Err(error) => BootstrapState {
            phase: GatePhase::Initializing,
            ready: false,
            retry_enabled: false,
            config_error: Some(error.to_string()),
            app_url: None,
            app_host: None,
            window_title: DEFAULT_TITLE.to_string(),
            window_width: DEFAULT_WIDTH,
            window_height: DEFAULT_HEIGHT,
            version: version.to_string(),
            reachable: false,
            reachability_error: None,
            web_build_hash: None,
            web_build_time: None,
            required_web_build_hash: None,
            build_parity_ok: None,
            build_parity_error: None,
            enforce_web_build: false,
        },
    }
}
