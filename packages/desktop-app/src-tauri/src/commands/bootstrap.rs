//! Bootstrap pipeline commands
//!
//! The bootstrap page drives the launch gate through these three commands:
//! read the current snapshot (first read triggers the pipeline), retry from
//! a retryable phase, and hand the window over to the remote app once the
//! gate reports `Launched`.

use std::sync::Arc;

use kiosk_core::gate::GatePhase;
use kiosk_core::{BootstrapState, LaunchGate};
use tauri::{State, WebviewWindow};

/// Current bootstrap snapshot. Idempotent: the full pipeline runs on the
/// first call, later calls only read the latest immutable snapshot.
#[tauri::command]
pub async fn bootstrap_state(gate: State<'_, Arc<LaunchGate>>) -> Result<BootstrapState, String> {
    Ok(gate.bootstrap_state().await)
}

/// Re-enter `Probing` from `Unreachable` or `ParityBlocked`. A retry while
/// an attempt is in flight is dropped; the page re-polls `bootstrap_state`
/// for the outcome either way.
#[tauri::command]
pub async fn retry_connect(gate: State<'_, Arc<LaunchGate>>) -> Result<(), String> {
    gate.retry_connect().await;
    Ok(())
}

/// Navigate the window to the remote application.
///
/// Refused with a self-diagnosable message unless the gate is `Launched`.
#[tauri::command]
pub async fn launch_app(
    window: WebviewWindow,
    gate: State<'_, Arc<LaunchGate>>,
) -> Result<(), String> {
    let state = gate.bootstrap_state().await;
    if state.phase != GatePhase::Launched {
        return Err(launch_refusal(&state));
    }

    let config = gate
        .config()
        .ok_or_else(|| "Runtime configuration is missing.".to_string())?;

    let target = escape_js(config.app_url.as_str());
    window
        .eval(&format!("window.location.replace(\"{target}\");"))
        .map_err(|error| format!("Failed to navigate to {}: {error}", config.app_url))
}

/// One operator-readable line explaining why launch is refused right now
fn launch_refusal(state: &BootstrapState) -> String {
    if let Some(error) = &state.config_error {
        return format!("Configuration error: {error}");
    }
    if let Some(error) = &state.reachability_error {
        return format!("Server not reachable: {error}");
    }
    if let Some(error) = &state.build_parity_error {
        return format!("Server build check failed: {error}");
    }
    format!("Launch is not ready yet (phase: {:?}).", state.phase)
}

/// Escape a URL for interpolation into a double-quoted JS string
fn escape_js(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}
