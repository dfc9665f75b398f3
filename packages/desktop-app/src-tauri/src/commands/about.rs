//! About dialog command

use std::sync::Arc;

use kiosk_core::{AboutInfo, LaunchGate};
use tauri::State;

/// Read-only About information, safe to call from any gate state
#[tauri::command]
pub fn get_about_info(gate: State<'_, Arc<LaunchGate>>) -> AboutInfo {
    gate.about_info()
}
