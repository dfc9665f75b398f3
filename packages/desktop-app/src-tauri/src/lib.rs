//! Kiosk Client desktop shell
//!
//! Thin Tauri layer over the `kiosk-core` launch gating engine. The shell
//! creates the single confined window, wires the core's navigation guard
//! into the webview's navigation hook, and exposes the gate operations to
//! the bundled bootstrap page. All gating decisions live in the core; this
//! crate is presentation glue.

mod commands;
pub mod constants;

use std::sync::Arc;

use kiosk_core::LaunchGate;
use tauri::{Manager, WebviewUrl, WebviewWindowBuilder};

use kiosk_core::config::{DEFAULT_HEIGHT, DEFAULT_TITLE, DEFAULT_WIDTH};

/// Injected before the remote app loads: keeps `window.open` and
/// `target="_blank"` links inside the confined window and binds the
/// About-dialog hotkey.
const INIT_SCRIPT: &str = include_str!("init_script.js");

pub fn run() {
    // Configuration is resolved exactly once, before the window exists.
    // The pipeline itself runs when the bootstrap page first asks for state.
    let gate = Arc::new(LaunchGate::initialize(env!("CARGO_PKG_VERSION")));

    tauri::Builder::default()
        .manage(gate)
        .setup(|app| {
            let gate = app.state::<Arc<LaunchGate>>().inner().clone();

            // With a broken configuration the window still opens so the
            // bootstrap page can show the error; the guard then carries an
            // empty allowlist and blocks every external navigation.
            let (title, width, height) = match gate.config() {
                Some(config) => (
                    config.window_title.clone(),
                    config.window_width,
                    config.window_height,
                ),
                None => (DEFAULT_TITLE.to_string(), DEFAULT_WIDTH, DEFAULT_HEIGHT),
            };

            let guard = gate.navigation_guard();
            tracing::info!(%title, width, height, "creating confined window");

            WebviewWindowBuilder::new(
                app,
                constants::MAIN_WINDOW_LABEL,
                WebviewUrl::App("index.html".into()),
            )
            .title(title)
            .inner_size(f64::from(width), f64::from(height))
            .resizable(true)
            .initialization_script(INIT_SCRIPT)
            .on_navigation(move |url| guard.check(url))
            .build()?;

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::bootstrap::bootstrap_state,
            commands::bootstrap::retry_connect,
            commands::bootstrap::launch_app,
            commands::about::get_about_info,
        ])
        .run(tauri::generate_context!())
        .expect("error while running Kiosk Client");
}
