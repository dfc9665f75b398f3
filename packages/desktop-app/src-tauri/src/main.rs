// Prevents additional console window on Windows in release, DO NOT REMOVE!!
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(kiosk_app_lib::constants::DEFAULT_LOG_FILTER)),
        )
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime");

    // Set this runtime as Tauri's async runtime before starting the app
    tauri::async_runtime::set(runtime.handle().clone());

    runtime.block_on(async { kiosk_app_lib::run() })
}
