//! Kiosk Client Launch Gating Engine
//!
//! This crate owns the entire decision pipeline that runs before the desktop
//! shell is allowed to display the remote web application:
//!
//! 1. Layered configuration resolution with validation and one-time migration
//! 2. A bounded-timeout reachability probe against the configured target
//! 3. A build-parity comparison against the server's deploy-info endpoint
//! 4. The navigation guard that confines the session to the host allowlist
//!
//! # Modules
//!
//! - [`config`] - ConfigSource resolution, validation, `ClientConfig`
//! - [`probe`] - Reachability probe and `ReachError` classification
//! - [`parity`] - Deploy-info fetch and build-parity comparison
//! - [`guard`] - Session navigation allowlist enforcement
//! - [`gate`] - The `LaunchGate` state machine and `BootstrapState` snapshots
//! - [`diagnostics`] - Append-only startup log under the per-user directory
//!
//! The crate has no UI dependency. The Tauri shell consumes it through the
//! `LaunchGate` operations (`bootstrap_state`, `retry_connect`, `about_info`)
//! and the `NavigationGuard` it arms.

pub mod config;
pub mod diagnostics;
pub mod gate;
pub mod guard;
pub mod parity;
pub mod paths;
pub mod probe;

// Re-export commonly used types
pub use config::{ClientConfig, ConfigError, ConfigResolver, ResolvedSources};
pub use gate::{AboutInfo, BootstrapState, GatePhase, LaunchGate};
pub use guard::NavigationGuard;
pub use parity::{ParityError, ParityResult};
pub use probe::ReachError;
