//! Integration tests for the launch gate pipeline
//!
//! Tests cover:
//! - The full Probing -> Launched path against a live local server
//! - Build parity acceptance (case-insensitive prefix) and git-hash fallback
//! - ParityBlocked vs ParityWarning depending on enforcement
//! - Malformed/missing deploy-info as a parity failure, not unreachability
//! - Unreachable -> retry -> Launched without re-resolving configuration
//! - Retry dropped while an attempt is in flight

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::Result;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use kiosk_core::config::{ClientConfig, DEFAULT_TITLE};
use kiosk_core::diagnostics::StartupLog;
use kiosk_core::gate::{GatePhase, LaunchGate};
use serde_json::{json, Value};
use url::Url;

type DeployState = Arc<RwLock<Value>>;

async fn deploy_info(State(state): State<DeployState>) -> Json<Value> {
    Json(state.read().unwrap().clone())
}

/// Serve `/` plus a mutable `/api/admin/deploy-info` on an ephemeral port
async fn spawn_server(deploy: DeployState) -> Result<SocketAddr> {
    let app = Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/api/admin/deploy-info", get(deploy_info))
        .with_state(deploy);
    spawn_router(app).await
}

/// Serve only `/`; deploy-info responds 404
async fn spawn_bare_server() -> Result<SocketAddr> {
    spawn_router(Router::new().route("/", get(|| async { "ok" }))).await
}

async fn spawn_router(app: Router) -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Ok(addr)
}

fn test_config(addr: SocketAddr, min_hash: Option<&str>, enforce: bool) -> ClientConfig {
    ClientConfig {
        app_url: Url::parse(&format!("http://{addr}/")).unwrap(),
        allowed_hosts: HashSet::from(["127.0.0.1".to_string()]),
        window_title: DEFAULT_TITLE.to_string(),
        window_width: 1280,
        window_height: 800,
        min_web_build_hash: min_hash.map(|hash| hash.to_ascii_lowercase()),
        enforce_web_build: enforce,
        allow_localhost_release: false,
    }
}

fn gate_for(config: ClientConfig) -> LaunchGate {
    LaunchGate::new(Ok(config), "0.1.0-test", StartupLog::disabled())
        .with_probe_timeout(Duration::from_secs(5))
}

// =========================================================================
// Successful launch paths
// =========================================================================

#[tokio::test]
async fn reachable_server_with_matching_build_launches() -> Result<()> {
    let deploy: DeployState = Arc::new(RwLock::new(json!({
        "build": { "hash": "AACB669123", "time": "2026-08-01T12:00:00Z" },
        "git": { "hash": "deadbeef" }
    })));
    let addr = spawn_server(deploy).await?;
    let gate = gate_for(test_config(addr, Some("aacb669"), true));

    let state = gate.bootstrap_state().await;
    assert_eq!(state.phase, GatePhase::Launched);
    assert!(state.reachable);
    assert_eq!(state.build_parity_ok, Some(true));
    assert_eq!(state.web_build_hash.as_deref(), Some("AACB669123"));
    assert_eq!(state.web_build_time.as_deref(), Some("2026-08-01T12:00:00Z"));
    assert_eq!(state.required_web_build_hash.as_deref(), Some("aacb669"));
    assert!(state.build_parity_error.is_none());
    assert!(!state.retry_enabled);
    Ok(())
}

#[tokio::test]
async fn unset_minimum_hash_launches_without_comparison() -> Result<()> {
    let deploy: DeployState = Arc::new(RwLock::new(json!({
        "build": { "hash": "anything" }
    })));
    let addr = spawn_server(deploy).await?;
    let gate = gate_for(test_config(addr, None, true));

    let state = gate.bootstrap_state().await;
    assert_eq!(state.phase, GatePhase::Launched);
    assert_eq!(state.build_parity_ok, Some(true));
    Ok(())
}

#[tokio::test]
async fn git_hash_is_used_when_build_hash_is_absent() -> Result<()> {
    let deploy: DeployState = Arc::new(RwLock::new(json!({
        "build": { "time": "2026-08-01T12:00:00Z" },
        "git": { "hash": "AACB669abc" }
    })));
    let addr = spawn_server(deploy).await?;
    let gate = gate_for(test_config(addr, Some("aacb669"), true));

    let state = gate.bootstrap_state().await;
    assert_eq!(state.phase, GatePhase::Launched);
    assert_eq!(state.web_build_hash.as_deref(), Some("AACB669abc"));
    Ok(())
}

#[tokio::test]
async fn repeated_bootstrap_state_reads_do_not_rerun_the_pipeline() -> Result<()> {
    let deploy: DeployState = Arc::new(RwLock::new(json!({ "build": { "hash": "abc" } })));
    let addr = spawn_server(deploy).await?;
    let gate = gate_for(test_config(addr, None, true));

    gate.bootstrap_state().await;
    gate.bootstrap_state().await;
    gate.bootstrap_state().await;

    assert_eq!(
        gate.phase_trace().await,
        vec![
            GatePhase::Initializing,
            GatePhase::Probing,
            GatePhase::Launched
        ]
    );
    Ok(())
}

// =========================================================================
// Parity gating
// =========================================================================

#[tokio::test]
async fn stale_build_blocks_when_enforced() -> Result<()> {
    let deploy: DeployState = Arc::new(RwLock::new(json!({
        "build": { "hash": "1111111" }
    })));
    let addr = spawn_server(deploy).await?;
    let gate = gate_for(test_config(addr, Some("aacb669"), true));

    let state = gate.bootstrap_state().await;
    assert_eq!(state.phase, GatePhase::ParityBlocked);
    assert!(state.reachable, "parity failure is not unreachability");
    assert_eq!(state.build_parity_ok, Some(false));
    assert!(state.retry_enabled, "server may be redeployed");

    // The operator can self-diagnose: required vs observed are both present
    let error = state.build_parity_error.unwrap();
    assert!(error.contains("1111111"));
    assert!(error.contains("aacb669"));
    Ok(())
}

#[tokio::test]
async fn stale_build_warns_and_launches_when_not_enforced() -> Result<()> {
    let deploy: DeployState = Arc::new(RwLock::new(json!({
        "build": { "hash": "1111111" }
    })));
    let addr = spawn_server(deploy).await?;
    let gate = gate_for(test_config(addr, Some("aacb669"), false));

    let state = gate.bootstrap_state().await;
    assert_eq!(state.phase, GatePhase::Launched);
    assert_eq!(state.build_parity_ok, Some(false));
    assert!(state.build_parity_error.is_some(), "warning stays visible");

    let trace = gate.phase_trace().await;
    assert_eq!(
        trace,
        vec![
            GatePhase::Initializing,
            GatePhase::Probing,
            GatePhase::ParityWarning,
            GatePhase::Launched
        ]
    );
    Ok(())
}

#[tokio::test]
async fn missing_deploy_info_endpoint_is_a_parity_failure() -> Result<()> {
    let addr = spawn_bare_server().await?;
    let gate = gate_for(test_config(addr, Some("aacb669"), true));

    let state = gate.bootstrap_state().await;
    assert_eq!(state.phase, GatePhase::ParityBlocked);
    assert!(state.reachable);
    assert_eq!(state.build_parity_ok, Some(false));
    assert!(state.build_parity_error.unwrap().contains("404"));
    Ok(())
}

#[tokio::test]
async fn malformed_deploy_info_is_a_parity_failure() -> Result<()> {
    // A JSON string where an object is expected
    let deploy: DeployState = Arc::new(RwLock::new(json!("not a descriptor")));
    let addr = spawn_server(deploy).await?;
    let gate = gate_for(test_config(addr, Some("aacb669"), true));

    let state = gate.bootstrap_state().await;
    assert_eq!(state.phase, GatePhase::ParityBlocked);
    assert_eq!(state.build_parity_ok, Some(false));
    assert!(state.build_parity_error.is_some());
    Ok(())
}

#[tokio::test]
async fn parity_blocked_recovers_after_server_redeploy() -> Result<()> {
    let deploy: DeployState = Arc::new(RwLock::new(json!({
        "build": { "hash": "1111111" }
    })));
    let addr = spawn_server(deploy.clone()).await?;
    let gate = gate_for(test_config(addr, Some("aacb669"), true));

    assert_eq!(gate.bootstrap_state().await.phase, GatePhase::ParityBlocked);

    // Server gets redeployed with a satisfying build
    *deploy.write().unwrap() = json!({ "build": { "hash": "aacb669900" } });
    gate.retry_connect().await;

    let state = gate.bootstrap_state().await;
    assert_eq!(state.phase, GatePhase::Launched);
    assert_eq!(state.build_parity_ok, Some(true));
    Ok(())
}

// =========================================================================
// Reachability and retry
// =========================================================================

#[tokio::test]
async fn unreachable_then_retry_against_live_server_launches() -> Result<()> {
    // Reserve a port, then release it so the first probe gets refused
    let reserved = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = reserved.local_addr()?;
    drop(reserved);

    let gate = gate_for(test_config(addr, None, true));

    let state = gate.bootstrap_state().await;
    assert_eq!(state.phase, GatePhase::Unreachable);
    assert!(state.retry_enabled);
    let error = state.reachability_error.unwrap();
    assert!(error.contains(&addr.to_string()), "error names the URL: {error}");

    // Server comes up on the same address; retry re-probes without
    // re-reading any configuration source
    let deploy: DeployState = Arc::new(RwLock::new(json!({ "build": { "hash": "abc" } })));
    let app = Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/api/admin/deploy-info", get(deploy_info))
        .with_state(deploy);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    gate.retry_connect().await;

    let state = gate.bootstrap_state().await;
    assert_eq!(state.phase, GatePhase::Launched);
    assert_eq!(
        gate.phase_trace().await,
        vec![
            GatePhase::Initializing,
            GatePhase::Probing,
            GatePhase::Unreachable,
            GatePhase::Probing,
            GatePhase::Launched
        ]
    );
    Ok(())
}

#[tokio::test]
async fn retry_during_in_flight_attempt_is_dropped() -> Result<()> {
    // Accepts the TCP connection but never answers, so the attempt stays
    // in flight until the probe timeout fires
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;

    let gate = Arc::new(
        LaunchGate::new(
            Ok(test_config(addr, None, true)),
            "0.1.0-test",
            StartupLog::disabled(),
        )
        .with_probe_timeout(Duration::from_millis(800)),
    );

    let in_flight = {
        let gate = gate.clone();
        tokio::spawn(async move { gate.bootstrap_state().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Dropped: returns immediately instead of queueing a second attempt
    gate.retry_connect().await;

    let state = in_flight.await?;
    assert_eq!(state.phase, GatePhase::Unreachable);
    assert_eq!(
        gate.phase_trace().await,
        vec![
            GatePhase::Initializing,
            GatePhase::Probing,
            GatePhase::Unreachable
        ],
        "a queued retry would have appended a second Probing"
    );
    drop(listener);
    Ok(())
}

#[tokio::test]
async fn about_info_reflects_the_configured_target() -> Result<()> {
    let deploy: DeployState = Arc::new(RwLock::new(json!({ "build": { "hash": "abc" } })));
    let addr = spawn_server(deploy).await?;
    let gate = gate_for(test_config(addr, None, true));

    let about = gate.about_info();
    assert_eq!(about.title, DEFAULT_TITLE);
    assert_eq!(about.version, "0.1.0-test");
    assert_eq!(about.app_host, "127.0.0.1");
    Ok(())
}
