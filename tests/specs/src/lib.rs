// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end harness for the control-plane API: builds a real router
//! over a temporary SQLite database and a stub worker process, so the
//! scenario tests exercise the full HTTP surface without needing a
//! container engine or NATS broker.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use nexus_bus::Bus;
use nexus_core::action::Action;
use nexus_signer::action::verify;
use nexus_signer::key::KeyRing;
use serde_json::{json, Value};
use tokio::net::TcpListener;

const ACTION_TOKEN_HEADER: &str = "x-nexus-action-token";
const ACTION_KEY: &[u8] = b"spec-harness-action-signing-key";
const SESSION_KEY: &[u8] = b"spec-harness-session-signing-key";

/// Everything a scenario test needs: the control router and the worker
/// stub's base URL, plus the keys used to mint out-of-band tokens.
pub struct Harness {
    pub app: Router,
    pub action_keys: KeyRing,
    pub session_keys: KeyRing,
    /// Tenant ids the worker stub rejects with a 400, simulating a
    /// worker-side precondition failure independent of the control-side
    /// check. A test registers a tenant id here once it knows it, since
    /// tenant ids are only assigned at setup time.
    pub reject_tenants: Arc<Mutex<Vec<String>>>,
}

struct WorkerStubState {
    action_keys: KeyRing,
    reject_tenants: Arc<Mutex<Vec<String>>>,
}

async fn stub_action(
    State(state): State<Arc<WorkerStubState>>,
    Path((tenant_id, action)): Path<(String, String)>,
    headers: axum::http::HeaderMap,
    Json(_body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let token = headers.get(ACTION_TOKEN_HEADER).and_then(|v| v.to_str().ok()).unwrap_or_default();
    let parsed_action = Action::parse(&action).unwrap_or(Action::Health);
    if verify(&state.action_keys, token, &tenant_id, &[parsed_action]).is_err() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"code": "unauthorized", "message": "bad action token"}})),
        );
    }
    let rejected = state.reject_tenants.lock().unwrap_or_else(|e| e.into_inner()).contains(&tenant_id);
    if rejected {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": {
                    "code": "precondition_failed",
                    "message": "an OpenRouter API key is required before starting this tenant",
                    "detail": {"error": "openrouter_api_key_required"},
                }
            })),
        );
    }
    let new_state = match parsed_action {
        Action::Stop => "paused",
        Action::Provision => "provisioning",
        _ => "running",
    };
    (StatusCode::OK, Json(json!({"state": new_state, "qr_baseline_event_id": 1})))
}

async fn spawn_worker_stub(
    action_keys: KeyRing,
    reject_tenants: Arc<Mutex<Vec<String>>>,
) -> anyhow::Result<String> {
    let state = Arc::new(WorkerStubState { action_keys, reject_tenants });
    let router = Router::new()
        .route("/internal/tenants/{tenant_id}/actions/{action}", post(stub_action))
        .with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(format!("http://{addr}"))
}

async fn build_inner(
    worker_base_url: String,
    reject_tenants: Arc<Mutex<Vec<String>>>,
) -> anyhow::Result<(Harness, tempfile::TempDir)> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("control.db");
    let database_url = format!("sqlite://{}", db_path.display());
    let pool = nexus_store::connect(&database_url).await?;
    let bus = Arc::new(Bus::new(pool.clone()));

    let action_keys = KeyRing::new(ACTION_KEY, None)?;
    let session_keys = KeyRing::new(SESSION_KEY, None)?;

    let state = Arc::new(nexus_control::state::AppState {
        pool,
        bus,
        action_keys: action_keys.clone(),
        session_keys: session_keys.clone(),
        worker_client: reqwest::Client::new(),
        worker_base_url,
        default_image: "ghcr.io/nexus/runtime:test".to_owned(),
        default_replay: nexus_bus::DEFAULT_REPLAY,
    });

    let app = nexus_control::build_router(state, None);
    Ok((Harness { app, action_keys, session_keys, reject_tenants }, dir))
}

/// Build a fresh control-plane stack: a temp-file SQLite database, an
/// in-process worker stub, and the assembled router. Register a tenant
/// id in the returned harness's `reject_tenants` to make the stub answer
/// that tenant's next action with a worker-side precondition failure.
pub async fn build() -> anyhow::Result<(Harness, tempfile::TempDir)> {
    let action_keys = KeyRing::new(ACTION_KEY, None)?;
    let reject_tenants = Arc::new(Mutex::new(Vec::new()));
    let worker_base_url = spawn_worker_stub(action_keys, Arc::clone(&reject_tenants)).await?;
    build_inner(worker_base_url, reject_tenants).await
}

/// Build a stack whose worker is unreachable, so a dispatch always fails
/// with `service_unavailable` while the store write it follows still
/// lands — used for the "stored intent survives a failed dispatch" case.
pub async fn build_with_unreachable_worker() -> anyhow::Result<(Harness, tempfile::TempDir)> {
    // Bind then drop immediately: the port is free but nothing answers it.
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    build_inner(format!("http://{addr}"), Arc::new(Mutex::new(Vec::new()))).await
}
