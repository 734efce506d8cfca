// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control process: public multi-tenant API, signed action dispatch to
//! the worker, and the event gateway.

pub mod auth_layer;
pub mod bootstrap;
pub mod config;
pub mod dispatch;
pub mod handlers;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::{Json, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use nexus_bus::Bus;
use nexus_signer::key::KeyRing;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ControlConfig;
use crate::state::AppState;

fn decode_key(raw: &str) -> anyhow::Result<Vec<u8>> {
    URL_SAFE_NO_PAD.decode(raw).or_else(|_| Ok::<_, anyhow::Error>(raw.as_bytes().to_vec()))
}

async fn healthz() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    match origin {
        None => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
        Some(origins) => {
            let parsed: Vec<axum::http::HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|s| s.parse().ok())
                .collect();
            CorsLayer::new().allow_origin(parsed).allow_methods(Any).allow_headers(Any)
        }
    }
}

pub fn build_router(state: Arc<AppState>, cors_origin: Option<&str>) -> Router {
    Router::new()
        .route("/v1/auth/signup", post(handlers::auth::signup))
        .route("/v1/auth/login", post(handlers::auth::login))
        .route("/v1/auth/refresh", post(handlers::auth::refresh_tokens))
        .route("/v1/tenants/setup", post(handlers::tenants::setup))
        .route("/v1/tenants/{id}/status", get(handlers::tenants::status))
        .route("/v1/tenants/{id}/runtime/start", post(handlers::tenants::runtime_start))
        .route("/v1/tenants/{id}/runtime/stop", post(handlers::tenants::runtime_stop))
        .route("/v1/tenants/{id}/runtime/restart", post(handlers::tenants::runtime_restart))
        .route("/v1/tenants/{id}/whatsapp/pair/start", post(handlers::whatsapp::pair_start))
        .route("/v1/tenants/{id}/whatsapp/disconnect", post(handlers::whatsapp::disconnect))
        .route(
            "/v1/tenants/{id}/config",
            get(handlers::tenants::get_config).patch(handlers::tenants::patch_config),
        )
        .route("/v1/tenants/{id}/prompts", get(handlers::artifacts::list_prompts))
        .route("/v1/tenants/{id}/prompts/{name}", put(handlers::artifacts::put_prompt))
        .route("/v1/tenants/{id}/skills", get(handlers::artifacts::list_skills))
        .route("/v1/tenants/{id}/skills/{skill_id}", put(handlers::artifacts::put_skill))
        .route("/v1/tenants/{id}/events/recent", get(handlers::events::recent))
        .route("/v1/events/ws", get(handlers::events::ws_handler))
        .route("/v1/healthz", get(healthz))
        .layer(axum::middleware::from_fn_with_state(state.clone(), auth_layer::auth_layer))
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the control process until shutdown.
pub async fn run(config: ControlConfig) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();

    let current_action_key = decode_key(&config.action_key)?;
    let previous_action_key = match &config.action_key_previous {
        Some(raw) => Some(decode_key(raw)?),
        None => None,
    };
    let action_keys = KeyRing::new(&current_action_key, previous_action_key.as_deref())?;

    let current_session_key = decode_key(&config.session_key)?;
    let previous_session_key = match &config.session_key_previous {
        Some(raw) => Some(decode_key(raw)?),
        None => None,
    };
    let session_keys = KeyRing::new(&current_session_key, previous_session_key.as_deref())?;

    let pool = nexus_store::connect(&config.database_url).await?;
    let bus = Arc::new(Bus::new(pool.clone()));

    let nats_client = nexus_bus::nats::connect(&config.nats_url).await?;
    let responder = nexus_bus::nats::Responder::new(nats_client, Arc::clone(&bus));
    let responder_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = responder.run(responder_shutdown).await {
            tracing::error!(error = %err, "nats responder exited");
        }
    });

    let state = Arc::new(AppState {
        pool,
        bus,
        action_keys,
        session_keys,
        worker_client: reqwest::Client::new(),
        worker_base_url: config.worker_base_url.clone(),
        default_image: config.default_image.clone(),
        default_replay: config.default_replay,
    });

    spawn_signal_handler(shutdown.clone());

    let router = build_router(state, config.cors_origin.as_deref());
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!(addr = %config.bind_addr(), "nexus-controld listening");
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;

    Ok(())
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();

        tokio::select! {
            _ = async { if let Some(ref mut s) = sigterm { s.recv().await } else { std::future::pending().await } } => {
                info!("received SIGTERM");
            }
            _ = async { if let Some(ref mut s) = sigint { s.recv().await } else { std::future::pending().await } } => {
                info!("received SIGINT");
            }
        }
        shutdown.cancel();
    });
}
