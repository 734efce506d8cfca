// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker process: private internal HTTP surface, container lifecycle,
//! and bridge-to-bus forwarding.

pub mod bridge_forward;
pub mod config;
pub mod desired;
pub mod http;
pub mod reconcile;
pub mod registry;
pub mod state;

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use nexus_driver::ComposeDriver;
use nexus_signer::key::KeyRing;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::WorkerConfig;
use crate::state::AppState;

fn decode_key(raw: &str) -> anyhow::Result<Vec<u8>> {
    URL_SAFE_NO_PAD.decode(raw).or_else(|_| Ok::<_, anyhow::Error>(raw.as_bytes().to_vec()))
}

/// Run the worker process until shutdown.
pub async fn run(config: WorkerConfig) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();

    let current_key = decode_key(&config.action_key)?;
    let previous_key = match &config.action_key_previous {
        Some(raw) => Some(decode_key(raw)?),
        None => None,
    };
    let action_keys = KeyRing::new(&current_key, previous_key.as_deref())?;

    let nats_client = nexus_bus::nats::connect(&config.nats_url).await?;
    let publisher = nexus_bus::Publisher::new(nats_client);

    let driver = Arc::new(ComposeDriver::new(config.tenant_root.clone(), config.default_image.clone()));

    let state = Arc::new(AppState {
        driver: driver.clone(),
        locks: registry::TenantLocks::new(),
        tenant_root: config.tenant_root.clone(),
        default_image: config.default_image.clone(),
        action_keys,
        publisher,
        qr_baseline: RwLock::new(HashMap::new()),
        observed_state: RwLock::new(HashMap::new()),
        shutdown: shutdown.clone(),
    });

    info!("running startup reconciliation");
    reconcile::reconcile_all(&state).await;

    for tenant_id in desired::known_tenants(&config.tenant_root).await.unwrap_or_default() {
        let socket_path = driver.bridge_socket_path(&tenant_id);
        bridge_forward::spawn(Arc::clone(&state), tenant_id, socket_path, shutdown.clone());
    }

    tokio::spawn(reconcile::run_sweep(Arc::clone(&state), config.reconcile_interval(), shutdown.clone()));
    spawn_signal_handler(shutdown.clone());

    let router = http::build_router(Arc::clone(&state));
    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!(addr = %config.bind_addr(), "nexus-workerd listening");
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
