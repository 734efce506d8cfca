// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires a tenant's bridge socket to the NATS publisher: every
//! bridge-observed event is forwarded to control (which assigns the
//! authoritative `event_id`) and, for `whatsapp.qr`, recorded as this
//! worker's freshness baseline.

use std::path::PathBuf;
use std::sync::Arc;

use nexus_driver::BridgeListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::state::AppState;

const QR_EVENT_TYPE: &str = "whatsapp.qr";

/// Spawn the bridge listener for one tenant and the task that forwards
/// its events onto the bus. Returns immediately; both tasks run until
/// `shutdown` fires.
pub fn spawn(state: Arc<AppState>, tenant_id: String, socket_path: PathBuf, shutdown: CancellationToken) {
    let (tx, rx) = mpsc::channel(64);
    let listener = BridgeListener::new(tenant_id.clone(), socket_path);
    let listener_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = listener.run(tx, listener_shutdown).await {
            warn!(%tenant_id, error = %err, "bridge listener exited");
        }
    });
    tokio::spawn(forward_loop(state, rx, shutdown));
}

async fn forward_loop(
    state: Arc<AppState>,
    mut rx: mpsc::Receiver<nexus_driver::BridgeEvent>,
    shutdown: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => return,
            next = rx.recv() => next,
        };
        let Some(event) = next else { return };

        match state.publisher.publish(&event.tenant_id, &event.event_type, event.payload).await {
            Ok(published) => {
                if event.event_type == QR_EVENT_TYPE {
                    state.record_qr_baseline(&event.tenant_id, published.event_id).await;
                }
            }
            Err(err) => {
                warn!(tenant_id = %event.tenant_id, error = %err, "failed to forward bridge event");
            }
        }
    }
}
