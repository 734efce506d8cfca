// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared worker process state, handed to every axum handler as an
//! `Arc<AppState>`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use nexus_bus::Publisher;
use nexus_driver::Driver;
use nexus_signer::key::KeyRing;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::registry::TenantLocks;

const RUNTIME_STATUS_EVENT_TYPE: &str = "runtime.status";

pub struct AppState {
    pub driver: Arc<dyn Driver>,
    pub locks: TenantLocks,
    pub tenant_root: PathBuf,
    pub default_image: String,
    pub action_keys: KeyRing,
    pub publisher: Publisher,
    /// QR-freshness baseline: the highest `event_id` a tenant's pairing
    /// flow has seen, so a stale cached QR isn't presented as fresh after
    /// a reconnect.
    pub qr_baseline: RwLock<HashMap<String, i64>>,
    /// Last observed-state label published for each tenant, so a
    /// `runtime.status` event fires once per actual transition rather than
    /// once per dispatch or sweep tick.
    pub observed_state: RwLock<HashMap<String, String>>,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub async fn record_qr_baseline(&self, tenant_id: &str, event_id: i64) {
        let mut baseline = self.qr_baseline.write().await;
        let entry = baseline.entry(tenant_id.to_owned()).or_insert(0);
        if event_id > *entry {
            *entry = event_id;
        }
    }

    pub async fn qr_baseline_for(&self, tenant_id: &str) -> i64 {
        *self.qr_baseline.read().await.get(tenant_id).unwrap_or(&0)
    }

    /// Publish a `runtime.status` event for `tenant_id` if `new_state`
    /// differs from the last state published for it. A no-op on repeat
    /// observations of the same state, so a reconcile sweep that finds
    /// nothing changed stays silent.
    pub async fn publish_runtime_status(&self, tenant_id: &str, new_state: &str) {
        let previous_state = {
            let mut observed = self.observed_state.write().await;
            match observed.get(tenant_id) {
                Some(previous) if previous == new_state => return,
                previous => {
                    let previous_state = previous.cloned();
                    observed.insert(tenant_id.to_owned(), new_state.to_owned());
                    previous_state
                }
            }
        };
        let payload = serde_json::json!({"state": new_state, "previous_state": previous_state});
        if let Err(err) = self.publisher.publish(tenant_id, RUNTIME_STATUS_EVENT_TYPE, payload).await {
            warn!(%tenant_id, state = new_state, error = %err, "failed to publish runtime.status");
        }
    }
}
