// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconciliation: on startup, and on a periodic sweep, re-derive each
//! known tenant's actual state from the engine and drive it toward the
//! cached desired state.

use std::sync::Arc;

use nexus_core::model::TenantState;
use nexus_driver::EngineHealth;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::desired;
use crate::state::AppState;

/// Reconcile every tenant the worker has a desired-state cache for. Runs
/// once at startup and again on every sweep tick.
pub async fn reconcile_all(state: &Arc<AppState>) {
    let tenants = match desired::known_tenants(&state.tenant_root).await {
        Ok(tenants) => tenants,
        Err(err) => {
            warn!(error = %err, "failed to list known tenants for reconciliation");
            return;
        }
    };
    for tenant_id in tenants {
        reconcile_one(state, &tenant_id).await;
    }
}

async fn reconcile_one(state: &Arc<AppState>, tenant_id: &str) {
    let Some(cached) = desired::read(&state.tenant_root, tenant_id).await else { return };
    let _guard = state.locks.acquire(tenant_id).await;

    let health = match state.driver.health(tenant_id).await {
        Ok(health) => health,
        Err(err) => {
            warn!(%tenant_id, error = %err, "reconcile health check failed");
            return;
        }
    };

    let action_needed = match (cached.desired_state, &health) {
        (TenantState::Running, EngineHealth::Running) => None,
        (TenantState::Running, _) => Some("start"),
        (TenantState::Paused, EngineHealth::Stopped) => None,
        (TenantState::Paused, EngineHealth::Running) => Some("stop"),
        (TenantState::PendingPairing, EngineHealth::Running) => None,
        (TenantState::PendingPairing, _) => Some("pair_start"),
        (TenantState::Provisioning, _) => None,
        (TenantState::Deleted, EngineHealth::Missing) => None,
        (TenantState::Deleted, _) => Some("delete"),
        (TenantState::Error, _) => None,
    };

    let Some(action) = action_needed else {
        // Nothing to drive, but still report what was observed — this is
        // what lets a subscriber learn a tenant's actual state after a
        // worker restart without it ever having been dispatched an action.
        state.publish_runtime_status(tenant_id, health.label()).await;
        return;
    };
    info!(%tenant_id, action, desired = cached.desired_state.as_str(), "reconciling tenant");

    let result = match action {
        "start" => state.driver.start(tenant_id).await,
        "stop" => state.driver.stop(tenant_id).await,
        "pair_start" => state.driver.pair_start(tenant_id).await,
        "delete" => state.driver.delete(tenant_id).await,
        _ => unreachable!("action_needed only yields the arms handled above"),
    };
    match result {
        Ok(()) => {
            if let Ok(health) = state.driver.health(tenant_id).await {
                state.publish_runtime_status(tenant_id, health.label()).await;
            }
        }
        Err(err) => warn!(%tenant_id, action, error = %err, "reconcile action failed"),
    }
}

/// Run the periodic reconcile sweep until `shutdown` fires.
pub async fn run_sweep(state: Arc<AppState>, interval: std::time::Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = ticker.tick() => reconcile_all(&state).await,
        }
    }
}
