// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WhatsApp pairing lifecycle, including the QR-freshness baseline that
//! discriminates a fresh pairing code from a stale replayed one.

use std::sync::Arc;

use axum::extract::{Extension, Path, State};
use axum::Json;
use nexus_core::action::Action;
use nexus_core::error::ApiError;
use nexus_core::model::TenantState;
use nexus_store::tenants;
use serde::Serialize;

use crate::auth_layer::AuthUser;
use crate::dispatch;
use crate::handlers::tenants::owned_tenant;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PairStartResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_baseline_event_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct DisconnectResponse {
    pub accepted: bool,
}

/// `POST /v1/tenants/{id}/whatsapp/pair/start`
pub async fn pair_start(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(tenant_id): Path<String>,
) -> Result<Json<PairStartResponse>, ApiError> {
    owned_tenant(&state, &user_id, &tenant_id).await?;
    tenants::set_desired_state(&state.pool, &tenant_id, TenantState::PendingPairing)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    let result = dispatch::dispatch(&state, &tenant_id, Action::PairStart).await?;
    Ok(Json(PairStartResponse { accepted: true, qr_baseline_event_id: result.qr_baseline_event_id }))
}

/// `POST /v1/tenants/{id}/whatsapp/disconnect`
///
/// Transitions to `pending_pairing` (never a bare "disconnected" tenant
/// state, which the state machine doesn't have) so a client can re-enter
/// pairing immediately without an intervening `runtime/start`.
pub async fn disconnect(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(tenant_id): Path<String>,
) -> Result<Json<DisconnectResponse>, ApiError> {
    owned_tenant(&state, &user_id, &tenant_id).await?;
    tenants::set_desired_state(&state.pool, &tenant_id, TenantState::PendingPairing)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    dispatch::dispatch(&state, &tenant_id, Action::WhatsappDisconnect).await?;
    Ok(Json(DisconnectResponse { accepted: true }))
}
