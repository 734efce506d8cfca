// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Private internal HTTP surface the control process dispatches signed
//! actions to.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use nexus_core::action::Action;
use nexus_core::error::ApiError;
use nexus_core::model::EnvMap;
use nexus_core::time::iso8601_now;
use nexus_driver::DriverError;
use nexus_signer::action::{verify, VerifyError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::desired::{self, DesiredState};
use crate::state::AppState;

const ACTION_TOKEN_HEADER: &str = "x-nexus-action-token";

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/internal/healthz", get(healthz))
        .route("/internal/tenants/{tenant_id}/actions/{action}", post(dispatch_action))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

#[derive(Debug, Default, Deserialize)]
struct ActionBody {
    #[serde(default)]
    image_ref: Option<String>,
    #[serde(default)]
    env: EnvMap,
}

#[derive(Debug, Serialize)]
struct ActionResponse {
    state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    qr_baseline_event_id: Option<i64>,
}

fn driver_error_to_api(err: DriverError) -> ApiError {
    match err {
        DriverError::MissingConfig(tenant_id) => {
            ApiError::Precondition { message: format!("tenant {tenant_id} has no config"), detail: Value::Null }
        }
        other => ApiError::ServiceUnavailable(other.to_string()),
    }
}

fn verify_error_to_api(err: VerifyError) -> ApiError {
    match err {
        VerifyError::Expired | VerifyError::NotYetValid => ApiError::Unauthorized,
        VerifyError::BadSignature | VerifyError::Malformed => ApiError::Unauthorized,
        VerifyError::TenantMismatch | VerifyError::ActionNotPermitted => ApiError::Forbidden,
    }
}

async fn dispatch_action(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, action_str)): Path<(String, String)>,
    headers: axum::http::HeaderMap,
    Json(body): Json<ActionBody>,
) -> Result<Json<ActionResponse>, ApiError> {
    let action = Action::parse(&action_str)
        .ok_or_else(|| ApiError::Validation(format!("unknown action {action_str}")))?;

    let token = headers
        .get(ACTION_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;
    verify(&state.action_keys, token, &tenant_id, &[action]).map_err(verify_error_to_api)?;

    let _guard = state.locks.acquire(&tenant_id).await;
    info!(%tenant_id, action = action.as_str(), "dispatching action");

    let image_ref = body.image_ref.clone().unwrap_or_else(|| state.default_image.clone());

    match action {
        Action::Provision => {
            state.driver.provision(&tenant_id, &image_ref, &body.env).await.map_err(driver_error_to_api)?;
            persist_desired(&state, &tenant_id, nexus_core::model::TenantState::Provisioning, Some(image_ref), body.env).await;
        }
        Action::Start => {
            state.driver.start(&tenant_id).await.map_err(driver_error_to_api)?;
            persist_desired(&state, &tenant_id, nexus_core::model::TenantState::Running, None, EnvMap::new()).await;
        }
        Action::Stop => {
            state.driver.stop(&tenant_id).await.map_err(driver_error_to_api)?;
            persist_desired(&state, &tenant_id, nexus_core::model::TenantState::Paused, None, EnvMap::new()).await;
        }
        Action::Restart => {
            state.driver.restart(&tenant_id).await.map_err(driver_error_to_api)?;
        }
        Action::ApplyConfig => {
            state.driver.apply_config(&tenant_id, &body.env).await.map_err(driver_error_to_api)?;
            persist_desired(&state, &tenant_id, nexus_core::model::TenantState::Running, None, body.env).await;
        }
        Action::PairStart => {
            state.driver.pair_start(&tenant_id).await.map_err(driver_error_to_api)?;
            persist_desired(&state, &tenant_id, nexus_core::model::TenantState::PendingPairing, None, EnvMap::new()).await;
        }
        Action::WhatsappDisconnect => {
            state.driver.whatsapp_disconnect(&tenant_id).await.map_err(driver_error_to_api)?;
            persist_desired(&state, &tenant_id, nexus_core::model::TenantState::PendingPairing, None, EnvMap::new()).await;
        }
        Action::Delete => {
            state.driver.delete(&tenant_id).await.map_err(driver_error_to_api)?;
            let _ = desired::remove(&state.tenant_root, &tenant_id).await;
        }
        Action::Health => {}
    }

    let health = state.driver.health(&tenant_id).await.map_err(driver_error_to_api)?;
    let qr_baseline = if action == Action::PairStart {
        Some(state.qr_baseline_for(&tenant_id).await)
    } else {
        None
    };

    if action != Action::Health {
        state.publish_runtime_status(&tenant_id, health.label()).await;
    }

    Ok(Json(ActionResponse { state: health.label(), qr_baseline_event_id: qr_baseline }))
}

async fn persist_desired(
    state: &AppState,
    tenant_id: &str,
    desired_state: nexus_core::model::TenantState,
    image_ref: Option<String>,
    env: EnvMap,
) {
    let previous = desired::read(&state.tenant_root, tenant_id).await;
    let image_ref = image_ref.or_else(|| previous.as_ref().and_then(|p| p.image_ref.clone()));
    let env = if env.is_empty() { previous.map(|p| p.env).unwrap_or_default() } else { env };
    let cache = DesiredState { desired_state, image_ref, env, updated_at: iso8601_now() };
    if let Err(err) = desired::write(&state.tenant_root, tenant_id, &cache).await {
        tracing::warn!(%tenant_id, error = %err, "failed to persist desired-state cache");
    }
}
