// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenant ownership, lifecycle dispatch, and status.

use std::sync::Arc;

use axum::extract::{Extension, Path, State};
use axum::Json;
use nexus_core::action::Action;
use nexus_core::error::ApiError;
use nexus_core::model::{EnvMap, Tenant};
use nexus_store::{tenants, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth_layer::AuthUser;
use crate::dispatch::{self, ActionRequest};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SetupRequest {
    #[serde(default)]
    pub initial_config: EnvMap,
}

#[derive(Debug, Serialize)]
pub struct SetupResponse {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub tenant_id: String,
    pub desired_state: &'static str,
    pub actual_state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_heartbeat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RuntimeActionResponse {
    pub accepted: bool,
    pub state: String,
}

/// Load the tenant named in the path and confirm `caller` owns it.
/// Cross-tenant access fails with `forbidden` regardless of whether the
/// tenant itself exists, so a caller can't distinguish "not yours" from
/// "doesn't exist".
pub async fn owned_tenant(state: &AppState, caller: &str, tenant_id: &str) -> Result<Tenant, ApiError> {
    let tenant = tenants::find_by_id(&state.pool, tenant_id)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("tenant {tenant_id} not found")))?;
    if tenant.owner_user_id != caller {
        return Err(ApiError::Forbidden);
    }
    Ok(tenant)
}

/// `POST /v1/tenants/setup`
pub async fn setup(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(req): Json<SetupRequest>,
) -> Result<Json<SetupResponse>, ApiError> {
    if let Some(existing) = tenants::find_by_owner(&state.pool, &user_id)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
    {
        return Err(ApiError::Conflict {
            message: "tenant already exists".to_owned(),
            detail: json!({"tenant_id": existing.id}),
        });
    }

    let tenant = match tenants::create(&state.pool, &user_id).await {
        Ok(tenant) => tenant,
        Err(StoreError::Conflict) => {
            let existing = tenants::find_by_owner(&state.pool, &user_id)
                .await
                .map_err(|err| ApiError::Internal(err.to_string()))?
                .ok_or_else(|| ApiError::Internal("conflict with no owner row".to_owned()))?;
            return Err(ApiError::Conflict {
                message: "tenant already exists".to_owned(),
                detail: json!({"tenant_id": existing.id}),
            });
        }
        Err(other) => return Err(ApiError::Internal(other.to_string())),
    };

    if !req.initial_config.is_empty() {
        nexus_store::config::apply(&state.pool, &tenant.id, &req.initial_config, &[])
            .await
            .map_err(|err| ApiError::Internal(err.to_string()))?;
    }

    let body = ActionRequest { image_ref: Some(state.default_image.clone()), env: req.initial_config };
    dispatch::dispatch_with_body(&state, &tenant.id, Action::Provision, body).await?;

    Ok(Json(SetupResponse { id: tenant.id }))
}

/// `GET /v1/tenants/{id}/status`
pub async fn status(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(tenant_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let tenant = owned_tenant(&state, &user_id, &tenant_id).await?;

    let running = tenant.actual_state == nexus_core::model::TenantState::Running;
    match crate::bootstrap::ensure_defaults(&state, &tenant.id, running).await {
        Ok(result) if result.defaults_applied => {
            tracing::info!(tenant_id = %tenant.id, restarted = result.restarted, "applied default prompts/skills");
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(tenant_id = %tenant.id, error = %err, "assistant bootstrap failed"),
    }

    Ok(Json(StatusResponse {
        tenant_id: tenant.id,
        desired_state: tenant.desired_state.as_str(),
        actual_state: tenant.actual_state.as_str(),
        last_heartbeat: tenant.last_heartbeat,
        last_error: tenant.last_error,
    }))
}

async fn require_config_key(state: &AppState, tenant_id: &str) -> Result<(), ApiError> {
    let active = nexus_store::config::active(&state.pool, tenant_id)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    let has_key = active
        .map(|rev| rev.env.keys().any(|k| k.eq_ignore_ascii_case("NEXUS_OPENROUTER_API_KEY")))
        .unwrap_or(false);
    if has_key {
        Ok(())
    } else {
        Err(ApiError::Precondition {
            message: "an OpenRouter API key is required before starting this tenant".to_owned(),
            detail: json!({"error": "openrouter_api_key_required"}),
        })
    }
}

async fn runtime_action(
    state: Arc<AppState>,
    user_id: String,
    tenant_id: String,
    action: Action,
    check_precondition: bool,
) -> Result<Json<RuntimeActionResponse>, ApiError> {
    owned_tenant(&state, &user_id, &tenant_id).await?;
    if check_precondition {
        require_config_key(&state, &tenant_id).await?;
    }
    let desired = match action {
        Action::Start | Action::Restart => nexus_core::model::TenantState::Running,
        Action::Stop => nexus_core::model::TenantState::Paused,
        _ => nexus_core::model::TenantState::Running,
    };
    tenants::set_desired_state(&state.pool, &tenant_id, desired)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    let result = dispatch::dispatch(&state, &tenant_id, action).await?;
    tenants::set_actual_state(
        &state.pool,
        &tenant_id,
        nexus_core::model::TenantState::parse(&result.state).unwrap_or(nexus_core::model::TenantState::Error),
        None,
    )
    .await
    .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok(Json(RuntimeActionResponse { accepted: true, state: result.state }))
}

/// `POST /v1/tenants/{id}/runtime/start`
pub async fn runtime_start(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(tenant_id): Path<String>,
) -> Result<Json<RuntimeActionResponse>, ApiError> {
    runtime_action(state, user_id, tenant_id, Action::Start, true).await
}

/// `POST /v1/tenants/{id}/runtime/stop`
pub async fn runtime_stop(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(tenant_id): Path<String>,
) -> Result<Json<RuntimeActionResponse>, ApiError> {
    runtime_action(state, user_id, tenant_id, Action::Stop, false).await
}

/// `POST /v1/tenants/{id}/runtime/restart`
pub async fn runtime_restart(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(tenant_id): Path<String>,
) -> Result<Json<RuntimeActionResponse>, ApiError> {
    runtime_action(state, user_id, tenant_id, Action::Restart, true).await
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub tenant_id: String,
    pub revision: i64,
    pub env_json: EnvMap,
    /// False when the stored revision could not be pushed to the worker
    /// immediately. The revision is retained regardless and the next
    /// reconcile sweep will pick it up, but a caller that needs the new
    /// config live right away should know it isn't yet.
    pub dispatched: bool,
}

#[derive(Debug, Deserialize)]
pub struct ConfigPatchRequest {
    #[serde(default)]
    pub values: EnvMap,
    #[serde(default)]
    pub remove_keys: Vec<String>,
}

/// `GET /v1/tenants/{id}/config`
pub async fn get_config(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(tenant_id): Path<String>,
) -> Result<Json<ConfigResponse>, ApiError> {
    owned_tenant(&state, &user_id, &tenant_id).await?;
    let active = nexus_store::config::active(&state.pool, &tenant_id)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    let (revision, env) = match active {
        Some(rev) => (rev.revision_number, rev.env),
        None => (0, EnvMap::new()),
    };
    Ok(Json(ConfigResponse { tenant_id, revision, env_json: env, dispatched: true }))
}

/// `PATCH /v1/tenants/{id}/config`
pub async fn patch_config(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(tenant_id): Path<String>,
    Json(req): Json<ConfigPatchRequest>,
) -> Result<Json<ConfigResponse>, ApiError> {
    owned_tenant(&state, &user_id, &tenant_id).await?;
    for key in req.values.keys() {
        if !nexus_core::model::is_valid_config_key(key) {
            return Err(ApiError::Validation(format!("invalid config key: {key}")));
        }
    }

    let revision = nexus_store::config::apply(&state.pool, &tenant_id, &req.values, &req.remove_keys)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    state
        .bus
        .publish(&tenant_id, "config.applied", json!({"revision": revision.revision_number}))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    let body = ActionRequest { image_ref: None, env: revision.env.clone() };
    let dispatched = match dispatch::dispatch_with_body(&state, &tenant_id, Action::ApplyConfig, body).await {
        Ok(_) => true,
        Err(err) => {
            // Stored revision is retained and the next reconcile sweep will
            // apply it; the caller is told via `dispatched` rather than a
            // 5xx, since the mutation itself (the stored intent) succeeded.
            tracing::warn!(%tenant_id, error = %err, "worker rejected config apply; stored revision is retained for the next reconcile");
            false
        }
    };

    Ok(Json(ConfigResponse {
        tenant_id,
        revision: revision.revision_number,
        env_json: revision.env,
        dispatched,
    }))
}
