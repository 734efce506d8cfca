// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt and skill revision handlers. Both share the same shape — a
//! named artifact with exactly one active revision — distinguished only
//! by [`ArtifactKind`]; see `nexus_store::artifacts`.

use std::sync::Arc;

use axum::extract::{Extension, Path, State};
use axum::Json;
use nexus_core::error::ApiError;
use nexus_store::artifacts::{self, ArtifactKind};
use serde::{Deserialize, Serialize};

use crate::auth_layer::AuthUser;
use crate::handlers::tenants::owned_tenant;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PromptView {
    pub name: String,
    pub revision: i64,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct SkillView {
    pub skill_id: String,
    pub revision: i64,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ArtifactPutRequest {
    pub content: String,
}

async fn put(
    state: &AppState,
    kind: ArtifactKind,
    tenant_id: &str,
    name: &str,
    content: &str,
) -> Result<nexus_core::model::ArtifactRevision, ApiError> {
    artifacts::put(&state.pool, kind, tenant_id, name, content)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))
}

/// `GET /v1/tenants/{id}/prompts`
pub async fn list_prompts(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Vec<PromptView>>, ApiError> {
    owned_tenant(&state, &user_id, &tenant_id).await?;
    let revisions = artifacts::list_active(&state.pool, ArtifactKind::Prompt, &tenant_id)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok(Json(
        revisions
            .into_iter()
            .map(|rev| PromptView { name: rev.name, revision: rev.revision_number, content: rev.content })
            .collect(),
    ))
}

/// `PUT /v1/tenants/{id}/prompts/{name}`
pub async fn put_prompt(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path((tenant_id, name)): Path<(String, String)>,
    Json(req): Json<ArtifactPutRequest>,
) -> Result<Json<PromptView>, ApiError> {
    owned_tenant(&state, &user_id, &tenant_id).await?;
    let rev = put(&state, ArtifactKind::Prompt, &tenant_id, &name, &req.content).await?;
    Ok(Json(PromptView { name: rev.name, revision: rev.revision_number, content: rev.content }))
}

/// `GET /v1/tenants/{id}/skills`
pub async fn list_skills(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Vec<SkillView>>, ApiError> {
    owned_tenant(&state, &user_id, &tenant_id).await?;
    let revisions = artifacts::list_active(&state.pool, ArtifactKind::Skill, &tenant_id)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok(Json(
        revisions
            .into_iter()
            .map(|rev| SkillView { skill_id: rev.name, revision: rev.revision_number, content: rev.content })
            .collect(),
    ))
}

/// `PUT /v1/tenants/{id}/skills/{skill_id}`
pub async fn put_skill(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path((tenant_id, skill_id)): Path<(String, String)>,
    Json(req): Json<ArtifactPutRequest>,
) -> Result<Json<SkillView>, ApiError> {
    owned_tenant(&state, &user_id, &tenant_id).await?;
    let rev = put(&state, ArtifactKind::Skill, &tenant_id, &skill_id, &req.content).await?;
    Ok(Json(SkillView { skill_id: rev.name, revision: rev.revision_number, content: rev.content }))
}
