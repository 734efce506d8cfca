// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idempotent default prompt/skill application, run on a tenant's first
//! status check after setup.

use nexus_core::action::Action;
use nexus_core::error::ApiError;
use nexus_store::artifacts::{self, ArtifactKind};

use crate::dispatch;
use crate::state::AppState;

/// Bundled with the binary; prompt/skill content is never semantically
/// validated, so these are opaque text blobs.
const DEFAULT_PROMPTS: &[(&str, &str)] =
    &[("system", "You are a helpful assistant bridging WhatsApp conversations.")];
const DEFAULT_SKILLS: &[(&str, &str)] = &[("reminders", "Track and surface reminders mentioned in chat.")];

pub struct BootstrapResult {
    pub defaults_applied: bool,
    pub restarted: bool,
}

/// Apply the default prompt/skill set if this tenant has none yet.
/// Versioned by presence, not a counter: once any revision exists for a
/// given artifact name, bootstrap never overwrites it.
pub async fn ensure_defaults(
    state: &AppState,
    tenant_id: &str,
    tenant_is_running: bool,
) -> Result<BootstrapResult, ApiError> {
    let existing_prompts = artifacts::list_active(&state.pool, ArtifactKind::Prompt, tenant_id)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    let existing_skills = artifacts::list_active(&state.pool, ArtifactKind::Skill, tenant_id)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    if !existing_prompts.is_empty() || !existing_skills.is_empty() {
        return Ok(BootstrapResult { defaults_applied: false, restarted: false });
    }

    for (name, content) in DEFAULT_PROMPTS {
        artifacts::put(&state.pool, ArtifactKind::Prompt, tenant_id, name, content)
            .await
            .map_err(|err| ApiError::Internal(err.to_string()))?;
    }
    for (skill_id, content) in DEFAULT_SKILLS {
        artifacts::put(&state.pool, ArtifactKind::Skill, tenant_id, skill_id, content)
            .await
            .map_err(|err| ApiError::Internal(err.to_string()))?;
    }

    let restarted = if tenant_is_running {
        dispatch::dispatch(state, tenant_id, Action::Restart).await.is_ok()
    } else {
        false
    };

    Ok(BootstrapResult { defaults_applied: true, restarted })
}
