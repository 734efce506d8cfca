// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mints a signed action token and calls the worker's private internal
//! API. Control never talks to the container engine directly — this is
//! the only path a mutating tenant action takes out of this process.

use nexus_core::action::Action;
use nexus_core::error::ApiError;
use nexus_core::model::EnvMap;
use nexus_signer::action::mint;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::AppState;

const ACTION_TOKEN_HEADER: &str = "x-nexus-action-token";
const ACTION_TOKEN_TTL_SECS: u64 = 30;

#[derive(Debug, Default, Serialize)]
pub struct ActionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    #[serde(skip_serializing_if = "EnvMap::is_empty")]
    pub env: EnvMap,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionResponse {
    pub state: String,
    #[serde(default)]
    pub qr_baseline_event_id: Option<i64>,
}

/// Dispatch `action` for `tenant_id` to the worker, with an empty body.
pub async fn dispatch(
    state: &AppState,
    tenant_id: &str,
    action: Action,
) -> Result<ActionResponse, ApiError> {
    dispatch_with_body(state, tenant_id, action, ActionRequest::default()).await
}

/// Dispatch `action` for `tenant_id`, with an explicit request body (e.g.
/// an image override or the env to apply).
pub async fn dispatch_with_body(
    state: &AppState,
    tenant_id: &str,
    action: Action,
    body: ActionRequest,
) -> Result<ActionResponse, ApiError> {
    let token = mint(&state.action_keys, tenant_id, action, ACTION_TOKEN_TTL_SECS);
    let url = format!(
        "{}/internal/tenants/{}/actions/{}",
        state.worker_base_url.trim_end_matches('/'),
        tenant_id,
        action.as_str()
    );

    let response = state
        .worker_client
        .post(&url)
        .header(ACTION_TOKEN_HEADER, token)
        .json(&body)
        .send()
        .await
        .map_err(|err| ApiError::ServiceUnavailable(format!("worker unreachable: {err}")))?;

    if !response.status().is_success() {
        let status = response.status();
        let detail: Value = response.json().await.unwrap_or(Value::Null);
        if status.as_u16() == 400 || status.as_u16() == 412 {
            let message = detail
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("precondition failed")
                .to_owned();
            let inner_detail =
                detail.get("error").and_then(|e| e.get("detail")).cloned().unwrap_or(Value::Null);
            return Err(ApiError::Precondition { message, detail: inner_detail });
        }
        return Err(ApiError::ServiceUnavailable(format!("worker returned {status}")));
    }

    response
        .json::<ActionResponse>()
        .await
        .map_err(|err| ApiError::ServiceUnavailable(format!("malformed worker response: {err}")))
}
