// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signup, login, and refresh.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use nexus_core::error::ApiError;
use nexus_core::model::User;
use nexus_signer::session::{mint_access, mint_refresh, verify_refresh};
use nexus_store::{password, refresh, users, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub tokens: TokenPair,
}

async fn mint_session(state: &AppState, user_id: &str) -> Result<TokenPair, ApiError> {
    let access_token = mint_access(&state.session_keys, user_id);
    let (refresh_token, token_id) = mint_refresh(&state.session_keys, user_id);
    let expires_at = nexus_core::time::iso8601_now();
    refresh::record(&state.pool, &token_id, user_id, &expires_at)
        .await
        .map_err(store_error_to_api)?;
    Ok(TokenPair { access_token, refresh_token })
}

fn store_error_to_api(err: StoreError) -> ApiError {
    match err {
        StoreError::Conflict => {
            ApiError::Conflict { message: "email already registered".to_owned(), detail: Value::Null }
        }
        other => ApiError::Internal(other.to_string()),
    }
}

/// `POST /v1/auth/signup`
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err(ApiError::Validation("invalid email".to_owned()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation("password must be at least 8 characters".to_owned()));
    }

    let password_hash =
        password::hash_password(&req.password).map_err(|err| ApiError::Internal(err.to_string()))?;
    let user = users::create(&state.pool, &req.email, &password_hash).await.map_err(store_error_to_api)?;
    let tokens = mint_session(&state, &user.id).await?;
    Ok(Json(AuthResponse { user, tokens }))
}

/// `POST /v1/auth/login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let found = users::find_by_email(&state.pool, &req.email).await.map_err(store_error_to_api)?;
    let Some((user, password_hash)) = found else {
        return Err(ApiError::Unauthorized);
    };
    let valid = password::verify_password(&req.password, &password_hash)
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    if !valid {
        return Err(ApiError::Unauthorized);
    }
    let tokens = mint_session(&state, &user.id).await?;
    Ok(Json(AuthResponse { user, tokens }))
}

/// `POST /v1/auth/refresh` — rotate-on-use: the presented refresh token is
/// revoked and a new pair is minted, so it cannot be replayed.
pub async fn refresh_tokens(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let claims =
        verify_refresh(&state.session_keys, &req.refresh_token).map_err(|_| ApiError::Unauthorized)?;
    let live = refresh::is_live(&state.pool, &claims.token_id).await.map_err(store_error_to_api)?;
    if !live {
        return Err(ApiError::Unauthorized);
    }
    refresh::revoke(&state.pool, &claims.token_id).await.map_err(store_error_to_api)?;

    let user = users::find_by_id(&state.pool, &claims.user_id).await.map_err(store_error_to_api)?;
    if user.is_none() {
        return Err(ApiError::Unauthorized);
    }
    let tokens = mint_session(&state, &claims.user_id).await?;
    Ok(Json(RefreshResponse { tokens }))
}
