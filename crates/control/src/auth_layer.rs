// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer session-token authentication, exempting the auth endpoints and
//! the WebSocket gateway (which authenticates via a `token` query param
//! instead, since browsers cannot set custom headers on a WS upgrade).

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use nexus_core::error::ApiError;
use nexus_signer::session::verify_access;

use crate::state::AppState;

/// The authenticated user id, inserted into request extensions by
/// [`auth_layer`] for downstream handlers to read.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

fn is_exempt(path: &str) -> bool {
    path.starts_with("/v1/auth/") || path == "/v1/events/ws" || path == "/v1/healthz"
}

pub async fn auth_layer(State(state): State<Arc<AppState>>, mut req: Request<Body>, next: Next) -> Response {
    if is_exempt(req.uri().path()) {
        return next.run(req).await;
    }

    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(token) = token else {
        return ApiError::Unauthorized.into_response();
    };

    match verify_access(&state.session_keys, token) {
        Ok(claims) => {
            req.extensions_mut().insert(AuthUser(claims.user_id));
            next.run(req).await
        }
        Err(_) => ApiError::Unauthorized.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exempts_auth_and_ws_and_health() {
        assert!(is_exempt("/v1/auth/login"));
        assert!(is_exempt("/v1/auth/signup"));
        assert!(is_exempt("/v1/events/ws"));
        assert!(is_exempt("/v1/healthz"));
        assert!(!is_exempt("/v1/tenants/status"));
    }
}
