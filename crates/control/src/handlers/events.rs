// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stream gateway: incremental poll and WebSocket delivery over the same
//! event store, via a per-connection select loop and query-driven
//! subscription filtering.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Extension, Path, Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::{SinkExt, StreamExt};
use nexus_bus::Delivery;
use nexus_core::error::ApiError;
use nexus_signer::session::verify_access;
use serde::Deserialize;

use crate::auth_layer::AuthUser;
use crate::handlers::tenants::owned_tenant;
use crate::state::AppState;

const DEFAULT_POLL_LIMIT: i64 = 50;
const MAX_POLL_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
    pub after_event_id: Option<i64>,
    pub types: Option<String>,
}

fn split_types(types: Option<&str>) -> Vec<String> {
    types
        .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned).collect())
        .unwrap_or_default()
}

/// `GET /v1/tenants/{id}/events/recent`
pub async fn recent(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(tenant_id): Path<String>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<nexus_core::Event>>, ApiError> {
    owned_tenant(&state, &user_id, &tenant_id).await?;
    let limit = query.limit.unwrap_or(DEFAULT_POLL_LIMIT).clamp(1, MAX_POLL_LIMIT);
    let types = split_types(query.types.as_deref());
    let events =
        nexus_store::events::recent_for_tenant(&state.pool, &tenant_id, query.after_event_id, &types, limit)
            .await
            .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok(Json(events))
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: String,
    pub tenant_id: String,
    #[serde(default)]
    pub replay: Option<usize>,
    #[serde(default)]
    pub after_event_id: Option<i64>,
    #[serde(default)]
    pub types: Option<String>,
}

/// `GET /v1/events/ws?token=…&tenant_id=…&replay=N&after_event_id=K`
///
/// Authenticates via a query-string token (not a header) because browsers
/// cannot set custom headers on a WebSocket upgrade request.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let claims = match verify_access(&state.session_keys, &query.token) {
        Ok(claims) => claims,
        Err(_) => return ApiError::Unauthorized.into_response(),
    };
    if let Err(err) = owned_tenant(&state, &claims.user_id, &query.tenant_id).await {
        return err.into_response();
    }

    let replay = query.replay.unwrap_or(nexus_bus::DEFAULT_REPLAY).min(nexus_bus::MAX_REPLAY);
    let types = split_types(query.types.as_deref());
    let attachment = match state.bus.attach_tenant(&query.tenant_id, query.after_event_id, replay).await {
        Ok(attachment) => attachment,
        Err(err) => return ApiError::Internal(err.to_string()).into_response(),
    };

    ws.on_upgrade(move |socket| handle_ws(socket, attachment, types)).into_response()
}

async fn handle_ws(socket: WebSocket, mut attachment: nexus_bus::Attachment, types: Vec<String>) {
    let (mut tx, mut rx) = socket.split();

    for event in std::mem::take(&mut attachment.backlog) {
        if !types.is_empty() && !types.iter().any(|t| t == &event.event_type) {
            continue;
        }
        if send_event(&mut tx, &event).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            delivery = attachment.next() => {
                match delivery {
                    Some(Delivery::Event(event)) => {
                        if !types.is_empty() && !types.iter().any(|t| t == &event.event_type) {
                            continue;
                        }
                        if send_event(&mut tx, &event).await.is_err() {
                            break;
                        }
                    }
                    Some(Delivery::Lagging) => {
                        let _ = tx.send(Message::Text(r#"{"error":"lagging"}"#.into())).await;
                        break;
                    }
                    None => break,
                }
            }
            msg = rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
}

async fn send_event(
    tx: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    event: &nexus_core::Event,
) -> Result<(), axum::Error> {
    let body = serde_json::to_string(event).unwrap_or_default();
    tx.send(Message::Text(body.into())).await
}
