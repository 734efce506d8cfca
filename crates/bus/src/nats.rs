// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-process event forwarding for the worker plane.
//!
//! The worker process holds no database credentials (`nexus-workerd` takes
//! no `DATABASE_URL`), so it cannot assign `event_id` itself. Bridge-observed
//! events (QR codes, link status, message
//! deliveries) instead go out over NATS request-reply: the worker sends a
//! [`PublishRequest`] and blocks on the control process's reply, which
//! carries the authoritative [`Event`] — including the `event_id` the
//! worker needs as its QR-freshness baseline.

use std::sync::Arc;
use std::time::Duration;

use async_nats::Client;
use futures_util::StreamExt;
use nexus_core::Event;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::bus::Bus;

const SUBJECT_PREFIX: &str = "nexus.events.publish";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum BusNatsError {
    #[error("nats request failed: {0}")]
    Request(#[from] async_nats::RequestError),
    #[error("nats publish failed: {0}")]
    Publish(#[from] async_nats::PublishError),
    #[error("nats subscribe failed: {0}")]
    Subscribe(#[from] async_nats::SubscribeError),
    #[error("malformed reply from control: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("control replied with an error: {0}")]
    Remote(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct PublishRequest {
    tenant_id: String,
    event_type: String,
    payload: Value,
}

#[derive(Debug, Serialize, Deserialize)]
enum PublishReply {
    Ok(Event),
    Err(String),
}

fn subject_for(tenant_id: &str) -> String {
    format!("{SUBJECT_PREFIX}.{tenant_id}")
}

/// Worker-side handle: forwards bridge events to control and waits for
/// the assigned `event_id`.
#[derive(Clone)]
pub struct Publisher {
    client: Client,
}

impl Publisher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn publish(&self, tenant_id: &str, event_type: &str, payload: Value) -> Result<Event, BusNatsError> {
        let request = PublishRequest {
            tenant_id: tenant_id.to_owned(),
            event_type: event_type.to_owned(),
            payload,
        };
        let body = serde_json::to_vec(&request).unwrap_or_default();
        let message = self
            .client
            .request_with_headers(
                subject_for(tenant_id),
                async_nats::HeaderMap::new(),
                body.into(),
            )
            .await?;
        match serde_json::from_slice::<PublishReply>(&message.payload)? {
            PublishReply::Ok(event) => Ok(event),
            PublishReply::Err(detail) => Err(BusNatsError::Remote(detail)),
        }
    }
}

/// Control-side responder: answers [`Publisher`] requests by writing
/// through the authoritative [`Bus`].
pub struct Responder {
    client: Client,
    bus: Arc<Bus>,
}

impl Responder {
    pub fn new(client: Client, bus: Arc<Bus>) -> Self {
        Self { client, bus }
    }

    /// Run the responder loop until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), BusNatsError> {
        let subject = format!("{SUBJECT_PREFIX}.*");
        let mut subscriber = self.client.subscribe(subject).await?;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                message = subscriber.next() => {
                    let Some(message) = message else { return Ok(()) };
                    let Some(reply_to) = message.reply.clone() else {
                        warn!("nats publish request with no reply subject, dropping");
                        continue;
                    };
                    let reply = self.handle(&message.payload).await;
                    let body = serde_json::to_vec(&reply).unwrap_or_default();
                    if let Err(err) = self.client.publish(reply_to, body.into()).await {
                        error!(error = %err, "failed to send nats reply");
                    }
                }
            }
        }
    }

    async fn handle(&self, body: &[u8]) -> PublishReply {
        let request: PublishRequest = match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(err) => return PublishReply::Err(format!("malformed request: {err}")),
        };
        match self
            .bus
            .publish(&request.tenant_id, &request.event_type, request.payload)
            .await
        {
            Ok(event) => PublishReply::Ok(event),
            Err(err) => PublishReply::Err(err.to_string()),
        }
    }
}

/// Connect to NATS with the timeout the request-reply round trip assumes.
pub async fn connect(url: &str) -> Result<Client, async_nats::ConnectError> {
    async_nats::ConnectOptions::new()
        .request_timeout(Some(REQUEST_TIMEOUT))
        .connect(url)
        .await
}
