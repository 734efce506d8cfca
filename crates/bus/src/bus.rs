// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenant-scoped event bus: in-memory fanout backed by the durable store.

use std::collections::HashMap;
use std::sync::Arc;

use nexus_core::Event;
use nexus_store::events::EventWriter;
use nexus_store::StoreError;
use serde_json::Value;
use sqlx::SqlitePool;
use tokio::sync::{broadcast, RwLock};

/// Bounded per-subscriber buffer. A subscriber that falls this far behind
/// is evicted rather than allowed to stall the publisher.
pub const CHANNEL_CAPACITY: usize = 256;
/// Default WebSocket/poll replay window.
pub const DEFAULT_REPLAY: usize = 80;
/// Implementation ceiling on replay size, regardless of what a client asks for.
pub const MAX_REPLAY: usize = 500;

/// The authoritative bus: owns event_id issuance (via the store) and
/// in-process fanout. Lives in the control process.
pub struct Bus {
    pool: SqlitePool,
    writer: Arc<EventWriter>,
    tenant_channels: RwLock<HashMap<String, broadcast::Sender<Event>>>,
    global: broadcast::Sender<Event>,
}

/// A single delivery from a live subscription: either a fresh event or a
/// lagging-consumer eviction notice.
#[derive(Debug)]
pub enum Delivery {
    Event(Event),
    Lagging,
}

impl Bus {
    pub fn new(pool: SqlitePool) -> Self {
        let (global, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { pool, writer: Arc::new(EventWriter::new(pool.clone())), tenant_channels: RwLock::new(HashMap::new()), global }
    }

    async fn tenant_sender(&self, tenant_id: &str) -> broadcast::Sender<Event> {
        {
            let channels = self.tenant_channels.read().await;
            if let Some(tx) = channels.get(tenant_id) {
                return tx.clone();
            }
        }
        let mut channels = self.tenant_channels.write().await;
        if let Some(tx) = channels.get(tenant_id) {
            return tx.clone();
        }
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        channels.insert(tenant_id.to_owned(), tx.clone());
        tx
    }

    /// Publish an event: write it durably (assigning `event_id`), then
    /// broadcast to tenant-scoped and global subscribers.
    pub async fn publish(&self, tenant_id: &str, event_type: &str, payload: Value) -> Result<Event, StoreError> {
        let event = self.writer.publish(tenant_id, event_type, payload).await?;
        let tx = self.tenant_sender(tenant_id).await;
        let _ = tx.send(event.clone());
        let _ = self.global.send(event.clone());
        Ok(event)
    }

    /// Subscribe to a single tenant's live stream, returning backlog
    /// (events with id > `after_event_id`, or the last `replay` events if
    /// absent) plus a live receiver. Backlog is fetched *after* attaching
    /// the live receiver, so no event can be missed in the gap; the live
    /// stream is filtered to skip anything already in the backlog.
    pub async fn attach_tenant(
        &self,
        tenant_id: &str,
        after_event_id: Option<i64>,
        replay: usize,
    ) -> Result<Attachment, StoreError> {
        let limit = replay.min(MAX_REPLAY) as i64;
        let live = self.tenant_sender(tenant_id).await.subscribe();
        let backlog =
            nexus_store::events::recent_for_tenant(&self.pool, tenant_id, after_event_id, &[], limit)
                .await?;
        let last_delivered = backlog.last().map(|e| e.event_id).or(after_event_id).unwrap_or(0);
        Ok(Attachment { backlog, live, last_delivered })
    }

    pub fn subscribe_all(&self) -> broadcast::Receiver<Event> {
        self.global.subscribe()
    }
}

/// Result of attaching to a tenant's stream: replay backlog plus a live
/// receiver already positioned to avoid both gaps and duplicates.
pub struct Attachment {
    pub backlog: Vec<Event>,
    pub live: broadcast::Receiver<Event>,
    last_delivered: i64,
}

impl Attachment {
    /// Await the next live delivery, silently skipping events already
    /// present in `backlog` and surfacing lag as [`Delivery::Lagging`].
    pub async fn next(&mut self) -> Option<Delivery> {
        loop {
            match self.live.recv().await {
                Ok(event) => {
                    if event.event_id <= self.last_delivered {
                        continue;
                    }
                    self.last_delivered = event.event_id;
                    return Some(Delivery::Event(event));
                }
                Err(broadcast::error::RecvError::Lagged(_)) => return Some(Delivery::Lagging),
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_bus() -> Bus {
        let pool = nexus_store::connect("sqlite::memory:").await.expect("in-memory db should connect");
        Bus::new(pool)
    }

    #[tokio::test]
    async fn attach_then_publish_delivers_live() -> Result<(), StoreError> {
        let bus = test_bus().await;
        let mut att = bus.attach_tenant("t_1", None, 80).await?;
        assert!(att.backlog.is_empty());

        bus.publish("t_1", "runtime.status", serde_json::json!({"state": "running"})).await?;
        match att.next().await {
            Some(Delivery::Event(ev)) => assert_eq!(ev.event_type, "runtime.status"),
            other => panic!("expected event, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn replay_excludes_already_seen_ids_from_live_stream() -> Result<(), StoreError> {
        let bus = test_bus().await;
        bus.publish("t_1", "a", serde_json::json!({})).await?;
        bus.publish("t_1", "b", serde_json::json!({})).await?;

        let mut att = bus.attach_tenant("t_1", None, 80).await?;
        assert_eq!(att.backlog.len(), 2);

        // A fresh publish must be the only thing delivered live.
        bus.publish("t_1", "c", serde_json::json!({})).await?;
        match att.next().await {
            Some(Delivery::Event(ev)) => assert_eq!(ev.event_type, "c"),
            other => panic!("expected event c, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn lagging_subscriber_is_reported_not_blocking() -> Result<(), StoreError> {
        let bus = test_bus().await;
        let mut att = bus.attach_tenant("t_1", None, 80).await?;
        for i in 0..(CHANNEL_CAPACITY + 10) {
            bus.publish("t_1", "spam", serde_json::json!({"i": i})).await?;
        }
        let mut saw_lag = false;
        for _ in 0..(CHANNEL_CAPACITY + 10) {
            if let Some(Delivery::Lagging) = att.next().await {
                saw_lag = true;
                break;
            }
        }
        assert!(saw_lag);
        Ok(())
    }
}
