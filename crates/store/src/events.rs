// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable event log with a single-writer sequence so `event_id` is
//! gapless and strictly increasing.

use nexus_core::time::iso8601_now;
use nexus_core::Event;
use serde_json::Value;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::error::StoreError;

/// Serializes event inserts through a single connection-equivalent path.
/// sqlx's pool would otherwise let concurrent writers interleave; this
/// mutex makes `event_id` issuance behave like the single-writer sequence
/// the design calls for even though SQLite's `AUTOINCREMENT` alone is
/// already monotonic per-writer.
pub struct EventWriter {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl EventWriter {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, write_lock: Mutex::new(()) }
    }

    /// Append an event and return its assigned `event_id`.
    pub async fn publish(&self, tenant_id: &str, event_type: &str, payload: Value) -> Result<Event, StoreError> {
        let _guard = self.write_lock.lock().await;
        let created_at = iso8601_now();
        let payload_json = serde_json::to_string(&payload).unwrap_or_default();

        let result = sqlx::query(
            "INSERT INTO events (tenant_id, type, created_at, payload_json) VALUES (?, ?, ?, ?)",
        )
        .bind(tenant_id)
        .bind(event_type)
        .bind(&created_at)
        .bind(&payload_json)
        .execute(&self.pool)
        .await?;

        Ok(Event {
            event_id: result.last_insert_rowid(),
            tenant_id: tenant_id.to_owned(),
            event_type: event_type.to_owned(),
            created_at,
            payload,
        })
    }
}

fn row_to_event(event_id: i64, tenant_id: String, event_type: String, created_at: String, payload_json: String) -> Event {
    Event {
        event_id,
        tenant_id,
        event_type,
        created_at,
        payload: serde_json::from_str(&payload_json).unwrap_or(Value::Null),
    }
}

/// Events for `tenant_id` with `event_id > after_event_id`, ascending,
/// optionally filtered by `types`, clamped to `limit`.
pub async fn recent_for_tenant(
    pool: &SqlitePool,
    tenant_id: &str,
    after_event_id: Option<i64>,
    types: &[String],
    limit: i64,
) -> Result<Vec<Event>, StoreError> {
    let rows = if let Some(after) = after_event_id {
        sqlx::query_as::<_, (i64, String, String, String, String)>(
            "SELECT event_id, tenant_id, type, created_at, payload_json FROM events \
             WHERE tenant_id = ? AND event_id > ? ORDER BY event_id ASC LIMIT ?",
        )
        .bind(tenant_id)
        .bind(after)
        .bind(limit)
        .fetch_all(pool)
        .await?
    } else {
        // No cursor: return the most recent `limit` events, in ascending order.
        let descending = sqlx::query_as::<_, (i64, String, String, String, String)>(
            "SELECT event_id, tenant_id, type, created_at, payload_json FROM events \
             WHERE tenant_id = ? ORDER BY event_id DESC LIMIT ?",
        )
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        let mut ascending = descending;
        ascending.reverse();
        ascending
    };

    let events = rows
        .into_iter()
        .map(|(id, tid, ty, created, payload)| row_to_event(id, tid, ty, created, payload))
        .filter(|ev| types.is_empty() || types.iter().any(|t| t == &ev.event_type))
        .collect();
    Ok(events)
}

/// The highest `event_id` issued for a tenant so far, or 0 if none.
pub async fn latest_event_id(pool: &SqlitePool, tenant_id: &str) -> Result<i64, StoreError> {
    let row: (Option<i64>,) =
        sqlx::query_as("SELECT MAX(event_id) FROM events WHERE tenant_id = ?")
            .bind(tenant_id)
            .fetch_one(pool)
            .await?;
    Ok(row.0.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::connect;

    #[tokio::test]
    async fn event_ids_are_strictly_increasing() -> Result<(), StoreError> {
        let pool = connect("sqlite::memory:").await.expect("in-memory db should connect");
        let writer = EventWriter::new(pool.clone());
        let e1 = writer.publish("t_1", "runtime.status", serde_json::json!({"state": "running"})).await?;
        let e2 = writer.publish("t_1", "runtime.status", serde_json::json!({"state": "paused"})).await?;
        assert!(e2.event_id > e1.event_id);
        assert_eq!(e2.event_id - e1.event_id, 1);
        Ok(())
    }

    #[tokio::test]
    async fn round_trip_via_after_event_id() -> Result<(), StoreError> {
        let pool = connect("sqlite::memory:").await.expect("in-memory db should connect");
        let writer = EventWriter::new(pool.clone());
        let e1 = writer.publish("t_1", "runtime.status", serde_json::json!({})).await?;
        let fetched = recent_for_tenant(&pool, "t_1", Some(e1.event_id - 1), &[], 1).await?;
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].event_id, e1.event_id);
        Ok(())
    }

    #[tokio::test]
    async fn type_filter_applies() -> Result<(), StoreError> {
        let pool = connect("sqlite::memory:").await.expect("in-memory db should connect");
        let writer = EventWriter::new(pool.clone());
        writer.publish("t_1", "runtime.status", serde_json::json!({})).await?;
        writer.publish("t_1", "whatsapp.qr", serde_json::json!({"qr": "x"})).await?;
        let filtered =
            recent_for_tenant(&pool, "t_1", None, &["whatsapp.qr".to_owned()], 10).await?;
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].event_type, "whatsapp.qr");
        Ok(())
    }
}
