// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config revisions. A write deactivates prior revisions in the same
//! transaction.

use nexus_core::model::EnvMap;
use nexus_core::time::iso8601_now;
use nexus_core::ConfigRevision;
use sqlx::SqlitePool;

use crate::error::StoreError;

/// Fetch the active config revision for a tenant, if one exists.
pub async fn active(pool: &SqlitePool, tenant_id: &str) -> Result<Option<ConfigRevision>, StoreError> {
    let row = sqlx::query_as::<_, (i64, String, String, bool)>(
        "SELECT revision_number, env_json, created_at, active FROM config_revisions \
         WHERE tenant_id = ? AND active = 1",
    )
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(revision_number, env_json, created_at, active)| ConfigRevision {
        tenant_id: tenant_id.to_owned(),
        revision_number,
        env: serde_json::from_str(&env_json).unwrap_or_default(),
        created_at,
        active,
    }))
}

/// Apply `values`/`remove_keys` on top of the currently active revision
/// (or an empty map if none), writing and activating a new revision.
/// Returns the new revision.
pub async fn apply(
    pool: &SqlitePool,
    tenant_id: &str,
    values: &EnvMap,
    remove_keys: &[String],
) -> Result<ConfigRevision, StoreError> {
    let mut tx = pool.begin().await?;

    let prev = sqlx::query_as::<_, (i64, String)>(
        "SELECT revision_number, env_json FROM config_revisions WHERE tenant_id = ? AND active = 1",
    )
    .bind(tenant_id)
    .fetch_optional(&mut *tx)
    .await?;

    let mut env: EnvMap = match &prev {
        Some((_, env_json)) => serde_json::from_str(env_json).unwrap_or_default(),
        None => EnvMap::new(),
    };
    for key in remove_keys {
        env.remove(key);
    }
    for (k, v) in values {
        env.insert(k.clone(), v.clone());
    }

    let next_revision = prev.as_ref().map(|(n, _)| n + 1).unwrap_or(1);
    let env_json = serde_json::to_string(&env).unwrap_or_default();
    let created_at = iso8601_now();

    sqlx::query("UPDATE config_revisions SET active = 0 WHERE tenant_id = ? AND active = 1")
        .bind(tenant_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO config_revisions (tenant_id, revision_number, env_json, created_at, active) \
         VALUES (?, ?, ?, ?, 1)",
    )
    .bind(tenant_id)
    .bind(next_revision)
    .bind(&env_json)
    .bind(&created_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(ConfigRevision {
        tenant_id: tenant_id.to_owned(),
        revision_number: next_revision,
        env,
        created_at,
        active: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::connect;

    async fn test_pool() -> sqlx::SqlitePool {
        connect("sqlite::memory:").await.expect("in-memory db should connect")
    }

    #[tokio::test]
    async fn apply_increments_revision_and_deactivates_prior() -> Result<(), StoreError> {
        let pool = test_pool().await;
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, created_at) VALUES ('u_1','a@b.com','h','now')",
        )
        .execute(&pool)
        .await?;
        sqlx::query(
            "INSERT INTO tenants (id, owner_user_id, desired_state, actual_state, created_at) \
             VALUES ('t_1','u_1','provisioning','provisioning','now')",
        )
        .execute(&pool)
        .await?;

        let mut v1 = EnvMap::new();
        v1.insert("A".to_owned(), "1".to_owned());
        let rev1 = apply(&pool, "t_1", &v1, &[]).await?;
        assert_eq!(rev1.revision_number, 1);

        let mut v2 = EnvMap::new();
        v2.insert("B".to_owned(), "2".to_owned());
        let rev2 = apply(&pool, "t_1", &v2, &[]).await?;
        assert_eq!(rev2.revision_number, 2);
        assert_eq!(rev2.env.get("A").map(String::as_str), Some("1"));
        assert_eq!(rev2.env.get("B").map(String::as_str), Some("2"));

        let active_count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM config_revisions WHERE tenant_id = 't_1' AND active = 1")
                .fetch_one(&pool)
                .await?;
        assert_eq!(active_count.0, 1);

        let cur = active(&pool, "t_1").await?.expect("should have an active revision");
        assert_eq!(cur.revision_number, 2);
        Ok(())
    }
}
