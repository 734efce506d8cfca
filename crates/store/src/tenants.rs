// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use nexus_core::ids::new_tenant_id;
use nexus_core::time::iso8601_now;
use nexus_core::{Tenant, TenantState};
use sqlx::SqlitePool;

use crate::error::StoreError;

fn row_to_tenant(
    id: String,
    owner_user_id: String,
    desired_state: String,
    actual_state: String,
    last_heartbeat: Option<String>,
    last_error: Option<String>,
    image_ref: Option<String>,
    created_at: String,
) -> Tenant {
    Tenant {
        id,
        owner_user_id,
        desired_state: TenantState::parse(&desired_state).unwrap_or(TenantState::Error),
        actual_state: TenantState::parse(&actual_state).unwrap_or(TenantState::Error),
        last_heartbeat,
        last_error,
        image_ref,
        created_at,
    }
}

/// Find the tenant already owned by `user_id`, if any (at most one tenant
/// per user).
pub async fn find_by_owner(pool: &SqlitePool, user_id: &str) -> Result<Option<Tenant>, StoreError> {
    let row = sqlx::query_as::<_, (String, String, String, String, Option<String>, Option<String>, Option<String>, String)>(
        "SELECT id, owner_user_id, desired_state, actual_state, last_heartbeat, last_error, image_ref, created_at \
         FROM tenants WHERE owner_user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(id, owner, d, a, hb, err, img, created)| row_to_tenant(id, owner, d, a, hb, err, img, created)))
}

pub async fn find_by_id(pool: &SqlitePool, tenant_id: &str) -> Result<Option<Tenant>, StoreError> {
    let row = sqlx::query_as::<_, (String, String, String, String, Option<String>, Option<String>, Option<String>, String)>(
        "SELECT id, owner_user_id, desired_state, actual_state, last_heartbeat, last_error, image_ref, created_at \
         FROM tenants WHERE id = ?",
    )
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(id, owner, d, a, hb, err, img, created)| row_to_tenant(id, owner, d, a, hb, err, img, created)))
}

/// Create a tenant for `user_id`. Fails with [`StoreError::Conflict`] if the
/// user already owns one (enforced by the `owner_user_id` unique index).
pub async fn create(pool: &SqlitePool, user_id: &str) -> Result<Tenant, StoreError> {
    let tenant = Tenant {
        id: new_tenant_id(),
        owner_user_id: user_id.to_owned(),
        desired_state: TenantState::Provisioning,
        actual_state: TenantState::Provisioning,
        last_heartbeat: None,
        last_error: None,
        image_ref: None,
        created_at: iso8601_now(),
    };
    sqlx::query(
        "INSERT INTO tenants (id, owner_user_id, desired_state, actual_state, last_heartbeat, last_error, image_ref, created_at) \
         VALUES (?, ?, ?, ?, NULL, NULL, NULL, ?)",
    )
    .bind(&tenant.id)
    .bind(&tenant.owner_user_id)
    .bind(tenant.desired_state.as_str())
    .bind(tenant.actual_state.as_str())
    .bind(&tenant.created_at)
    .execute(pool)
    .await
    .map_err(StoreError::from_sqlx)?;
    Ok(tenant)
}

/// Set the desired state (called by control before dispatching an action).
pub async fn set_desired_state(
    pool: &SqlitePool,
    tenant_id: &str,
    state: TenantState,
) -> Result<(), StoreError> {
    sqlx::query("UPDATE tenants SET desired_state = ? WHERE id = ?")
        .bind(state.as_str())
        .bind(tenant_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Set the actual state, heartbeat, and error (called by the worker's
/// reconcile loop or by control on poll-through).
pub async fn set_actual_state(
    pool: &SqlitePool,
    tenant_id: &str,
    state: TenantState,
    last_error: Option<&str>,
) -> Result<(), StoreError> {
    sqlx::query(
        "UPDATE tenants SET actual_state = ?, last_heartbeat = ?, last_error = ? WHERE id = ?",
    )
    .bind(state.as_str())
    .bind(iso8601_now())
    .bind(last_error)
    .bind(tenant_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Persist a runtime image override so subsequent reconciles use it
/// (Open Question resolution, see `DESIGN.md`).
pub async fn set_image_ref(pool: &SqlitePool, tenant_id: &str, image_ref: &str) -> Result<(), StoreError> {
    sqlx::query("UPDATE tenants SET image_ref = ? WHERE id = ?")
        .bind(image_ref)
        .bind(tenant_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// All tenants known to the store, for worker startup reconciliation.
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Tenant>, StoreError> {
    let rows = sqlx::query_as::<_, (String, String, String, String, Option<String>, Option<String>, Option<String>, String)>(
        "SELECT id, owner_user_id, desired_state, actual_state, last_heartbeat, last_error, image_ref, created_at FROM tenants",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(id, owner, d, a, hb, err, img, created)| row_to_tenant(id, owner, d, a, hb, err, img, created)).collect())
}
