// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt and skill revisions. Both are a named artifact with exactly one
//! active revision; the two tables share this logic with their
//! table/column name chosen by [`ArtifactKind`].

use nexus_core::model::ArtifactRevision;
use nexus_core::time::iso8601_now;
use sqlx::SqlitePool;

use crate::error::StoreError;

#[derive(Clone, Copy)]
pub enum ArtifactKind {
    Prompt,
    Skill,
}

impl ArtifactKind {
    fn table(self) -> &'static str {
        match self {
            Self::Prompt => "prompt_revisions",
            Self::Skill => "skill_revisions",
        }
    }

    fn name_column(self) -> &'static str {
        match self {
            Self::Prompt => "name",
            Self::Skill => "skill_id",
        }
    }
}

/// List the active revision of every artifact for a tenant.
pub async fn list_active(
    pool: &SqlitePool,
    kind: ArtifactKind,
    tenant_id: &str,
) -> Result<Vec<ArtifactRevision>, StoreError> {
    let sql = format!(
        "SELECT {name_col}, revision_number, content, created_at, active FROM {table} \
         WHERE tenant_id = ? AND active = 1 ORDER BY {name_col}",
        name_col = kind.name_column(),
        table = kind.table(),
    );
    let rows = sqlx::query_as::<_, (String, i64, String, String, bool)>(&sql)
        .bind(tenant_id)
        .fetch_all(pool)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(name, revision_number, content, created_at, active)| ArtifactRevision {
            tenant_id: tenant_id.to_owned(),
            name,
            revision_number,
            content,
            created_at,
            active,
        })
        .collect())
}

/// Write a new, active revision for the named artifact, deactivating the
/// previous one in the same transaction.
pub async fn put(
    pool: &SqlitePool,
    kind: ArtifactKind,
    tenant_id: &str,
    name: &str,
    content: &str,
) -> Result<ArtifactRevision, StoreError> {
    let mut tx = pool.begin().await?;
    let name_col = kind.name_column();
    let table = kind.table();

    let prev_sql = format!(
        "SELECT revision_number FROM {table} WHERE tenant_id = ? AND {name_col} = ? AND active = 1"
    );
    let prev: Option<(i64,)> =
        sqlx::query_as(&prev_sql).bind(tenant_id).bind(name).fetch_optional(&mut *tx).await?;
    let next_revision = prev.map(|(n,)| n + 1).unwrap_or(1);

    let deactivate_sql = format!(
        "UPDATE {table} SET active = 0 WHERE tenant_id = ? AND {name_col} = ? AND active = 1"
    );
    sqlx::query(&deactivate_sql).bind(tenant_id).bind(name).execute(&mut *tx).await?;

    let created_at = iso8601_now();
    let insert_sql = format!(
        "INSERT INTO {table} (tenant_id, {name_col}, revision_number, content, created_at, active) \
         VALUES (?, ?, ?, ?, ?, 1)"
    );
    sqlx::query(&insert_sql)
        .bind(tenant_id)
        .bind(name)
        .bind(next_revision)
        .bind(content)
        .bind(&created_at)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(ArtifactRevision {
        tenant_id: tenant_id.to_owned(),
        name: name.to_owned(),
        revision_number: next_revision,
        content: content.to_owned(),
        created_at,
        active: true,
    })
}
