// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Refresh-token rotation bookkeeping. Only the opaque `token_id` and
//! revocation flag are stored — never the signed token itself — so a
//! leaked row cannot mint a session.

use sqlx::SqlitePool;

use crate::error::StoreError;

pub async fn record(
    pool: &SqlitePool,
    token_id: &str,
    user_id: &str,
    expires_at: &str,
) -> Result<(), StoreError> {
    sqlx::query("INSERT INTO refresh_tokens (token_id, user_id, expires_at, revoked) VALUES (?, ?, ?, 0)")
        .bind(token_id)
        .bind(user_id)
        .bind(expires_at)
        .execute(pool)
        .await?;
    Ok(())
}

/// Returns true if `token_id` is known and has not been revoked.
pub async fn is_live(pool: &SqlitePool, token_id: &str) -> Result<bool, StoreError> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT revoked FROM refresh_tokens WHERE token_id = ?")
            .bind(token_id)
            .fetch_optional(pool)
            .await?;
    Ok(matches!(row, Some((0,))))
}

/// Mark a refresh token consumed so it cannot be reused (rotate-on-use).
pub async fn revoke(pool: &SqlitePool, token_id: &str) -> Result<(), StoreError> {
    sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE token_id = ?")
        .bind(token_id)
        .execute(pool)
        .await?;
    Ok(())
}
