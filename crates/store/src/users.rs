// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use nexus_core::ids::new_user_id;
use nexus_core::time::iso8601_now;
use nexus_core::User;
use sqlx::SqlitePool;

use crate::error::StoreError;

/// Create a new user with the given email and pre-hashed password.
pub async fn create(pool: &SqlitePool, email: &str, password_hash: &str) -> Result<User, StoreError> {
    let user = User { id: new_user_id(), email: email.to_owned(), created_at: iso8601_now() };
    sqlx::query("INSERT INTO users (id, email, password_hash, created_at) VALUES (?, ?, ?, ?)")
        .bind(&user.id)
        .bind(&user.email)
        .bind(password_hash)
        .bind(&user.created_at)
        .execute(pool)
        .await
        .map_err(StoreError::from_sqlx)?;
    Ok(user)
}

/// Fetch a user and their password hash by email (case-insensitive).
pub async fn find_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<(User, String)>, StoreError> {
    let row = sqlx::query_as::<_, (String, String, String, String)>(
        "SELECT id, email, password_hash, created_at FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(id, email, password_hash, created_at)| {
        (User { id, email, created_at }, password_hash)
    }))
}

pub async fn find_by_id(pool: &SqlitePool, user_id: &str) -> Result<Option<User>, StoreError> {
    let row = sqlx::query_as::<_, (String, String, String)>(
        "SELECT id, email, created_at FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(id, email, created_at)| User { id, email, created_at }))
}
