// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection pool setup and migration runner.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::StoreError;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("migrations");

/// Connect to the store's SQLite database (`database_url`, e.g.
/// `sqlite:///var/lib/nexus/control.db`), running pending migrations, and
/// return a ready-to-use pool.
pub async fn connect(database_url: &str) -> Result<SqlitePool, StoreError> {
    let opts: SqliteConnectOptions = database_url.parse::<SqliteConnectOptions>()?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(8).connect_with(opts).await?;
    MIGRATOR.run(&pool).await?;
    Ok(pool)
}
