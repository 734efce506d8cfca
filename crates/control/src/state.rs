// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared control process state.

use std::sync::Arc;

use nexus_bus::Bus;
use nexus_signer::key::KeyRing;
use sqlx::SqlitePool;

pub struct AppState {
    pub pool: SqlitePool,
    pub bus: Arc<Bus>,
    pub action_keys: KeyRing,
    pub session_keys: KeyRing,
    pub worker_client: reqwest::Client,
    pub worker_base_url: String,
    pub default_image: String,
    pub default_replay: usize,
}
