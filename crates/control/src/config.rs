// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control process configuration.

#[derive(Debug, Clone, clap::Parser)]
#[command(name = "nexus-controld")]
pub struct ControlConfig {
    #[arg(long, default_value = "0.0.0.0", env = "NEXUS_CONTROL_HOST")]
    pub host: String,

    #[arg(long, default_value_t = 8080, env = "NEXUS_CONTROL_PORT")]
    pub port: u16,

    /// SQLite connection string, e.g. `sqlite:///var/lib/nexus/control.db`.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Current action-token signing key, shared with the worker.
    #[arg(long, env = "NEXUS_ACTION_KEY")]
    pub action_key: String,

    #[arg(long, env = "NEXUS_ACTION_KEY_PREVIOUS")]
    pub action_key_previous: Option<String>,

    /// Current session-token (access/refresh) signing key.
    #[arg(long, env = "NEXUS_SESSION_KEY")]
    pub session_key: String,

    #[arg(long, env = "NEXUS_SESSION_KEY_PREVIOUS")]
    pub session_key_previous: Option<String>,

    #[arg(long, default_value = "nats://127.0.0.1:4222", env = "NEXUS_NATS_URL")]
    pub nats_url: String,

    /// Base URL of the worker's private internal API.
    #[arg(long, env = "NEXUS_WORKER_BASE_URL")]
    pub worker_base_url: String,

    /// Default runtime image for newly provisioned tenants.
    #[arg(long, env = "NEXUS_DEFAULT_IMAGE")]
    pub default_image: String,

    /// Allowed CORS origin for the public API (comma-separated).
    #[arg(long, env = "NEXUS_CORS_ORIGIN")]
    pub cors_origin: Option<String>,

    /// Default WebSocket/poll replay window; see `nexus_bus::DEFAULT_REPLAY`.
    #[arg(long, default_value_t = nexus_bus::DEFAULT_REPLAY, env = "NEXUS_DEFAULT_REPLAY")]
    pub default_replay: usize,
}

impl ControlConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
