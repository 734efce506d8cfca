// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker process configuration. Deliberately has no database URL: the
//! worker never talks to the store directly, only to the engine and to
//! control via signed action requests / NATS.

use std::time::Duration;

#[derive(Debug, Clone, clap::Parser)]
#[command(name = "nexus-workerd")]
pub struct WorkerConfig {
    /// Host to bind the internal API on.
    #[arg(long, default_value = "127.0.0.1", env = "NEXUS_WORKER_HOST")]
    pub host: String,

    /// Port to bind the internal API on.
    #[arg(long, default_value_t = 7900, env = "NEXUS_WORKER_PORT")]
    pub port: u16,

    /// Root directory under which each tenant gets a subdirectory holding
    /// its compose topology, env file, bridge socket, and desired-state
    /// cache.
    #[arg(long, env = "NEXUS_TENANT_ROOT")]
    pub tenant_root: std::path::PathBuf,

    /// Default runtime image used when a tenant has no image override.
    #[arg(long, env = "NEXUS_DEFAULT_IMAGE")]
    pub default_image: String,

    /// Current action-token signing key (base64url), shared with control.
    #[arg(long, env = "NEXUS_ACTION_KEY")]
    pub action_key: String,

    /// Previous action-token signing key, accepted during rotation.
    #[arg(long, env = "NEXUS_ACTION_KEY_PREVIOUS")]
    pub action_key_previous: Option<String>,

    /// NATS server URL used to forward bridge-observed events to control.
    #[arg(long, default_value = "nats://127.0.0.1:4222", env = "NEXUS_NATS_URL")]
    pub nats_url: String,

    /// Reconcile sweep interval in seconds.
    #[arg(long, default_value_t = 30, env = "NEXUS_RECONCILE_INTERVAL_SECS")]
    pub reconcile_interval_secs: u64,
}

impl WorkerConfig {
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
