// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container driver trait: the operations the worker performs against a
//! tenant's runtime container.

use async_trait::async_trait;
use nexus_core::model::EnvMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("engine command failed (exit {code:?}): {stderr}")]
    EngineFailed { code: Option<i32>, stderr: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tenant {0} has no active config revision")]
    MissingConfig(String),
    #[error("template error: {0}")]
    Template(String),
}

/// Health as observed directly from the container engine, independent of
/// the tenant's last-known `actual_state` in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineHealth {
    Running,
    Stopped,
    Missing,
    Errored(String),
}

impl EngineHealth {
    /// Wire-facing label, used both in the worker's action response and as
    /// the `state` field of a `runtime.status` event.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Missing => "missing",
            Self::Errored(_) => "error",
        }
    }
}

/// Operations the worker performs against a tenant's runtime container.
/// `ComposeDriver` is the concrete container-engine implementation; the
/// trait exists so a test double can stand in for it.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Materialize the tenant's runtime topology (compose file, volumes,
    /// env file) without starting it.
    async fn provision(&self, tenant_id: &str, image_ref: &str, env: &EnvMap) -> Result<(), DriverError>;

    async fn start(&self, tenant_id: &str) -> Result<(), DriverError>;

    async fn stop(&self, tenant_id: &str) -> Result<(), DriverError>;

    async fn restart(&self, tenant_id: &str) -> Result<(), DriverError>;

    /// Rewrite the env file from the given revision and recreate the
    /// container so the new environment takes effect.
    async fn apply_config(&self, tenant_id: &str, env: &EnvMap) -> Result<(), DriverError>;

    /// Start (or restart) the runtime in a mode that requests a fresh
    /// WhatsApp pairing QR code.
    async fn pair_start(&self, tenant_id: &str) -> Result<(), DriverError>;

    /// Tell the runtime to drop its current WhatsApp link without
    /// stopping the container.
    async fn whatsapp_disconnect(&self, tenant_id: &str) -> Result<(), DriverError>;

    /// Tear down the tenant's topology and remove its volumes.
    async fn delete(&self, tenant_id: &str) -> Result<(), DriverError>;

    /// Directly query the engine for the container's health, bypassing
    /// any cached state.
    async fn health(&self, tenant_id: &str) -> Result<EngineHealth, DriverError>;
}
