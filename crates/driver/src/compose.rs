// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker Compose topology driver: one compose project per tenant,
//! materialized from a single template.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use nexus_core::model::EnvMap;
use tokio::fs;
use tracing::{info, warn};

use crate::driver::{Driver, DriverError, EngineHealth};
use crate::template;

const TEMPLATE: &str = include_str!("../templates/tenant-compose.yaml.tmpl");

/// Compose-backed [`Driver`]. Each tenant gets its own directory under
/// `tenant_root` holding `compose.yaml`, an env file, and the bridge
/// socket the runtime container mounts.
pub struct ComposeDriver {
    tenant_root: PathBuf,
    default_image: String,
}

impl ComposeDriver {
    pub fn new(tenant_root: impl Into<PathBuf>, default_image: impl Into<String>) -> Self {
        Self { tenant_root: tenant_root.into(), default_image: default_image.into() }
    }

    /// Image to provision with when a tenant has no `image_ref` override.
    pub fn default_image(&self) -> &str {
        &self.default_image
    }

    fn tenant_dir(&self, tenant_id: &str) -> PathBuf {
        self.tenant_root.join(tenant_id)
    }

    fn compose_path(&self, tenant_id: &str) -> PathBuf {
        self.tenant_dir(tenant_id).join("compose.yaml")
    }

    fn env_path(&self, tenant_id: &str) -> PathBuf {
        self.tenant_dir(tenant_id).join("runtime.env")
    }

    /// Unix domain socket path the bridge ingress reader listens on for
    /// this tenant. Mounted read-write into the runtime container.
    pub fn bridge_socket_path(&self, tenant_id: &str) -> PathBuf {
        self.tenant_dir(tenant_id).join("bridge.sock")
    }

    /// Name of the named volume holding a tenant's WhatsApp session data,
    /// as declared in the rendered compose file.
    fn session_volume_name(tenant_id: &str) -> String {
        format!("nexus_{tenant_id}_session")
    }

    fn render_compose(&self, tenant_id: &str, image_ref: &str) -> String {
        let env_file = self.env_path(tenant_id);
        let socket_dir = self.tenant_dir(tenant_id);
        template::render(
            TEMPLATE,
            &[
                ("TENANT_ID", tenant_id),
                ("IMAGE_REF", image_ref),
                ("ENV_FILE", &env_file.display().to_string()),
                ("SESSION_VOLUME", &Self::session_volume_name(tenant_id)),
                ("STATE_VOLUME", &format!("nexus_{tenant_id}_state")),
                ("BRIDGE_SOCKET_DIR", &socket_dir.display().to_string()),
            ],
        )
    }

    /// Discard the tenant's session volume so the next `up` starts the
    /// runtime with no prior WhatsApp session to resume, guaranteeing a
    /// fresh QR. The container must already be stopped — Docker refuses to
    /// remove a volume still attached to a running container. A volume
    /// that was never created (first-ever pairing) is not an error.
    async fn discard_session_volume(&self, tenant_id: &str) -> Result<(), DriverError> {
        let volume = Self::session_volume_name(tenant_id);
        let output = tokio::process::Command::new("docker").args(["volume", "rm", &volume]).output().await?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.to_lowercase().contains("no such volume") {
            return Ok(());
        }
        Err(DriverError::EngineFailed { code: output.status.code(), stderr: stderr.trim().to_owned() })
    }

    fn render_env_file(env: &EnvMap) -> String {
        env.iter().map(|(k, v)| format!("{k}={v}\n")).collect()
    }

    async fn write_topology(&self, tenant_id: &str, image_ref: &str, env: &EnvMap) -> Result<(), DriverError> {
        let dir = self.tenant_dir(tenant_id);
        fs::create_dir_all(&dir).await?;
        fs::write(self.compose_path(tenant_id), self.render_compose(tenant_id, image_ref)).await?;
        fs::write(self.env_path(tenant_id), Self::render_env_file(env)).await?;
        Ok(())
    }

    async fn compose(&self, tenant_id: &str, args: &[&str]) -> Result<String, DriverError> {
        run_compose(&self.compose_path(tenant_id), args).await
    }
}

#[async_trait]
impl Driver for ComposeDriver {
    async fn provision(&self, tenant_id: &str, image_ref: &str, env: &EnvMap) -> Result<(), DriverError> {
        self.write_topology(tenant_id, image_ref, env).await?;
        info!(%tenant_id, %image_ref, "provisioned tenant topology");
        Ok(())
    }

    async fn start(&self, tenant_id: &str) -> Result<(), DriverError> {
        self.compose(tenant_id, &["up", "-d"]).await?;
        Ok(())
    }

    async fn stop(&self, tenant_id: &str) -> Result<(), DriverError> {
        self.compose(tenant_id, &["stop"]).await?;
        Ok(())
    }

    async fn restart(&self, tenant_id: &str) -> Result<(), DriverError> {
        self.compose(tenant_id, &["restart"]).await?;
        Ok(())
    }

    async fn apply_config(&self, tenant_id: &str, env: &EnvMap) -> Result<(), DriverError> {
        fs::write(self.env_path(tenant_id), Self::render_env_file(env)).await?;
        self.compose(tenant_id, &["up", "-d", "--force-recreate"]).await?;
        Ok(())
    }

    async fn pair_start(&self, tenant_id: &str) -> Result<(), DriverError> {
        // Stop first: Docker refuses to remove a volume still attached to a
        // running container. Discarding the session volume here is what
        // guarantees a fresh QR rather than a silent resume.
        self.compose(tenant_id, &["stop"]).await?;
        self.discard_session_volume(tenant_id).await?;
        self.compose(tenant_id, &["up", "-d", "--force-recreate"]).await?;
        Ok(())
    }

    async fn whatsapp_disconnect(&self, tenant_id: &str) -> Result<(), DriverError> {
        // Runtime watches its bridge socket for a sentinel line; restarting
        // is the engine-level equivalent when no such control channel exists.
        self.compose(tenant_id, &["restart"]).await?;
        Ok(())
    }

    async fn delete(&self, tenant_id: &str) -> Result<(), DriverError> {
        self.compose(tenant_id, &["down", "--volumes", "--remove-orphans"]).await?;
        let dir = self.tenant_dir(tenant_id);
        if let Err(err) = fs::remove_dir_all(&dir).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                return Err(err.into());
            }
        }
        Ok(())
    }

    async fn health(&self, tenant_id: &str) -> Result<EngineHealth, DriverError> {
        if !self.compose_path(tenant_id).exists() {
            return Ok(EngineHealth::Missing);
        }
        let out = self.compose(tenant_id, &["ps", "--format", "json", "--status", "running"]).await;
        match out {
            Ok(stdout) if !stdout.trim().is_empty() => Ok(EngineHealth::Running),
            Ok(_) => Ok(EngineHealth::Stopped),
            Err(err) => {
                warn!(%tenant_id, error = %err, "health check failed");
                Ok(EngineHealth::Errored(err.to_string()))
            }
        }
    }
}

/// Run `docker compose -f <file> <args>` and return trimmed stdout.
async fn run_compose(compose_file: &Path, args: &[&str]) -> Result<String, DriverError> {
    let mut full_args = vec!["compose".to_owned(), "-f".to_owned(), compose_file.display().to_string()];
    full_args.extend(args.iter().map(|a| a.to_string()));

    let output = tokio::process::Command::new("docker").args(&full_args).output().await?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
    } else {
        Err(DriverError::EngineFailed {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_render_contains_tenant_id_and_image() {
        let driver = ComposeDriver::new("/tmp/nexus-tenants", "nexus/runtime:latest");
        let rendered = driver.render_compose("t_1", "nexus/runtime:v2");
        assert!(rendered.contains("nexus-tenant-t_1"));
        assert!(rendered.contains("image: nexus/runtime:v2"));
        assert!(!rendered.contains("{{"));
    }

    #[test]
    fn env_file_renders_one_line_per_var() {
        let mut env = EnvMap::new();
        env.insert("A".to_owned(), "1".to_owned());
        env.insert("B".to_owned(), "2".to_owned());
        let rendered = ComposeDriver::render_env_file(&env);
        assert_eq!(rendered, "A=1\nB=2\n");
    }

    #[tokio::test]
    async fn provision_writes_compose_and_env_files() -> Result<(), DriverError> {
        let tmp = tempfile::tempdir().expect("tempdir");
        let driver = ComposeDriver::new(tmp.path(), "nexus/runtime:latest");
        let mut env = EnvMap::new();
        env.insert("NEXUS_OPENROUTER_API_KEY".to_owned(), "sk-test".to_owned());
        driver.provision("t_1", "nexus/runtime:v3", &env).await?;

        assert!(driver.compose_path("t_1").exists());
        assert!(driver.env_path("t_1").exists());
        Ok(())
    }
}
