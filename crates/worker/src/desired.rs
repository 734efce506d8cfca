// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local cache of each tenant's desired state, used only for
//! reconciliation after a worker restart.
//!
//! The worker has no database access, so it cannot ask the store what a
//! tenant's desired state is. Instead, every lifecycle
//! action control dispatches is recorded here as a side effect of
//! executing it; on startup the worker reads this cache for every tenant
//! directory under `tenant_root` and reconciles actual state toward it.
//! This is strictly a local cache of control's last instruction, never a
//! second source of truth for the tenant's identity or ownership.

use std::path::{Path, PathBuf};

use nexus_core::model::{EnvMap, TenantState};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredState {
    pub desired_state: TenantState,
    pub image_ref: Option<String>,
    #[serde(default)]
    pub env: EnvMap,
    pub updated_at: String,
}

fn cache_path(tenant_root: &Path, tenant_id: &str) -> PathBuf {
    tenant_root.join(tenant_id).join("desired.json")
}

pub async fn write(tenant_root: &Path, tenant_id: &str, state: &DesiredState) -> std::io::Result<()> {
    let path = cache_path(tenant_root, tenant_id);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let body = serde_json::to_vec_pretty(state).unwrap_or_default();
    fs::write(path, body).await
}

pub async fn read(tenant_root: &Path, tenant_id: &str) -> Option<DesiredState> {
    let body = fs::read(cache_path(tenant_root, tenant_id)).await.ok()?;
    serde_json::from_slice(&body).ok()
}

/// Every tenant id with a desired-state cache under `tenant_root`, for the
/// startup reconciliation sweep.
pub async fn known_tenants(tenant_root: &Path) -> std::io::Result<Vec<String>> {
    let mut ids = Vec::new();
    let mut entries = match fs::read_dir(tenant_root).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
        Err(err) => return Err(err),
    };
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else { continue };
        if cache_path(tenant_root, &name).exists() {
            ids.push(name);
        }
    }
    Ok(ids)
}

pub async fn remove(tenant_root: &Path, tenant_id: &str) -> std::io::Result<()> {
    let path = cache_path(tenant_root, tenant_id);
    match fs::remove_file(&path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trip_and_listing() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let state = DesiredState {
            desired_state: TenantState::Running,
            image_ref: Some("nexus/runtime:v1".to_owned()),
            env: EnvMap::new(),
            updated_at: "2026-01-01T00:00:00Z".to_owned(),
        };
        write(tmp.path(), "t_1", &state).await.expect("write");

        let read_back = read(tmp.path(), "t_1").await.expect("present");
        assert_eq!(read_back.desired_state, TenantState::Running);

        let known = known_tenants(tmp.path()).await.expect("list");
        assert_eq!(known, vec!["t_1".to_owned()]);
    }

    #[tokio::test]
    async fn missing_tenant_root_lists_empty() {
        let known = known_tenants(Path::new("/nonexistent/nexus/tenants")).await.expect("list");
        assert!(known.is_empty());
    }
}
