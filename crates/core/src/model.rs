// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain types for users, tenants, and versioned artifacts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A registered control-plane user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub created_at: String,
}

/// Tenant lifecycle state. Shared by `desired_state` and `actual_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantState {
    Provisioning,
    Running,
    Paused,
    PendingPairing,
    Error,
    Deleted,
}

impl TenantState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provisioning => "provisioning",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::PendingPairing => "pending_pairing",
            Self::Error => "error",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "provisioning" => Self::Provisioning,
            "running" => Self::Running,
            "paused" => Self::Paused,
            "pending_pairing" => Self::PendingPairing,
            "error" => Self::Error,
            "deleted" => Self::Deleted,
            _ => return None,
        })
    }

    /// `deleted` is the only terminal state; no action moves a tenant out of it.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

/// A tenant: one user's isolated runtime environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub owner_user_id: String,
    pub desired_state: TenantState,
    pub actual_state: TenantState,
    pub last_heartbeat: Option<String>,
    pub last_error: Option<String>,
    pub image_ref: Option<String>,
    pub created_at: String,
}

/// Environment map for a tenant's container. Ordered for deterministic
/// env-file rendering.
pub type EnvMap = BTreeMap<String, String>;

/// A versioned tenant configuration snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigRevision {
    pub tenant_id: String,
    pub revision_number: i64,
    pub env: EnvMap,
    pub created_at: String,
    pub active: bool,
}

/// A versioned prompt or skill artifact. `name` is the prompt name or skill id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRevision {
    pub tenant_id: String,
    pub name: String,
    pub revision_number: i64,
    pub content: String,
    pub created_at: String,
    pub active: bool,
}

/// Validate a config key against `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_config_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Keys matching `(KEY|SECRET|TOKEN|PASSWORD)` are sensitive and must never
/// be logged or echoed into event payloads.
pub fn is_sensitive_config_key(key: &str) -> bool {
    let upper = key.to_ascii_uppercase();
    ["KEY", "SECRET", "TOKEN", "PASSWORD"].iter().any(|needle| upper.contains(needle))
}

/// Redact sensitive values from an env map for logging/event purposes.
pub fn redact_env(env: &EnvMap) -> BTreeMap<String, String> {
    env.iter()
        .map(|(k, v)| {
            if is_sensitive_config_key(k) {
                (k.clone(), "***".to_owned())
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_validation() {
        assert!(is_valid_config_key("NEXUS_OPENROUTER_API_KEY"));
        assert!(is_valid_config_key("_foo"));
        assert!(!is_valid_config_key("1BAD"));
        assert!(!is_valid_config_key("bad-key"));
        assert!(!is_valid_config_key(""));
    }

    #[test]
    fn sensitive_detection() {
        assert!(is_sensitive_config_key("NEXUS_OPENROUTER_API_KEY"));
        assert!(is_sensitive_config_key("SECRET_VALUE"));
        assert!(!is_sensitive_config_key("LOG_LEVEL"));
    }

    #[test]
    fn redaction_masks_sensitive_values() {
        let mut env = EnvMap::new();
        env.insert("TOKEN_X".to_owned(), "abc123".to_owned());
        env.insert("LOG_LEVEL".to_owned(), "debug".to_owned());
        let redacted = redact_env(&env);
        assert_eq!(redacted["TOKEN_X"], "***");
        assert_eq!(redacted["LOG_LEVEL"], "debug");
    }
}
