// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action tokens: the capability the control plane mints and the worker
//! verifies for every lifecycle request.

use serde::{Deserialize, Serialize};

/// Worker-side operation an action token authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Provision,
    Start,
    Stop,
    Restart,
    PairStart,
    ApplyConfig,
    WhatsappDisconnect,
    Health,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provision => "provision",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::PairStart => "pair_start",
            Self::ApplyConfig => "apply_config",
            Self::WhatsappDisconnect => "whatsapp_disconnect",
            Self::Health => "health",
            Self::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "provision" => Self::Provision,
            "start" => Self::Start,
            "stop" => Self::Stop,
            "restart" => Self::Restart,
            "pair_start" => Self::PairStart,
            "apply_config" => Self::ApplyConfig,
            "whatsapp_disconnect" => Self::WhatsappDisconnect,
            "health" => Self::Health,
            "delete" => Self::Delete,
            _ => return None,
        })
    }
}

/// Maximum action token lifetime: expiry must be within 60 seconds.
pub const MAX_ACTION_TOKEN_TTL_SECS: u64 = 60;

/// Claims carried by a signed action token. Not persisted — minted and
/// verified on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionClaims {
    pub tenant_id: String,
    pub action: Action,
    pub nbf: u64,
    pub exp: u64,
    pub nonce: String,
}

/// Claims carried by a short-lived session access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub user_id: String,
    pub exp: u64,
}

/// Claims carried by a longer-lived refresh token. `token_id` is the
/// persisted row identifying this token for rotate-on-use revocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub user_id: String,
    pub token_id: String,
    pub exp: u64,
}
