// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action token mint/verify.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use nexus_core::action::{Action, ActionClaims, MAX_ACTION_TOKEN_TTL_SECS};
use nexus_core::ids::new_nonce;
use nexus_core::time::epoch_secs;
use thiserror::Error;

use crate::key::KeyRing;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("malformed token")]
    Malformed,
    #[error("bad signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("token not yet valid")]
    NotYetValid,
    #[error("tenant mismatch")]
    TenantMismatch,
    #[error("action not permitted")]
    ActionNotPermitted,
}

/// Mint a signed action token for `tenant_id`/`action`, valid for `ttl_secs`
/// (clamped to [`MAX_ACTION_TOKEN_TTL_SECS`]).
pub fn mint(keys: &KeyRing, tenant_id: &str, action: Action, ttl_secs: u64) -> String {
    let now = epoch_secs();
    let ttl = ttl_secs.min(MAX_ACTION_TOKEN_TTL_SECS);
    let claims = ActionClaims {
        tenant_id: tenant_id.to_owned(),
        action,
        nbf: now,
        exp: now + ttl,
        nonce: new_nonce(),
    };
    encode(keys, &claims)
}

fn encode(keys: &KeyRing, claims: &ActionClaims) -> String {
    let body = serde_json::to_vec(claims).unwrap_or_default();
    let body_b64 = URL_SAFE_NO_PAD.encode(&body);
    let tag = keys.sign(body_b64.as_bytes());
    let sig_b64 = URL_SAFE_NO_PAD.encode(tag.as_ref());
    format!("{body_b64}.{sig_b64}")
}

/// Verify a token string, requiring it to name `expected_tenant_id` and one
/// of `allowed_actions`. Replay within the expiry window is accepted by
/// design — the driver's operations are idempotent.
pub fn verify(
    keys: &KeyRing,
    token: &str,
    expected_tenant_id: &str,
    allowed_actions: &[Action],
) -> Result<ActionClaims, VerifyError> {
    let (body_b64, sig_b64) = token.split_once('.').ok_or(VerifyError::Malformed)?;
    let sig = URL_SAFE_NO_PAD.decode(sig_b64).map_err(|_| VerifyError::Malformed)?;
    if !keys.verify(body_b64.as_bytes(), &sig) {
        return Err(VerifyError::BadSignature);
    }
    let body = URL_SAFE_NO_PAD.decode(body_b64).map_err(|_| VerifyError::Malformed)?;
    let claims: ActionClaims = serde_json::from_slice(&body).map_err(|_| VerifyError::Malformed)?;

    let now = epoch_secs();
    if now < claims.nbf {
        return Err(VerifyError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(VerifyError::Expired);
    }
    if claims.tenant_id != expected_tenant_id {
        return Err(VerifyError::TenantMismatch);
    }
    if !allowed_actions.contains(&claims.action) {
        return Err(VerifyError::ActionNotPermitted);
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> KeyRing {
        KeyRing::new(b"0123456789abcdef0123456789abcdef", None).expect("valid key")
    }

    #[test]
    fn round_trip_ok() -> Result<(), VerifyError> {
        let keys = keys();
        let token = mint(&keys, "t_1", Action::Start, 30);
        let claims = verify(&keys, &token, "t_1", &[Action::Start, Action::Restart])?;
        assert_eq!(claims.tenant_id, "t_1");
        assert_eq!(claims.action, Action::Start);
        Ok(())
    }

    #[test]
    fn rejects_wrong_tenant() {
        let keys = keys();
        let token = mint(&keys, "t_1", Action::Start, 30);
        assert_eq!(verify(&keys, &token, "t_2", &[Action::Start]), Err(VerifyError::TenantMismatch));
    }

    #[test]
    fn rejects_disallowed_action() {
        let keys = keys();
        let token = mint(&keys, "t_1", Action::Delete, 30);
        assert_eq!(
            verify(&keys, &token, "t_1", &[Action::Start]),
            Err(VerifyError::ActionNotPermitted)
        );
    }

    #[test]
    fn ttl_is_clamped_to_max() {
        let keys = keys();
        let token = mint(&keys, "t_1", Action::Start, 10_000);
        let claims = verify(&keys, &token, "t_1", &[Action::Start]).expect("should verify");
        assert!(claims.exp - claims.nbf <= MAX_ACTION_TOKEN_TTL_SECS);
    }

    #[test]
    fn rejects_bad_signature() {
        let keys = keys();
        let other = KeyRing::new(b"fedcba9876543210fedcba9876543210", None).expect("valid key");
        let token = mint(&other, "t_1", Action::Start, 30);
        assert_eq!(verify(&keys, &token, "t_1", &[Action::Start]), Err(VerifyError::BadSignature));
    }

    #[yare::parameterized(
        no_dot = { "onlyonepart" },
        empty = { "" },
        bad_body_b64 = { "not-b64!!.YWJj" },
        bad_sig_b64 = { "YWJj.not-b64!!" },
    )]
    fn rejects_malformed_tokens(token: &str) {
        let keys = keys();
        assert_eq!(verify(&keys, token, "t_1", &[Action::Start]), Err(VerifyError::Malformed));
    }
}
