// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session access/refresh token mint/verify.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use nexus_core::action::{AccessClaims, RefreshClaims};
use nexus_core::ids::new_nonce;
use nexus_core::time::epoch_secs;
use thiserror::Error;

use crate::key::KeyRing;

/// Access tokens live ~1h.
pub const ACCESS_TOKEN_TTL_SECS: u64 = 3600;
/// Refresh tokens live 30 days.
pub const REFRESH_TOKEN_TTL_SECS: u64 = 30 * 24 * 3600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("malformed token")]
    Malformed,
    #[error("bad signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

fn encode<T: serde::Serialize>(keys: &KeyRing, claims: &T) -> String {
    let body = serde_json::to_vec(claims).unwrap_or_default();
    let body_b64 = URL_SAFE_NO_PAD.encode(&body);
    let tag = keys.sign(body_b64.as_bytes());
    let sig_b64 = URL_SAFE_NO_PAD.encode(tag.as_ref());
    format!("{body_b64}.{sig_b64}")
}

fn decode<T: serde::de::DeserializeOwned>(keys: &KeyRing, token: &str) -> Result<T, VerifyError> {
    let (body_b64, sig_b64) = token.split_once('.').ok_or(VerifyError::Malformed)?;
    let sig = URL_SAFE_NO_PAD.decode(sig_b64).map_err(|_| VerifyError::Malformed)?;
    if !keys.verify(body_b64.as_bytes(), &sig) {
        return Err(VerifyError::BadSignature);
    }
    let body = URL_SAFE_NO_PAD.decode(body_b64).map_err(|_| VerifyError::Malformed)?;
    serde_json::from_slice(&body).map_err(|_| VerifyError::Malformed)
}

pub fn mint_access(keys: &KeyRing, user_id: &str) -> String {
    let claims = AccessClaims { user_id: user_id.to_owned(), exp: epoch_secs() + ACCESS_TOKEN_TTL_SECS };
    encode(keys, &claims)
}

pub fn verify_access(keys: &KeyRing, token: &str) -> Result<AccessClaims, VerifyError> {
    let claims: AccessClaims = decode(keys, token)?;
    if epoch_secs() >= claims.exp {
        return Err(VerifyError::Expired);
    }
    Ok(claims)
}

/// Mint a refresh token, returning both the token string and the
/// `token_id` the caller must persist for rotate-on-use revocation.
pub fn mint_refresh(keys: &KeyRing, user_id: &str) -> (String, String) {
    let token_id = new_nonce();
    let claims = RefreshClaims {
        user_id: user_id.to_owned(),
        token_id: token_id.clone(),
        exp: epoch_secs() + REFRESH_TOKEN_TTL_SECS,
    };
    (encode(keys, &claims), token_id)
}

pub fn verify_refresh(keys: &KeyRing, token: &str) -> Result<RefreshClaims, VerifyError> {
    let claims: RefreshClaims = decode(keys, token)?;
    if epoch_secs() >= claims.exp {
        return Err(VerifyError::Expired);
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
    fn access_round_trip() -> Result<(), VerifyError> {
        let keys = keys();
        let token = mint_access(&keys, "u_1");
        let claims = verify_access(&keys, &token)?;
        assert_eq!(claims.user_id, "u_1");
        Ok(())
    }

    #[test]
    fn refresh_round_trip_carries_token_id() -> Result<(), VerifyError> {
        let keys = keys();
        let (token, token_id) = mint_refresh(&keys, "u_1");
        let claims = verify_refresh(&keys, &token)?;
        assert_eq!(claims.token_id, token_id);
        assert_eq!(claims.user_id, "u_1");
        Ok(())
    }

    #[test]
    fn tampered_token_rejected() {
        let keys = keys();
        let mut token = mint_access(&keys, "u_1");
        token.push('x');
        assert_eq!(verify_access(&keys, &token), Err(VerifyError::BadSignature));
    }
}
