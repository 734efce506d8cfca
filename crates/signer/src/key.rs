// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signing key loading with a minimum-length guard and rotation support.

use ring::hmac;
use thiserror::Error;

/// Minimum accepted raw key length in bytes. Below this, the process
/// should fail fast at startup rather than mint tokens with a weak key.
pub const MIN_KEY_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("signing key too short: {0} bytes (minimum {MIN_KEY_LEN})")]
    TooShort(usize),
}

/// A loaded HMAC signing/verifying key, with an optional previous key
/// accepted during a rotation grace period.
#[derive(Clone)]
pub struct KeyRing {
    current: hmac::Key,
    previous: Option<hmac::Key>,
}

impl KeyRing {
    /// Build a key ring from raw key bytes. Fails fast if `current` is
    /// below [`MIN_KEY_LEN`]; `previous`, if given, is not length-checked
    /// since it is being phased out, not newly adopted.
    pub fn new(current: &[u8], previous: Option<&[u8]>) -> Result<Self, KeyError> {
        if current.len() < MIN_KEY_LEN {
            return Err(KeyError::TooShort(current.len()));
        }
        Ok(Self {
            current: hmac::Key::new(hmac::HMAC_SHA256, current),
            previous: previous.map(|p| hmac::Key::new(hmac::HMAC_SHA256, p)),
        })
    }

    pub fn sign(&self, message: &[u8]) -> hmac::Tag {
        hmac::sign(&self.current, message)
    }

    /// Verify `sig` against `message` under the current key, falling back
    /// to the previous key if present. Returns true on any match.
    pub fn verify(&self, message: &[u8], sig: &[u8]) -> bool {
        if hmac::verify(&self.current, message, sig).is_ok() {
            return true;
        }
        if let Some(ref prev) = self.previous {
            return hmac::verify(prev, message, sig).is_ok();
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_key() {
        assert!(KeyRing::new(b"short", None).is_err());
    }

    #[test]
    fn accepts_previous_key_during_rotation() -> Result<(), KeyError> {
        let old = b"old-signing-key-0123456789";
        let new = b"new-signing-key-0123456789";
        let old_ring = KeyRing::new(old, None)?;
        let tag = old_ring.sign(b"hello");

        let rotated = KeyRing::new(new, Some(old))?;
        assert!(rotated.verify(b"hello", tag.as_ref()));

        let no_previous = KeyRing::new(new, None)?;
        assert!(!no_previous.verify(b"hello", tag.as_ref()));
        Ok(())
    }
}
