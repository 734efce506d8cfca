// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque id generation. Tenant/user ids are stable strings, not exposed
//! database keys.

/// Generate a new tenant id of the form `t_<12 hex chars>`.
pub fn new_tenant_id() -> String {
    format!("t_{}", short_uuid())
}

/// Generate a new user id of the form `u_<12 hex chars>`.
pub fn new_user_id() -> String {
    format!("u_{}", short_uuid())
}

/// Generate a new opaque nonce/token id.
pub fn new_nonce() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn short_uuid() -> String {
    let s = uuid::Uuid::new_v4().simple().to_string();
    s[..12].to_owned()
}
