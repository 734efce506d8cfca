// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-tenant mutex registry: serializes lifecycle operations against a
//! single tenant while letting independent tenants run concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

#[derive(Default)]
pub struct TenantLocks {
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl TenantLocks {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lock_for(&self, tenant_id: &str) -> Arc<Mutex<()>> {
        {
            let locks = self.locks.read().await;
            if let Some(lock) = locks.get(tenant_id) {
                return Arc::clone(lock);
            }
        }
        let mut locks = self.locks.write().await;
        Arc::clone(locks.entry(tenant_id.to_owned()).or_insert_with(|| Arc::new(Mutex::new(()))))
    }

    /// Acquire the per-tenant lock for the duration of the returned guard.
    /// Entries are never pruned — tenants are long-lived, so the map only
    /// grows, never shrinks under a live tenant.
    pub async fn acquire(&self, tenant_id: &str) -> OwnedMutexGuard<()> {
        let lock = self.lock_for(tenant_id).await;
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_tenant_serializes() {
        let locks = Arc::new(TenantLocks::new());
        let order = Arc::new(tokio::sync::Mutex::new(Vec::new()));

        let guard1 = locks.acquire("t_1").await;

        let locks2 = Arc::clone(&locks);
        let order2 = Arc::clone(&order);
        let second = tokio::spawn(async move {
            let _g = locks2.acquire("t_1").await;
            order2.lock().await.push(2);
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        order.lock().await.push(1);
        drop(guard1);
        second.await.expect("task join");

        assert_eq!(*order.lock().await, vec![1, 2]);
    }

    #[tokio::test]
    async fn different_tenants_do_not_block() {
        let locks = TenantLocks::new();
        let _a = locks.acquire("t_1").await;
        let timed = tokio::time::timeout(Duration::from_millis(50), locks.acquire("t_2")).await;
        assert!(timed.is_ok());
    }
}
