//! Per-key write serialisation.
//!
//! Every movement against a `StockKey` runs its read → plan → commit sequence
//! while holding that key's mutex, so two movements on the same position can
//! never compute from the same stale snapshot. Distinct keys proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use stockledger_inventory::StockKey;

/// Mutex table keyed by `StockKey`.
///
/// Entries are never evicted: the table holds one `Arc<Mutex<()>>` per key ever
/// written, growing at the same rate as the stock records themselves.
#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: RwLock<HashMap<StockKey, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutex for `key`, creating it on first use.
    pub fn lock_for(&self, key: StockKey) -> Arc<Mutex<()>> {
        {
            let locks = self.locks.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(lock) = locks.get(&key) {
                return lock.clone();
            }
        }

        let mut locks = self.locks.write().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Acquire a key mutex. The guarded value is `()`, so a poisoned lock carries
/// no broken state and is simply taken over.
pub fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockledger_core::{ProductId, TenantId, WarehouseId};

    #[test]
    fn same_key_shares_one_mutex() {
        let locks = KeyLocks::new();
        let key = StockKey::new(TenantId::new(), ProductId::new(), WarehouseId::new());
        let other = StockKey::new(key.tenant_id, key.product_id, WarehouseId::new());

        let a = locks.lock_for(key);
        let b = locks.lock_for(key);
        let c = locks.lock_for(other);

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
