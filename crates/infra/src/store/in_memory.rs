use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use stockledger_core::{ExpectedVersion, MovementId, ProductId, TenantId};
use stockledger_inventory::{LedgerEntry, MovementRecord, StockKey, StockRecord};

use super::r#trait::{CommittedMovement, MovementCommit, StockStore, StoreError};

#[derive(Debug, Default)]
struct State {
    stock: HashMap<StockKey, StockRecord>,
    movements: HashMap<MovementId, MovementRecord>,
    ledgers: HashMap<StockKey, Vec<LedgerEntry>>,
    ledger_counters: HashMap<StockKey, u64>,
    movement_counters: HashMap<TenantId, u64>,
    idempotency: HashMap<(TenantId, String), MovementId>,
}

impl State {
    fn committed(&self, movement_id: MovementId) -> Option<CommittedMovement> {
        let movement = self.movements.get(&movement_id)?;
        let key = StockKey::new(movement.tenant_id, movement.product_id, movement.warehouse_id);
        let ledger_entry = self
            .ledgers
            .get(&key)?
            .iter()
            .find(|e| e.movement_id == movement_id)?;
        let stock = self.stock.get(&key)?;

        Some(CommittedMovement {
            movement: movement.clone(),
            ledger_entry: ledger_entry.clone(),
            stock: stock.clone(),
        })
    }
}

/// In-memory stock store.
///
/// Intended for tests/dev. A single lock guards all collections, which makes
/// `commit` trivially atomic.
#[derive(Debug, Default)]
pub struct InMemoryStockStore {
    state: RwLock<State>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

impl StockStore for InMemoryStockStore {
    fn get_stock(&self, key: &StockKey) -> Result<Option<StockRecord>, StoreError> {
        Ok(self.read()?.stock.get(key).cloned())
    }

    fn list_product_stock(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Vec<StockRecord>, StoreError> {
        let state = self.read()?;
        let mut records: Vec<StockRecord> = state
            .stock
            .values()
            .filter(|s| s.key.tenant_id == tenant_id && s.key.product_id == product_id)
            .cloned()
            .collect();
        records.sort_by_key(|s| s.key.warehouse_id);
        Ok(records)
    }

    fn get_movement(
        &self,
        tenant_id: TenantId,
        movement_id: MovementId,
    ) -> Result<Option<MovementRecord>, StoreError> {
        Ok(self
            .read()?
            .movements
            .get(&movement_id)
            .filter(|m| m.tenant_id == tenant_id)
            .cloned())
    }

    fn list_movements(&self, key: &StockKey) -> Result<Vec<MovementRecord>, StoreError> {
        let state = self.read()?;
        // The key's ledger is in commit order; each entry names its movement.
        let movements: Vec<MovementRecord> = state
            .ledgers
            .get(key)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| state.movements.get(&e.movement_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(movements)
    }

    fn find_by_idempotency_key(
        &self,
        tenant_id: TenantId,
        key: &str,
    ) -> Result<Option<CommittedMovement>, StoreError> {
        let state = self.read()?;
        Ok(state
            .idempotency
            .get(&(tenant_id, key.to_string()))
            .and_then(|id| state.committed(*id)))
    }

    fn next_movement_counter(&self, tenant_id: TenantId) -> Result<u64, StoreError> {
        let mut state = self.write()?;
        let counter = state.movement_counters.entry(tenant_id).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    fn load_ledger(&self, key: &StockKey) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self.read()?.ledgers.get(key).cloned().unwrap_or_default())
    }

    fn commit(
        &self,
        commit: MovementCommit,
        expected_version: ExpectedVersion,
    ) -> Result<CommittedMovement, StoreError> {
        let MovementCommit {
            movement,
            ledger,
            mut stock,
            reverses,
        } = commit;
        let key = stock.key;
        let tenant_id = key.tenant_id;

        if movement.tenant_id != tenant_id || ledger.key != key {
            return Err(StoreError::TenantIsolation(format!(
                "movement {} does not belong to stock key {key}",
                movement.id
            )));
        }

        let mut state = self.write()?;

        // Validate everything before the first mutation.
        let current_version = state.stock.get(&key).map(|s| s.version).unwrap_or(0);
        expected_version
            .check(current_version)
            .map_err(|e| StoreError::Concurrency(format!("stock {key}: {e}")))?;

        if let Some(idem) = &movement.idempotency_key {
            if state.idempotency.contains_key(&(tenant_id, idem.clone())) {
                return Err(StoreError::DuplicateIdempotencyKey(idem.clone()));
            }
        }

        if let Some((original_id, _)) = &reverses {
            match state.movements.get(original_id) {
                Some(original) if original.tenant_id != tenant_id => {
                    return Err(StoreError::MovementNotFound(*original_id));
                }
                Some(original) if original.is_reversed() => {
                    return Err(StoreError::AlreadyReversed(*original_id));
                }
                Some(_) => {}
                None => return Err(StoreError::MovementNotFound(*original_id)),
            }
        }

        // Per-key sequence counter, advanced under the same lock as the writes.
        let counter = state.ledger_counters.entry(key).or_insert(0);
        *counter += 1;
        let ledger_entry = ledger.into_entry(*counter);

        stock.version = current_version + 1;

        if let Some(idem) = &movement.idempotency_key {
            state.idempotency.insert((tenant_id, idem.clone()), movement.id);
        }
        if let Some((original_id, info)) = reverses {
            if let Some(original) = state.movements.get_mut(&original_id) {
                original.reversal = Some(info);
            }
        }
        state.movements.insert(movement.id, movement.clone());
        state
            .ledgers
            .entry(key)
            .or_default()
            .push(ledger_entry.clone());
        state.stock.insert(key, stock.clone());

        Ok(CommittedMovement {
            movement,
            ledger_entry,
            stock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use stockledger_core::{UserId, WarehouseId};
    use stockledger_inventory::{
        Actor, DocumentReference, ItemInfo, LedgerDraft, MovementType, ReversalInfo,
        plan_movement,
    };

    fn test_key() -> StockKey {
        StockKey::new(TenantId::new(), ProductId::new(), WarehouseId::new())
    }

    fn actor() -> Actor {
        Actor::new(UserId::new(), "store-test")
    }

    fn build_commit(
        store: &InMemoryStockStore,
        key: StockKey,
        t: MovementType,
        qty: Decimal,
    ) -> (MovementCommit, ExpectedVersion) {
        let current = store.get_stock(&key).unwrap();
        let plan = plan_movement(current.as_ref(), t, qty, dec!(2)).unwrap();
        let now = Utc::now();
        let movement = MovementRecord {
            id: MovementId::new(),
            tenant_id: key.tenant_id,
            movement_number: "MV-TEST".to_string(),
            movement_type: t,
            direction: plan.direction,
            product_id: key.product_id,
            product_name: String::new(),
            sku: String::new(),
            warehouse_id: key.warehouse_id,
            warehouse_name: String::new(),
            quantity: qty,
            quantity_change: plan.quantity_change,
            unit_cost: dec!(2),
            total_cost: plan.total_cost,
            previous_quantity: plan.previous_quantity,
            new_quantity: plan.new_quantity,
            previous_avg_cost: plan.previous_avg_cost,
            new_avg_cost: plan.new_avg_cost,
            reference: DocumentReference::default(),
            batch_id: None,
            bin_location_id: None,
            notes: String::new(),
            idempotency_key: None,
            created_at: now,
            created_by: actor(),
            reversal: None,
        };
        let ledger = LedgerDraft::for_movement(key, &movement, &plan);
        let stock = StockRecord::after_movement(
            current.as_ref(),
            key,
            &ItemInfo::default(),
            &plan,
            movement.id,
            t,
            now,
        );
        let expected = current.map_or(ExpectedVersion::Absent, |s| ExpectedVersion::Exact(s.version));
        (
            MovementCommit {
                movement,
                ledger,
                stock,
                reverses: None,
            },
            expected,
        )
    }

    #[test]
    fn commit_assigns_sequence_and_version() {
        let store = InMemoryStockStore::new();
        let key = test_key();

        let (c1, v1) = build_commit(&store, key, MovementType::OpeningStock, dec!(10));
        let first = store.commit(c1, v1).unwrap();
        assert_eq!(first.ledger_entry.sequence, 1);
        assert_eq!(first.stock.version, 1);

        let (c2, v2) = build_commit(&store, key, MovementType::SalesIssue, dec!(4));
        let second = store.commit(c2, v2).unwrap();
        assert_eq!(second.ledger_entry.sequence, 2);
        assert_eq!(second.stock.version, 2);
        assert_eq!(second.stock.quantity, dec!(6));

        let ledger = store.load_ledger(&key).unwrap();
        assert_eq!(
            ledger.iter().map(|e| e.sequence).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn stale_version_is_rejected_without_writes() {
        let store = InMemoryStockStore::new();
        let key = test_key();

        let (c1, v1) = build_commit(&store, key, MovementType::OpeningStock, dec!(10));
        let (stale, stale_version) = build_commit(&store, key, MovementType::GrnReceipt, dec!(5));
        store.commit(c1, v1).unwrap();

        let stale_id = stale.movement.id;
        let err = store.commit(stale, stale_version).unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));
        assert!(store.get_movement(key.tenant_id, stale_id).unwrap().is_none());
        assert_eq!(store.load_ledger(&key).unwrap().len(), 1);
        assert_eq!(store.get_stock(&key).unwrap().unwrap().quantity, dec!(10));
    }

    #[test]
    fn reversal_linkage_is_written_once() {
        let store = InMemoryStockStore::new();
        let key = test_key();

        let (c1, v1) = build_commit(&store, key, MovementType::OpeningStock, dec!(10));
        let original = store.commit(c1, v1).unwrap().movement;

        let link = |id: MovementId| ReversalInfo {
            reversal_movement_id: id,
            reason: "typo".to_string(),
            reversed_by: actor(),
            reversed_at: Utc::now(),
        };

        let (mut c2, v2) = build_commit(&store, key, MovementType::AdjustmentMinus, dec!(10));
        c2.reverses = Some((original.id, link(c2.movement.id)));
        store.commit(c2, v2).unwrap();

        let marked = store.get_movement(key.tenant_id, original.id).unwrap().unwrap();
        assert!(marked.is_reversed());

        let (mut c3, v3) = build_commit(&store, key, MovementType::AdjustmentPlus, dec!(10));
        c3.reverses = Some((original.id, link(c3.movement.id)));
        assert_eq!(
            store.commit(c3, v3).unwrap_err(),
            StoreError::AlreadyReversed(original.id)
        );
        assert_eq!(store.load_ledger(&key).unwrap().len(), 2);
    }

    #[test]
    fn movements_are_tenant_scoped() {
        let store = InMemoryStockStore::new();
        let key = test_key();

        let (c1, v1) = build_commit(&store, key, MovementType::OpeningStock, dec!(1));
        let id = store.commit(c1, v1).unwrap().movement.id;

        assert!(store.get_movement(key.tenant_id, id).unwrap().is_some());
        assert!(store.get_movement(TenantId::new(), id).unwrap().is_none());
    }

    #[test]
    fn movement_log_follows_commit_order() {
        let store = InMemoryStockStore::new();
        let key = test_key();

        // Past the six-digit counter width the number gains a digit, so the
        // later number sorts first as a string.
        let mut numbers = Vec::new();
        for number in ["MV-2026999999", "MV-20261000000"] {
            let (mut commit, version) = build_commit(&store, key, MovementType::GrnReceipt, dec!(1));
            commit.movement.movement_number = number.to_string();
            store.commit(commit, version).unwrap();
            numbers.push(number.to_string());
        }

        let listed: Vec<String> = store
            .list_movements(&key)
            .unwrap()
            .into_iter()
            .map(|m| m.movement_number)
            .collect();
        assert_eq!(listed, numbers);
        assert!(store.list_movements(&test_key()).unwrap().is_empty());
    }

    #[test]
    fn movement_counters_are_per_tenant() {
        let store = InMemoryStockStore::new();
        let (a, b) = (TenantId::new(), TenantId::new());
        assert_eq!(store.next_movement_counter(a).unwrap(), 1);
        assert_eq!(store.next_movement_counter(a).unwrap(), 2);
        assert_eq!(store.next_movement_counter(b).unwrap(), 1);
    }
}
