use std::sync::Arc;

use thiserror::Error;

use stockledger_core::{ExpectedVersion, MovementId, ProductId, TenantId};
use stockledger_inventory::{
    LedgerDraft, LedgerEntry, MovementRecord, ReversalInfo, StockKey, StockRecord,
};

/// Everything one stock movement writes, committed as a single unit.
///
/// ## Commit Semantics
///
/// `StockStore::commit()`:
/// - Checks the stock record's version against `ExpectedVersion` (optimistic concurrency)
/// - Rejects a reused idempotency key
/// - Checks the reversal target exists and is not reversed yet (when `reverses` is set)
/// - Assigns the next ledger sequence for the key from the per-key counter
/// - Writes the movement, the ledger entry, the stock upsert and the reversal linkage
///
/// Either all of the above is persisted or none of it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementCommit {
    pub movement: MovementRecord,
    pub ledger: LedgerDraft,
    pub stock: StockRecord,
    /// Original movement compensated by this one, with the linkage to record on it.
    pub reverses: Option<(MovementId, ReversalInfo)>,
}

/// The persisted result of a commit (ledger sequence and stock version assigned).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedMovement {
    pub movement: MovementRecord,
    pub ledger_entry: LedgerEntry,
    pub stock: StockRecord,
}

/// Stock store operation error.
///
/// These are **infrastructure errors** (storage, concurrency, isolation) as
/// opposed to domain errors (validation, insufficient stock).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("idempotency key already used: {0}")]
    DuplicateIdempotencyKey(String),

    #[error("movement not found: {0}")]
    MovementNotFound(MovementId),

    #[error("movement already reversed: {0}")]
    AlreadyReversed(MovementId),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Tenant-scoped keyed store behind the movement engine.
///
/// The engine is the only writer; every write goes through `commit`.
///
/// ## Implementation Requirements
///
/// Implementations must:
/// - Enforce tenant isolation (a commit may only touch one tenant)
/// - Enforce optimistic concurrency on the stock record version
/// - Assign ledger sequences per key from an atomic counter (no gaps, no duplicates)
/// - Ensure atomicity of `commit`
pub trait StockStore: Send + Sync {
    fn get_stock(&self, key: &StockKey) -> Result<Option<StockRecord>, StoreError>;

    /// All stock records of one product across warehouses.
    fn list_product_stock(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Vec<StockRecord>, StoreError>;

    fn get_movement(
        &self,
        tenant_id: TenantId,
        movement_id: MovementId,
    ) -> Result<Option<MovementRecord>, StoreError>;

    /// Movement log of a key, oldest first.
    fn list_movements(&self, key: &StockKey) -> Result<Vec<MovementRecord>, StoreError>;

    /// The committed movement (with its ledger entry and current stock) registered under `key`.
    fn find_by_idempotency_key(
        &self,
        tenant_id: TenantId,
        key: &str,
    ) -> Result<Option<CommittedMovement>, StoreError>;

    /// Next value of the tenant's movement-number counter (starts at 1).
    fn next_movement_counter(&self, tenant_id: TenantId) -> Result<u64, StoreError>;

    /// Ledger of a key in ascending sequence order.
    fn load_ledger(&self, key: &StockKey) -> Result<Vec<LedgerEntry>, StoreError>;

    fn commit(
        &self,
        commit: MovementCommit,
        expected_version: ExpectedVersion,
    ) -> Result<CommittedMovement, StoreError>;
}

impl<S> StockStore for Arc<S>
where
    S: StockStore + ?Sized,
{
    fn get_stock(&self, key: &StockKey) -> Result<Option<StockRecord>, StoreError> {
        (**self).get_stock(key)
    }

    fn list_product_stock(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Vec<StockRecord>, StoreError> {
        (**self).list_product_stock(tenant_id, product_id)
    }

    fn get_movement(
        &self,
        tenant_id: TenantId,
        movement_id: MovementId,
    ) -> Result<Option<MovementRecord>, StoreError> {
        (**self).get_movement(tenant_id, movement_id)
    }

    fn list_movements(&self, key: &StockKey) -> Result<Vec<MovementRecord>, StoreError> {
        (**self).list_movements(key)
    }

    fn find_by_idempotency_key(
        &self,
        tenant_id: TenantId,
        key: &str,
    ) -> Result<Option<CommittedMovement>, StoreError> {
        (**self).find_by_idempotency_key(tenant_id, key)
    }

    fn next_movement_counter(&self, tenant_id: TenantId) -> Result<u64, StoreError> {
        (**self).next_movement_counter(tenant_id)
    }

    fn load_ledger(&self, key: &StockKey) -> Result<Vec<LedgerEntry>, StoreError> {
        (**self).load_ledger(key)
    }

    fn commit(
        &self,
        commit: MovementCommit,
        expected_version: ExpectedVersion,
    ) -> Result<CommittedMovement, StoreError> {
        (**self).commit(commit, expected_version)
    }
}
