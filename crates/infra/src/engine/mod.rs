//! Stock movement engine.
//!
//! Every change to on-hand stock funnels through [`StockEngine::create_stock_movement`],
//! the sole writer of stock records, movement records and ledger entries.
//! Bulk application and reversal are thin wrappers around it.
//!
//! ## Movement Pipeline
//!
//! ```text
//! MovementParams
//!   ↓
//! 1. Acquire the per-key mutex (tenant, product, warehouse)
//!   ↓
//! 2. Idempotency check (replay an earlier outcome for a reused key)
//!   ↓
//! 3. Read the current stock record (absent = quantity 0, cost 0)
//!   ↓
//! 4. Plan (pure: direction, insufficient-stock check, moving-average cost)
//!   ↓
//! 5. Commit movement + ledger draft + stock upsert atomically, guarded by the
//!    record version; the store assigns the ledger sequence
//! ```
//!
//! A rejected plan performs no write. A version conflict (another writer outside
//! this process) re-reads and re-plans, up to `max_conflict_retries` times.

mod bulk;
mod params;
mod query;
mod reversal;

pub use bulk::{BulkCommon, BulkItemError, BulkMovementItem, BulkOutcome};
pub use params::{MovementOutcome, MovementParams};

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use stockledger_core::{ExpectedVersion, MovementId};
use stockledger_inventory::{
    LedgerDraft, MovementRecord, ReversalInfo, StockError, StockRecord, format_movement_number,
    plan_movement,
};

use crate::config::EngineConfig;
use crate::locks::{KeyLocks, acquire};
use crate::store::{CommittedMovement, MovementCommit, StockStore, StoreError};

/// Caller-facing error taxonomy of the engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Unknown movement type name or code (caller bug, not retried).
    #[error("invalid movement type: {0}")]
    InvalidMovementType(String),

    /// Outbound quantity exceeds on-hand stock (business rule, surfaced to the user).
    #[error("insufficient stock: available {available}, required {requested}")]
    InsufficientStock {
        available: Decimal,
        requested: Decimal,
    },

    /// Reversal target does not exist (for this tenant).
    #[error("movement not found: {0}")]
    NotFound(MovementId),

    #[error("movement {0} has already been reversed")]
    AlreadyReversed(MovementId),

    #[error("validation failed: {0}")]
    Validation(String),

    /// Optimistic concurrency retries were exhausted.
    #[error("concurrent modification: {0}")]
    Concurrency(String),

    #[error("ledger inconsistent at sequence {sequence}: {detail}")]
    LedgerInconsistent { sequence: u64, detail: String },

    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StockError> for EngineError {
    fn from(value: StockError) -> Self {
        match value {
            StockError::InvalidMovementType(t) => EngineError::InvalidMovementType(t),
            StockError::InsufficientStock {
                available,
                requested,
            } => EngineError::InsufficientStock {
                available,
                requested,
            },
            StockError::Validation(msg) => EngineError::Validation(msg),
            e @ StockError::Overflow(_) => EngineError::Validation(e.to_string()),
            StockError::LedgerInconsistent { sequence, detail } => {
                EngineError::LedgerInconsistent { sequence, detail }
            }
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Concurrency(msg) => EngineError::Concurrency(msg),
            StoreError::MovementNotFound(id) => EngineError::NotFound(id),
            StoreError::AlreadyReversed(id) => EngineError::AlreadyReversed(id),
            other => EngineError::Store(other),
        }
    }
}

/// Compensation request carried into the commit of a reversal movement.
#[derive(Debug, Clone)]
pub(crate) struct ReversalLink {
    pub original_id: MovementId,
    pub reason: String,
}

/// The perpetual-inventory movement engine.
///
/// Generic over the store so tests run against `InMemoryStockStore` and
/// production against any backend implementing `StockStore`.
#[derive(Debug)]
pub struct StockEngine<S> {
    store: S,
    locks: KeyLocks,
    config: EngineConfig,
}

impl<S> StockEngine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self {
            store,
            locks: KeyLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> StockEngine<S>
where
    S: StockStore,
{
    /// Apply one stock movement and return the movement, ledger entry,
    /// updated stock and a before/after summary.
    pub fn create_stock_movement(
        &self,
        params: MovementParams,
    ) -> Result<MovementOutcome, EngineError> {
        let lock = self.locks.lock_for(params.key());
        let _guard = acquire(&lock);
        self.apply_locked(params, None)
    }

    /// Body of a movement; the caller must hold the key's mutex.
    pub(crate) fn apply_locked(
        &self,
        params: MovementParams,
        reverses: Option<ReversalLink>,
    ) -> Result<MovementOutcome, EngineError> {
        let key = params.key();

        if let Some(idem) = &params.idempotency_key {
            if let Some(prior) = self.store.find_by_idempotency_key(key.tenant_id, idem)? {
                return replay_prior(&params, idem, prior);
            }
        }

        let mut attempt: u32 = 0;
        loop {
            let current = self.store.get_stock(&key)?;
            let plan = plan_movement(
                current.as_ref(),
                params.movement_type,
                params.quantity,
                params.unit_cost,
            )
            .inspect_err(|e| {
                warn!(
                    key = %key,
                    movement_type = %params.movement_type,
                    quantity = %params.quantity,
                    error = %e,
                    "stock movement rejected"
                );
            })?;
            let expected = current
                .as_ref()
                .map_or(ExpectedVersion::Absent, |s| ExpectedVersion::Exact(s.version));

            let now = Utc::now();
            let counter = self.store.next_movement_counter(key.tenant_id)?;
            let movement = MovementRecord {
                id: MovementId::new(),
                tenant_id: key.tenant_id,
                movement_number: format_movement_number(&self.config.movement_prefix, now, counter),
                movement_type: params.movement_type,
                direction: plan.direction,
                product_id: key.product_id,
                product_name: params.item.product_name.clone(),
                sku: params.item.sku.clone(),
                warehouse_id: key.warehouse_id,
                warehouse_name: params.item.warehouse_name.clone(),
                quantity: params.quantity,
                quantity_change: plan.quantity_change,
                unit_cost: params.unit_cost,
                total_cost: plan.total_cost,
                previous_quantity: plan.previous_quantity,
                new_quantity: plan.new_quantity,
                previous_avg_cost: plan.previous_avg_cost,
                new_avg_cost: plan.new_avg_cost,
                reference: params.reference.clone(),
                batch_id: params.batch_id.clone(),
                bin_location_id: params.bin_location_id.clone(),
                notes: params.notes.clone(),
                idempotency_key: params.idempotency_key.clone(),
                created_at: now,
                created_by: params.actor.clone(),
                reversal: None,
            };
            let ledger = LedgerDraft::for_movement(key, &movement, &plan);
            let stock = StockRecord::after_movement(
                current.as_ref(),
                key,
                &params.item,
                &plan,
                movement.id,
                params.movement_type,
                now,
            );
            let reverses = reverses.as_ref().map(|link| {
                (
                    link.original_id,
                    ReversalInfo {
                        reversal_movement_id: movement.id,
                        reason: link.reason.clone(),
                        reversed_by: params.actor.clone(),
                        reversed_at: now,
                    },
                )
            });

            let commit = MovementCommit {
                movement,
                ledger,
                stock,
                reverses,
            };

            match self.store.commit(commit, expected) {
                Ok(committed) => {
                    info!(
                        movement_number = %committed.movement.movement_number,
                        movement_type = %committed.movement.movement_type,
                        key = %key,
                        sequence = committed.ledger_entry.sequence,
                        previous_quantity = %plan.previous_quantity,
                        new_quantity = %plan.new_quantity,
                        "stock movement committed"
                    );
                    return Ok(MovementOutcome::committed(committed));
                }
                Err(StoreError::Concurrency(msg)) if attempt < self.config.max_conflict_retries => {
                    attempt += 1;
                    debug!(key = %key, attempt, conflict = %msg, "retrying stock movement after conflict");
                }
                Err(StoreError::DuplicateIdempotencyKey(idem)) => {
                    // Another writer registered the key between our check and commit.
                    return match self.store.find_by_idempotency_key(key.tenant_id, &idem)? {
                        Some(prior) => replay_prior(&params, &idem, prior),
                        None => Err(EngineError::Store(StoreError::DuplicateIdempotencyKey(idem))),
                    };
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Replay the movement registered under `idem`, provided it was made for the same request.
fn replay_prior(
    params: &MovementParams,
    idem: &str,
    prior: CommittedMovement,
) -> Result<MovementOutcome, EngineError> {
    let movement = &prior.movement;
    let same_request = movement.product_id == params.product_id
        && movement.warehouse_id == params.warehouse_id
        && movement.movement_type == params.movement_type
        && movement.quantity == params.quantity;
    if !same_request {
        warn!(
            idempotency_key = %idem,
            movement_number = %movement.movement_number,
            "idempotency key reused for a different movement"
        );
        return Err(EngineError::Validation(format!(
            "idempotency key {idem} already used by movement {} with different parameters",
            movement.movement_number
        )));
    }

    debug!(idempotency_key = %idem, movement_id = %movement.id, "replaying earlier movement");
    Ok(MovementOutcome::replayed(prior))
}
