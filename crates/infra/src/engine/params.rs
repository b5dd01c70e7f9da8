use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{ProductId, TenantId, WarehouseId};
use stockledger_inventory::{
    Actor, DocumentReference, ItemInfo, LedgerEntry, MovementPlan, MovementRecord, MovementType,
    StockKey, StockRecord,
};

use crate::store::CommittedMovement;

/// Input of a single stock movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementParams {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    #[serde(default)]
    pub item: ItemInfo,
    pub movement_type: MovementType,
    /// Must be strictly positive.
    pub quantity: Decimal,
    #[serde(default)]
    pub unit_cost: Decimal,
    #[serde(default)]
    pub reference: DocumentReference,
    #[serde(default)]
    pub notes: String,
    pub actor: Actor,
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub bin_location_id: Option<String>,
    /// Caller-supplied token; resubmitting it returns the first outcome instead of moving stock twice.
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl MovementParams {
    pub fn new(
        tenant_id: TenantId,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        movement_type: MovementType,
        quantity: Decimal,
        actor: Actor,
    ) -> Self {
        Self {
            tenant_id,
            product_id,
            warehouse_id,
            item: ItemInfo::default(),
            movement_type,
            quantity,
            unit_cost: Decimal::ZERO,
            reference: DocumentReference::default(),
            notes: String::new(),
            actor,
            batch_id: None,
            bin_location_id: None,
            idempotency_key: None,
        }
    }

    pub fn key(&self) -> StockKey {
        StockKey::new(self.tenant_id, self.product_id, self.warehouse_id)
    }

    pub fn with_unit_cost(mut self, unit_cost: Decimal) -> Self {
        self.unit_cost = unit_cost;
        self
    }

    pub fn with_item(mut self, item: ItemInfo) -> Self {
        self.item = item;
        self
    }

    pub fn with_reference(mut self, reference: DocumentReference) -> Self {
        self.reference = reference;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_batch(mut self, batch_id: impl Into<String>) -> Self {
        self.batch_id = Some(batch_id.into());
        self
    }

    pub fn with_bin_location(mut self, bin_location_id: impl Into<String>) -> Self {
        self.bin_location_id = Some(bin_location_id.into());
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Result of a committed (or idempotently replayed) movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovementOutcome {
    pub movement: MovementRecord,
    pub ledger_entry: LedgerEntry,
    pub stock: StockRecord,
    /// Before/after quantity and average cost.
    pub summary: MovementPlan,
    /// `true` when an idempotency key matched an earlier movement and nothing was applied.
    pub replayed: bool,
}

impl MovementOutcome {
    pub(crate) fn committed(committed: CommittedMovement) -> Self {
        Self::from_parts(committed, false)
    }

    pub(crate) fn replayed(committed: CommittedMovement) -> Self {
        Self::from_parts(committed, true)
    }

    fn from_parts(committed: CommittedMovement, replayed: bool) -> Self {
        let summary = MovementPlan::recorded(&committed.movement, &committed.ledger_entry);
        Self {
            movement: committed.movement,
            ledger_entry: committed.ledger_entry,
            stock: committed.stock,
            summary,
            replayed,
        }
    }
}
