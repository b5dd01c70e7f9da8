use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{MovementId, ProductId, TenantId, WarehouseId};

use crate::error::StockError;
use crate::movement::MovementType;
use crate::plan::MovementPlan;

/// Identity of a stock position: one product in one warehouse of one tenant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
}

impl StockKey {
    pub fn new(tenant_id: TenantId, product_id: ProductId, warehouse_id: WarehouseId) -> Self {
        Self {
            tenant_id,
            product_id,
            warehouse_id,
        }
    }
}

impl core::fmt::Display for StockKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}@{}", self.tenant_id, self.product_id, self.warehouse_id)
    }
}

/// Descriptive fields denormalised onto stock, movement and ledger records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    pub product_name: String,
    pub sku: String,
    pub warehouse_name: String,
}

/// Current on-hand position for a [`StockKey`].
///
/// Created on the first movement for a key, never deleted (only zeroed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub key: StockKey,
    pub product_name: String,
    pub sku: String,
    pub warehouse_name: String,

    pub quantity: Decimal,
    /// Soft holds owned by the reservation workflow; never written by movements.
    pub reserved_quantity: Decimal,
    pub average_unit_cost: Decimal,

    pub last_movement_id: Option<MovementId>,
    pub last_movement_type: Option<MovementType>,
    pub last_movement_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Optimistic concurrency token; `0` means "not yet persisted".
    pub version: u64,
}

impl StockRecord {
    pub fn available_quantity(&self) -> Decimal {
        self.quantity - self.reserved_quantity
    }

    pub fn valued_stock(&self) -> Result<Decimal, StockError> {
        self.quantity
            .checked_mul(self.average_unit_cost)
            .ok_or(StockError::Overflow("stock value"))
    }

    /// State of the record after `plan` has been applied by `movement_id`.
    ///
    /// The version is left untouched; the store bumps it on commit.
    pub fn after_movement(
        current: Option<&StockRecord>,
        key: StockKey,
        item: &ItemInfo,
        plan: &MovementPlan,
        movement_id: MovementId,
        movement_type: MovementType,
        at: DateTime<Utc>,
    ) -> StockRecord {
        match current {
            Some(existing) => StockRecord {
                quantity: plan.new_quantity,
                average_unit_cost: plan.new_avg_cost,
                last_movement_id: Some(movement_id),
                last_movement_type: Some(movement_type),
                last_movement_at: Some(at),
                updated_at: at,
                ..existing.clone()
            },
            None => StockRecord {
                key,
                product_name: item.product_name.clone(),
                sku: item.sku.clone(),
                warehouse_name: item.warehouse_name.clone(),
                quantity: plan.new_quantity,
                reserved_quantity: Decimal::ZERO,
                average_unit_cost: plan.new_avg_cost,
                last_movement_id: Some(movement_id),
                last_movement_type: Some(movement_type),
                last_movement_at: Some(at),
                created_at: at,
                updated_at: at,
                version: 0,
            },
        }
    }
}
