//! Bulk application of movements sharing one business document.
//!
//! Policy: **continue on error**. Items are applied one at a time, in order;
//! a failing item is reported in `errors` and never rolls back items already
//! applied. A multi-line document can therefore end up partially applied, and
//! `success` is `true` only when every item went through.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use stockledger_core::{ProductId, TenantId, WarehouseId};
use stockledger_inventory::{Actor, DocumentReference, ItemInfo, MovementType};

use super::{EngineError, MovementOutcome, MovementParams, StockEngine};
use crate::store::StockStore;

/// Parameters shared by every item of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkCommon {
    pub tenant_id: TenantId,
    pub movement_type: MovementType,
    /// Used for items that do not name their own warehouse.
    #[serde(default)]
    pub warehouse_id: Option<WarehouseId>,
    #[serde(default)]
    pub warehouse_name: String,
    #[serde(default)]
    pub reference: DocumentReference,
    #[serde(default)]
    pub notes: String,
    pub actor: Actor,
}

/// One line of a batch; set fields override the common parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkMovementItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub warehouse_id: Option<WarehouseId>,
    #[serde(default)]
    pub warehouse_name: Option<String>,
    #[serde(default)]
    pub movement_type: Option<MovementType>,
    pub quantity: Decimal,
    #[serde(default)]
    pub unit_cost: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub bin_location_id: Option<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl BulkMovementItem {
    pub fn new(product_id: ProductId, quantity: Decimal) -> Self {
        Self {
            product_id,
            product_name: String::new(),
            sku: String::new(),
            warehouse_id: None,
            warehouse_name: None,
            movement_type: None,
            quantity,
            unit_cost: Decimal::ZERO,
            notes: None,
            batch_id: None,
            bin_location_id: None,
            idempotency_key: None,
        }
    }

    pub fn with_unit_cost(mut self, unit_cost: Decimal) -> Self {
        self.unit_cost = unit_cost;
        self
    }

    pub fn with_warehouse(mut self, warehouse_id: WarehouseId) -> Self {
        self.warehouse_id = Some(warehouse_id);
        self
    }

    /// Merge with the batch parameters into a single movement request.
    fn to_params(&self, common: &BulkCommon) -> Result<MovementParams, EngineError> {
        let warehouse_id = self
            .warehouse_id
            .or(common.warehouse_id)
            .ok_or_else(|| EngineError::Validation("item has no warehouse".to_string()))?;

        let mut params = MovementParams::new(
            common.tenant_id,
            self.product_id,
            warehouse_id,
            self.movement_type.unwrap_or(common.movement_type),
            self.quantity,
            common.actor.clone(),
        )
        .with_unit_cost(self.unit_cost)
        .with_item(ItemInfo {
            product_name: self.product_name.clone(),
            sku: self.sku.clone(),
            warehouse_name: self
                .warehouse_name
                .clone()
                .unwrap_or_else(|| common.warehouse_name.clone()),
        })
        .with_reference(common.reference.clone())
        .with_notes(self.notes.clone().unwrap_or_else(|| common.notes.clone()));
        params.batch_id = self.batch_id.clone();
        params.bin_location_id = self.bin_location_id.clone();
        params.idempotency_key = self.idempotency_key.clone();
        Ok(params)
    }
}

/// A batch item that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemError {
    /// Position of the item in the submitted list.
    pub index: usize,
    pub item: BulkMovementItem,
    pub error: EngineError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkOutcome {
    /// `true` only if no item failed.
    pub success: bool,
    pub processed: usize,
    pub failed: usize,
    pub results: Vec<MovementOutcome>,
    pub errors: Vec<BulkItemError>,
}

impl<S> StockEngine<S>
where
    S: StockStore,
{
    pub fn create_bulk_stock_movement(
        &self,
        items: Vec<BulkMovementItem>,
        common: BulkCommon,
    ) -> BulkOutcome {
        let mut results = Vec::with_capacity(items.len());
        let mut errors = Vec::new();

        for (index, item) in items.into_iter().enumerate() {
            let applied = item
                .to_params(&common)
                .and_then(|params| self.create_stock_movement(params));
            match applied {
                Ok(outcome) => results.push(outcome),
                Err(error) => {
                    warn!(
                        index,
                        product_id = %item.product_id,
                        reference = %common.reference.doc_number,
                        error = %error,
                        "bulk item failed; continuing with remaining items"
                    );
                    errors.push(BulkItemError { index, item, error });
                }
            }
        }

        info!(
            reference = %common.reference.doc_number,
            processed = results.len(),
            failed = errors.len(),
            "bulk stock movement finished"
        );

        BulkOutcome {
            success: errors.is_empty(),
            processed: results.len(),
            failed: errors.len(),
            results,
            errors,
        }
    }
}
