//! Reversal of a prior movement.
//!
//! History is never edited: a reversal is a new, fully audited compensating
//! movement (an IN adjustment for an original OUT and vice versa), and the
//! original is linked to it in the same commit. The reversal movement lives on
//! the same key as the original, so the key mutex also serialises two
//! competing reversals of one movement.

use tracing::{info, warn};

use stockledger_core::{MovementId, TenantId};
use stockledger_inventory::{Actor, DocumentReference, ItemInfo, StockKey};

use super::{EngineError, MovementOutcome, MovementParams, ReversalLink, StockEngine};
use crate::locks::acquire;
use crate::store::StockStore;

pub const REVERSAL_DOC_TYPE: &str = "reversal";

impl<S> StockEngine<S>
where
    S: StockStore,
{
    pub fn reverse_stock_movement(
        &self,
        tenant_id: TenantId,
        movement_id: MovementId,
        reason: impl Into<String>,
        actor: Actor,
    ) -> Result<MovementOutcome, EngineError> {
        let reason = reason.into();

        let located = self
            .store
            .get_movement(tenant_id, movement_id)?
            .ok_or(EngineError::NotFound(movement_id))?;
        let key = StockKey::new(tenant_id, located.product_id, located.warehouse_id);

        let lock = self.locks.lock_for(key);
        let _guard = acquire(&lock);

        // Re-read under the key mutex; the first read only located the key.
        let original = self
            .store
            .get_movement(tenant_id, movement_id)?
            .ok_or(EngineError::NotFound(movement_id))?;
        if original.is_reversed() {
            warn!(movement_id = %movement_id, "movement has already been reversed");
            return Err(EngineError::AlreadyReversed(movement_id));
        }

        let reversal_type = original.movement_type.compensating();
        let mut params = MovementParams::new(
            tenant_id,
            original.product_id,
            original.warehouse_id,
            reversal_type,
            original.quantity,
            actor,
        )
        .with_unit_cost(original.unit_cost)
        .with_item(ItemInfo {
            product_name: original.product_name.clone(),
            sku: original.sku.clone(),
            warehouse_name: original.warehouse_name.clone(),
        })
        .with_reference(DocumentReference::new(
            REVERSAL_DOC_TYPE,
            movement_id.to_string(),
            format!("{}-{}", self.config.reversal_prefix, original.movement_number),
        ))
        .with_notes(format!("Reversal: {reason}"));
        params.batch_id = original.batch_id.clone();
        params.bin_location_id = original.bin_location_id.clone();

        let outcome = self.apply_locked(
            params,
            Some(ReversalLink {
                original_id: movement_id,
                reason,
            }),
        )?;

        info!(
            original = %original.movement_number,
            reversal = %outcome.movement.movement_number,
            reversal_type = %reversal_type,
            "stock movement reversed"
        );
        Ok(outcome)
    }
}
