//! Read-only queries. Only `replay_ledger` takes the key mutex, so that the
//! ledger and the stock record it is checked against come from one snapshot.

use stockledger_core::{MovementId, ProductId, TenantId};
use stockledger_inventory::{
    LedgerEntry, LedgerReplay, MovementRecord, ProductStockSummary, StockKey, StockRecord,
};

use super::{EngineError, StockEngine};
use crate::locks::acquire;
use crate::store::StockStore;

impl<S> StockEngine<S>
where
    S: StockStore,
{
    /// Totals for one product across all warehouses of the tenant.
    pub fn get_product_stock_summary(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<ProductStockSummary, EngineError> {
        let records = self.store.list_product_stock(tenant_id, product_id)?;
        Ok(ProductStockSummary::from_records(product_id, &records)?)
    }

    pub fn get_stock(&self, key: &StockKey) -> Result<Option<StockRecord>, EngineError> {
        Ok(self.store.get_stock(key)?)
    }

    pub fn get_movement(
        &self,
        tenant_id: TenantId,
        movement_id: MovementId,
    ) -> Result<MovementRecord, EngineError> {
        self.store
            .get_movement(tenant_id, movement_id)?
            .ok_or(EngineError::NotFound(movement_id))
    }

    /// Movement log of a key, oldest first.
    pub fn movements_for(&self, key: &StockKey) -> Result<Vec<MovementRecord>, EngineError> {
        Ok(self.store.list_movements(key)?)
    }

    /// Ledger of a key, ascending by sequence.
    pub fn ledger_for(&self, key: &StockKey) -> Result<Vec<LedgerEntry>, EngineError> {
        Ok(self.store.load_ledger(key)?)
    }

    /// Rebuild a key's position from its ledger alone and check it against the stock record.
    pub fn replay_ledger(&self, key: &StockKey) -> Result<LedgerReplay, EngineError> {
        let lock = self.locks.lock_for(*key);
        let _guard = acquire(&lock);

        let entries = self.store.load_ledger(key)?;
        let stock = self.store.get_stock(key)?;
        let replay = LedgerReplay::from_entries(&entries)?;
        replay.verify_against(stock.as_ref())?;
        Ok(replay)
    }
}
