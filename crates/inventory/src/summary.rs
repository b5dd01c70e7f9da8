use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::ProductId;

use crate::error::StockError;
use crate::stock::StockRecord;

/// Aggregate stock position of one product across all of its warehouses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStockSummary {
    pub product_id: ProductId,
    pub total_quantity: Decimal,
    pub total_reserved: Decimal,
    pub total_available: Decimal,
    pub warehouse_count: u64,
    /// Quantity-weighted average unit cost (`total_value / total_quantity`).
    pub average_cost: Decimal,
    pub total_value: Decimal,
}

impl ProductStockSummary {
    pub fn empty(product_id: ProductId) -> Self {
        Self {
            product_id,
            total_quantity: Decimal::ZERO,
            total_reserved: Decimal::ZERO,
            total_available: Decimal::ZERO,
            warehouse_count: 0,
            average_cost: Decimal::ZERO,
            total_value: Decimal::ZERO,
        }
    }

    /// Fold the stock records of `product_id`; records for other products are ignored.
    pub fn from_records<'a>(
        product_id: ProductId,
        records: impl IntoIterator<Item = &'a StockRecord>,
    ) -> Result<Self, StockError> {
        let mut summary = Self::empty(product_id);

        for record in records
            .into_iter()
            .filter(|r| r.key.product_id == product_id)
        {
            summary.total_quantity = checked_sum(summary.total_quantity, record.quantity)?;
            summary.total_reserved =
                checked_sum(summary.total_reserved, record.reserved_quantity)?;
            summary.total_available =
                checked_sum(summary.total_available, record.available_quantity())?;
            summary.total_value = checked_sum(summary.total_value, record.valued_stock()?)?;
            summary.warehouse_count += 1;
        }

        if !summary.total_quantity.is_zero() {
            summary.average_cost = summary
                .total_value
                .checked_div(summary.total_quantity)
                .ok_or(StockError::Overflow("summary average cost"))?;
        }
        Ok(summary)
    }
}

fn checked_sum(total: Decimal, add: Decimal) -> Result<Decimal, StockError> {
    total
        .checked_add(add)
        .ok_or(StockError::Overflow("summary total"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use stockledger_core::{TenantId, WarehouseId};

    use crate::stock::StockKey;

    fn record(product_id: ProductId, qty: Decimal, reserved: Decimal, cost: Decimal) -> StockRecord {
        let now = Utc::now();
        StockRecord {
            key: StockKey::new(TenantId::new(), product_id, WarehouseId::new()),
            product_name: "Oak plank".to_string(),
            sku: "OAK-01".to_string(),
            warehouse_name: "Main".to_string(),
            quantity: qty,
            reserved_quantity: reserved,
            average_unit_cost: cost,
            last_movement_id: None,
            last_movement_type: None,
            last_movement_at: None,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    #[test]
    fn weights_average_cost_by_quantity() {
        let product_id = ProductId::new();
        let records = vec![
            record(product_id, dec!(30), dec!(5), dec!(10)),
            record(product_id, dec!(10), dec!(0), dec!(30)),
            record(ProductId::new(), dec!(999), dec!(0), dec!(1)),
        ];

        let summary = ProductStockSummary::from_records(product_id, &records).unwrap();
        assert_eq!(summary.warehouse_count, 2);
        assert_eq!(summary.total_quantity, dec!(40));
        assert_eq!(summary.total_reserved, dec!(5));
        assert_eq!(summary.total_available, dec!(35));
        assert_eq!(summary.total_value, dec!(600));
        assert_eq!(summary.average_cost, dec!(15));
    }

    #[test]
    fn no_records_yields_zeroes() {
        let product_id = ProductId::new();
        let summary = ProductStockSummary::from_records(product_id, &Vec::<StockRecord>::new()).unwrap();
        assert_eq!(summary, ProductStockSummary::empty(product_id));
    }

    #[test]
    fn zeroed_positions_still_count_as_warehouses() {
        let product_id = ProductId::new();
        let records = vec![record(product_id, dec!(0), dec!(0), dec!(12))];
        let summary = ProductStockSummary::from_records(product_id, &records).unwrap();
        assert_eq!(summary.warehouse_count, 1);
        assert_eq!(summary.average_cost, Decimal::ZERO);
    }

    #[test]
    fn value_beyond_range_is_an_overflow() {
        let product_id = ProductId::new();
        let big = Decimal::from_scientific("2e14").unwrap();
        let records = vec![
            record(product_id, big, dec!(0), big),
            record(product_id, big, dec!(0), big),
        ];
        assert_eq!(
            ProductStockSummary::from_records(product_id, &records).unwrap_err(),
            StockError::Overflow("summary total")
        );
    }
}
