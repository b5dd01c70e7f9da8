//! Decision logic for a single stock movement.
//!
//! `plan_movement` is pure: it reads the current position and returns the
//! before/after quantities and costs, or the reason the movement is rejected.
//! Nothing is persisted here, so a rejected plan can never leave a partial write.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cost::moving_average;
use crate::error::StockError;
use crate::ledger::LedgerEntry;
use crate::movement::{Direction, MovementRecord, MovementType};
use crate::stock::StockRecord;

/// Before/after snapshot of a planned movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementPlan {
    pub direction: Direction,
    pub previous_quantity: Decimal,
    pub quantity_change: Decimal,
    pub new_quantity: Decimal,
    pub previous_avg_cost: Decimal,
    pub new_avg_cost: Decimal,
    /// `quantity × unit_cost` of the movement itself.
    pub total_cost: Decimal,
    /// Valued stock after the movement (running value on the ledger).
    pub new_value: Decimal,
}

impl MovementPlan {
    /// Rebuild the plan of an already committed movement from its records.
    pub fn recorded(movement: &MovementRecord, ledger_entry: &LedgerEntry) -> Self {
        Self {
            direction: movement.direction,
            previous_quantity: movement.previous_quantity,
            quantity_change: movement.quantity_change,
            new_quantity: movement.new_quantity,
            previous_avg_cost: movement.previous_avg_cost,
            new_avg_cost: movement.new_avg_cost,
            total_cost: movement.total_cost,
            new_value: ledger_entry.running_value,
        }
    }
}

pub fn plan_movement(
    current: Option<&StockRecord>,
    movement_type: MovementType,
    quantity: Decimal,
    unit_cost: Decimal,
) -> Result<MovementPlan, StockError> {
    if quantity <= Decimal::ZERO {
        return Err(StockError::validation("quantity must be positive"));
    }
    if unit_cost < Decimal::ZERO {
        return Err(StockError::validation("unit cost cannot be negative"));
    }

    let previous_quantity = current.map(|s| s.quantity).unwrap_or(Decimal::ZERO);
    let previous_avg_cost = current
        .map(|s| s.average_unit_cost)
        .unwrap_or(Decimal::ZERO);

    let direction = movement_type.direction();
    let (new_quantity, new_avg_cost) = match direction {
        Direction::In => {
            let new_quantity = previous_quantity
                .checked_add(quantity)
                .ok_or(StockError::Overflow("new quantity"))?;
            let new_avg_cost =
                moving_average(previous_quantity, previous_avg_cost, quantity, unit_cost)?;
            (new_quantity, new_avg_cost)
        }
        Direction::Out => {
            if previous_quantity < quantity {
                return Err(StockError::InsufficientStock {
                    available: previous_quantity,
                    requested: quantity,
                });
            }
            (previous_quantity - quantity, previous_avg_cost)
        }
    };

    // Checked on every path, outbound and zero-cost receipts included.
    let total_cost = quantity
        .checked_mul(unit_cost)
        .ok_or(StockError::Overflow("total cost"))?;
    let new_value = new_quantity
        .checked_mul(new_avg_cost)
        .ok_or(StockError::Overflow("stock value"))?;

    Ok(MovementPlan {
        direction,
        previous_quantity,
        quantity_change: direction.signed(quantity),
        new_quantity,
        previous_avg_cost,
        new_avg_cost,
        total_cost,
        new_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use stockledger_core::{MovementId, ProductId, TenantId, WarehouseId};

    use crate::stock::{ItemInfo, StockKey};

    fn sci(value: &str) -> Decimal {
        Decimal::from_scientific(value).unwrap()
    }

    fn test_key() -> StockKey {
        StockKey::new(TenantId::new(), ProductId::new(), WarehouseId::new())
    }

    fn apply(current: Option<&StockRecord>, t: MovementType, plan: &MovementPlan) -> StockRecord {
        StockRecord::after_movement(
            current,
            current.map(|s| s.key).unwrap_or_else(test_key),
            &ItemInfo::default(),
            plan,
            MovementId::new(),
            t,
            Utc::now(),
        )
    }

    #[test]
    fn inbound_into_empty_key_creates_position() {
        let plan = plan_movement(None, MovementType::GrnReceipt, dec!(100), dec!(10)).unwrap();
        assert_eq!(plan.previous_quantity, dec!(0));
        assert_eq!(plan.new_quantity, dec!(100));
        assert_eq!(plan.quantity_change, dec!(100));
        assert_eq!(plan.new_avg_cost, dec!(10));
        assert_eq!(plan.new_value, dec!(1000));
        assert_eq!(plan.total_cost, dec!(1000));
    }

    #[test]
    fn outbound_keeps_average_cost() {
        let first = plan_movement(None, MovementType::OpeningStock, dec!(20), dec!(5)).unwrap();
        let stock = apply(None, MovementType::OpeningStock, &first);

        let plan = plan_movement(Some(&stock), MovementType::SalesIssue, dec!(8), dec!(99)).unwrap();
        assert_eq!(plan.direction, Direction::Out);
        assert_eq!(plan.quantity_change, dec!(-8));
        assert_eq!(plan.new_quantity, dec!(12));
        assert_eq!(plan.new_avg_cost, dec!(5));
    }

    #[test]
    fn outbound_beyond_on_hand_is_rejected() {
        let first = plan_movement(None, MovementType::GrnReceipt, dec!(3), dec!(1)).unwrap();
        let stock = apply(None, MovementType::GrnReceipt, &first);

        let err =
            plan_movement(Some(&stock), MovementType::ChallanDispatch, dec!(4), dec!(0)).unwrap_err();
        assert_eq!(
            err,
            StockError::InsufficientStock {
                available: dec!(3),
                requested: dec!(4)
            }
        );
    }

    #[test]
    fn outbound_from_missing_key_is_rejected() {
        let err = plan_movement(None, MovementType::DamageWriteoff, dec!(1), dec!(0)).unwrap_err();
        assert!(matches!(err, StockError::InsufficientStock { .. }));
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        for qty in [dec!(0), dec!(-1)] {
            let err = plan_movement(None, MovementType::GrnReceipt, qty, dec!(1)).unwrap_err();
            assert!(matches!(err, StockError::Validation(_)));
        }
    }

    #[test]
    fn outbound_cost_beyond_range_is_an_overflow() {
        let first = plan_movement(None, MovementType::GrnReceipt, sci("1e10"), dec!(1)).unwrap();
        let stock = apply(None, MovementType::GrnReceipt, &first);

        let err =
            plan_movement(Some(&stock), MovementType::SalesIssue, sci("1e10"), sci("1e19")).unwrap_err();
        assert_eq!(err, StockError::Overflow("total cost"));
    }

    #[test]
    fn zero_cost_receipt_beyond_value_range_is_an_overflow() {
        let first = plan_movement(None, MovementType::GrnReceipt, sci("1e14"), sci("1e14")).unwrap();
        let stock = apply(None, MovementType::GrnReceipt, &first);

        let err =
            plan_movement(Some(&stock), MovementType::TransferIn, sci("1e15"), dec!(0)).unwrap_err();
        assert_eq!(err, StockError::Overflow("stock value"));
    }

    #[test]
    fn negative_unit_cost_is_rejected() {
        let err = plan_movement(None, MovementType::GrnReceipt, dec!(1), dec!(-0.01)).unwrap_err();
        assert!(matches!(err, StockError::Validation(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: applying any accepted sequence of movements conserves quantity,
        /// and rejected outbound movements leave the position untouched.
        #[test]
        fn accepted_movements_conserve_quantity(
            steps in prop::collection::vec((0usize..10, 1i64..500, 0i64..100), 1..40)
        ) {
            let mut stock: Option<StockRecord> = None;
            let mut expected = Decimal::ZERO;

            for (type_idx, qty, cost) in steps {
                let t = MovementType::ALL[type_idx];
                let qty = Decimal::from(qty);
                match plan_movement(stock.as_ref(), t, qty, Decimal::from(cost)) {
                    Ok(plan) => {
                        expected += t.direction().signed(qty);
                        stock = Some(apply(stock.as_ref(), t, &plan));
                    }
                    Err(StockError::InsufficientStock { available, .. }) => {
                        prop_assert_eq!(t.direction(), Direction::Out);
                        prop_assert_eq!(available, expected);
                    }
                    Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                }
                let on_hand = stock.as_ref().map(|s| s.quantity).unwrap_or(Decimal::ZERO);
                prop_assert_eq!(on_hand, expected);
                prop_assert!(on_hand >= Decimal::ZERO);
            }
        }
    }
}
