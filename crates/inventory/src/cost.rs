//! Moving-average cost engine.

use rust_decimal::Decimal;

use crate::error::StockError;

/// New average unit cost after receiving `incoming_qty` units at `incoming_unit_cost`.
///
/// Receipts without a cost (`incoming_unit_cost <= 0`) leave the average unchanged.
/// When the resulting quantity is zero the incoming cost is used as-is.
pub fn moving_average(
    previous_qty: Decimal,
    previous_avg_cost: Decimal,
    incoming_qty: Decimal,
    incoming_unit_cost: Decimal,
) -> Result<Decimal, StockError> {
    if incoming_unit_cost <= Decimal::ZERO {
        return Ok(previous_avg_cost);
    }

    let total_qty = previous_qty
        .checked_add(incoming_qty)
        .ok_or(StockError::Overflow("total quantity"))?;
    if total_qty.is_zero() {
        return Ok(incoming_unit_cost);
    }

    let previous_value = previous_qty
        .checked_mul(previous_avg_cost)
        .ok_or(StockError::Overflow("previous stock value"))?;
    let incoming_value = incoming_qty
        .checked_mul(incoming_unit_cost)
        .ok_or(StockError::Overflow("incoming stock value"))?;

    previous_value
        .checked_add(incoming_value)
        .and_then(|value| value.checked_div(total_qty))
        .ok_or(StockError::Overflow("average cost"))
}
