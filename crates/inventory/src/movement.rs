use core::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{MovementId, ProductId, TenantId, UserId, WarehouseId};

use crate::error::StockError;

/// Which way a movement moves stock.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    /// Signed quantity change for a (positive) movement quantity.
    pub fn signed(self, quantity: Decimal) -> Decimal {
        match self {
            Direction::In => quantity,
            Direction::Out => -quantity,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::In => Direction::Out,
            Direction::Out => Direction::In,
        }
    }
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Direction::In => f.write_str("IN"),
            Direction::Out => f.write_str("OUT"),
        }
    }
}

/// The closed set of business events that may change on-hand stock.
///
/// Direction is an intrinsic property of the type; callers never choose it.
/// Serialized as the enumeration name; deserialization goes through `FromStr`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum MovementType {
    GrnReceipt,
    SalesReturn,
    TransferIn,
    AdjustmentPlus,
    OpeningStock,
    ChallanDispatch,
    SalesIssue,
    TransferOut,
    AdjustmentMinus,
    DamageWriteoff,
}

impl MovementType {
    pub const ALL: [MovementType; 10] = [
        MovementType::GrnReceipt,
        MovementType::SalesReturn,
        MovementType::TransferIn,
        MovementType::AdjustmentPlus,
        MovementType::OpeningStock,
        MovementType::ChallanDispatch,
        MovementType::SalesIssue,
        MovementType::TransferOut,
        MovementType::AdjustmentMinus,
        MovementType::DamageWriteoff,
    ];

    pub fn direction(self) -> Direction {
        match self {
            MovementType::GrnReceipt
            | MovementType::SalesReturn
            | MovementType::TransferIn
            | MovementType::AdjustmentPlus
            | MovementType::OpeningStock => Direction::In,
            MovementType::ChallanDispatch
            | MovementType::SalesIssue
            | MovementType::TransferOut
            | MovementType::AdjustmentMinus
            | MovementType::DamageWriteoff => Direction::Out,
        }
    }

    /// Enumeration name as exposed to callers (e.g. `GRN_RECEIPT`).
    pub fn name(self) -> &'static str {
        match self {
            MovementType::GrnReceipt => "GRN_RECEIPT",
            MovementType::SalesReturn => "SALES_RETURN",
            MovementType::TransferIn => "TRANSFER_IN",
            MovementType::AdjustmentPlus => "ADJUSTMENT_PLUS",
            MovementType::OpeningStock => "OPENING_STOCK",
            MovementType::ChallanDispatch => "CHALLAN_DISPATCH",
            MovementType::SalesIssue => "SALES_ISSUE",
            MovementType::TransferOut => "TRANSFER_OUT",
            MovementType::AdjustmentMinus => "ADJUSTMENT_MINUS",
            MovementType::DamageWriteoff => "DAMAGE_WRITEOFF",
        }
    }

    /// Stable lowercase code, accepted on input alongside the name.
    pub fn code(self) -> &'static str {
        match self {
            MovementType::GrnReceipt => "grn_receipt",
            MovementType::SalesReturn => "sales_return",
            MovementType::TransferIn => "transfer_in",
            MovementType::AdjustmentPlus => "adjustment_plus",
            MovementType::OpeningStock => "opening_stock",
            MovementType::ChallanDispatch => "challan_dispatch",
            MovementType::SalesIssue => "sales_issue",
            MovementType::TransferOut => "transfer_out",
            MovementType::AdjustmentMinus => "adjustment_minus",
            MovementType::DamageWriteoff => "damage_writeoff",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MovementType::GrnReceipt => "GRN Receipt",
            MovementType::SalesReturn => "Sales Return",
            MovementType::TransferIn => "Transfer In",
            MovementType::AdjustmentPlus => "Stock Adjustment (+)",
            MovementType::OpeningStock => "Opening Stock",
            MovementType::ChallanDispatch => "Challan Dispatch",
            MovementType::SalesIssue => "Sales Issue",
            MovementType::TransferOut => "Transfer Out",
            MovementType::AdjustmentMinus => "Stock Adjustment (-)",
            MovementType::DamageWriteoff => "Damage/Write-off",
        }
    }

    /// Movement type used to compensate a movement of this type.
    pub fn compensating(self) -> Self {
        match self.direction() {
            Direction::In => MovementType::AdjustmentMinus,
            Direction::Out => MovementType::AdjustmentPlus,
        }
    }
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts either the enumeration name (`GRN_RECEIPT`) or the stored code (`grn_receipt`).
impl FromStr for MovementType {
    type Err = StockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        MovementType::ALL
            .into_iter()
            .find(|t| t.name() == trimmed || t.code() == trimmed)
            .ok_or_else(|| StockError::InvalidMovementType(s.to_string()))
    }
}

impl TryFrom<String> for MovementType {
    type Error = StockError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MovementType> for &'static str {
    fn from(value: MovementType) -> Self {
        value.name()
    }
}

/// The business document a movement originates from (GRN, challan, invoice, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReference {
    pub doc_type: String,
    pub doc_id: String,
    pub doc_number: String,
}

impl DocumentReference {
    pub fn new(
        doc_type: impl Into<String>,
        doc_id: impl Into<String>,
        doc_number: impl Into<String>,
    ) -> Self {
        Self {
            doc_type: doc_type.into(),
            doc_id: doc_id.into(),
            doc_number: doc_number.into(),
        }
    }
}

/// Acting identity recorded on every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub name: String,
}

impl Actor {
    pub fn new(user_id: UserId, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
        }
    }
}

/// Linkage written onto a movement once it has been compensated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalInfo {
    pub reversal_movement_id: MovementId,
    pub reason: String,
    pub reversed_by: Actor,
    pub reversed_at: DateTime<Utc>,
}

/// One requested stock change, with before/after snapshots.
///
/// Immutable once committed, except for `reversal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecord {
    pub id: MovementId,
    pub tenant_id: TenantId,
    pub movement_number: String,
    pub movement_type: MovementType,
    pub direction: Direction,

    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub warehouse_id: WarehouseId,
    pub warehouse_name: String,

    /// Always positive.
    pub quantity: Decimal,
    /// Signed change applied to on-hand quantity.
    pub quantity_change: Decimal,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,

    pub previous_quantity: Decimal,
    pub new_quantity: Decimal,
    pub previous_avg_cost: Decimal,
    pub new_avg_cost: Decimal,

    pub reference: DocumentReference,
    pub batch_id: Option<String>,
    pub bin_location_id: Option<String>,
    pub notes: String,
    pub idempotency_key: Option<String>,

    pub created_at: DateTime<Utc>,
    pub created_by: Actor,

    pub reversal: Option<ReversalInfo>,
}

impl MovementRecord {
    pub fn is_reversed(&self) -> bool {
        self.reversal.is_some()
    }
}

/// Human-readable movement number, e.g. `MV-2026000042`.
pub fn format_movement_number(prefix: &str, at: DateTime<Utc>, counter: u64) -> String {
    format!("{prefix}-{}{counter:06}", at.year())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn direction_is_fixed_by_type() {
        let inbound: Vec<_> = MovementType::ALL
            .into_iter()
            .filter(|t| t.direction() == Direction::In)
            .collect();
        assert_eq!(
            inbound,
            vec![
                MovementType::GrnReceipt,
                MovementType::SalesReturn,
                MovementType::TransferIn,
                MovementType::AdjustmentPlus,
                MovementType::OpeningStock,
            ]
        );
        assert_eq!(MovementType::DamageWriteoff.direction(), Direction::Out);
    }

    #[test]
    fn parses_names_and_codes() {
        assert_eq!(
            "CHALLAN_DISPATCH".parse::<MovementType>().unwrap(),
            MovementType::ChallanDispatch
        );
        assert_eq!(
            "opening_stock".parse::<MovementType>().unwrap(),
            MovementType::OpeningStock
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = "TELEPORT".parse::<MovementType>().unwrap_err();
        assert_eq!(err, StockError::InvalidMovementType("TELEPORT".to_string()));
    }

    #[test]
    fn compensation_flips_direction() {
        for t in MovementType::ALL {
            assert_eq!(t.compensating().direction(), t.direction().opposite());
        }
    }

    #[test]
    fn serde_uses_enumeration_names() {
        let json = serde_json::to_string(&MovementType::DamageWriteoff).unwrap();
        assert_eq!(json, "\"DAMAGE_WRITEOFF\"");
        let dir: Direction = serde_json::from_str("\"OUT\"").unwrap();
        assert_eq!(dir, Direction::Out);
    }

    #[test]
    fn deserialization_accepts_names_and_codes() {
        let by_name: MovementType = serde_json::from_str("\"GRN_RECEIPT\"").unwrap();
        let by_code: MovementType = serde_json::from_str("\"grn_receipt\"").unwrap();
        assert_eq!(by_name, MovementType::GrnReceipt);
        assert_eq!(by_code, MovementType::GrnReceipt);

        let err = serde_json::from_str::<MovementType>("\"TELEPORT\"").unwrap_err();
        assert!(err.to_string().contains("invalid movement type: TELEPORT"));
    }

    #[test]
    fn movement_number_is_year_plus_padded_counter() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(format_movement_number("MV", at, 42), "MV-2026000042");
    }
}
