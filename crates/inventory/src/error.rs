use rust_decimal::Decimal;
use thiserror::Error;

/// Deterministic failures raised while deciding a stock movement.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockError {
    /// An unknown movement type name or code was supplied.
    #[error("invalid movement type: {0}")]
    InvalidMovementType(String),

    /// An outbound movement asked for more than is on hand.
    #[error("insufficient stock: available {available}, required {requested}")]
    InsufficientStock {
        available: Decimal,
        requested: Decimal,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("arithmetic overflow while computing {0}")]
    Overflow(&'static str),

    /// Ledger replay disagreed with a recorded entry or with the stock record.
    #[error("ledger inconsistent at sequence {sequence}: {detail}")]
    LedgerInconsistent { sequence: u64, detail: String },
}

impl StockError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn ledger(sequence: u64, detail: impl Into<String>) -> Self {
        Self::LedgerInconsistent {
            sequence,
            detail: detail.into(),
        }
    }
}
