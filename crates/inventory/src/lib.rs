//! Perpetual inventory domain module.
//!
//! This crate contains the business rules of the stock ledger, implemented
//! purely as deterministic domain logic (no IO, no locking, no storage):
//! movement types and their direction, the moving-average cost engine, the
//! decision half of a stock movement, ledger replay, and stock summaries.

pub mod cost;
pub mod error;
pub mod ledger;
pub mod movement;
pub mod plan;
pub mod stock;
pub mod summary;

pub use cost::moving_average;
pub use error::StockError;
pub use ledger::{LedgerDraft, LedgerEntry, LedgerReplay};
pub use movement::{
    Actor, Direction, DocumentReference, MovementRecord, MovementType, ReversalInfo,
    format_movement_number,
};
pub use plan::{MovementPlan, plan_movement};
pub use stock::{ItemInfo, StockKey, StockRecord};
pub use summary::ProductStockSummary;
