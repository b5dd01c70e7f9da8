//! Keyed store boundary for stock records, movements and ledgers.
//!
//! This module defines an infrastructure-facing abstraction for persisting the
//! three records a stock movement produces without making any storage assumptions.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryStockStore;
pub use r#trait::{CommittedMovement, MovementCommit, StockStore, StoreError};
