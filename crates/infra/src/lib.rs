//! Infrastructure layer: the movement engine, its store boundary and configuration.

pub mod config;
pub mod engine;
pub mod locks;
pub mod store;


pub use config::EngineConfig;
pub use engine::{
    BulkCommon, BulkItemError, BulkMovementItem, BulkOutcome, EngineError, MovementOutcome,
    MovementParams, StockEngine,
};
pub use store::{InMemoryStockStore, StockStore, StoreError};
