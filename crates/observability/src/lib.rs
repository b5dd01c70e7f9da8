//! Process-wide logging setup for stock ledger hosts.

/// Initialize tracing with settings read from the environment.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use tracing::{LogFormat, LogSettings};
