//! Engine configuration.

use anyhow::{Context, Result};

pub const DEFAULT_MOVEMENT_PREFIX: &str = "MV";
pub const DEFAULT_REVERSAL_PREFIX: &str = "REV";
pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Prefix of human-readable movement numbers (`MV-2026000001`).
    pub movement_prefix: String,
    /// Prefix of the reference number given to reversal movements (`REV-MV-2026000001`).
    pub reversal_prefix: String,
    /// Optimistic-concurrency retries before a conflict is surfaced to the caller.
    pub max_conflict_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            movement_prefix: DEFAULT_MOVEMENT_PREFIX.to_string(),
            reversal_prefix: DEFAULT_REVERSAL_PREFIX.to_string(),
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }
}

impl EngineConfig {
    /// Load from `STOCK_MOVEMENT_PREFIX`, `STOCK_REVERSAL_PREFIX` and
    /// `STOCK_MAX_CONFLICT_RETRIES`, falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let movement_prefix = lookup("STOCK_MOVEMENT_PREFIX")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.movement_prefix);
        let reversal_prefix = lookup("STOCK_REVERSAL_PREFIX")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.reversal_prefix);
        let max_conflict_retries = match lookup("STOCK_MAX_CONFLICT_RETRIES") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("STOCK_MAX_CONFLICT_RETRIES must be a u32, got {raw:?}"))?,
            None => defaults.max_conflict_retries,
        };

        Ok(Self {
            movement_prefix,
            reversal_prefix,
            max_conflict_retries,
        })
    }
}
