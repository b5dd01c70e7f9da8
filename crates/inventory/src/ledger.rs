//! Per-key stock ledger: sequenced, append-only journal entries.
//!
//! A `LedgerDraft` is an entry that has not been assigned a sequence yet; the
//! store assigns the next per-key sequence when it commits the draft, turning
//! it into a `LedgerEntry`. Entries are never mutated after commit.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{LedgerEntryId, MovementId};

use crate::cost::moving_average;
use crate::error::StockError;
use crate::movement::{Actor, Direction, DocumentReference, MovementRecord, MovementType};
use crate::plan::MovementPlan;
use crate::stock::{StockKey, StockRecord};

/// A ledger entry ready to be appended (no sequence yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDraft {
    pub id: LedgerEntryId,
    pub key: StockKey,
    pub movement_id: MovementId,
    pub movement_type: MovementType,
    pub direction: Direction,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub total_value: Decimal,
    pub running_balance: Decimal,
    pub running_value: Decimal,
    pub avg_cost_at_time: Decimal,
    pub reference: DocumentReference,
    pub batch_id: Option<String>,
    pub bin_location_id: Option<String>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Actor,
}

impl LedgerDraft {
    /// Draft the entry accompanying `movement`, carrying the post-movement
    /// balances of the `plan` it was built from.
    pub fn for_movement(key: StockKey, movement: &MovementRecord, plan: &MovementPlan) -> Self {
        Self {
            id: LedgerEntryId::new(),
            key,
            movement_id: movement.id,
            movement_type: movement.movement_type,
            direction: movement.direction,
            quantity: movement.quantity,
            unit_cost: movement.unit_cost,
            total_value: plan.total_cost,
            running_balance: plan.new_quantity,
            running_value: plan.new_value,
            avg_cost_at_time: plan.new_avg_cost,
            reference: movement.reference.clone(),
            batch_id: movement.batch_id.clone(),
            bin_location_id: movement.bin_location_id.clone(),
            notes: movement.notes.clone(),
            created_at: movement.created_at,
            created_by: movement.created_by.clone(),
        }
    }

    pub fn into_entry(self, sequence: u64) -> LedgerEntry {
        LedgerEntry {
            id: self.id,
            key: self.key,
            sequence,
            movement_id: self.movement_id,
            movement_type: self.movement_type,
            direction: self.direction,
            quantity: self.quantity,
            unit_cost: self.unit_cost,
            total_value: self.total_value,
            running_balance: self.running_balance,
            running_value: self.running_value,
            avg_cost_at_time: self.avg_cost_at_time,
            reference: self.reference,
            batch_id: self.batch_id,
            bin_location_id: self.bin_location_id,
            notes: self.notes,
            created_at: self.created_at,
            created_by: self.created_by,
        }
    }
}

/// A committed ledger entry.
///
/// `sequence` is strictly increasing per key, starting at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub key: StockKey,
    pub sequence: u64,
    pub movement_id: MovementId,
    pub movement_type: MovementType,
    pub direction: Direction,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub total_value: Decimal,
    pub running_balance: Decimal,
    pub running_value: Decimal,
    pub avg_cost_at_time: Decimal,
    pub reference: DocumentReference,
    pub batch_id: Option<String>,
    pub bin_location_id: Option<String>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Actor,
}

/// State reconstructed from a key's ledger alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReplay {
    pub entries: u64,
    pub last_sequence: u64,
    pub balance: Decimal,
    pub average_cost: Decimal,
    /// Valued stock after the last entry.
    pub value: Decimal,
}

impl LedgerReplay {
    /// Replay entries (ascending sequence) and check every recorded running figure.
    pub fn from_entries(entries: &[LedgerEntry]) -> Result<Self, StockError> {
        let mut balance = Decimal::ZERO;
        let mut average_cost = Decimal::ZERO;
        let mut last_sequence = 0u64;
        let mut value = Decimal::ZERO;

        for entry in entries {
            if entry.sequence != last_sequence + 1 {
                return Err(StockError::ledger(
                    entry.sequence,
                    format!("expected sequence {}", last_sequence + 1),
                ));
            }
            last_sequence = entry.sequence;

            match entry.direction {
                Direction::In => {
                    average_cost =
                        moving_average(balance, average_cost, entry.quantity, entry.unit_cost)?;
                    balance = balance
                        .checked_add(entry.quantity)
                        .ok_or(StockError::Overflow("ledger balance"))?;
                }
                Direction::Out => {
                    if balance < entry.quantity {
                        return Err(StockError::ledger(
                            entry.sequence,
                            format!("balance {balance} cannot cover outbound {}", entry.quantity),
                        ));
                    }
                    balance -= entry.quantity;
                }
            }
            value = balance
                .checked_mul(average_cost)
                .ok_or(StockError::Overflow("ledger value"))?;

            if entry.running_balance != balance {
                return Err(StockError::ledger(
                    entry.sequence,
                    format!(
                        "running balance {} but replay gives {balance}",
                        entry.running_balance
                    ),
                ));
            }
            if entry.avg_cost_at_time != average_cost {
                return Err(StockError::ledger(
                    entry.sequence,
                    format!(
                        "average cost {} but replay gives {average_cost}",
                        entry.avg_cost_at_time
                    ),
                ));
            }
            if entry.running_value != value {
                return Err(StockError::ledger(
                    entry.sequence,
                    format!(
                        "running value {} but replay gives {value}",
                        entry.running_value
                    ),
                ));
            }
        }

        Ok(Self {
            entries: entries.len() as u64,
            last_sequence,
            balance,
            average_cost,
            value,
        })
    }

    /// Check the replayed balance against the persisted stock record.
    pub fn verify_against(&self, stock: Option<&StockRecord>) -> Result<(), StockError> {
        let quantity = stock.map(|s| s.quantity).unwrap_or(Decimal::ZERO);
        if quantity != self.balance {
            return Err(StockError::ledger(
                self.last_sequence,
                format!("stock record holds {quantity} but ledger balance is {}", self.balance),
            ));
        }
        Ok(())
    }
}
