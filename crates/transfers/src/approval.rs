use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{ApprovalId, TransferId};

/// Whether the engine runs fully autonomous or gates high-value transfers
/// behind a human decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    Autonomous,
    Supervised,
}

/// Approval gate thresholds.
///
/// In `Supervised` mode a transfer needs approval when its estimated value
/// or its quantity reaches the configured threshold. A caller can always
/// force the gate with the explicit `requires_approval` flag, regardless of
/// mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalConfig {
    pub mode: OperationMode,
    /// Estimated transfer value (smallest currency unit) at which approval
    /// is required.
    pub high_value_threshold: u64,
    /// Quantity at which approval is required regardless of value.
    pub high_quantity_threshold: i64,
}

impl ApprovalConfig {
    pub fn requires_approval(&self, estimated_value: u64, quantity: i64) -> bool {
        if self.mode == OperationMode::Autonomous {
            return false;
        }
        estimated_value >= self.high_value_threshold || quantity >= self.high_quantity_threshold
    }
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            mode: OperationMode::Supervised,
            high_value_threshold: 1_000_000,
            high_quantity_threshold: 500,
        }
    }
}

/// Handle to a parked transfer awaiting a human decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalTicket {
    pub id: ApprovalId,
    pub transfer_id: TransferId,
    pub estimated_value: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

/// Record of a resolved ticket. Created only for transfers that went
/// through the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub ticket_id: ApprovalId,
    pub transfer_id: TransferId,
    pub decision: ApprovalDecision,
    pub approver: String,
    pub reason: Option<String>,
    pub decided_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn autonomous_mode_never_requires_approval() {
        let config = ApprovalConfig {
            mode: OperationMode::Autonomous,
            high_value_threshold: 1,
            high_quantity_threshold: 1,
        };
        assert!(!config.requires_approval(u64::MAX, i64::MAX));
    }

    #[test]
    fn supervised_mode_gates_on_value_or_quantity() {
        let config = ApprovalConfig {
            mode: OperationMode::Supervised,
            high_value_threshold: 10_000,
            high_quantity_threshold: 100,
        };
        assert!(config.requires_approval(10_000, 1));
        assert!(config.requires_approval(0, 100));
        assert!(!config.requires_approval(9_999, 99));
    }
}
