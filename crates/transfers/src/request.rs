use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{LedgerError, LedgerResult, Sku, TransferId, WarehouseId};

/// Transfer lifecycle.
///
/// `pending → (awaiting_approval | approved) → in_transit → completed`,
/// with rejection/cancellation exits before execution, rejection for stale
/// insufficiency detected during execution, and `failed` for internal
/// executor faults. Terminal states admit no further transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    AwaitingApproval,
    Approved,
    InTransit,
    Completed,
    Failed,
    Cancelled,
    Rejected,
}

impl TransferStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TransferStatus::Completed
                | TransferStatus::Failed
                | TransferStatus::Cancelled
                | TransferStatus::Rejected
        )
    }

    fn can_transition_to(self, to: TransferStatus) -> bool {
        use TransferStatus::*;
        matches!(
            (self, to),
            (Pending, AwaitingApproval)
                | (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (AwaitingApproval, Approved)
                | (AwaitingApproval, Rejected)
                | (AwaitingApproval, Cancelled)
                | (Approved, InTransit)
                | (Approved, Rejected)
                | (InTransit, Completed)
                | (InTransit, Rejected)
                | (InTransit, Failed)
        )
    }
}

/// Caller-supplied transfer proposal. The ledger never originates one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferIntent {
    pub source: WarehouseId,
    pub target: WarehouseId,
    pub sku: Sku,
    pub quantity: i64,
    pub reason: String,
    /// Forces the approval gate regardless of configured thresholds.
    pub requires_approval: bool,
}

/// A transfer request owned by the ledger until terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    id: TransferId,
    source: WarehouseId,
    target: WarehouseId,
    sku: Sku,
    quantity: i64,
    reason: String,
    requires_approval: bool,
    status: TransferStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    failure_reason: Option<String>,
}

impl TransferRequest {
    /// Build a `pending` transfer, failing fast on malformed input.
    ///
    /// Equal source/target and non-positive quantities are malformed
    /// requests, rejected before any state access.
    pub fn new(intent: TransferIntent, now: DateTime<Utc>) -> LedgerResult<Self> {
        if intent.source == intent.target {
            return Err(LedgerError::validation(format!(
                "source and target warehouse are the same: {}",
                intent.source
            )));
        }
        if intent.quantity <= 0 {
            return Err(LedgerError::validation(format!(
                "transfer quantity must be positive: {}",
                intent.quantity
            )));
        }
        Ok(Self {
            id: TransferId::new(),
            source: intent.source,
            target: intent.target,
            sku: intent.sku,
            quantity: intent.quantity,
            reason: intent.reason,
            requires_approval: intent.requires_approval,
            status: TransferStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
            failure_reason: None,
        })
    }

    pub fn id(&self) -> TransferId {
        self.id
    }

    pub fn source(&self) -> &WarehouseId {
        &self.source
    }

    pub fn target(&self) -> &WarehouseId {
        &self.target
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn requires_approval(&self) -> bool {
        self.requires_approval
    }

    pub fn status(&self) -> TransferStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn touches(&self, warehouse_id: &WarehouseId) -> bool {
        &self.source == warehouse_id || &self.target == warehouse_id
    }

    pub(crate) fn mark_requires_approval(&mut self) {
        self.requires_approval = true;
    }

    /// Guarded transition. Terminal states are final.
    pub fn transition(&mut self, to: TransferStatus, now: DateTime<Utc>) -> LedgerResult<()> {
        if self.status.is_terminal() {
            return Err(LedgerError::conflict(format!(
                "transfer {} is terminal ({:?})",
                self.id, self.status
            )));
        }
        if !self.status.can_transition_to(to) {
            return Err(LedgerError::conflict(format!(
                "illegal transition {:?} -> {to:?} for transfer {}",
                self.status, self.id
            )));
        }
        self.status = to;
        self.updated_at = now;
        if to == TransferStatus::Completed {
            self.completed_at = Some(now);
        }
        Ok(())
    }

    pub(crate) fn reject(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> LedgerResult<()> {
        self.failure_reason = Some(reason.into());
        self.transition(TransferStatus::Rejected, now)
    }

    pub(crate) fn fail(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> LedgerResult<()> {
        self.failure_reason = Some(reason.into());
        self.transition(TransferStatus::Failed, now)
    }

    pub(crate) fn cancel(&mut self, now: DateTime<Utc>) -> LedgerResult<()> {
        self.transition(TransferStatus::Cancelled, now)
    }
}
