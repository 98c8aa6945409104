use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{DecisionId, LedgerError, LedgerResult, TransferId};

/// What a decision-log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    TransferCompleted,
    TransferRejected,
    TransferFailed,
    TransferCancelled,
    ApprovalRequested,
    ApprovalGranted,
    ApprovalDenied,
    Restock,
    AuditDiscrepancy,
}

/// Append-only, immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionLogEntry {
    pub id: DecisionId,
    /// 1-based, strictly increasing.
    pub sequence: u64,
    pub kind: DecisionKind,
    pub transfer_id: Option<TransferId>,
    /// Free-form rationale; carries validation warnings and failure reasons.
    pub rationale: String,
    pub recorded_at: DateTime<Utc>,
}

/// In-memory append-only decision log.
///
/// Entries get strictly increasing sequence numbers under the write lock;
/// readers get clones, never references into the log.
#[derive(Debug, Default)]
pub struct DecisionLog {
    entries: RwLock<Vec<DecisionLogEntry>>,
}

impl DecisionLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, Vec<DecisionLogEntry>>> {
        self.entries
            .read()
            .map_err(|_| LedgerError::conflict("decision log lock poisoned"))
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, Vec<DecisionLogEntry>>> {
        self.entries
            .write()
            .map_err(|_| LedgerError::conflict("decision log lock poisoned"))
    }

    pub fn append(
        &self,
        kind: DecisionKind,
        transfer_id: Option<TransferId>,
        rationale: impl Into<String>,
    ) -> LedgerResult<DecisionLogEntry> {
        let mut entries = self.write()?;
        let entry = DecisionLogEntry {
            id: DecisionId::new(),
            sequence: entries.len() as u64 + 1,
            kind,
            transfer_id,
            rationale: rationale.into(),
            recorded_at: Utc::now(),
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    pub fn entries(&self) -> LedgerResult<Vec<DecisionLogEntry>> {
        Ok(self.read()?.clone())
    }

    pub fn for_transfer(&self, transfer_id: TransferId) -> LedgerResult<Vec<DecisionLogEntry>> {
        Ok(self
            .read()?
            .iter()
            .filter(|e| e.transfer_id == Some(transfer_id))
            .cloned()
            .collect())
    }

    pub fn of_kind(&self, kind: DecisionKind) -> LedgerResult<Vec<DecisionLogEntry>> {
        Ok(self
            .read()?
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect())
    }

    pub fn len(&self) -> LedgerResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.read()?.is_empty())
    }
}
