//! Audit trail and conservation checks.
//!
//! The decision log is the append-only record of every transfer attempt,
//! outcome, and approval decision. The conservation auditor compares actual
//! per-SKU stock against a running total that only explicit restocks may
//! move; a non-zero discrepancy is a fatal data-integrity signal, reported
//! and never silently corrected.

pub mod auditor;
pub mod decision_log;

pub use auditor::{AuditResult, ConservationAuditor, SkuTotals};
pub use decision_log::{DecisionKind, DecisionLog, DecisionLogEntry};
