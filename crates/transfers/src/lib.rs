//! Transfer coordination: validation, approval gating, and atomic execution.
//!
//! The entry point is [`TransferLedger`]: it accepts transfer intents,
//! validates them against current stock, parks high-value transfers behind
//! the approval gate, and executes the rest as all-or-nothing paired
//! adjustments serialized per (warehouse, SKU) mutation unit.

pub mod approval;
pub mod ledger;
pub mod locks;
pub mod request;
pub mod retry;
pub mod validator;


pub use approval::{ApprovalConfig, ApprovalDecision, ApprovalRecord, ApprovalTicket, OperationMode};
pub use ledger::{ExecutorConfig, TransferLedger};
pub use locks::{LockTable, PairGuard, UnitGuard};
pub use request::{TransferIntent, TransferRequest, TransferStatus};
pub use retry::RetryPolicy;
pub use validator::{ValidationCheck, ValidationResult, Validator};
