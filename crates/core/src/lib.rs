//! `stockledger-core` — shared domain foundation for the transfer ledger.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! strongly-typed identifiers and the error taxonomy every other crate maps
//! its failures into.

pub mod error;
pub mod id;

pub use error::{LedgerError, LedgerResult};
pub use id::{ApprovalId, DecisionId, Sku, TransferId, WarehouseId};
