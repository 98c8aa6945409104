//! Inventory state: per-(warehouse, SKU) records and the store that owns
//! them.
//!
//! All mutation funnels through `InventoryStore::adjust` (or the paired
//! write built on the same checked application) so the non-negativity
//! invariant is enforced in exactly one place.

pub mod record;
pub mod store;

pub use record::{InventoryRecord, RecordKey};
pub use store::InventoryStore;
