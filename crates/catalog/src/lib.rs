//! Reference data: warehouses and products.
//!
//! Both are immutable once registered; they are created at provisioning time
//! and never mutated by transfer execution.

pub mod reference;

pub use reference::{Catalog, Product, Warehouse};
