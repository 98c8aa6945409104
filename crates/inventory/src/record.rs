use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{Sku, WarehouseId};

/// Key of a single inventory record.
///
/// Also the mutation unit: every update to a record is serialized against
/// every other update of the same key. `Ord` gives the deterministic global
/// order (warehouse code first, then SKU) used for two-key lock acquisition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub warehouse_id: WarehouseId,
    pub sku: Sku,
}

impl RecordKey {
    pub fn new(warehouse_id: WarehouseId, sku: Sku) -> Self {
        Self { warehouse_id, sku }
    }
}

impl core::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.warehouse_id, self.sku)
    }
}

/// Stock of one SKU at one warehouse.
///
/// Invariant: `quantity >= 0` at every observable point, including
/// mid-transfer as seen by concurrent readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub warehouse_id: WarehouseId,
    pub sku: Sku,
    pub quantity: i64,
    pub min_threshold: i64,
    pub max_threshold: i64,
    pub received_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl InventoryRecord {
    pub fn new(warehouse_id: WarehouseId, sku: Sku, quantity: i64, received_date: DateTime<Utc>) -> Self {
        Self {
            warehouse_id,
            sku,
            quantity,
            min_threshold: 0,
            max_threshold: i64::MAX,
            received_date,
            last_updated: received_date,
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.warehouse_id.clone(), self.sku.clone())
    }

    pub fn below_min_threshold(&self) -> bool {
        self.quantity < self.min_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(wh: &str, sku: &str) -> RecordKey {
        RecordKey::new(WarehouseId::new(wh).unwrap(), Sku::new(sku).unwrap())
    }

    #[test]
    fn record_keys_order_by_warehouse_then_sku() {
        assert!(key("WH001", "SKU002") < key("WH002", "SKU001"));
        assert!(key("WH001", "SKU001") < key("WH001", "SKU002"));
    }

    #[test]
    fn below_min_threshold_compares_strictly() {
        let mut record = InventoryRecord::new(
            WarehouseId::new("WH001").unwrap(),
            Sku::new("SKU001").unwrap(),
            10,
            Utc::now(),
        );
        record.min_threshold = 10;
        assert!(!record.below_min_threshold());
        record.quantity = 9;
        assert!(record.below_min_threshold());
    }
}
