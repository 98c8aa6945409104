use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracing::debug;

use stockledger_core::{LedgerError, LedgerResult, Sku, WarehouseId};

use crate::record::{InventoryRecord, RecordKey};

/// Owner of all inventory records.
///
/// `adjust` is the only mutation primitive; it applies a delta if and only
/// if the resulting quantity stays non-negative (the conditional-update
/// contract of the backing store). The paired form applies a transfer's
/// decrement and increment inside one write-lock critical section, so no
/// concurrent reader ever observes a half-applied transfer.
#[derive(Debug, Default)]
pub struct InventoryStore {
    records: RwLock<HashMap<RecordKey, InventoryRecord>>,
}

impl InventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, HashMap<RecordKey, InventoryRecord>>> {
        self.records
            .read()
            .map_err(|_| LedgerError::conflict("inventory lock poisoned"))
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, HashMap<RecordKey, InventoryRecord>>> {
        self.records
            .write()
            .map_err(|_| LedgerError::conflict("inventory lock poisoned"))
    }

    /// Provisioning-time insert. Fails if the record already exists.
    pub fn seed(&self, record: InventoryRecord) -> LedgerResult<()> {
        if record.quantity < 0 {
            return Err(LedgerError::validation(format!(
                "cannot seed negative quantity for {}",
                record.key()
            )));
        }
        let mut records = self.write()?;
        let key = record.key();
        if records.contains_key(&key) {
            return Err(LedgerError::conflict(format!("record already seeded: {key}")));
        }
        records.insert(key, record);
        Ok(())
    }

    pub fn get(&self, warehouse_id: &WarehouseId, sku: &Sku) -> LedgerResult<InventoryRecord> {
        let key = RecordKey::new(warehouse_id.clone(), sku.clone());
        self.read()?.get(&key).cloned().ok_or(LedgerError::NotFound)
    }

    /// Apply `delta` to a record, failing with an insufficient-stock error
    /// when the result would go negative. Returns the new quantity.
    pub fn adjust(&self, warehouse_id: &WarehouseId, sku: &Sku, delta: i64) -> LedgerResult<i64> {
        let key = RecordKey::new(warehouse_id.clone(), sku.clone());
        let mut records = self.write()?;
        apply_delta(&mut records, &key, delta, Utc::now())
    }

    /// All-or-nothing two-key write: source −quantity, target +quantity.
    ///
    /// Both applications happen under one write guard. If the second one
    /// fails, the first is rolled back from the captured prior state before
    /// the error is returned, so the pair is never partially visible.
    pub fn adjust_paired(
        &self,
        source: &WarehouseId,
        target: &WarehouseId,
        sku: &Sku,
        quantity: i64,
    ) -> LedgerResult<(i64, i64)> {
        if quantity <= 0 {
            return Err(LedgerError::validation(format!(
                "paired adjustment quantity must be positive: {quantity}"
            )));
        }
        let now = Utc::now();
        let src_key = RecordKey::new(source.clone(), sku.clone());
        let tgt_key = RecordKey::new(target.clone(), sku.clone());

        let mut records = self.write()?;
        let src_before = records.get(&src_key).cloned().ok_or(LedgerError::NotFound)?;
        if !records.contains_key(&tgt_key) {
            return Err(LedgerError::NotFound);
        }

        let new_source = apply_delta(&mut records, &src_key, -quantity, now)?;
        match apply_delta(&mut records, &tgt_key, quantity, now) {
            Ok(new_target) => {
                debug!(
                    source = %src_key,
                    target = %tgt_key,
                    quantity,
                    new_source,
                    new_target,
                    "paired adjustment applied"
                );
                Ok((new_source, new_target))
            }
            Err(e) => {
                // Compensate the decrement; restore the exact prior record.
                records.insert(src_key, src_before);
                Err(e)
            }
        }
    }

    /// Explicit restock: the only non-transfer path that changes a quantity.
    pub fn restock(&self, warehouse_id: &WarehouseId, sku: &Sku, quantity: i64) -> LedgerResult<i64> {
        if quantity <= 0 {
            return Err(LedgerError::validation(format!(
                "restock quantity must be positive: {quantity}"
            )));
        }
        self.adjust(warehouse_id, sku, quantity)
    }

    pub fn set_thresholds(
        &self,
        warehouse_id: &WarehouseId,
        sku: &Sku,
        min_threshold: i64,
        max_threshold: i64,
    ) -> LedgerResult<()> {
        if min_threshold < 0 || max_threshold < min_threshold {
            return Err(LedgerError::validation(format!(
                "invalid thresholds: min={min_threshold}, max={max_threshold}"
            )));
        }
        let key = RecordKey::new(warehouse_id.clone(), sku.clone());
        let mut records = self.write()?;
        let record = records.get_mut(&key).ok_or(LedgerError::NotFound)?;
        record.min_threshold = min_threshold;
        record.max_threshold = max_threshold;
        record.last_updated = Utc::now();
        Ok(())
    }

    /// Read-only scan of every record holding `sku` (auditor input).
    pub fn scan_sku(&self, sku: &Sku) -> LedgerResult<Vec<InventoryRecord>> {
        let records = self.read()?;
        let mut found: Vec<InventoryRecord> = records
            .values()
            .filter(|r| &r.sku == sku)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.warehouse_id.cmp(&b.warehouse_id));
        Ok(found)
    }

    pub fn total_for_sku(&self, sku: &Sku) -> LedgerResult<i64> {
        let records = self.read()?;
        Ok(records
            .values()
            .filter(|r| &r.sku == sku)
            .map(|r| r.quantity)
            .sum())
    }

    /// SKUs with at least one record (auditor sweep input).
    pub fn skus(&self) -> LedgerResult<Vec<Sku>> {
        let records = self.read()?;
        let mut skus: Vec<Sku> = records.values().map(|r| r.sku.clone()).collect();
        skus.sort();
        skus.dedup();
        Ok(skus)
    }
}

fn apply_delta(
    records: &mut HashMap<RecordKey, InventoryRecord>,
    key: &RecordKey,
    delta: i64,
    now: DateTime<Utc>,
) -> LedgerResult<i64> {
    let record = records.get_mut(key).ok_or(LedgerError::NotFound)?;
    let new_quantity = record
        .quantity
        .checked_add(delta)
        .ok_or_else(|| LedgerError::conflict(format!("quantity overflow at {key}")))?;
    if new_quantity < 0 {
        return Err(LedgerError::insufficient_stock(format!(
            "{key}: available={}, requested={}",
            record.quantity, -delta
        )));
    }
    record.quantity = new_quantity;
    record.last_updated = now;
    Ok(new_quantity)
}
