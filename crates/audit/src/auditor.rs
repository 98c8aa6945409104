use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::error;

use stockledger_core::{LedgerError, LedgerResult, Sku};
use stockledger_inventory::InventoryStore;

use crate::decision_log::{DecisionKind, DecisionLog};

/// Running expected total per SKU.
///
/// Seeded at initial data load and adjusted only by explicit restocks.
/// Completed transfers conserve it by construction, which is exactly what
/// the auditor verifies.
#[derive(Debug, Default)]
pub struct SkuTotals {
    totals: RwLock<HashMap<Sku, i64>>,
}

impl SkuTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed (or re-seed) the expected total at data-load time.
    pub fn register(&self, sku: Sku, total: i64) -> LedgerResult<()> {
        let mut totals = self
            .totals
            .write()
            .map_err(|_| LedgerError::conflict("totals lock poisoned"))?;
        totals.insert(sku, total);
        Ok(())
    }

    /// Shift the expected total; restocks are the only legal caller. An
    /// overflowing shift is rejected and leaves the total unchanged, same
    /// contract as the store's delta application.
    pub fn add(&self, sku: &Sku, delta: i64) -> LedgerResult<i64> {
        let mut totals = self
            .totals
            .write()
            .map_err(|_| LedgerError::conflict("totals lock poisoned"))?;
        let total = totals.entry(sku.clone()).or_insert(0);
        *total = total
            .checked_add(delta)
            .ok_or_else(|| LedgerError::conflict(format!("expected total overflow for {sku}")))?;
        Ok(*total)
    }

    pub fn expected(&self, sku: &Sku) -> LedgerResult<Option<i64>> {
        let totals = self
            .totals
            .read()
            .map_err(|_| LedgerError::conflict("totals lock poisoned"))?;
        Ok(totals.get(sku).copied())
    }

    pub fn registered_skus(&self) -> LedgerResult<Vec<Sku>> {
        let totals = self
            .totals
            .read()
            .map_err(|_| LedgerError::conflict("totals lock poisoned"))?;
        let mut skus: Vec<Sku> = totals.keys().cloned().collect();
        skus.sort();
        Ok(skus)
    }
}

/// Outcome of one conservation check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditResult {
    pub sku: Sku,
    pub expected_total: i64,
    pub actual_total: i64,
    /// `actual - expected`; non-zero is fatal.
    pub discrepancy: i64,
}

impl AuditResult {
    pub fn is_consistent(&self) -> bool {
        self.discrepancy == 0
    }
}

/// Read-only conservation check over the inventory store.
///
/// Runs independently of transfer execution. A discrepancy is reported (log
/// entry + error-level trace) for operator investigation, never corrected.
#[derive(Debug)]
pub struct ConservationAuditor {
    inventory: Arc<InventoryStore>,
    totals: Arc<SkuTotals>,
    log: Arc<DecisionLog>,
}

impl ConservationAuditor {
    pub fn new(inventory: Arc<InventoryStore>, totals: Arc<SkuTotals>, log: Arc<DecisionLog>) -> Self {
        Self {
            inventory,
            totals,
            log,
        }
    }

    /// Compare the summed stock for `sku` against the maintained total.
    ///
    /// Fails with `NotFound` for a SKU that was never registered; auditing
    /// an unseeded total would always report a spurious discrepancy.
    pub fn audit(&self, sku: &Sku) -> LedgerResult<AuditResult> {
        let expected_total = self.totals.expected(sku)?.ok_or(LedgerError::NotFound)?;
        let actual_total = self.inventory.total_for_sku(sku)?;
        let result = AuditResult {
            sku: sku.clone(),
            expected_total,
            actual_total,
            discrepancy: actual_total - expected_total,
        };

        if !result.is_consistent() {
            error!(
                sku = %sku,
                expected = expected_total,
                actual = actual_total,
                discrepancy = result.discrepancy,
                "conservation audit discrepancy"
            );
            self.log.append(
                DecisionKind::AuditDiscrepancy,
                None,
                format!(
                    "{sku}: expected={expected_total}, actual={actual_total}, discrepancy={}",
                    result.discrepancy
                ),
            )?;
        }

        Ok(result)
    }

    /// The periodic sweep: audit every registered SKU.
    pub fn audit_all(&self) -> LedgerResult<Vec<AuditResult>> {
        let mut results = Vec::new();
        for sku in self.totals.registered_skus()? {
            results.push(self.audit(&sku)?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stockledger_core::WarehouseId;
    use stockledger_inventory::InventoryRecord;

    fn wh(code: &str) -> WarehouseId {
        WarehouseId::new(code).unwrap()
    }

    fn sku(code: &str) -> Sku {
        Sku::new(code).unwrap()
    }

    fn setup(records: &[(&str, &str, i64)]) -> (Arc<InventoryStore>, Arc<SkuTotals>, ConservationAuditor) {
        let inventory = Arc::new(InventoryStore::new());
        let totals = Arc::new(SkuTotals::new());
        let log = Arc::new(DecisionLog::new());
        for (w, s, qty) in records {
            inventory
                .seed(InventoryRecord::new(wh(w), sku(s), *qty, Utc::now()))
                .unwrap();
            totals.add(&sku(s), *qty).unwrap();
        }
        let auditor = ConservationAuditor::new(inventory.clone(), totals.clone(), log);
        (inventory, totals, auditor)
    }

    #[test]
    fn audit_reports_zero_discrepancy_when_consistent() {
        let (_, _, auditor) = setup(&[("WH001", "SKU001", 100), ("WH002", "SKU001", 50)]);
        let result = auditor.audit(&sku("SKU001")).unwrap();
        assert_eq!(result.expected_total, 150);
        assert_eq!(result.actual_total, 150);
        assert!(result.is_consistent());
    }

    #[test]
    fn audit_detects_untracked_mutation() {
        let (inventory, _, auditor) = setup(&[("WH001", "SKU001", 100)]);
        // A mutation bypassing the ledger's restock path: totals not updated.
        inventory.adjust(&wh("WH001"), &sku("SKU001"), -30).unwrap();
        let result = auditor.audit(&sku("SKU001")).unwrap();
        assert_eq!(result.discrepancy, -30);
        assert!(!result.is_consistent());
    }

    #[test]
    fn expected_total_overflow_is_a_conflict() {
        let totals = SkuTotals::new();
        totals.register(sku("SKU001"), i64::MAX).unwrap();
        let err = totals.add(&sku("SKU001"), 1).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
        assert_eq!(totals.expected(&sku("SKU001")).unwrap(), Some(i64::MAX));
    }

    #[test]
    fn audit_of_unregistered_sku_is_not_found() {
        let (_, _, auditor) = setup(&[]);
        assert_eq!(auditor.audit(&sku("SKU404")).unwrap_err(), LedgerError::NotFound);
    }

    #[test]
    fn audit_all_sweeps_every_registered_sku() {
        let (_, _, auditor) = setup(&[("WH001", "SKU001", 10), ("WH001", "SKU002", 20)]);
        let results = auditor.audit_all().unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(AuditResult::is_consistent));
    }

    #[test]
    fn discrepancy_is_logged_not_corrected() {
        let inventory = Arc::new(InventoryStore::new());
        let totals = Arc::new(SkuTotals::new());
        let log = Arc::new(DecisionLog::new());
        inventory
            .seed(InventoryRecord::new(wh("WH001"), sku("SKU001"), 90, Utc::now()))
            .unwrap();
        totals.register(sku("SKU001"), 100).unwrap();
        let auditor = ConservationAuditor::new(inventory.clone(), totals, log.clone());

        let result = auditor.audit(&sku("SKU001")).unwrap();
        assert_eq!(result.discrepancy, -10);
        // Reported, not reconciled: stock is untouched and the log records it.
        assert_eq!(inventory.total_for_sku(&sku("SKU001")).unwrap(), 90);
        assert_eq!(log.of_kind(DecisionKind::AuditDiscrepancy).unwrap().len(), 1);
    }
}
