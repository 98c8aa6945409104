//! Transfer execution pipeline (application-level orchestration).
//!
//! `TransferLedger` orchestrates the full lifecycle of a transfer:
//!
//! ```text
//! TransferIntent
//!   ↓
//! 1. Fail fast on malformed input (equal warehouses, non-positive qty)
//!   ↓
//! 2. Validate against current stock (business violations → rejected)
//!   ↓
//! 3. Approval gate (high-value transfers park as awaiting_approval)
//!   ↓
//! 4. Execute: acquire both mutation units in key order (bounded wait),
//!    re-validate under the locks, apply the paired adjustment
//!   ↓
//! 5. Append the decision-log entry and mark the outcome
//! ```
//!
//! Every failure below the executor boundary becomes a typed outcome on the
//! transfer; callers read `status`/`failure_reason`, they never catch a
//! business error.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use stockledger_audit::{AuditResult, ConservationAuditor, DecisionKind, DecisionLog, SkuTotals};
use stockledger_catalog::Catalog;
use stockledger_core::{ApprovalId, LedgerError, LedgerResult, Sku, TransferId, WarehouseId};
use stockledger_inventory::{InventoryRecord, InventoryStore, RecordKey};

use crate::approval::{ApprovalConfig, ApprovalDecision, ApprovalRecord, ApprovalTicket};
use crate::locks::LockTable;
use crate::request::{TransferIntent, TransferRequest, TransferStatus};
use crate::retry::RetryPolicy;
use crate::validator::Validator;

/// Executor tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Bound on each mutation-unit acquisition.
    pub lock_timeout: Duration,
    pub retry: RetryPolicy,
    pub approval: ApprovalConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(250),
            retry: RetryPolicy::default(),
            approval: ApprovalConfig::default(),
        }
    }
}

/// The transfer ledger and consistency engine.
///
/// Owns every in-flight `TransferRequest` until it reaches a terminal
/// state, the per-key lock table, the approval queue, and the running
/// per-SKU totals the conservation auditor checks against.
#[derive(Debug)]
pub struct TransferLedger {
    catalog: Arc<Catalog>,
    inventory: Arc<InventoryStore>,
    log: Arc<DecisionLog>,
    totals: Arc<SkuTotals>,
    validator: Validator,
    auditor: ConservationAuditor,
    locks: LockTable<RecordKey>,
    /// Serializes restocks and seeding against conservation audits, so an
    /// audit never snapshots the store with the expected total lagging.
    sku_units: LockTable<Sku>,
    transfers: RwLock<HashMap<TransferId, TransferRequest>>,
    tickets: RwLock<HashMap<ApprovalId, ApprovalTicket>>,
    approvals: RwLock<Vec<ApprovalRecord>>,
    config: ExecutorConfig,
}

impl TransferLedger {
    pub fn new(catalog: Arc<Catalog>, config: ExecutorConfig) -> Self {
        let inventory = Arc::new(InventoryStore::new());
        let log = Arc::new(DecisionLog::new());
        let totals = Arc::new(SkuTotals::new());
        let validator = Validator::new(inventory.clone(), catalog.clone());
        let auditor = ConservationAuditor::new(inventory.clone(), totals.clone(), log.clone());
        Self {
            catalog,
            inventory,
            log,
            totals,
            validator,
            auditor,
            locks: LockTable::new(),
            sku_units: LockTable::new(),
            transfers: RwLock::new(HashMap::new()),
            tickets: RwLock::new(HashMap::new()),
            approvals: RwLock::new(Vec::new()),
            config,
        }
    }

    pub fn inventory(&self) -> Arc<InventoryStore> {
        self.inventory.clone()
    }

    pub fn decision_log(&self) -> Arc<DecisionLog> {
        self.log.clone()
    }

    pub fn totals(&self) -> Arc<SkuTotals> {
        self.totals.clone()
    }

    /// Initial data load: seed the record and the running SKU total in step.
    pub fn seed_inventory(&self, record: InventoryRecord) -> LedgerResult<()> {
        let sku = record.sku.clone();
        let quantity = record.quantity;
        let _unit = self.sku_units.acquire(&sku, self.config.lock_timeout)?;
        self.inventory.seed(record)?;
        self.totals.add(&sku, quantity)?;
        Ok(())
    }

    /// Explicit restock: the only operation besides seeding that moves the
    /// expected total. Store and total move under the SKU's mutation unit so
    /// a concurrent audit sees both or neither.
    pub fn restock(&self, warehouse_id: &WarehouseId, sku: &Sku, quantity: i64) -> LedgerResult<i64> {
        let _unit = self.sku_units.acquire(sku, self.config.lock_timeout)?;
        let new_quantity = self.inventory.restock(warehouse_id, sku, quantity)?;
        self.totals.add(sku, quantity)?;
        self.log.append(
            DecisionKind::Restock,
            None,
            format!("{warehouse_id}/{sku}: +{quantity} -> {new_quantity}"),
        )?;
        Ok(new_quantity)
    }

    /// Accept a transfer intent: fail fast on malformed input, then route
    /// through validation, the approval gate, and execution. The returned
    /// transfer carries its outcome in `status`/`failure_reason`.
    pub fn submit(&self, intent: TransferIntent) -> LedgerResult<TransferRequest> {
        let now = Utc::now();
        let explicit_approval = intent.requires_approval;
        let transfer = TransferRequest::new(intent, now)?;
        let id = transfer.id();

        let validation = self.validator.validate(&transfer)?;
        self.insert_transfer(transfer)?;

        if !validation.is_valid() {
            let reason = validation.summary();
            self.with_transfer(id, |t| t.reject(reason.clone(), Utc::now()))?;
            self.log
                .append(DecisionKind::TransferRejected, Some(id), reason.clone())?;
            info!(transfer = %id, %reason, "transfer rejected at validation");
            return self.status(id);
        }

        let snapshot = self.status(id)?;
        let estimated_value = self.estimated_value(snapshot.sku(), snapshot.quantity());
        let gated = explicit_approval
            || self
                .config
                .approval
                .requires_approval(estimated_value, snapshot.quantity());

        if gated {
            self.with_transfer(id, |t| {
                t.mark_requires_approval();
                t.transition(TransferStatus::AwaitingApproval, Utc::now())
            })?;
            let ticket = ApprovalTicket {
                id: ApprovalId::new(),
                transfer_id: id,
                estimated_value,
                created_at: Utc::now(),
            };
            self.tickets
                .write()
                .map_err(|_| LedgerError::conflict("ticket lock poisoned"))?
                .insert(ticket.id, ticket.clone());
            self.log.append(
                DecisionKind::ApprovalRequested,
                Some(id),
                format!("estimated_value={estimated_value}, ticket={}", ticket.id),
            )?;
            info!(transfer = %id, ticket = %ticket.id, estimated_value, "transfer awaiting approval");
            return self.status(id);
        }

        self.with_transfer(id, |t| t.transition(TransferStatus::Approved, Utc::now()))?;
        self.execute(id)?;
        self.status(id)
    }

    /// Resolve an approval ticket. Approval re-enters the executor at
    /// re-validation; it never bypasses it.
    pub fn decide(
        &self,
        ticket_id: ApprovalId,
        approve: bool,
        approver: &str,
        reason: Option<String>,
    ) -> LedgerResult<TransferRequest> {
        let ticket = self
            .tickets
            .write()
            .map_err(|_| LedgerError::conflict("ticket lock poisoned"))?
            .remove(&ticket_id)
            .ok_or(LedgerError::NotFound)?;
        let id = ticket.transfer_id;
        let now = Utc::now();

        // Transition first; the decision is recorded only once the transfer
        // actually left awaiting_approval. A cancel racing this call wins or
        // loses at the transition, never leaving a granted record attached
        // to a cancelled transfer.
        let reject_reason = reason
            .clone()
            .unwrap_or_else(|| format!("rejected by {approver}"));
        let transitioned = self.with_transfer(id, |t| {
            if approve {
                t.transition(TransferStatus::Approved, now)
            } else {
                t.reject(reject_reason.clone(), now)
            }
        });
        match transitioned {
            Ok(()) => {}
            Err(LedgerError::Conflict(_)) => {
                info!(
                    transfer = %id,
                    ticket = %ticket_id,
                    "approval decision dropped: transfer no longer awaiting approval"
                );
                return self.status(id);
            }
            Err(e) => return Err(e),
        }

        let decision = if approve {
            ApprovalDecision::Approved
        } else {
            ApprovalDecision::Rejected
        };
        self.approvals
            .write()
            .map_err(|_| LedgerError::conflict("approval lock poisoned"))?
            .push(ApprovalRecord {
                ticket_id,
                transfer_id: id,
                decision,
                approver: approver.to_string(),
                reason,
                decided_at: now,
            });

        if approve {
            self.log.append(
                DecisionKind::ApprovalGranted,
                Some(id),
                format!("approved by {approver}"),
            )?;
            self.execute(id)?;
        } else {
            self.log
                .append(DecisionKind::ApprovalDenied, Some(id), reject_reason)?;
        }

        self.status(id)
    }

    /// Cancel a transfer that has not started executing. Once `in_transit`
    /// the transfer runs to `completed` or `failed`.
    pub fn cancel(&self, id: TransferId) -> LedgerResult<TransferRequest> {
        self.with_transfer(id, |t| t.cancel(Utc::now()))?;
        self.tickets
            .write()
            .map_err(|_| LedgerError::conflict("ticket lock poisoned"))?
            .retain(|_, ticket| ticket.transfer_id != id);
        self.log
            .append(DecisionKind::TransferCancelled, Some(id), "cancelled by caller")?;
        self.status(id)
    }

    pub fn status(&self, id: TransferId) -> LedgerResult<TransferRequest> {
        self.transfers
            .read()
            .map_err(|_| LedgerError::conflict("transfer lock poisoned"))?
            .get(&id)
            .cloned()
            .ok_or(LedgerError::NotFound)
    }

    /// Full transfer history, oldest first.
    pub fn transfers(&self) -> LedgerResult<Vec<TransferRequest>> {
        let mut all: Vec<TransferRequest> = self
            .transfers
            .read()
            .map_err(|_| LedgerError::conflict("transfer lock poisoned"))?
            .values()
            .cloned()
            .collect();
        all.sort_by_key(|t| (t.created_at(), t.id().as_uuid().to_owned()));
        Ok(all)
    }

    pub fn history_for_warehouse(&self, warehouse_id: &WarehouseId) -> LedgerResult<Vec<TransferRequest>> {
        Ok(self
            .transfers()?
            .into_iter()
            .filter(|t| t.touches(warehouse_id))
            .collect())
    }

    pub fn history_for_sku(&self, sku: &Sku) -> LedgerResult<Vec<TransferRequest>> {
        Ok(self
            .transfers()?
            .into_iter()
            .filter(|t| t.sku() == sku)
            .collect())
    }

    /// Open approval tickets, oldest first.
    pub fn pending_approvals(&self) -> LedgerResult<Vec<ApprovalTicket>> {
        let mut open: Vec<ApprovalTicket> = self
            .tickets
            .read()
            .map_err(|_| LedgerError::conflict("ticket lock poisoned"))?
            .values()
            .cloned()
            .collect();
        open.sort_by_key(|t| t.created_at);
        Ok(open)
    }

    pub fn approval_records(&self) -> LedgerResult<Vec<ApprovalRecord>> {
        Ok(self
            .approvals
            .read()
            .map_err(|_| LedgerError::conflict("approval lock poisoned"))?
            .clone())
    }

    /// Conservation check for one SKU. Read-only; takes the SKU's mutation
    /// unit so a restock in flight is never observed half-recorded.
    /// Transfers need no such exclusion: the paired write and the audit's
    /// store scan serialize on the store's own lock, and completed transfers
    /// conserve the total by construction.
    pub fn audit(&self, sku: &Sku) -> LedgerResult<AuditResult> {
        let _unit = self.sku_units.acquire(sku, self.config.lock_timeout)?;
        self.auditor.audit(sku)
    }

    /// The periodic sweep, one SKU unit at a time.
    pub fn audit_all(&self) -> LedgerResult<Vec<AuditResult>> {
        let mut results = Vec::new();
        for sku in self.totals.registered_skus()? {
            results.push(self.audit(&sku)?);
        }
        Ok(results)
    }

    fn estimated_value(&self, sku: &Sku, quantity: i64) -> u64 {
        self.catalog
            .product(sku)
            .map(|p| p.value_of(quantity))
            .unwrap_or(0)
    }

    fn insert_transfer(&self, transfer: TransferRequest) -> LedgerResult<()> {
        self.transfers
            .write()
            .map_err(|_| LedgerError::conflict("transfer lock poisoned"))?
            .insert(transfer.id(), transfer);
        Ok(())
    }

    fn with_transfer<T>(
        &self,
        id: TransferId,
        f: impl FnOnce(&mut TransferRequest) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let mut transfers = self
            .transfers
            .write()
            .map_err(|_| LedgerError::conflict("transfer lock poisoned"))?;
        let transfer = transfers.get_mut(&id).ok_or(LedgerError::NotFound)?;
        f(transfer)
    }

    /// Atomic execution of an `approved` transfer.
    ///
    /// Re-validates before mutating, serializes on both (warehouse, SKU)
    /// mutation units in deterministic order with a bounded wait, and
    /// applies the paired adjustment as one all-or-nothing write. Every
    /// outcome lands on the transfer and in the decision log; `Err` is
    /// reserved for infrastructure faults (poisoned locks).
    fn execute(&self, id: TransferId) -> LedgerResult<()> {
        let snapshot = self.status(id)?;
        let src_key = RecordKey::new(snapshot.source().clone(), snapshot.sku().clone());
        let tgt_key = RecordKey::new(snapshot.target().clone(), snapshot.sku().clone());

        // Cheap staleness check before going in_transit; stock may have
        // moved while the transfer waited for approval.
        let validation = self.validator.validate(&snapshot)?;
        if !validation.is_valid() {
            let reason = validation.summary();
            self.with_transfer(id, |t| t.reject(reason.clone(), Utc::now()))?;
            self.log
                .append(DecisionKind::TransferRejected, Some(id), reason.clone())?;
            info!(transfer = %id, %reason, "transfer rejected at re-validation");
            return Ok(());
        }

        self.with_transfer(id, |t| t.transition(TransferStatus::InTransit, Utc::now()))?;

        let attempts = self.config.retry.attempts();
        for attempt in 0..attempts {
            let _guard = match self
                .locks
                .acquire_pair(&src_key, &tgt_key, self.config.lock_timeout)
            {
                Ok(guard) => guard,
                Err(LedgerError::ConcurrencyTimeout(msg)) => {
                    if attempt + 1 < attempts {
                        thread::sleep(self.config.retry.backoff(attempt));
                        continue;
                    }
                    self.with_transfer(id, |t| t.fail(msg.clone(), Utc::now()))?;
                    self.log.append(
                        DecisionKind::TransferFailed,
                        Some(id),
                        format!("fatal transfer error after {attempts} attempts: {msg}"),
                    )?;
                    warn!(transfer = %id, attempts, "transfer failed: lock acquisition exhausted");
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            // Authoritative re-validation: the locks are held, so this view
            // cannot go stale before the paired write below.
            let validation = self.validator.validate(&snapshot)?;
            if !validation.is_valid() {
                let reason = validation.summary();
                self.with_transfer(id, |t| t.reject(reason.clone(), Utc::now()))?;
                self.log
                    .append(DecisionKind::TransferRejected, Some(id), reason.clone())?;
                info!(transfer = %id, %reason, "transfer rejected under lock");
                return Ok(());
            }

            match self.inventory.adjust_paired(
                snapshot.source(),
                snapshot.target(),
                snapshot.sku(),
                snapshot.quantity(),
            ) {
                Ok((source_quantity, target_quantity)) => {
                    let mut rationale = format!(
                        "{} -> {}, {} x{}: source={source_quantity}, target={target_quantity}",
                        snapshot.source(),
                        snapshot.target(),
                        snapshot.sku(),
                        snapshot.quantity()
                    );
                    for warning in &validation.warnings {
                        rationale.push_str("; warning: ");
                        rationale.push_str(warning);
                    }
                    self.log
                        .append(DecisionKind::TransferCompleted, Some(id), rationale)?;
                    self.with_transfer(id, |t| t.transition(TransferStatus::Completed, Utc::now()))?;
                    info!(
                        transfer = %id,
                        source = %snapshot.source(),
                        target = %snapshot.target(),
                        sku = %snapshot.sku(),
                        quantity = snapshot.quantity(),
                        "transfer completed"
                    );
                    return Ok(());
                }
                Err(e) if e.is_business_rejection() => {
                    // Unreachable under held locks; kept as the typed path
                    // the paired write contract allows.
                    let reason = e.to_string();
                    self.with_transfer(id, |t| t.reject(reason.clone(), Utc::now()))?;
                    self.log
                        .append(DecisionKind::TransferRejected, Some(id), reason)?;
                    return Ok(());
                }
                Err(e) => {
                    // The paired write already rolled back its decrement.
                    let reason = e.to_string();
                    self.with_transfer(id, |t| t.fail(reason.clone(), Utc::now()))?;
                    self.log
                        .append(DecisionKind::TransferFailed, Some(id), reason.clone())?;
                    warn!(transfer = %id, %reason, "transfer failed during paired write");
                    return Ok(());
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stockledger_catalog::{Product, Warehouse};

    fn wh(code: &str) -> WarehouseId {
        WarehouseId::new(code).unwrap()
    }

    fn sku(code: &str) -> Sku {
        Sku::new(code).unwrap()
    }

    fn catalog() -> Arc<Catalog> {
        let mut catalog = Catalog::new();
        for code in ["WH001", "WH002", "WH003"] {
            catalog
                .register_warehouse(Warehouse {
                    id: wh(code),
                    name: code.to_string(),
                    region: "eu-west".to_string(),
                    capacity: 100_000,
                    is_trade_hub: code == "WH001",
                })
                .unwrap();
        }
        catalog
            .register_product(Product {
                sku: sku("SKU001"),
                name: "Widget".to_string(),
                category: "widgets".to_string(),
                unit_price: 100,
                aging_threshold_days: 90,
            })
            .unwrap();
        Arc::new(catalog)
    }

    fn ledger_with(records: &[(&str, i64)]) -> TransferLedger {
        let config = ExecutorConfig {
            approval: ApprovalConfig {
                mode: crate::approval::OperationMode::Autonomous,
                ..ApprovalConfig::default()
            },
            ..ExecutorConfig::default()
        };
        let ledger = TransferLedger::new(catalog(), config);
        for (w, qty) in records {
            ledger
                .seed_inventory(InventoryRecord::new(wh(w), sku("SKU001"), *qty, Utc::now()))
                .unwrap();
        }
        ledger
    }

    fn intent(source: &str, target: &str, quantity: i64) -> TransferIntent {
        TransferIntent {
            source: wh(source),
            target: wh(target),
            sku: sku("SKU001"),
            quantity,
            reason: "rebalance".to_string(),
            requires_approval: false,
        }
    }

    #[test]
    fn malformed_intent_fails_fast_without_state_access() {
        let ledger = ledger_with(&[("WH001", 100), ("WH002", 0)]);
        let err = ledger.submit(intent("WH001", "WH001", 10)).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert!(ledger.transfers().unwrap().is_empty());
        assert!(ledger.decision_log().is_empty().unwrap());
    }

    #[test]
    fn restock_moves_stock_and_expected_total_together() {
        let ledger = ledger_with(&[("WH001", 100)]);
        ledger.restock(&wh("WH001"), &sku("SKU001"), 25).unwrap();
        let result = ledger.audit(&sku("SKU001")).unwrap();
        assert_eq!(result.expected_total, 125);
        assert!(result.is_consistent());
    }

    #[test]
    fn status_of_unknown_transfer_is_not_found() {
        let ledger = ledger_with(&[]);
        assert_eq!(ledger.status(TransferId::new()).unwrap_err(), LedgerError::NotFound);
    }

    #[test]
    fn history_filters_by_warehouse_and_sku() {
        let ledger = ledger_with(&[("WH001", 100), ("WH002", 0), ("WH003", 0)]);
        ledger.submit(intent("WH001", "WH002", 10)).unwrap();
        ledger.submit(intent("WH001", "WH003", 10)).unwrap();

        assert_eq!(ledger.history_for_warehouse(&wh("WH002")).unwrap().len(), 1);
        assert_eq!(ledger.history_for_warehouse(&wh("WH001")).unwrap().len(), 2);
        assert_eq!(ledger.history_for_sku(&sku("SKU001")).unwrap().len(), 2);
        assert_eq!(ledger.history_for_sku(&sku("SKU404")).unwrap().len(), 0);
    }

    #[test]
    fn cancelled_transfer_drops_its_ticket() {
        let ledger = ledger_with(&[("WH001", 100), ("WH002", 0)]);
        let mut gated = intent("WH001", "WH002", 10);
        gated.requires_approval = true;
        let transfer = ledger.submit(gated).unwrap();
        assert_eq!(transfer.status(), TransferStatus::AwaitingApproval);
        assert_eq!(ledger.pending_approvals().unwrap().len(), 1);

        let cancelled = ledger.cancel(transfer.id()).unwrap();
        assert_eq!(cancelled.status(), TransferStatus::Cancelled);
        assert!(ledger.pending_approvals().unwrap().is_empty());
    }

    #[test]
    fn decide_on_unknown_ticket_is_not_found() {
        let ledger = ledger_with(&[]);
        let err = ledger
            .decide(ApprovalId::new(), true, "ops", None)
            .unwrap_err();
        assert_eq!(err, LedgerError::NotFound);
    }
}
