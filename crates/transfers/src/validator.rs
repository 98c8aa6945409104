use std::sync::Arc;

use serde::{Deserialize, Serialize};

use stockledger_catalog::Catalog;
use stockledger_core::{LedgerError, LedgerResult};
use stockledger_inventory::InventoryStore;

use crate::request::TransferRequest;

/// Which ordered check a transfer failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCheck {
    DistinctWarehouses,
    PositiveQuantity,
    SourceStock,
    TargetRecord,
}

/// Structured validation outcome.
///
/// Expected business violations land in `errors` (with `failed_check` set),
/// never in an `Err`. Capacity overflow at the target is advisory and only
/// ever produces a warning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub failed_check: Option<ValidationCheck>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.failed_check.is_none()
    }

    fn fail(check: ValidationCheck, message: String, warnings: Vec<String>) -> Self {
        Self {
            failed_check: Some(check),
            errors: vec![message],
            warnings,
        }
    }

    pub fn summary(&self) -> String {
        if self.errors.is_empty() {
            self.warnings.join("; ")
        } else {
            self.errors.join("; ")
        }
    }
}

/// Checks a proposed transfer against current inventory state and business
/// rules. Runs both at submission and immediately before mutation, so a
/// result is only ever a snapshot of the state it was computed against.
#[derive(Debug, Clone)]
pub struct Validator {
    inventory: Arc<InventoryStore>,
    catalog: Arc<Catalog>,
}

impl Validator {
    pub fn new(inventory: Arc<InventoryStore>, catalog: Arc<Catalog>) -> Self {
        Self { inventory, catalog }
    }

    /// Ordered checks: (a) source ≠ target, (b) quantity > 0, (c) source
    /// record exists with sufficient stock, (d) target record exists;
    /// projected target quantity above warehouse capacity is a warning.
    pub fn validate(&self, transfer: &TransferRequest) -> LedgerResult<ValidationResult> {
        if transfer.source() == transfer.target() {
            return Ok(ValidationResult::fail(
                ValidationCheck::DistinctWarehouses,
                format!("source and target warehouse are the same: {}", transfer.source()),
                vec![],
            ));
        }

        if transfer.quantity() <= 0 {
            return Ok(ValidationResult::fail(
                ValidationCheck::PositiveQuantity,
                format!("transfer quantity must be positive: {}", transfer.quantity()),
                vec![],
            ));
        }

        let source = match self.inventory.get(transfer.source(), transfer.sku()) {
            Ok(record) => record,
            Err(LedgerError::NotFound) => {
                return Ok(ValidationResult::fail(
                    ValidationCheck::SourceStock,
                    format!(
                        "no inventory record for {}/{}",
                        transfer.source(),
                        transfer.sku()
                    ),
                    vec![],
                ));
            }
            Err(e) => return Err(e),
        };

        let mut warnings = Vec::new();
        if source.quantity - transfer.quantity() < source.min_threshold {
            warnings.push(format!(
                "transfer drops {}/{} below min_threshold {}",
                transfer.source(),
                transfer.sku(),
                source.min_threshold
            ));
        }

        if source.quantity < transfer.quantity() {
            return Ok(ValidationResult::fail(
                ValidationCheck::SourceStock,
                format!(
                    "insufficient stock: {}/{} available={}, requested={}",
                    transfer.source(),
                    transfer.sku(),
                    source.quantity,
                    transfer.quantity()
                ),
                warnings,
            ));
        }

        let target = match self.inventory.get(transfer.target(), transfer.sku()) {
            Ok(record) => record,
            Err(LedgerError::NotFound) => {
                return Ok(ValidationResult::fail(
                    ValidationCheck::TargetRecord,
                    format!(
                        "no inventory record for {}/{}",
                        transfer.target(),
                        transfer.sku()
                    ),
                    warnings,
                ));
            }
            Err(e) => return Err(e),
        };

        // Capacity is advisory: the backing transaction conditions only on
        // source sufficiency.
        let projected = target.quantity.saturating_add(transfer.quantity());
        if let Some(warehouse) = self.catalog.warehouse(transfer.target()) {
            if u64::try_from(projected).unwrap_or(u64::MAX) > warehouse.capacity {
                warnings.push(format!(
                    "projected quantity {projected} at {} exceeds capacity {}",
                    transfer.target(),
                    warehouse.capacity
                ));
            }
        }
        if projected > target.max_threshold {
            warnings.push(format!(
                "projected quantity {projected} at {}/{} exceeds max_threshold {}",
                transfer.target(),
                transfer.sku(),
                target.max_threshold
            ));
        }

        Ok(ValidationResult {
            failed_check: None,
            errors: vec![],
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stockledger_catalog::Warehouse;
    use stockledger_core::{Sku, WarehouseId};
    use stockledger_inventory::InventoryRecord;

    use crate::request::TransferIntent;

    fn wh(code: &str) -> WarehouseId {
        WarehouseId::new(code).unwrap()
    }

    fn sku(code: &str) -> Sku {
        Sku::new(code).unwrap()
    }

    fn transfer(source: &str, target: &str, quantity: i64) -> TransferRequest {
        TransferRequest::new(
            TransferIntent {
                source: wh(source),
                target: wh(target),
                sku: sku("SKU001"),
                quantity,
                reason: String::new(),
                requires_approval: false,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn validator(records: &[(&str, i64)], capacity: Option<(&str, u64)>) -> Validator {
        let inventory = Arc::new(InventoryStore::new());
        for (w, qty) in records {
            inventory
                .seed(InventoryRecord::new(wh(w), sku("SKU001"), *qty, Utc::now()))
                .unwrap();
        }
        let mut catalog = Catalog::new();
        if let Some((w, cap)) = capacity {
            catalog
                .register_warehouse(Warehouse {
                    id: wh(w),
                    name: w.to_string(),
                    region: "eu-west".to_string(),
                    capacity: cap,
                    is_trade_hub: false,
                })
                .unwrap();
        }
        Validator::new(inventory, Arc::new(catalog))
    }

    #[test]
    fn missing_source_record_fails_source_stock_check() {
        let validator = validator(&[("WH002", 10)], None);
        let result = validator.validate(&transfer("WH001", "WH002", 5)).unwrap();
        assert_eq!(result.failed_check, Some(ValidationCheck::SourceStock));
    }

    #[test]
    fn insufficient_stock_fails_with_quantities_in_message() {
        let validator = validator(&[("WH001", 10), ("WH002", 0)], None);
        let result = validator.validate(&transfer("WH001", "WH002", 50)).unwrap();
        assert_eq!(result.failed_check, Some(ValidationCheck::SourceStock));
        assert!(result.errors[0].contains("available=10"));
        assert!(result.errors[0].contains("requested=50"));
    }

    #[test]
    fn missing_target_record_fails_target_check() {
        let validator = validator(&[("WH001", 100)], None);
        let result = validator.validate(&transfer("WH001", "WH002", 50)).unwrap();
        assert_eq!(result.failed_check, Some(ValidationCheck::TargetRecord));
    }

    #[test]
    fn capacity_overflow_is_a_warning_not_a_failure() {
        let validator = validator(&[("WH001", 100), ("WH002", 90)], Some(("WH002", 100)));
        let result = validator.validate(&transfer("WH001", "WH002", 50)).unwrap();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.contains("exceeds capacity")));
    }

    #[test]
    fn valid_transfer_has_no_failed_check() {
        let validator = validator(&[("WH001", 150), ("WH002", 10)], Some(("WH002", 10_000)));
        let result = validator.validate(&transfer("WH001", "WH002", 50)).unwrap();
        assert!(result.is_valid());
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn min_threshold_breach_warns_even_when_valid() {
        let validator = validator(&[("WH001", 60), ("WH002", 0)], None);
        validator
            .inventory
            .set_thresholds(&wh("WH001"), &sku("SKU001"), 20, 1_000)
            .unwrap();
        let result = validator.validate(&transfer("WH001", "WH002", 50)).unwrap();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.contains("min_threshold")));
    }
}
