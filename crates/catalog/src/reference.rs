use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use stockledger_core::{LedgerError, LedgerResult, Sku, WarehouseId};

/// Warehouse reference data (immutable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    pub name: String,
    pub region: String,
    /// Total unit capacity across all SKUs.
    pub capacity: u64,
    pub is_trade_hub: bool,
}

/// Product reference data (immutable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub sku: Sku,
    pub name: String,
    pub category: String,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
    pub aging_threshold_days: u32,
}

impl Product {
    /// Total value of `quantity` units, saturating on overflow.
    pub fn value_of(&self, quantity: i64) -> u64 {
        let qty = u64::try_from(quantity).unwrap_or(0);
        self.unit_price.saturating_mul(qty)
    }
}

/// In-memory lookup over provisioned reference data.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    warehouses: HashMap<WarehouseId, Warehouse>,
    products: HashMap<Sku, Product>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_warehouse(&mut self, warehouse: Warehouse) -> LedgerResult<()> {
        if self.warehouses.contains_key(&warehouse.id) {
            return Err(LedgerError::conflict(format!(
                "warehouse already registered: {}",
                warehouse.id
            )));
        }
        self.warehouses.insert(warehouse.id.clone(), warehouse);
        Ok(())
    }

    pub fn register_product(&mut self, product: Product) -> LedgerResult<()> {
        if self.products.contains_key(&product.sku) {
            return Err(LedgerError::conflict(format!(
                "product already registered: {}",
                product.sku
            )));
        }
        self.products.insert(product.sku.clone(), product);
        Ok(())
    }

    pub fn warehouse(&self, id: &WarehouseId) -> Option<&Warehouse> {
        self.warehouses.get(id)
    }

    pub fn product(&self, sku: &Sku) -> Option<&Product> {
        self.products.get(sku)
    }

    pub fn warehouses(&self) -> impl Iterator<Item = &Warehouse> {
        self.warehouses.values()
    }
}
