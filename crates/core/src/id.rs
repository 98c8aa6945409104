//! Strongly-typed identifiers used across the ledger.
//!
//! Two families:
//! - UUIDv7 newtypes for records the engine mints itself (transfers,
//!   approval tickets, decision-log entries).
//! - Code newtypes for externally-assigned keys (`WH001`, `SKU001`); these
//!   come from provisioning data and are validated, not generated.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

/// Identifier of a transfer request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(Uuid);

/// Identifier of an approval ticket.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalId(Uuid);

/// Identifier of a decision-log entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionId(Uuid);

macro_rules! impl_uuid_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in
            /// tests for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| LedgerError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_uuid_newtype!(TransferId, "TransferId");
impl_uuid_newtype!(ApprovalId, "ApprovalId");
impl_uuid_newtype!(DecisionId, "DecisionId");

/// Warehouse code (e.g. `WH001`). Assigned at provisioning time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WarehouseId(String);

/// Stock-keeping unit (e.g. `SKU001`). Unique product identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sku(String);

macro_rules! impl_code_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Validate and wrap an externally-assigned code.
            pub fn new(code: impl Into<String>) -> Result<Self, LedgerError> {
                let code = code.into();
                let trimmed = code.trim();
                if trimmed.is_empty() {
                    return Err(LedgerError::invalid_id(concat!($name, " cannot be empty")));
                }
                if trimmed.len() != code.len() {
                    return Err(LedgerError::invalid_id(format!(
                        "{} has surrounding whitespace: {:?}",
                        $name, code
                    )));
                }
                Ok(Self(code))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $t {
            type Err = LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

impl_code_newtype!(WarehouseId, "WarehouseId");
impl_code_newtype!(Sku, "Sku");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warehouse_id_rejects_empty_and_whitespace() {
        assert!(WarehouseId::new("").is_err());
        assert!(WarehouseId::new("   ").is_err());
        assert!(WarehouseId::new(" WH001").is_err());
        assert!(WarehouseId::new("WH001").is_ok());
    }

    #[test]
    fn code_newtypes_order_lexicographically() {
        let a = WarehouseId::new("WH001").unwrap();
        let b = WarehouseId::new("WH002").unwrap();
        assert!(a < b);
    }

    #[test]
    fn sku_round_trips_through_from_str() {
        let sku: Sku = "SKU001".parse().unwrap();
        assert_eq!(sku.as_str(), "SKU001");
    }

    #[test]
    fn transfer_id_parses_its_own_display() {
        let id = TransferId::new();
        let parsed: TransferId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn ids_serialize_as_bare_strings() {
        let id = TransferId::new();
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            format!("\"{id}\"")
        );
        let warehouse = WarehouseId::new("WH001").unwrap();
        assert_eq!(serde_json::to_string(&warehouse).unwrap(), "\"WH001\"");
    }
}
