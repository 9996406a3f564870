//! Catalog of tables eligible for sync

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{DELETED_AT_COLUMN, UPDATED_AT_COLUMN};
use crate::error::Error;

/// One of the fixed set of tables the engine replicates.
///
/// Variants are declared in dependency order (`plans` before `members`,
/// `members` before `payments`/`attendance`), which is also the order every
/// sync operation walks them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogTable {
    Plans,
    Members,
    Payments,
    Attendance,
    Equipment,
}

impl CatalogTable {
    /// Every catalog table, in processing order.
    pub const ALL: [Self; 5] = [
        Self::Plans,
        Self::Members,
        Self::Payments,
        Self::Attendance,
        Self::Equipment,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plans => "plans",
            Self::Members => "members",
            Self::Payments => "payments",
            Self::Attendance => "attendance",
            Self::Equipment => "equipment",
        }
    }

    /// Columns the schema upgrader guarantees on this table.
    pub const fn required_columns(self) -> &'static [&'static str] {
        match self {
            Self::Members => &[UPDATED_AT_COLUMN, DELETED_AT_COLUMN, "biometric_id"],
            _ => &[UPDATED_AT_COLUMN, DELETED_AT_COLUMN],
        }
    }
}

impl fmt::Display for CatalogTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for CatalogTable {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|table| table.as_str() == name)
            .ok_or_else(|| Error::InvalidInput(format!("not a catalog table: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_order_puts_parents_first() {
        let position = |table| CatalogTable::ALL.iter().position(|t| *t == table).unwrap();
        assert!(position(CatalogTable::Plans) < position(CatalogTable::Members));
        assert!(position(CatalogTable::Members) < position(CatalogTable::Payments));
        assert!(position(CatalogTable::Members) < position(CatalogTable::Attendance));
    }

    #[test]
    fn parses_table_names() {
        assert_eq!("Members".parse::<CatalogTable>().unwrap(), CatalogTable::Members);
        assert_eq!(" equipment ".parse::<CatalogTable>().unwrap(), CatalogTable::Equipment);
        assert!("settings".parse::<CatalogTable>().is_err());
    }

    #[test]
    fn members_require_biometric_id() {
        assert!(CatalogTable::Members.required_columns().contains(&"biometric_id"));
        assert!(!CatalogTable::Payments.required_columns().contains(&"biometric_id"));
    }

    #[test]
    fn every_table_requires_sync_columns() {
        for table in CatalogTable::ALL {
            let required = table.required_columns();
            assert!(required.contains(&UPDATED_AT_COLUMN), "{table}");
            assert!(required.contains(&DELETED_AT_COLUMN), "{table}");
        }
    }
}
