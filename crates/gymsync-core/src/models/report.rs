//! Sync operation results

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::CatalogTable;

/// Which sync operation produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    Pull,
    Push,
    FullMerge,
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pull => "pull",
            Self::Push => "push",
            Self::FullMerge => "full merge",
        })
    }
}

/// Per-table outcome of one sync operation.
///
/// A table that failed is reported with a count of `0` and an entry in
/// `failures`; the remaining tables still carry their counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub kind: SyncKind,
    pub counts: BTreeMap<CatalogTable, usize>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub failures: BTreeMap<CatalogTable, String>,
}

impl SyncReport {
    pub const fn new(kind: SyncKind) -> Self {
        Self {
            kind,
            counts: BTreeMap::new(),
            failures: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, table: CatalogTable, count: usize) {
        self.counts.insert(table, count);
    }

    pub fn record_failure(&mut self, table: CatalogTable, message: impl Into<String>) {
        self.counts.insert(table, 0);
        self.failures.insert(table, message.into());
    }

    pub fn count(&self, table: CatalogTable) -> usize {
        self.counts.get(&table).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
