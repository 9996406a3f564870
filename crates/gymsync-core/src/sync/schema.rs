//! Idempotent column upgrades applied to both stores before any data moves

use serde::Serialize;

use crate::db::SqlStore;
use crate::error::Result;
use crate::models::{CatalogTable, SqlValue};

/// What one upgrader pass changed on one store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaUpgrade {
    /// Columns that were missing and have been added.
    pub added: Vec<(CatalogTable, &'static str)>,
    /// Non-fatal problems, one message per table/column.
    pub failures: Vec<String>,
}

impl SchemaUpgrade {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Ensure every catalog table on `store` has its required columns.
///
/// Never removes columns. "Column already exists" from the engine counts as
/// success, and every other failure is logged and collected rather than
/// returned, so a partially upgradable store never blocks a sync.
pub async fn upgrade_store<S: SqlStore>(store: &S) -> SchemaUpgrade {
    let mut upgrade = SchemaUpgrade::default();

    for table in CatalogTable::ALL {
        let columns = match table_columns(store, table).await {
            Ok(columns) => columns,
            Err(error) => {
                tracing::warn!(
                    "Schema introspection failed for {} table {}: {}",
                    store.label(),
                    table,
                    error
                );
                upgrade.failures.push(format!("{table}: {error}"));
                continue;
            }
        };

        if columns.is_empty() {
            tracing::warn!("{} store has no {} table", store.label(), table);
            upgrade.failures.push(format!("{table}: table does not exist"));
            continue;
        }

        for &column in table.required_columns() {
            if columns.iter().any(|existing| existing.eq_ignore_ascii_case(column)) {
                continue;
            }
            match add_column(store, table, column).await {
                Ok(true) => {
                    tracing::info!("Added column {}.{} on {} store", table, column, store.label());
                    upgrade.added.push((table, column));
                }
                Ok(false) => {}
                Err(error) => {
                    tracing::warn!(
                        "Failed to add column {}.{} on {} store: {}",
                        table,
                        column,
                        store.label(),
                        error
                    );
                    upgrade.failures.push(format!("{table}.{column}: {error}"));
                }
            }
        }
    }

    upgrade
}

/// Column names of `table`, empty when the table does not exist.
pub async fn table_columns<S: SqlStore>(store: &S, table: CatalogTable) -> Result<Vec<String>> {
    let result = store
        .execute(&format!("PRAGMA table_info({table})"), vec![])
        .await?;

    Ok(result
        .rows
        .iter()
        .filter_map(|row| row.get("name").and_then(SqlValue::as_text))
        .map(str::to_string)
        .collect())
}

/// Returns `Ok(false)` when the engine says the column is already there.
async fn add_column<S: SqlStore>(store: &S, table: CatalogTable, column: &str) -> Result<bool> {
    match store
        .execute(&format!("ALTER TABLE {table} ADD COLUMN {column} TEXT"), vec![])
        .await
    {
        Ok(_) => Ok(true),
        Err(error) if error.is_duplicate_column() => {
            tracing::debug!("Column {}.{} already exists on {} store", table, column, store.label());
            Ok(false)
        }
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::LocalStore;
    use pretty_assertions::assert_eq;

    const LEGACY_SCHEMA: &str = "
        CREATE TABLE plans (id TEXT PRIMARY KEY, name TEXT);
        CREATE TABLE members (id TEXT PRIMARY KEY, name TEXT);
        CREATE TABLE payments (id TEXT PRIMARY KEY, amount REAL);
        CREATE TABLE attendance (id TEXT PRIMARY KEY, member_id TEXT);
        CREATE TABLE equipment (id TEXT PRIMARY KEY, name TEXT, updated_at TEXT);
    ";

    #[tokio::test(flavor = "multi_thread")]
    async fn adds_missing_columns_on_legacy_store() {
        let store = LocalStore::open_in_memory(LEGACY_SCHEMA).await.unwrap();

        let upgrade = upgrade_store(&store).await;
        assert!(upgrade.is_clean());
        assert!(upgrade.added.contains(&(CatalogTable::Members, "biometric_id")));
        assert!(upgrade.added.contains(&(CatalogTable::Equipment, "deleted_at")));
        assert!(!upgrade.added.contains(&(CatalogTable::Equipment, "updated_at")));

        let members = table_columns(&store, CatalogTable::Members).await.unwrap();
        assert_eq!(
            members,
            vec!["id", "name", "updated_at", "deleted_at", "biometric_id"]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn second_run_is_a_no_op() {
        let store = LocalStore::open_in_memory(LEGACY_SCHEMA).await.unwrap();
        upgrade_store(&store).await;

        let again = upgrade_store(&store).await;
        assert!(again.is_clean());
        assert!(again.added.is_empty());

        let payments = table_columns(&store, CatalogTable::Payments).await.unwrap();
        assert_eq!(
            payments.iter().filter(|c| c.as_str() == "deleted_at").count(),
            1
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_table_is_reported_not_fatal() {
        let store = LocalStore::open_in_memory("CREATE TABLE members (id TEXT PRIMARY KEY)")
            .await
            .unwrap();

        let upgrade = upgrade_store(&store).await;
        assert!(upgrade.added.contains(&(CatalogTable::Members, "deleted_at")));
        assert_eq!(upgrade.failures.len(), 4);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn duplicate_column_error_counts_as_success() {
        let store = LocalStore::open_in_memory(LEGACY_SCHEMA).await.unwrap();
        store
            .execute("ALTER TABLE plans ADD COLUMN deleted_at TEXT", vec![])
            .await
            .unwrap();
        let added = add_column(&store, CatalogTable::Plans, "deleted_at")
            .await
            .unwrap();
        assert!(!added);
    }
}
