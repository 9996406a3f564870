//! Existence-check-then-insert-or-update, usable in either sync direction

use crate::db::SqlStore;
use crate::error::{Error, Result};
use crate::models::{CatalogTable, Row, SqlValue, ID_COLUMN};
use crate::util::quote_identifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    /// The destination copy is tombstoned and was left untouched.
    SkippedTombstone,
}

impl UpsertOutcome {
    /// Whether the destination was written.
    pub const fn applied(self) -> bool {
        matches!(self, Self::Inserted | Self::Updated)
    }
}

/// Make `dest` contain a row equal to `row`, keyed by its `id`.
///
/// Every column of the source row is written, including ones the destination
/// engine has never seen before in this process; nothing is dropped or
/// defaulted. A tombstoned destination row is overwritten like any other,
/// which is how a soft delete travels through write-through.
pub async fn upsert_row<S: SqlStore>(
    dest: &S,
    table: CatalogTable,
    row: &Row,
) -> Result<UpsertOutcome> {
    upsert(dest, table, row, false).await
}

/// Like [`upsert_row`], but never touches a destination row that is
/// tombstoned. Used by Pull, Push and Full Merge.
pub async fn upsert_live_row<S: SqlStore>(
    dest: &S,
    table: CatalogTable,
    row: &Row,
) -> Result<UpsertOutcome> {
    upsert(dest, table, row, true).await
}

async fn upsert<S: SqlStore>(
    dest: &S,
    table: CatalogTable,
    row: &Row,
    keep_tombstones: bool,
) -> Result<UpsertOutcome> {
    let id = row
        .get(ID_COLUMN)
        .filter(|_| row.id().is_some())
        .cloned()
        .ok_or_else(|| Error::InvalidInput(format!("{table} row has no id")))?;

    let lookup = if keep_tombstones {
        format!("SELECT id, deleted_at FROM {table} WHERE id = ?")
    } else {
        format!("SELECT id FROM {table} WHERE id = ?")
    };
    let existing = dest.execute(&lookup, vec![id.clone()]).await?;

    let Some(current) = existing.rows.first() else {
        insert(dest, table, row).await?;
        return Ok(UpsertOutcome::Inserted);
    };

    if keep_tombstones && current.is_tombstoned() {
        tracing::debug!(
            "Leaving tombstoned {} row {} on {} store",
            table,
            row.id().unwrap_or_default(),
            dest.label()
        );
        return Ok(UpsertOutcome::SkippedTombstone);
    }

    update(dest, table, row, id).await?;
    Ok(UpsertOutcome::Updated)
}

async fn insert<S: SqlStore>(dest: &S, table: CatalogTable, row: &Row) -> Result<()> {
    let mut columns = Vec::with_capacity(row.len());
    let mut args = Vec::with_capacity(row.len());
    for (column, value) in row.iter() {
        columns.push(quote_identifier(column)?);
        args.push(value.clone());
    }
    let placeholders = vec!["?"; columns.len()].join(", ");

    dest.execute(
        &format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            columns.join(", ")
        ),
        args,
    )
    .await?;
    Ok(())
}

async fn update<S: SqlStore>(dest: &S, table: CatalogTable, row: &Row, id: SqlValue) -> Result<()> {
    let mut assignments = Vec::with_capacity(row.len());
    let mut args = Vec::with_capacity(row.len());
    for (column, value) in row.iter().filter(|(column, _)| *column != ID_COLUMN) {
        assignments.push(format!("{} = ?", quote_identifier(column)?));
        args.push(value.clone());
    }

    if assignments.is_empty() {
        return Ok(());
    }
    args.push(id);

    dest.execute(
        &format!(
            "UPDATE {table} SET {} WHERE id = ?",
            assignments.join(", ")
        ),
        args,
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{LocalStore, DEFAULT_BOOTSTRAP_SCRIPT};
    use pretty_assertions::assert_eq;

    async fn store() -> LocalStore {
        LocalStore::open_in_memory(DEFAULT_BOOTSTRAP_SCRIPT)
            .await
            .unwrap()
    }

    async fn member(store: &LocalStore, id: &str) -> Option<Row> {
        store
            .execute(
                "SELECT id, name, phone FROM members WHERE id = ?",
                vec![id.into()],
            )
            .await
            .unwrap()
            .rows
            .into_iter()
            .next()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn inserts_then_updates() {
        let store = store().await;
        let row = Row::new()
            .with("id", "m1")
            .with("name", "Ann")
            .with("phone", "555");

        assert_eq!(
            upsert_row(&store, CatalogTable::Members, &row).await.unwrap(),
            UpsertOutcome::Inserted
        );

        let changed = row.clone().with("name", "Anna");
        assert_eq!(
            upsert_row(&store, CatalogTable::Members, &changed)
                .await
                .unwrap(),
            UpsertOutcome::Updated
        );
        assert_eq!(member(&store, "m1").await, Some(changed));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_writes_nulls_from_source() {
        let store = store().await;
        let row = Row::new()
            .with("id", "m1")
            .with("name", "Ann")
            .with("phone", "555");
        upsert_row(&store, CatalogTable::Members, &row).await.unwrap();

        let cleared = row.clone().with("phone", SqlValue::Null);
        upsert_row(&store, CatalogTable::Members, &cleared)
            .await
            .unwrap();
        assert_eq!(member(&store, "m1").await, Some(cleared));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn live_upsert_leaves_tombstoned_destination_alone() {
        let store = store().await;
        let deleted = Row::new()
            .with("id", "m1")
            .with("name", "Ann")
            .with("deleted_at", "2024-06-01T00:00:00Z");
        upsert_row(&store, CatalogTable::Members, &deleted).await.unwrap();

        let live = Row::new()
            .with("id", "m1")
            .with("name", "Anna")
            .with("deleted_at", SqlValue::Null);
        let outcome = upsert_live_row(&store, CatalogTable::Members, &live)
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::SkippedTombstone);
        assert!(!outcome.applied());

        let rows = store
            .execute("SELECT name, deleted_at FROM members", vec![])
            .await
            .unwrap()
            .rows;
        assert_eq!(
            rows,
            vec![Row::new()
                .with("name", "Ann")
                .with("deleted_at", "2024-06-01T00:00:00Z")]
        );

        // Write-through semantics still overwrite, carrying the row as-is.
        assert_eq!(
            upsert_row(&store, CatalogTable::Members, &live).await.unwrap(),
            UpsertOutcome::Updated
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn live_upsert_updates_blank_tombstone() {
        let store = store().await;
        let blank = Row::new().with("id", "m1").with("name", "Ann").with("deleted_at", " ");
        upsert_row(&store, CatalogTable::Members, &blank).await.unwrap();

        let outcome = upsert_live_row(&store, CatalogTable::Members, &blank.clone().with("name", "Anna"))
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rejects_rows_without_id() {
        let store = store().await;
        let row = Row::new().with("name", "Ghost");
        assert!(upsert_row(&store, CatalogTable::Members, &row).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rejects_unsafe_column_names() {
        let store = store().await;
        let row = Row::new()
            .with("id", "m1")
            .with("name) VALUES ('x'); --", "Ann");
        assert!(upsert_row(&store, CatalogTable::Members, &row).await.is_err());
        assert_eq!(member(&store, "m1").await, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_destination_column_is_an_error_not_a_drop() {
        let store = store().await;
        let row = Row::new()
            .with("id", "m1")
            .with("name", "Ann")
            .with("locker_number", 12_i64);
        let error = upsert_row(&store, CatalogTable::Members, &row)
            .await
            .unwrap_err();
        assert!(error.to_string().contains("locker_number"));
    }
}
