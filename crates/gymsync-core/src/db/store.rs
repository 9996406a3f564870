//! SQL execution seam shared by the local and remote stores

use std::future::Future;

use libsql::params::Params;
use libsql::Connection;

use crate::error::Result;
use crate::models::{Row, SqlValue};

/// Result of one statement: the rows it produced (if any) and how many rows it
/// changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub rows_affected: u64,
}

impl QueryResult {
    pub const fn affected(rows_affected: u64) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            rows_affected,
        }
    }
}

/// Anything that can run `execute(sql, args) -> {rows, rows_affected}`.
///
/// Both stores implement this so the upsert primitive and the schema upgrader
/// work in either sync direction.
pub trait SqlStore: Send + Sync {
    /// Run one statement with positional arguments.
    fn execute(
        &self,
        sql: &str,
        args: Vec<SqlValue>,
    ) -> impl Future<Output = Result<QueryResult>> + Send;

    /// Human-readable label used in log lines.
    fn label(&self) -> &str;
}

/// Whether a statement produces a result set and should go through `query`.
pub(crate) fn returns_rows(sql: &str) -> bool {
    let keyword = sql
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    matches!(
        keyword.as_str(),
        "SELECT" | "PRAGMA" | "WITH" | "EXPLAIN" | "VALUES"
    )
}

/// Run a statement against a libSQL connection and collect its output.
pub(crate) async fn run_statement(
    conn: &Connection,
    sql: &str,
    args: Vec<SqlValue>,
) -> Result<QueryResult> {
    let params = Params::Positional(args.into_iter().map(libsql::Value::from).collect());

    if !returns_rows(sql) {
        let rows_affected = conn.execute(sql, params).await?;
        return Ok(QueryResult::affected(rows_affected));
    }

    let mut rows = conn.query(sql, params).await?;
    let columns = (0..rows.column_count())
        .map(|idx| rows.column_name(idx).unwrap_or_default().to_string())
        .collect::<Vec<_>>();

    let mut collected = Vec::new();
    while let Some(row) = rows.next().await? {
        let values = (0_i32..)
            .zip(columns.iter())
            .map(|(idx, column)| -> Result<(String, SqlValue)> {
                Ok((column.clone(), SqlValue::from(row.get_value(idx)?)))
            })
            .collect::<Result<Row>>()?;
        collected.push(values);
    }

    Ok(QueryResult {
        columns,
        rows: collected,
        rows_affected: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;
    use pretty_assertions::assert_eq;

    #[test]
    fn classifies_statements() {
        assert!(returns_rows("SELECT id FROM members"));
        assert!(returns_rows("  pragma table_info(members)"));
        assert!(returns_rows("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(!returns_rows("INSERT INTO members (id) VALUES (?)"));
        assert!(!returns_rows("ALTER TABLE members ADD COLUMN biometric_id TEXT"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_statement_collects_named_columns() {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        let conn = db.connect().unwrap();

        run_statement(&conn, "CREATE TABLE t (id TEXT PRIMARY KEY, n INTEGER)", vec![])
            .await
            .unwrap();
        let inserted = run_statement(
            &conn,
            "INSERT INTO t (id, n) VALUES (?, ?)",
            vec!["a".into(), SqlValue::Integer(4)],
        )
        .await
        .unwrap();
        assert_eq!(inserted.rows_affected, 1);

        let result = run_statement(&conn, "SELECT id, n FROM t", vec![])
            .await
            .unwrap();
        assert_eq!(result.columns, vec!["id".to_string(), "n".to_string()]);
        assert_eq!(result.rows, vec![Row::new().with("id", "a").with("n", 4_i64)]);
    }
}
