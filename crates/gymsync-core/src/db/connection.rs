//! Local store lifecycle: open, validate, recover, bootstrap, persist

use std::path::{Path, PathBuf};

use libsql::{Builder, Connection, Database as LibSqlDatabase};
use tokio::sync::Mutex;

use super::migrations;
use super::store::{returns_rows, run_statement, QueryResult, SqlStore};
use crate::error::{Error, Result};
use crate::models::SqlValue;

/// The embedded, file-resident store used while the application is offline.
///
/// A single handle is shared by the whole process. Mutating statements are
/// serialized through an internal writer guard and each one is folded back
/// into the database file before the call returns.
pub struct LocalStore {
    _db: LibSqlDatabase,
    conn: Connection,
    path: Option<PathBuf>,
    writer: Mutex<()>,
    recovered_from: Option<PathBuf>,
}

impl LocalStore {
    /// Open the store at `path`, creating it on first use.
    ///
    /// An existing file that fails validation for any reason is copied to a
    /// timestamped backup and replaced with an empty, freshly bootstrapped
    /// database.
    pub async fn open(path: impl AsRef<Path>, bootstrap_script: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let (db, conn, recovered_from) = match Self::open_validated(&path).await {
            Ok((db, conn)) => (db, conn, None),
            Err(error) if path.exists() => {
                tracing::warn!(
                    "Local store at {} failed validation: {}. Starting from an empty database.",
                    path.display(),
                    error
                );
                let backup = Self::quarantine_corrupted_db_files(&path)?;
                let (db, conn) = Self::open_validated(&path).await?;
                (db, conn, Some(backup))
            }
            Err(error) => return Err(error),
        };

        let store = Self {
            _db: db,
            conn,
            path: Some(path),
            writer: Mutex::new(()),
            recovered_from,
        };
        store.configure().await?;
        store.bootstrap(bootstrap_script).await?;
        Ok(store)
    }

    /// Open an in-memory store (useful for testing)
    pub async fn open_in_memory(bootstrap_script: &str) -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        let conn = db.connect()?;

        let store = Self {
            _db: db,
            conn,
            path: None,
            writer: Mutex::new(()),
            recovered_from: None,
        };
        store.bootstrap(bootstrap_script).await?;
        Ok(store)
    }

    async fn open_validated(path: &Path) -> Result<(LibSqlDatabase, Connection)> {
        let path_str = path.to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        let conn = db.connect()?;

        // Trivial read-only query; an unreadable file fails here.
        let mut rows = conn.query("SELECT COUNT(*) FROM sqlite_master", ()).await?;
        rows.next().await?;
        drop(rows);

        Ok((db, conn))
    }

    async fn configure(&self) -> Result<()> {
        self.conn
            .query("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        Ok(())
    }

    async fn bootstrap(&self, bootstrap_script: &str) -> Result<()> {
        let _guard = self.writer.lock().await;
        if migrations::run(&self.conn, bootstrap_script).await? {
            self.persist().await?;
        }
        Ok(())
    }

    /// Copy an unreadable database file aside and clear it and its sidecars.
    fn quarantine_corrupted_db_files(db_path: &Path) -> Result<PathBuf> {
        let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%3fZ");
        let base_name = db_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("data.db")
            .to_string();
        let backup_path = db_path.with_file_name(format!("{base_name}.corrupt-{timestamp}"));

        std::fs::copy(db_path, &backup_path)?;
        std::fs::remove_file(db_path)?;
        tracing::warn!(
            "Backed up corrupted local store from {} to {}",
            db_path.display(),
            backup_path.display()
        );

        for suffix in ["-wal", "-shm", "-journal"] {
            let sidecar = db_path.with_file_name(format!("{base_name}{suffix}"));
            if sidecar.exists() {
                std::fs::remove_file(&sidecar)?;
                tracing::warn!("Removed stale local store file {}", sidecar.display());
            }
        }

        Ok(backup_path)
    }

    /// Fold all committed changes into the main database file.
    ///
    /// In-memory stores have nothing to persist.
    pub async fn persist(&self) -> Result<()> {
        if self.path.is_none() {
            return Ok(());
        }
        let mut rows = self
            .conn
            .query("PRAGMA wal_checkpoint(TRUNCATE)", ())
            .await?;
        if let Some(row) = rows.next().await? {
            let busy: i64 = row.get(0)?;
            if busy != 0 {
                return Err(Error::Database(
                    "local store checkpoint could not complete".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Run a statement; mutating statements hold the writer guard and are
    /// persisted before returning.
    pub async fn execute(&self, sql: &str, args: Vec<SqlValue>) -> Result<QueryResult> {
        if returns_rows(sql) {
            return run_statement(&self.conn, sql, args).await;
        }

        let _guard = self.writer.lock().await;
        let result = run_statement(&self.conn, sql, args).await?;
        self.persist().await?;
        Ok(result)
    }

    /// Path of the backing file, if this store is file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Backup file written when the store was recovered at open time.
    pub fn recovered_from(&self) -> Option<&Path> {
        self.recovered_from.as_deref()
    }
}

impl SqlStore for LocalStore {
    async fn execute(&self, sql: &str, args: Vec<SqlValue>) -> Result<QueryResult> {
        Self::execute(self, sql, args).await
    }

    fn label(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::DEFAULT_BOOTSTRAP_SCRIPT;
    use crate::models::Row;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_in_memory_bootstraps_catalog() {
        let store = LocalStore::open_in_memory(DEFAULT_BOOTSTRAP_SCRIPT)
            .await
            .unwrap();
        let result = store
            .execute("SELECT COUNT(*) AS n FROM members", vec![])
            .await
            .unwrap();
        assert_eq!(result.rows, vec![Row::new().with("n", 0_i64)]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_writes_survive_reopen() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("data.db");

        {
            let store = LocalStore::open(&db_path, DEFAULT_BOOTSTRAP_SCRIPT)
                .await
                .unwrap();
            let result = store
                .execute(
                    "INSERT INTO plans (id, name) VALUES (?, ?)",
                    vec!["p1".into(), "Monthly".into()],
                )
                .await
                .unwrap();
            assert_eq!(result.rows_affected, 1);
        }

        let reopened = LocalStore::open(&db_path, DEFAULT_BOOTSTRAP_SCRIPT)
            .await
            .unwrap();
        assert!(reopened.recovered_from().is_none());
        let result = reopened
            .execute("SELECT id, name FROM plans", vec![])
            .await
            .unwrap();
        assert_eq!(
            result.rows,
            vec![Row::new().with("id", "p1").with("name", "Monthly")]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_corrupted_file_is_backed_up_and_replaced() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("data.db");
        let garbage = b"this is definitely not an sqlite database file. ".repeat(100);
        std::fs::write(&db_path, &garbage).unwrap();

        let store = LocalStore::open(&db_path, DEFAULT_BOOTSTRAP_SCRIPT)
            .await
            .unwrap();

        let backup = store.recovered_from().unwrap().to_path_buf();
        assert!(backup
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("data.db.corrupt-"));
        assert_eq!(std::fs::read(&backup).unwrap(), garbage);

        let result = store
            .execute("SELECT COUNT(*) AS n FROM members", vec![])
            .await
            .unwrap();
        assert_eq!(result.rows, vec![Row::new().with("n", 0_i64)]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_damaged_pages_behind_valid_header_are_recovered() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("data.db");
        {
            let store = LocalStore::open(&db_path, DEFAULT_BOOTSTRAP_SCRIPT)
                .await
                .unwrap();
            store
                .execute(
                    "INSERT INTO plans (id, name) VALUES (?, ?)",
                    vec!["p1".into(), "Monthly".into()],
                )
                .await
                .unwrap();
        }

        // Keep the 100-byte SQLite header, scribble over the schema pages.
        let mut bytes = std::fs::read(&db_path).unwrap();
        for byte in bytes.iter_mut().skip(100) {
            *byte = 0xA5;
        }
        std::fs::write(&db_path, &bytes).unwrap();

        let store = LocalStore::open(&db_path, DEFAULT_BOOTSTRAP_SCRIPT)
            .await
            .unwrap();
        assert!(store.recovered_from().is_some());
        let result = store
            .execute("SELECT COUNT(*) AS n FROM plans", vec![])
            .await
            .unwrap();
        assert_eq!(result.rows, vec![Row::new().with("n", 0_i64)]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unknown_sql_error_is_propagated() {
        let store = LocalStore::open_in_memory(DEFAULT_BOOTSTRAP_SCRIPT)
            .await
            .unwrap();
        let error = store
            .execute("INSERT INTO no_such_table (id) VALUES (?)", vec!["x".into()])
            .await
            .unwrap_err();
        assert!(error.to_string().contains("no_such_table"));
    }
}
