//! Sync operations: Pull, Push and Full Merge between the local and remote
//! stores.
//!
//! Every operation validates credentials once, upgrades both schemas, then
//! walks the catalog tables in dependency order. Tombstoned rows are never
//! read, and a tombstoned destination row is never overwritten. A table whose
//! read or upsert fails is logged and reported with a count of `0`; the
//! operation still completes. Only configuration problems fail the whole call.

mod scheduler;
mod schema;
mod upsert;
mod write_through;

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::db::{
    LocalSettingsRepository, LocalStore, RemoteClientCache, RemoteConnector, SettingsRepository,
    SqlStore,
};
use crate::error::{Error, Result};
use crate::models::{CatalogTable, Credentials, Row, SyncKind, SyncReport};
use crate::state::SyncState;

pub use scheduler::spawn_periodic_pull;
pub use schema::{table_columns, upgrade_store, SchemaUpgrade};
pub use upsert::{upsert_live_row, upsert_row, UpsertOutcome};
pub use write_through::{ChangeNotice, WriteThroughHook, WriteThroughStats, WriteThroughWorker};

/// Runs sync operations against one local store and one remote connector.
///
/// Operations are single-flight: a second call made while one is running
/// waits for it to finish instead of interleaving with it.
pub struct SyncEngine<C: RemoteConnector = RemoteClientCache> {
    local: Arc<LocalStore>,
    connector: Arc<C>,
    in_flight: Mutex<()>,
    state: watch::Sender<SyncState>,
}

impl<C: RemoteConnector> SyncEngine<C> {
    pub fn new(local: Arc<LocalStore>, connector: Arc<C>) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        Self {
            local,
            connector,
            in_flight: Mutex::new(()),
            state,
        }
    }

    /// Copy every live remote row into the local store.
    pub async fn pull(&self) -> Result<SyncReport> {
        self.run(SyncKind::Pull).await
    }

    /// Copy every live local row into the remote store.
    pub async fn push(&self) -> Result<SyncReport> {
        self.run(SyncKind::Push).await
    }

    /// Remote wins on id collisions; local-only rows are promoted upward.
    pub async fn full_merge(&self) -> Result<SyncReport> {
        self.run(SyncKind::FullMerge).await
    }

    /// Run the schema upgrader against both stores without moving any rows.
    ///
    /// Returns `(local, remote)` results.
    pub async fn upgrade_schemas(&self) -> Result<(SchemaUpgrade, SchemaUpgrade)> {
        let _flight = self.in_flight.lock().await;
        let credentials = self.credentials().await?;
        let remote = self.connector.connect(&credentials).await?;
        Ok(upgrade_both(self.local.as_ref(), remote.as_ref()).await)
    }

    /// Credentials persisted in the local settings table.
    pub async fn credentials(&self) -> Result<Credentials> {
        LocalSettingsRepository::new(&self.local)
            .load_credentials()
            .await?
            .ok_or(Error::SyncNotConfigured)
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    async fn run(&self, kind: SyncKind) -> Result<SyncReport> {
        let _flight = self.in_flight.lock().await;
        self.state.send_replace(SyncState::Syncing);

        let result = self.run_exclusive(kind).await;
        let state = match &result {
            Ok(report) if report.is_complete() => SyncState::Synced,
            _ => SyncState::Error,
        };
        self.state.send_replace(state);
        result
    }

    async fn run_exclusive(&self, kind: SyncKind) -> Result<SyncReport> {
        let credentials = self.credentials().await?;
        tracing::info!("Starting {} with {}", kind, credentials.url);

        let remote = self.connector.connect(&credentials).await?;
        let local = self.local.as_ref();
        let remote = remote.as_ref();

        upgrade_both(local, remote).await;

        let report = match kind {
            SyncKind::Pull => pull(local, remote).await,
            SyncKind::Push => push(local, remote).await,
            SyncKind::FullMerge => full_merge(local, remote).await,
        };

        if report.is_complete() {
            tracing::info!("{} finished: {} rows", kind, report.total());
        } else {
            tracing::warn!(
                "{} finished with {} failed table(s): {} rows",
                kind,
                report.failures.len(),
                report.total()
            );
        }
        Ok(report)
    }
}

async fn upgrade_both<L: SqlStore, R: SqlStore>(local: &L, remote: &R) -> (SchemaUpgrade, SchemaUpgrade) {
    let local_upgrade = upgrade_store(local).await;
    let remote_upgrade = upgrade_store(remote).await;
    (local_upgrade, remote_upgrade)
}

/// Per-table tally of one pass.
#[derive(Debug, Default)]
struct TablePass {
    count: usize,
    failed: usize,
    first_error: Option<String>,
}

impl TablePass {
    fn absorb(&mut self, table: CatalogTable, row: &Row, result: Result<UpsertOutcome>) {
        match result {
            Ok(outcome) if outcome.applied() => self.count += 1,
            Ok(_) => {}
            Err(error) => {
                tracing::warn!(
                    "Failed to upsert {} row {}: {}",
                    table,
                    row.id().unwrap_or_else(|| "<no id>".to_string()),
                    error
                );
                self.failed += 1;
                self.first_error.get_or_insert_with(|| error.to_string());
            }
        }
    }

    fn record_into(self, report: &mut SyncReport, table: CatalogTable) {
        if self.failed == 0 {
            report.record(table, self.count);
            return;
        }
        report.record_failure(
            table,
            format!(
                "{} row(s) failed: {}",
                self.failed,
                self.first_error.unwrap_or_default()
            ),
        );
    }
}

/// Remote → Local for every catalog table.
pub async fn pull<L: SqlStore, R: SqlStore>(local: &L, remote: &R) -> SyncReport {
    let mut report = SyncReport::new(SyncKind::Pull);
    for table in CatalogTable::ALL {
        let pass = copy_table(remote, local, table).await;
        settle(&mut report, table, pass);
    }
    report
}

/// Local → Remote for every catalog table.
pub async fn push<L: SqlStore, R: SqlStore>(local: &L, remote: &R) -> SyncReport {
    let mut report = SyncReport::new(SyncKind::Push);
    for table in CatalogTable::ALL {
        let pass = copy_table(local, remote, table).await;
        settle(&mut report, table, pass);
    }
    report
}

/// Bidirectional merge where the remote is authoritative on identity
/// collisions.
///
/// `updated_at` is never compared: a row present on both sides always takes
/// the remote values, and local rows with a colliding id are never pushed.
/// Rows tombstoned on either side stay as they are.
pub async fn full_merge<L: SqlStore, R: SqlStore>(local: &L, remote: &R) -> SyncReport {
    let mut report = SyncReport::new(SyncKind::FullMerge);
    for table in CatalogTable::ALL {
        let pass = merge_table(local, remote, table).await;
        settle(&mut report, table, pass);
    }
    report
}

fn settle(report: &mut SyncReport, table: CatalogTable, pass: Result<TablePass>) {
    match pass {
        Ok(pass) => {
            tracing::debug!("{} {}: {} rows", report.kind, table, pass.count);
            pass.record_into(report, table);
        }
        Err(error) => {
            tracing::warn!("{} of {} failed: {}", report.kind, table, error);
            report.record_failure(table, error.to_string());
        }
    }
}

/// Non-tombstoned rows of `table`.
pub async fn live_rows<S: SqlStore>(store: &S, table: CatalogTable) -> Result<Vec<Row>> {
    let result = store
        .execute(
            &format!("SELECT * FROM {table} WHERE deleted_at IS NULL OR TRIM(deleted_at) = ''"),
            vec![],
        )
        .await?;
    Ok(result.rows)
}

async fn copy_table<S: SqlStore, D: SqlStore>(
    source: &S,
    dest: &D,
    table: CatalogTable,
) -> Result<TablePass> {
    let rows = live_rows(source, table).await?;
    let mut pass = TablePass::default();

    for row in &rows {
        let result = upsert_live_row(dest, table, row).await;
        pass.absorb(table, row, result);
    }
    Ok(pass)
}

async fn merge_table<L: SqlStore, R: SqlStore>(
    local: &L,
    remote: &R,
    table: CatalogTable,
) -> Result<TablePass> {
    let remote_rows = live_rows(remote, table).await?;
    let local_rows = live_rows(local, table).await?;
    let remote_ids: HashSet<String> = remote_rows.iter().filter_map(Row::id).collect();

    let mut pass = TablePass::default();

    for row in &remote_rows {
        let result = upsert_live_row(local, table, row).await;
        pass.absorb(table, row, result);
    }

    let local_only = local_rows
        .iter()
        .filter(|row| row.id().is_none_or(|id| !remote_ids.contains(&id)))
        .collect::<Vec<_>>();
    // A local-only id that is tombstoned on the remote is skipped here, not
    // promoted.
    for row in &local_only {
        let result = upsert_live_row(remote, table, row).await;
        pass.absorb(table, row, result);
    }

    Ok(pass)
}
