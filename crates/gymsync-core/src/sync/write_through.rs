//! Per-write propagation of single changed rows to the remote store.
//!
//! Domain write paths call [`WriteThroughHook::notify_changed`] after each
//! create/update/soft-delete. The call never blocks and never fails: notices go
//! onto a bounded queue drained by one background worker, and anything that
//! goes wrong is logged, not raised. Bulk reconciliation stays with
//! Pull/Push/Full Merge.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::upsert::upsert_row;
use crate::config::WriteThroughConfig;
use crate::db::{LocalSettingsRepository, LocalStore, RemoteConnector, SettingsRepository};
use crate::error::{Error, Result};
use crate::models::CatalogTable;

/// One changed row, identified by table and id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    pub table: CatalogTable,
    pub id: String,
}

/// Totals reported by the worker when it stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteThroughStats {
    pub propagated: usize,
    /// Row no longer exists locally, or sync is not configured.
    pub skipped: usize,
    pub failed: usize,
    /// Notices refused at enqueue time because the queue was full.
    pub dropped: usize,
}

/// Cheap, cloneable handle used by write paths.
#[derive(Clone, Default)]
pub struct WriteThroughHook {
    sender: Option<mpsc::Sender<ChangeNotice>>,
    dropped: Arc<AtomicUsize>,
}

/// Owns the background task; join it after dropping every hook clone.
pub struct WriteThroughWorker {
    handle: JoinHandle<WriteThroughStats>,
    dropped: Arc<AtomicUsize>,
}

impl WriteThroughHook {
    /// A hook that accepts notices and discards them.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Start the worker if `config.enabled`, otherwise return a disabled hook.
    pub fn from_config<C>(
        config: &WriteThroughConfig,
        local: Arc<LocalStore>,
        connector: Arc<C>,
    ) -> (Self, Option<WriteThroughWorker>)
    where
        C: RemoteConnector + 'static,
    {
        if !config.enabled {
            tracing::debug!("Write-through disabled; running offline-first");
            return (Self::disabled(), None);
        }
        let (hook, worker) = Self::spawn(config, local, connector);
        (hook, Some(worker))
    }

    /// Spawn the worker task on the current tokio runtime.
    pub fn spawn<C>(
        config: &WriteThroughConfig,
        local: Arc<LocalStore>,
        connector: Arc<C>,
    ) -> (Self, WriteThroughWorker)
    where
        C: RemoteConnector + 'static,
    {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let dropped = Arc::new(AtomicUsize::new(0));
        let retry = RetryPolicy {
            max_attempts: config.max_attempts.max(1),
            backoff: config.retry_backoff,
        };

        let handle = tokio::spawn(run_worker(receiver, local, connector, retry));
        tracing::info!(
            "Write-through worker started (queue {}, {} attempts)",
            config.queue_capacity,
            retry.max_attempts
        );

        (
            Self {
                sender: Some(sender),
                dropped: Arc::clone(&dropped),
            },
            WriteThroughWorker { handle, dropped },
        )
    }

    pub const fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Queue one changed row for propagation. Returns whether it was queued.
    pub fn notify_changed(&self, table: CatalogTable, id: impl Into<String>) -> bool {
        let Some(sender) = &self.sender else {
            tracing::trace!("Write-through disabled; ignoring {} change", table);
            return false;
        };
        let notice = ChangeNotice {
            table,
            id: id.into(),
        };

        match sender.try_send(notice) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(notice)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    "Write-through queue full; dropping {} {} (next bulk sync will carry it)",
                    notice.table,
                    notice.id
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(notice)) => {
                tracing::warn!(
                    "Write-through worker stopped; dropping {} {}",
                    notice.table,
                    notice.id
                );
                false
            }
        }
    }
}

impl WriteThroughWorker {
    /// Wait for the queue to drain and the worker to exit.
    ///
    /// The worker only exits once every [`WriteThroughHook`] clone is dropped.
    pub async fn join(self) -> WriteThroughStats {
        let mut stats = match self.handle.await {
            Ok(stats) => stats,
            Err(error) => {
                tracing::error!("Write-through worker panicked: {}", error);
                WriteThroughStats::default()
            }
        };
        stats.dropped = self.dropped.load(Ordering::Relaxed);
        stats
    }

    /// Stop immediately, abandoning queued notices.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

enum Propagation {
    Sent,
    Skipped,
}

async fn run_worker<C: RemoteConnector>(
    mut receiver: mpsc::Receiver<ChangeNotice>,
    local: Arc<LocalStore>,
    connector: Arc<C>,
    retry: RetryPolicy,
) -> WriteThroughStats {
    let mut stats = WriteThroughStats::default();

    while let Some(notice) = receiver.recv().await {
        match propagate_with_retry(&local, connector.as_ref(), &notice, retry).await {
            Ok(Propagation::Sent) => stats.propagated += 1,
            Ok(Propagation::Skipped) => stats.skipped += 1,
            Err(error) => {
                tracing::warn!(
                    "Write-through of {} {} failed: {}",
                    notice.table,
                    notice.id,
                    error
                );
                stats.failed += 1;
            }
        }
    }

    tracing::info!(
        "Write-through worker stopped: {} propagated, {} skipped, {} failed",
        stats.propagated,
        stats.skipped,
        stats.failed
    );
    stats
}

async fn propagate_with_retry<C: RemoteConnector>(
    local: &LocalStore,
    connector: &C,
    notice: &ChangeNotice,
    retry: RetryPolicy,
) -> Result<Propagation> {
    let mut attempt = 1;
    loop {
        match propagate(local, connector, notice).await {
            Ok(outcome) => return Ok(outcome),
            Err(Error::SyncNotConfigured) => {
                tracing::debug!("Sync not configured; skipping write-through of {}", notice.id);
                return Ok(Propagation::Skipped);
            }
            Err(error) if attempt >= retry.max_attempts || error.is_configuration() => {
                return Err(error);
            }
            Err(error) => {
                tracing::debug!(
                    "Write-through attempt {} for {} {} failed: {}",
                    attempt,
                    notice.table,
                    notice.id,
                    error
                );
                tokio::time::sleep(retry.backoff * attempt).await;
                attempt += 1;
            }
        }
    }
}

/// The row travels as-is, including its `deleted_at` value.
async fn propagate<C: RemoteConnector>(
    local: &LocalStore,
    connector: &C,
    notice: &ChangeNotice,
) -> Result<Propagation> {
    let credentials = LocalSettingsRepository::new(local)
        .load_credentials()
        .await?
        .ok_or(Error::SyncNotConfigured)?;

    let rows = local
        .execute(
            &format!("SELECT * FROM {} WHERE id = ?", notice.table),
            vec![notice.id.as_str().into()],
        )
        .await?
        .rows;
    let Some(row) = rows.first() else {
        tracing::debug!("{} {} no longer exists locally", notice.table, notice.id);
        return Ok(Propagation::Skipped);
    };

    let remote = connector.connect(&credentials).await?;
    upsert_row(remote.as_ref(), notice.table, row).await?;
    tracing::debug!("Propagated {} {} to remote", notice.table, notice.id);
    Ok(Propagation::Sent)
}
