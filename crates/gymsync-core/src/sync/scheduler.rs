//! Optional background puller.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::SyncEngine;
use crate::db::RemoteConnector;

/// Run Pull every `interval` until the returned task is aborted.
///
/// The first pull happens immediately. Runs share the engine's single-flight
/// guard, so a manual operation in progress delays the next tick rather than
/// racing it. Failures of any kind are logged and the loop keeps going.
pub fn spawn_periodic_pull<C>(engine: Arc<SyncEngine<C>>, interval: Duration) -> JoinHandle<()>
where
    C: RemoteConnector + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!("Periodic pull every {:?}", interval);

        loop {
            ticker.tick().await;
            match engine.pull().await {
                Ok(report) if report.is_complete() => {
                    tracing::debug!("Periodic pull synced {} rows", report.total());
                }
                Ok(report) => {
                    tracing::warn!(
                        "Periodic pull left {} table(s) unsynced",
                        report.failures.len()
                    );
                }
                Err(error) => tracing::warn!("Periodic pull failed: {}", error),
            }
        }
    })
}
