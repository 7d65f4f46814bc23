//! Time-based retention.
//!
//! A periodic task deletes versions older than the retention window in one
//! bulk statement. A failed sweep is logged and simply retried on the next
//! scheduled tick; it never escalates. Tracked files are never deleted,
//! even when all their versions are purged.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::database::Database;

/// How often the sweeper runs.
pub const SWEEP_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// How long a version is kept.
pub const RETENTION_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Run the sweeper until shutdown is signalled.
pub async fn run(database: Database, mut shutdown_rx: watch::Receiver<()>) {
    let mut ticker = tokio::time::interval(SWEEP_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of `interval` fires immediately; use it as the
    // startup sweep.
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match sweep(&database, RETENTION_WINDOW).await {
                    Ok(removed) => {
                        tracing::info!(removed, "retention sweep removed versions");
                    }
                    Err(e) => {
                        tracing::error!("retention sweep failed, deferring to next run: {}", e);
                    }
                }
            }
            _ = shutdown_rx.changed() => {
                tracing::debug!("retention sweeper shutting down");
                return;
            }
        }
    }
}

/// Delete every version older than `window`, returning the count removed.
pub async fn sweep(database: &Database, window: Duration) -> Result<u64, sqlx::Error> {
    let cutoff = chrono::Utc::now().timestamp() - window.as_secs() as i64;
    database.delete_versions_older_than(cutoff).await
}
