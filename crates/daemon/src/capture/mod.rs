//! Version capture pipeline.
//!
//! One capture is read → digest → dedup check → compress → seal → persist,
//! executed as a single transaction against the store. A process-wide
//! capture lock serializes captures (and restores) so concurrent attempts
//! can never race on version-number assignment. The lock is coarser than
//! per-file sharding, which is acceptable because debouncing already
//! rate-limits captures.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use common::prelude::{compress, content_hash, CodecError, EnvelopeError, EnvelopeKey};

use crate::database::{queries, Database};
use crate::watch::debounce::CaptureSink;
use crate::watch::stability::{self, wait_until_stable, Stability};

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),
}

/// What a capture attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// A new version was persisted.
    Captured { file_id: i64, version_number: i64 },
    /// Content hash matched the last capture; nothing stored.
    Unchanged,
    /// The file was unreadable or gone. Not an error; never retried.
    Vanished,
}

#[derive(Clone)]
pub struct CapturePipeline {
    database: Database,
    key: EnvelopeKey,
    capture_lock: Arc<tokio::sync::Mutex<()>>,
    poll_interval: Duration,
}

impl CapturePipeline {
    pub fn new(
        database: Database,
        key: EnvelopeKey,
        capture_lock: Arc<tokio::sync::Mutex<()>>,
    ) -> Self {
        Self {
            database,
            key,
            capture_lock,
            poll_interval: stability::DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the stability poll interval. Tests use a short interval so
    /// captures settle quickly.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Capture the current content of `path` as a new version.
    ///
    /// Holds the capture lock for the full read-through-commit sequence.
    /// On any failure the transaction rolls back whole: no partial
    /// version, no stale hash update.
    pub async fn capture(&self, path: &Path) -> Result<CaptureOutcome, CaptureError> {
        let _guard = self.capture_lock.lock().await;

        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            // Busy or removed since the event fired; abort without
            // touching the store.
            Err(_) => return Ok(CaptureOutcome::Vanished),
        };

        let hash = content_hash(&data);
        let path_str = path.to_string_lossy().into_owned();
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path_str.clone());
        let now = chrono::Utc::now().timestamp();

        let mut tx = self.database.begin().await?;

        let file_id = match queries::find_file_by_path(&mut tx, &path_str).await? {
            Some((_, Some(last_hash))) if last_hash == hash => {
                // Resave without change; dropping the transaction rolls
                // it back.
                return Ok(CaptureOutcome::Unchanged);
            }
            Some((id, _)) => id,
            None => queries::insert_file(&mut tx, &path_str, &display_name, now).await?,
        };

        let version_number = queries::next_version_number(&mut tx, file_id).await?;

        let payload = self.key.seal(&compress(&data)?)?;
        queries::insert_version(&mut tx, file_id, version_number, &payload, now).await?;
        queries::set_file_hash(&mut tx, file_id, &hash).await?;

        tx.commit().await?;

        Ok(CaptureOutcome::Captured {
            file_id,
            version_number,
        })
    }
}

#[async_trait::async_trait]
impl CaptureSink for CapturePipeline {
    /// Entry point from the debounce engine: wait for the write to settle,
    /// then run the pipeline. Failures are logged, never retried, and never
    /// affect other files' timers.
    async fn capture(&self, path: &Path) {
        if wait_until_stable(path, self.poll_interval).await == Stability::Vanished {
            tracing::debug!(path = %path.display(), "file vanished before stabilizing, capture aborted");
            return;
        }

        match CapturePipeline::capture(self, path).await {
            Ok(CaptureOutcome::Captured {
                file_id,
                version_number,
            }) => {
                tracing::info!(
                    path = %path.display(),
                    file_id,
                    version_number,
                    "captured version"
                );
            }
            Ok(CaptureOutcome::Unchanged) => {
                tracing::debug!(path = %path.display(), "content unchanged, capture skipped");
            }
            Ok(CaptureOutcome::Vanished) => {
                tracing::debug!(path = %path.display(), "file unreadable, capture aborted");
            }
            Err(e) => {
                tracing::error!(path = %path.display(), "capture failed: {}", e);
            }
        }
    }
}
