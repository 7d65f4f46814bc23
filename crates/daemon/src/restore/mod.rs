//! Point-in-time restore.
//!
//! Reverses the capture pipeline for one stored version: fetch the sealed
//! payload, open and decompress it, and overwrite the target file. A
//! restore is refused without side effects when the target cannot be
//! opened for exclusive write access (the document is open elsewhere).
//! Restoring never creates a new version.

use std::sync::Arc;

use common::prelude::{content_hash, decompress, CodecError, EnvelopeError, EnvelopeKey};

use crate::database::Database;

#[derive(Debug, thiserror::Error)]
pub enum RestoreError {
    #[error("unknown file or version")]
    NotFound,

    #[error("file is open in another application, close it before restoring")]
    FileLocked,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    // Stored payload failed to open or decompress: corruption, distinct
    // from not-found.
    #[error("stored version is corrupt: {0}")]
    CorruptEnvelope(#[from] EnvelopeError),

    #[error("stored version is corrupt: {0}")]
    CorruptPayload(#[from] CodecError),

    #[error("failed to write restored content: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone)]
pub struct RestoreWorkflow {
    database: Database,
    key: EnvelopeKey,
    capture_lock: Arc<tokio::sync::Mutex<()>>,
}

impl RestoreWorkflow {
    pub fn new(
        database: Database,
        key: EnvelopeKey,
        capture_lock: Arc<tokio::sync::Mutex<()>>,
    ) -> Self {
        Self {
            database,
            key,
            capture_lock,
        }
    }

    /// Overwrite the tracked file with the content of one stored version.
    ///
    /// Takes the capture lock so a restore can never interleave with a
    /// capture of the same store state. After a successful overwrite, the
    /// file's stored hash is refreshed to the restored content's digest:
    /// the watcher event raised by our own write then dedups to a no-op,
    /// and the next real edit is compared against what is actually on
    /// disk.
    pub async fn restore(&self, file_id: i64, version_number: i64) -> Result<(), RestoreError> {
        let _guard = self.capture_lock.lock().await;

        let file = self
            .database
            .get_file(file_id)
            .await?
            .ok_or(RestoreError::NotFound)?;

        // Probe for exclusive write access before touching anything. An
        // open workbook holds the file and must be closed first.
        if !is_writable(&file.path).await {
            return Err(RestoreError::FileLocked);
        }

        let payload = self
            .database
            .get_version_payload(file_id, version_number)
            .await?
            .ok_or(RestoreError::NotFound)?;

        let content = decompress(&self.key.open(&payload)?)?;

        tokio::fs::write(&file.path, &content).await?;
        self.database
            .update_file_hash(file_id, &content_hash(&content))
            .await?;

        tracing::info!(
            file_id,
            version_number,
            path = %file.path,
            "restored version"
        );

        Ok(())
    }
}

/// Attempt an exclusive-write open/close. Failure means some other process
/// (or the platform's permission model) holds the file against writing.
async fn is_writable(path: &str) -> bool {
    tokio::fs::OpenOptions::new()
        .write(true)
        .open(path)
        .await
        .is_ok()
}
