//! Stable-write detection.
//!
//! Office applications stream large workbooks to disk; the debounce timer
//! can fire while the write is still in progress. Before reading, the
//! capture pipeline polls the file size until two consecutive samples
//! agree. This is a best-effort heuristic: a writer that pauses for longer
//! than one poll interval can still slip through.

use std::path::Path;
use std::time::Duration;

/// Default interval between size samples.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(400);

/// Outcome of waiting for a file to stabilize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stability {
    /// Two consecutive size samples agreed.
    Stable,
    /// The file disappeared while waiting. The caller must treat this as
    /// "capture aborted", not an error, and must not retry.
    Vanished,
}

/// Poll `path`'s size until it stops changing.
///
/// There is deliberately no timeout: a file that never stabilizes blocks
/// its own capture indefinitely. Each capture runs on its own task, so a
/// stuck wait never stalls event delivery or captures of other files.
pub async fn wait_until_stable(path: &Path, poll_interval: Duration) -> Stability {
    let mut last: Option<u64> = None;

    loop {
        let size = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(_) => return Stability::Vanished,
        };

        if last == Some(size) {
            return Stability::Stable;
        }
        last = Some(size);

        tokio::time::sleep(poll_interval).await;
    }
}
