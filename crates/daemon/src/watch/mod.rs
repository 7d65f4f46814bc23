//! Recursive directory watching.
//!
//! One `RecommendedWatcher` plus one event-drain task per watched root.
//! Raw events are filtered down to qualifying spreadsheet files and handed
//! to the debounce engine; everything else is dropped silently.
//!
//! Policy note: the watcher runs in recursive mode, which also tracks
//! directories created after watch-start. That is the stricter of the two
//! coverage policies the contract allows.

pub mod debounce;
pub mod stability;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;

use debounce::DebounceEngine;

/// File extensions that qualify for capture, compared case-insensitively.
const RECOGNIZED_EXTENSIONS: [&str; 2] = ["xls", "xlsx"];

/// Prefix office applications use for transient lock/temp files. Always
/// ignored.
const LOCK_FILE_PREFIX: &str = "~$";

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("path is not a directory: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("already watching: {}", .0.display())]
    AlreadyWatching(PathBuf),

    #[error("failed to register watch: {0}")]
    Notify(#[from] notify::Error),
}

/// An active recursive watch on one root directory.
///
/// Dropping it stops the underlying watcher, which closes the event
/// channel and ends the drain task. Watches live for the process lifetime;
/// there is no unwatch operation.
struct RootWatch {
    _watcher: RecommendedWatcher,
    _drain: tokio::task::JoinHandle<()>,
}

/// Registry of root path → active watch.
///
/// Injected into the manager rather than living in a process-global map so
/// managers in tests are fully isolated from one another.
#[derive(Default)]
pub struct WatchRegistry(Mutex<HashMap<PathBuf, RootWatch>>);

impl WatchRegistry {
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }
}

/// Registers recursive watches and routes raw events to the debouncer.
#[derive(Clone)]
pub struct WatchManager {
    registry: Arc<WatchRegistry>,
    debounce: DebounceEngine,
}

impl WatchManager {
    pub fn new(registry: Arc<WatchRegistry>, debounce: DebounceEngine) -> Self {
        Self { registry, debounce }
    }

    /// Start watching a directory tree.
    ///
    /// Returns the canonical root path on success. A second request for an
    /// already-registered root is rejected, not merged or restarted.
    pub async fn watch(&self, root: &Path) -> Result<PathBuf, WatchError> {
        let meta = tokio::fs::metadata(root)
            .await
            .map_err(|_| WatchError::InvalidPath(root.to_path_buf()))?;
        if !meta.is_dir() {
            return Err(WatchError::InvalidPath(root.to_path_buf()));
        }
        let root = tokio::fs::canonicalize(root)
            .await
            .map_err(|_| WatchError::InvalidPath(root.to_path_buf()))?;

        let mut registry = self.registry.0.lock();
        if registry.contains_key(&root) {
            return Err(WatchError::AlreadyWatching(root));
        }

        let (events_tx, events_rx) = flume::unbounded();
        let mut watcher = notify::recommended_watcher(move |result| {
            // Watcher threads must never block; drop is fine once the
            // receiving side has gone away.
            let _ = events_tx.send(result);
        })?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        let debounce = self.debounce.clone();
        let drain_root = root.clone();
        let drain = tokio::spawn(async move {
            while let Ok(result) = events_rx.recv_async().await {
                match result {
                    Ok(event) => route_event(&debounce, &event),
                    Err(e) => {
                        tracing::warn!(root = %drain_root.display(), "watch error: {}", e);
                    }
                }
            }
            tracing::debug!(root = %drain_root.display(), "watch event loop ended");
        });

        tracing::info!(root = %root.display(), "watching directory tree");
        registry.insert(
            root.clone(),
            RootWatch {
                _watcher: watcher,
                _drain: drain,
            },
        );

        Ok(root)
    }
}

/// Forward each qualifying path of a raw event to the debouncer.
fn route_event(debounce: &DebounceEngine, event: &Event) {
    if !(event.kind.is_create() || event.kind.is_modify()) {
        return;
    }
    for path in &event.paths {
        if is_capture_candidate(path) {
            debounce.notify(path);
        }
    }
}

/// Whether a path names a spreadsheet we version, excluding the transient
/// lock files office applications leave next to open documents.
fn is_capture_candidate(path: &Path) -> bool {
    let has_recognized_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            RECOGNIZED_EXTENSIONS
                .iter()
                .any(|known| e.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false);

    let is_lock_file = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with(LOCK_FILE_PREFIX))
        .unwrap_or(false);

    has_recognized_ext && !is_lock_file
}
