//! Per-path event coalescing.
//!
//! A save from an office application arrives as a burst of raw filesystem
//! events. The engine keeps at most one pending timer per path; every new
//! event for that path cancels and replaces the previous timer, so exactly
//! one capture fires, one quiet period after the last event of the burst.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Default quiet period after the last qualifying event.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(1);

/// Receiver of debounced capture triggers.
///
/// The seam exists so the engine can be exercised against a recording
/// sink in tests; in production the capture pipeline implements it.
#[async_trait::async_trait]
pub trait CaptureSink: Send + Sync + 'static {
    async fn capture(&self, path: &Path);
}

struct PendingTimer {
    token: u64,
    handle: JoinHandle<()>,
}

/// Registry of pending per-path timers.
///
/// Injected into the engine rather than living in a process-global map so
/// engines in tests are fully isolated from one another.
#[derive(Default)]
pub struct PendingChanges {
    timers: Mutex<HashMap<PathBuf, PendingTimer>>,
    next_token: AtomicU64,
}

impl PendingChanges {
    pub fn len(&self) -> usize {
        self.timers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.lock().is_empty()
    }
}

/// Coalesces bursts of raw events into single capture triggers.
#[derive(Clone)]
pub struct DebounceEngine {
    pending: Arc<PendingChanges>,
    sink: Arc<dyn CaptureSink>,
    quiet_period: Duration,
}

impl DebounceEngine {
    pub fn new(pending: Arc<PendingChanges>, sink: Arc<dyn CaptureSink>) -> Self {
        Self::with_quiet_period(pending, sink, DEFAULT_QUIET_PERIOD)
    }

    pub fn with_quiet_period(
        pending: Arc<PendingChanges>,
        sink: Arc<dyn CaptureSink>,
        quiet_period: Duration,
    ) -> Self {
        Self {
            pending,
            sink,
            quiet_period,
        }
    }

    /// Record one qualifying raw event for `path`.
    ///
    /// Cancels any pending timer for the same path and arms a fresh one.
    /// Timers for different paths are independent and run in parallel.
    pub fn notify(&self, path: &Path) {
        let path = path.to_path_buf();
        let pending = self.pending.clone();
        let sink = self.sink.clone();
        let quiet_period = self.quiet_period;
        let token = self.pending.next_token.fetch_add(1, Ordering::Relaxed);

        let mut timers = self.pending.timers.lock();
        if let Some(superseded) = timers.remove(&path) {
            superseded.handle.abort();
        }

        let timer_path = path.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            {
                // Deregister before capturing, so a fresh event arriving
                // mid-capture arms a new timer instead of cancelling the
                // capture already in flight. The token check keeps a timer
                // that was superseded while waking up from evicting its
                // successor's entry.
                let mut timers = pending.timers.lock();
                match timers.get(&timer_path) {
                    Some(t) if t.token == token => {
                        timers.remove(&timer_path);
                    }
                    _ => return,
                }
            }
            sink.capture(&timer_path).await;
        });

        timers.insert(path, PendingTimer { token, handle });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    struct RecordingSink {
        fired: Mutex<Vec<(PathBuf, Instant)>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                fired: Mutex::new(Vec::new()),
            })
        }

        fn fired(&self) -> Vec<(PathBuf, Instant)> {
            self.fired.lock().clone()
        }
    }

    #[async_trait::async_trait]
    impl CaptureSink for RecordingSink {
        async fn capture(&self, path: &Path) {
            self.fired.lock().push((path.to_path_buf(), Instant::now()));
        }
    }

    fn engine(sink: Arc<RecordingSink>, quiet: Duration) -> DebounceEngine {
        DebounceEngine::with_quiet_period(Arc::new(PendingChanges::default()), sink, quiet)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_one_capture() {
        let sink = RecordingSink::new();
        let engine = engine(sink.clone(), Duration::from_secs(1));
        let path = PathBuf::from("/docs/report.xlsx");

        let start = Instant::now();
        // Events at t=0, t=0.2s, t=0.5s
        engine.notify(&path);
        tokio::time::sleep(Duration::from_millis(200)).await;
        engine.notify(&path);
        tokio::time::sleep(Duration::from_millis(300)).await;
        engine.notify(&path);

        tokio::time::sleep(Duration::from_secs(5)).await;

        let fired = sink.fired();
        assert_eq!(fired.len(), 1);
        // Exactly one capture, one quiet period after the last event
        assert!(fired[0].1.duration_since(start) >= Duration::from_millis(1500));
        assert_eq!(fired[0].0, path);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_capture_separately() {
        let sink = RecordingSink::new();
        let engine = engine(sink.clone(), Duration::from_secs(1));
        let path = PathBuf::from("/docs/report.xlsx");

        engine.notify(&path);
        tokio::time::sleep(Duration::from_secs(3)).await;
        engine.notify(&path);
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(sink.fired().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paths_debounce_independently() {
        let sink = RecordingSink::new();
        let engine = engine(sink.clone(), Duration::from_secs(1));

        engine.notify(Path::new("/docs/a.xlsx"));
        engine.notify(Path::new("/docs/b.xlsx"));
        tokio::time::sleep(Duration::from_secs(2)).await;

        let mut fired: Vec<_> = sink.fired().into_iter().map(|(p, _)| p).collect();
        fired.sort();
        assert_eq!(
            fired,
            vec![PathBuf::from("/docs/a.xlsx"), PathBuf::from("/docs/b.xlsx")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_entry_cleared_after_fire() {
        let sink = RecordingSink::new();
        let pending = Arc::new(PendingChanges::default());
        let engine =
            DebounceEngine::with_quiet_period(pending.clone(), sink, Duration::from_secs(1));

        engine.notify(Path::new("/docs/a.xlsx"));
        assert_eq!(pending.len(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(pending.is_empty());
    }
}
