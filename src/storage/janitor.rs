//! Delayed artifact deletion
//!
//! Every published artifact gets a cancellable deletion timer. Timers are
//! keyed by path, so scheduling the same path again replaces the pending
//! timer instead of racing it.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

struct Inner {
    ttl: Duration,
    pending: Mutex<HashMap<PathBuf, Pending>>,
    generation: AtomicU64,
}

/// Process-wide scheduler for artifact deletion
#[derive(Clone)]
pub struct Janitor {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Janitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Janitor")
            .field("ttl", &self.inner.ttl)
            .field("pending", &self.pending())
            .finish()
    }
}

impl Janitor {
    /// Create a janitor that deletes files `ttl` after they are scheduled
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                ttl,
                pending: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Delete `path` once the TTL elapses. An existing timer for the same
    /// path is aborted and replaced.
    pub fn schedule(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);

        // Hold the lock across spawn so the timer cannot look up its entry
        // before it is inserted.
        let mut pending = self.inner.pending.lock();
        let handle = tokio::spawn(expire(
            Arc::downgrade(&self.inner),
            path.clone(),
            generation,
            self.inner.ttl,
        ));

        if let Some(previous) = pending.insert(path.clone(), Pending { generation, handle }) {
            previous.handle.abort();
            debug!("Rescheduled deletion of {}", path.display());
        } else {
            debug!(
                "Scheduled deletion of {} in {}s",
                path.display(),
                self.inner.ttl.as_secs()
            );
        }
    }

    /// Push back the deletion of `path` if one is pending.
    ///
    /// Returns `false` when nothing was scheduled for it.
    pub fn reschedule(&self, path: &Path) -> bool {
        if !self.inner.pending.lock().contains_key(path) {
            return false;
        }
        self.schedule(path);
        true
    }

    /// Abort the pending deletion of `path`, leaving the file in place
    pub fn cancel(&self, path: &Path) -> bool {
        match self.inner.pending.lock().remove(path) {
            Some(entry) => {
                entry.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Whether a deletion is pending for `path`
    pub fn is_pending(&self, path: &Path) -> bool {
        self.inner.pending.lock().contains_key(path)
    }

    /// Number of pending deletions
    pub fn pending(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Abort every pending timer. Files already on disk stay there.
    pub fn shutdown(&self) {
        let drained: Vec<_> = self.inner.pending.lock().drain().collect();
        if !drained.is_empty() {
            info!("Abandoning {} pending artifact deletions", drained.len());
        }
        for (_, entry) in drained {
            entry.handle.abort();
        }
    }
}

async fn expire(inner: std::sync::Weak<Inner>, path: PathBuf, generation: u64, ttl: Duration) {
    tokio::time::sleep(ttl).await;

    // A superseded timer must leave both the entry and the file alone
    if let Some(inner) = inner.upgrade() {
        let mut pending = inner.pending.lock();
        if pending.get(&path).map(|p| p.generation) != Some(generation) {
            debug!("Stale deletion timer for {} ignored", path.display());
            return;
        }
        pending.remove(&path);
    }

    match tokio::fs::remove_file(&path).await {
        Ok(()) => debug!("Deleted expired artifact {}", path.display()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!("Expired artifact {} already gone", path.display())
        }
        Err(err) => warn!("Failed to delete expired artifact {}: {}", path.display(), err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        tokio::fs::write(&path, b"artifact").await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_deletes_after_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let path = touch(dir.path(), "brat_deadbeef.png").await;
        let janitor = Janitor::new(Duration::from_millis(50));

        janitor.schedule(&path);
        assert!(janitor.is_pending(&path));
        assert!(path.exists());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(!path.exists());
        assert_eq!(janitor.pending(), 0);
    }

    #[tokio::test]
    async fn test_cancel_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = touch(dir.path(), "brat_cafebabe.png").await;
        let janitor = Janitor::new(Duration::from_millis(50));

        janitor.schedule(&path);
        assert!(janitor.cancel(&path));
        assert!(!janitor.cancel(&path));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_reschedule_extends_lifetime() {
        let dir = tempfile::tempdir().unwrap();
        let path = touch(dir.path(), "bratvid_0badf00d.mp4").await;
        let janitor = Janitor::new(Duration::from_millis(300));

        janitor.schedule(&path);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(janitor.reschedule(&path));

        // The first deadline passes but the replacement timer is still pending
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(path.exists());
        assert_eq!(janitor.pending(), 1);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!path.exists());
        assert_eq!(janitor.pending(), 0);
    }

    #[tokio::test]
    async fn test_superseded_timer_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = touch(dir.path(), "brat_5ca1ab1e.png").await;
        let janitor = Janitor::new(Duration::from_secs(600));

        // Generations 0 and 1; the first timer fires after being replaced
        janitor.schedule(&path);
        janitor.schedule(&path);
        expire(Arc::downgrade(&janitor.inner), path.clone(), 0, Duration::ZERO).await;

        assert!(path.exists());
        assert!(janitor.is_pending(&path));

        // The current generation still deletes
        expire(Arc::downgrade(&janitor.inner), path.clone(), 1, Duration::ZERO).await;
        assert!(!path.exists());
        assert!(!janitor.is_pending(&path));
        janitor.shutdown();
    }

    #[tokio::test]
    async fn test_reschedule_unknown_path() {
        let janitor = Janitor::new(Duration::from_secs(600));
        assert!(!janitor.reschedule(Path::new("/nonexistent/brat_x.png")));
        assert_eq!(janitor.pending(), 0);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let janitor = Janitor::new(Duration::from_millis(10));
        janitor.schedule(dir.path().join("never_written.png"));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(janitor.pending(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_aborts_timers() {
        let dir = tempfile::tempdir().unwrap();
        let path = touch(dir.path(), "brat_feedface.png").await;
        let janitor = Janitor::new(Duration::from_millis(50));

        janitor.schedule(&path);
        janitor.shutdown();
        assert_eq!(janitor.pending(), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(path.exists());
    }
}
