//! Process running flag and the set of overflow files created this session.
//!
//! The flag gates two things: the single poller instance (`try_start`) and
//! session file tracking (`add`). Flag transitions to "stopped" happen under
//! the same lock that guards the file set, so no path can be tracked once
//! `stop` has returned. Files created by requests that finish after that are
//! left for the next startup sweep.
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

pub struct SessionTracker {
    running: AtomicBool,
    files: Mutex<HashSet<PathBuf>>,
}

/// Outcome of [`SessionTracker::drain_and_delete`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub removed: usize,
    pub failed: usize,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            files: Mutex::new(HashSet::new()),
        }
    }

    /// Moves the flag from stopped to running. Returns `false` if it was
    /// already running.
    pub fn try_start(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Moves the flag from running to stopped. Returns `false` if it was
    /// already stopped.
    pub fn stop(&self) -> bool {
        let _files = self.files.lock();
        self.running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Tracks `path` for deletion at shutdown. A no-op once stopped.
    pub fn add(&self, path: &Path) -> bool {
        let mut files = self.files.lock();
        if !self.running.load(Ordering::Acquire) {
            return false;
        }
        files.insert(path.to_path_buf());
        true
    }

    pub fn len(&self) -> usize {
        self.files.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.lock().is_empty()
    }

    /// Deletes every tracked file and clears the set. Failures are logged
    /// and counted; an already-missing file counts as removed.
    pub fn drain_and_delete(&self) -> DrainReport {
        let paths: Vec<PathBuf> = self.files.lock().drain().collect();
        let mut report = DrainReport::default();
        for path in paths {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "removed session file");
                    report.removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => report.removed += 1,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove session file");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    // ── running flag ──────────────────────────────────────────────────────────

    #[test]
    fn second_start_is_rejected() {
        let session = SessionTracker::new();
        assert!(session.try_start());
        assert!(!session.try_start());
        assert!(session.is_running());
    }

    #[test]
    fn stop_is_idempotent() {
        let session = SessionTracker::new();
        session.try_start();
        assert!(session.stop());
        assert!(!session.stop());
        assert!(!session.is_running());
    }

    #[test]
    fn concurrent_starts_admit_exactly_one() {
        let session = Arc::new(SessionTracker::new());
        let handles: Vec<_> = (0..50)
            .map(|_| {
                let session = Arc::clone(&session);
                thread::spawn(move || session.try_start())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    // ── add ───────────────────────────────────────────────────────────────────

    #[test]
    fn add_while_running_tracks_path() {
        let session = SessionTracker::new();
        session.try_start();
        assert!(session.add(Path::new("/tmp/test1.txt")));
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn add_while_stopped_is_a_no_op() {
        let session = SessionTracker::new();
        session.try_start();
        session.add(Path::new("/tmp/test1.txt"));
        session.stop();
        assert!(!session.add(Path::new("/tmp/test2.txt")));
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn add_before_start_is_a_no_op() {
        let session = SessionTracker::new();
        assert!(!session.add(Path::new("/tmp/test1.txt")));
        assert!(session.is_empty());
    }

    #[test]
    fn duplicate_paths_are_tracked_once() {
        let session = SessionTracker::new();
        session.try_start();
        session.add(Path::new("/tmp/same.txt"));
        session.add(Path::new("/tmp/same.txt"));
        assert_eq!(session.len(), 1);
    }

    // ── drain_and_delete ──────────────────────────────────────────────────────

    #[test]
    fn drain_deletes_tracked_files_and_empties_set() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("mcp-clip-1-a.txt");
        let b = dir.path().join("mcp-clip-1-b.txt");
        std::fs::write(&a, "a").unwrap();
        std::fs::write(&b, "b").unwrap();

        let session = SessionTracker::new();
        session.try_start();
        session.add(&a);
        session.add(&b);

        let report = session.drain_and_delete();
        assert_eq!(report, DrainReport { removed: 2, failed: 0 });
        assert!(!a.exists());
        assert!(!b.exists());
        assert!(session.is_empty());
    }

    #[test]
    fn drain_on_empty_set_is_safe() {
        let session = SessionTracker::new();
        assert_eq!(session.drain_and_delete(), DrainReport::default());
        assert_eq!(session.drain_and_delete(), DrainReport::default());
    }

    #[test]
    fn drain_tolerates_already_deleted_files() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("mcp-clip-1-gone.txt");

        let session = SessionTracker::new();
        session.try_start();
        session.add(&gone);

        assert_eq!(session.drain_and_delete(), DrainReport { removed: 1, failed: 0 });
        assert!(session.is_empty());
    }

    #[test]
    fn drain_after_stop_still_deletes_earlier_files() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("mcp-clip-1-kept.txt");
        let late = dir.path().join("mcp-clip-1-late.txt");
        std::fs::write(&kept, "x").unwrap();
        std::fs::write(&late, "y").unwrap();

        let session = SessionTracker::new();
        session.try_start();
        session.add(&kept);
        session.stop();
        session.add(&late);

        session.drain_and_delete();
        assert!(!kept.exists());
        assert!(late.exists(), "late file is left for the startup sweep");
    }
}
