use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};

/// One observed clipboard value. Never mutated after construction; the
/// cache replaces the whole snapshot instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardSnapshot {
    pub content: Vec<u8>,
    /// `None` only for the initial empty snapshot.
    pub observed_at: Option<DateTime<Utc>>,
}

impl ClipboardSnapshot {
    fn empty() -> Self {
        Self {
            content: Vec::new(),
            observed_at: None,
        }
    }
}

/// Single-slot "last known clipboard" shared between the poller and readers.
///
/// Updates publish a complete new [`ClipboardSnapshot`] with one atomic
/// pointer swap, so a reader always sees content and timestamp from the same
/// update. Concurrent writers resolve last-write-wins.
pub struct ClipboardCache {
    current: ArcSwap<ClipboardSnapshot>,
}

impl ClipboardCache {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(ClipboardSnapshot::empty()),
        }
    }

    /// Stores `content` if it is non-empty and differs from the current
    /// snapshot. Returns whether a new snapshot was published.
    pub fn update(&self, content: &[u8]) -> bool {
        if content.is_empty() || self.current.load().content == content {
            return false;
        }
        self.current.store(Arc::new(ClipboardSnapshot {
            content: content.to_vec(),
            observed_at: Some(Utc::now()),
        }));
        true
    }

    /// Returns the latest fully-formed snapshot.
    pub fn read(&self) -> Arc<ClipboardSnapshot> {
        self.current.load_full()
    }
}

impl Default for ClipboardCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn starts_empty_without_timestamp() {
        let cache = ClipboardCache::new();
        let snap = cache.read();
        assert!(snap.content.is_empty());
        assert!(snap.observed_at.is_none());
    }

    #[test]
    fn first_update_is_a_change() {
        let cache = ClipboardCache::new();
        assert!(cache.update(b"initial-content"));
        let snap = cache.read();
        assert_eq!(snap.content, b"initial-content");
        assert!(snap.observed_at.is_some());
    }

    #[test]
    fn repeated_identical_updates_are_not_changes() {
        let cache = ClipboardCache::new();
        assert!(cache.update(b"same"));
        assert!(!cache.update(b"same"));
        assert!(!cache.update(b"same"));
    }

    #[test]
    fn new_content_replaces_old() {
        let cache = ClipboardCache::new();
        cache.update(b"initial-content");
        assert!(cache.update(b"new-content"));
        assert_eq!(cache.read().content, b"new-content");
    }

    #[test]
    fn empty_update_is_ignored() {
        let cache = ClipboardCache::new();
        cache.update(b"kept");
        let before = cache.read();
        assert!(!cache.update(b""));
        assert_eq!(cache.read(), before);
    }

    #[test]
    fn changed_content_gets_a_fresh_timestamp() {
        let cache = ClipboardCache::new();
        cache.update(b"a");
        let first = cache.read().observed_at.unwrap();
        cache.update(b"b");
        let second = cache.read().observed_at.unwrap();
        assert!(second >= first);
    }

    #[test]
    fn held_snapshot_is_unaffected_by_later_updates() {
        let cache = ClipboardCache::new();
        cache.update(b"one");
        let held = cache.read();
        cache.update(b"two");
        assert_eq!(held.content, b"one");
        assert_eq!(cache.read().content, b"two");
    }

    // ── concurrency ───────────────────────────────────────────────────────────

    #[test]
    fn concurrent_updates_never_produce_torn_snapshots() {
        let cache = Arc::new(ClipboardCache::new());
        let writers = 16;
        let per_writer = 200;

        let mut handles = Vec::new();
        for id in 0..writers {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for n in 0..per_writer {
                    cache.update(format!("content-{id}-{n}").as_bytes());
                }
            }));
        }

        let reader = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let mut seen = 0;
                for _ in 0..5_000 {
                    let snap = cache.read();
                    // Content and timestamp must come from the same update.
                    assert_eq!(snap.content.is_empty(), snap.observed_at.is_none());
                    if !snap.content.is_empty() {
                        let text = std::str::from_utf8(&snap.content).unwrap();
                        assert!(text.starts_with("content-"));
                        seen += 1;
                    }
                }
                seen
            })
        };

        for handle in handles {
            handle.join().unwrap();
        }
        reader.join().unwrap();

        let last = cache.read();
        let text = String::from_utf8(last.content.clone()).unwrap();
        let valid: HashSet<String> = (0..writers)
            .flat_map(|id| (0..per_writer).map(move |n| format!("content-{id}-{n}")))
            .collect();
        assert!(valid.contains(&text));
        assert!(last.observed_at.is_some());
    }

    #[test]
    fn snapshot_timestamps_follow_publish_order() {
        let cache = Arc::new(ClipboardCache::new());
        let stamps: Vec<_> = (0..50)
            .map(|n| {
                cache.update(format!("v{n}").as_bytes());
                cache.read()
            })
            .collect();
        for pair in stamps.windows(2) {
            assert_ne!(pair[0].content, pair[1].content);
            assert!(pair[1].observed_at >= pair[0].observed_at);
        }
    }
}
