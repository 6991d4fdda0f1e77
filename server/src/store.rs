//! Content-addressed overflow files with TTL eviction.
//!
//! Payloads too large to return inline are written to
//!   `<dir>/mcp-clip-<unix-timestamp>-<sha256-hex>.<extension>`
//! Identical bytes written within the same second map to the same path, so a
//! second write is skipped. Every write first sweeps files whose embedded
//! timestamp is older than the TTL; there is no background timer.
//!
//! Concurrency relies on the filesystem. Content is staged in a private
//! temp file and published with a no-clobber rename, so a published name
//! only ever holds complete content. Deleting a file that is already gone is
//! not an error.
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::error::StoreError;
use crate::paths::{self, FILENAME_PREFIX};

/// Staging files never carry [`FILENAME_PREFIX`], so sweeps leave them alone.
const PARTIAL_PREFIX: &str = ".mcp-clip-partial-";

/// Result of one eviction sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub errors: usize,
}

pub struct OverflowStore {
    dir: PathBuf,
    ttl: Duration,
}

impl OverflowStore {
    pub fn new(dir: PathBuf, ttl: Duration) -> Self {
        Self { dir, ttl }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sweeps expired files, then writes `data` under its content-addressed
    /// name. Returns the path of the (new or pre-existing) file.
    pub fn write(&self, data: &[u8], extension: &str) -> Result<PathBuf, StoreError> {
        self.write_at(data, extension, Utc::now())
    }

    pub(crate) fn write_at(
        &self,
        data: &[u8],
        extension: &str,
        now: DateTime<Utc>,
    ) -> Result<PathBuf, StoreError> {
        // Best effort: a failed sweep never blocks the write.
        if let Err(e) = self.sweep_at(now) {
            tracing::debug!(error = %e, "cleanup warning");
        }

        std::fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let hash = content_hash(data);
        let path = paths::overflow_file_path(&self.dir, now.timestamp(), &hash, extension);

        if path.is_file() {
            tracing::debug!(path = %path.display(), "temp file already exists, reusing");
            return Ok(path);
        }

        // Created 0600 on unix. Dropped (and deleted) on every early return.
        let mut partial = tempfile::Builder::new()
            .prefix(PARTIAL_PREFIX)
            .tempfile_in(&self.dir)
            .map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })?;
        if let Err(source) = partial.write_all(data).and_then(|()| partial.flush()) {
            return Err(StoreError::Io {
                path: partial.path().to_path_buf(),
                source,
            });
        }

        match partial.persist_noclobber(&path) {
            Ok(_) => {
                tracing::debug!(path = %path.display(), bytes = data.len(), "created temp file");
                Ok(path)
            }
            // A concurrent writer published the same content first.
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                tracing::debug!(path = %path.display(), "temp file already exists, reusing");
                Ok(path)
            }
            Err(e) => Err(StoreError::Io {
                path,
                source: e.error,
            }),
        }
    }

    /// Removes prefixed entries that are expired or carry no parseable
    /// timestamp. Files without the prefix are never touched, and neither are
    /// directories. Symlinks are removed, never their targets.
    pub fn sweep(&self) -> Result<SweepReport, StoreError> {
        self.sweep_at(Utc::now())
    }

    pub(crate) fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
        let cutoff = cutoff(now, self.ttl);
        let entries = std::fs::read_dir(&self.dir).map_err(|source| StoreError::ListDir {
            dir: self.dir.clone(),
            source,
        })?;

        let mut report = SweepReport::default();
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            if !file_name
                .as_encoded_bytes()
                .starts_with(FILENAME_PREFIX.as_bytes())
            {
                continue;
            }
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(true) {
                continue;
            }
            // Lossy is enough: only the ASCII timestamp segment is parsed.
            if !should_remove(&file_name.to_string_lossy(), cutoff) {
                continue;
            }

            let path = entry.path();
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    report.removed += 1;
                    tracing::debug!(path = %path.display(), "removed expired file");
                }
                // Another sweep got there first.
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    report.errors += 1;
                    tracing::debug!(path = %path.display(), error = %e, "failed to remove expired file");
                }
            }
        }

        if report.removed > 0 || report.errors > 0 {
            tracing::debug!(
                removed = report.removed,
                errors = report.errors,
                "cleanup complete"
            );
        }
        Ok(report)
    }
}

/// Lowercase hex SHA-256 of `data`.
pub fn content_hash(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Instant before which files are expired, at full clock precision.
fn cutoff(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_sub_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Expired iff the embedded second is strictly before `cutoff`; names
/// without a parseable timestamp are always expired.
pub fn should_remove(file_name: &str, cutoff: DateTime<Utc>) -> bool {
    if !file_name.starts_with(FILENAME_PREFIX) {
        return false;
    }
    match paths::parse_created_at(file_name) {
        Some(created_at) => match DateTime::<Utc>::from_timestamp(created_at, 0) {
            Some(created) => created < cutoff,
            // Out of chrono's range: only the far past counts as expired.
            None => created_at < 0,
        },
        None => true,
    }
}
