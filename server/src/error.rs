use std::path::PathBuf;

use thiserror::Error;

/// Failures of the platform clipboard collaborator.
#[derive(Debug, Error)]
pub enum ClipboardError {
    /// The clipboard exists but could not be read right now (another process
    /// holds it, the bridge command failed, the payload was undecodable).
    #[error("clipboard read failed: {0}")]
    PlatformRead(String),
    /// No clipboard bridge is available in this environment.
    #[error("clipboard unavailable: {0}")]
    UnsupportedPlatform(String),
}

/// Failures writing, listing or deleting overflow files.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write temp file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to list temp files in {}: {source}", dir.display())]
    ListDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A malformed configuration value. Never fatal: callers log it and fall back
/// to the default.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid duration {value:?} for {var}: {reason}")]
    InvalidDuration {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("{var} must be a positive duration, got {value:?}")]
    NonPositiveDuration { var: &'static str, value: String },
}

/// Everything that can make an on-demand clipboard read fail.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Failed to read clipboard: {0}")]
    Clipboard(#[from] ClipboardError),
    #[error("Failed to save content to temp file: {0}")]
    Store(#[from] StoreError),
    #[error("Unknown format: {0}. Use 'text', 'base64', or 'auto'")]
    UnknownFormat(String),
    #[error("clipboard worker stopped unexpectedly: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_format_message_lists_choices() {
        let msg = ReadError::UnknownFormat("xml".into()).to_string();
        assert_eq!(msg, "Unknown format: xml. Use 'text', 'base64', or 'auto'");
    }

    #[test]
    fn store_error_names_the_path() {
        let err = StoreError::Io {
            path: PathBuf::from("/tmp/mcp-clip-1-ab.txt"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().contains("/tmp/mcp-clip-1-ab.txt"));
    }

    #[test]
    fn clipboard_error_converts_into_read_error() {
        let err: ReadError = ClipboardError::PlatformRead("busy".into()).into();
        assert_eq!(err.to_string(), "Failed to read clipboard: clipboard read failed: busy");
    }
}
