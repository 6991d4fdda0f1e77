//! On-demand `read_clipboard` path.
//!
//! Always reads the live clipboard; the poller's cache is never consulted.
//! Small text is returned inline, images always go to an overflow file, and
//! other binary is base64-encoded and returned inline or overflowed by size.
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine as _;

use crate::classify::{self, ContentKind, ImageFormat};
use crate::clipboard::ClipboardSource;
use crate::config::MAX_DIRECT_OUTPUT;
use crate::error::ReadError;
use crate::state::ServerState;
use crate::store::OverflowStore;

/// How the caller wants the clipboard rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadFormat {
    /// Detect text / image / binary from the bytes.
    #[default]
    Auto,
    /// Always treat the payload as text.
    Text,
    /// Always base64-encode the payload.
    Base64,
}

impl ReadFormat {
    /// Parses the optional `format` argument. Absent or empty means `auto`.
    pub fn parse(value: Option<&str>) -> Result<Self, ReadError> {
        match value.unwrap_or("") {
            "" | "auto" => Ok(Self::Auto),
            "text" => Ok(Self::Text),
            "base64" => Ok(Self::Base64),
            other => Err(ReadError::UnknownFormat(other.to_string())),
        }
    }
}

/// What a read produced. Rendered to text for the client via `Display`.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Empty,
    /// Text returned as-is (`format = text`).
    RawText(String),
    /// Text returned with a header (`format = auto`).
    Text(String),
    TextOverflow { path: PathBuf, size: usize },
    Base64(String),
    Base64Overflow { path: PathBuf, size: usize },
    BinaryBase64(String),
    BinaryOverflow { path: PathBuf, size: usize },
    Image { path: PathBuf, format: ImageFormat, size: usize },
}

impl ReadOutcome {
    /// Overflow file backing this outcome, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::TextOverflow { path, .. }
            | Self::Base64Overflow { path, .. }
            | Self::BinaryOverflow { path, .. }
            | Self::Image { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for ReadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Clipboard is empty"),
            Self::RawText(text) => f.write_str(text),
            Self::Text(text) => write!(f, "Clipboard text content:\n{text}"),
            Self::TextOverflow { path, size } => write!(
                f,
                "Clipboard text content too large ({size} bytes). Saved to: {}",
                path.display()
            ),
            Self::Base64(encoded) => write!(f, "Base64 encoded clipboard content:\n{encoded}"),
            Self::Base64Overflow { path, size } => write!(
                f,
                "Base64 encoded clipboard content too large ({size} bytes). Saved to: {}",
                path.display()
            ),
            Self::BinaryBase64(encoded) => {
                write!(f, "Clipboard binary content (base64 encoded):\n{encoded}")
            }
            Self::BinaryOverflow { path, size } => write!(
                f,
                "Clipboard binary content too large ({size} bytes base64). Saved to: {}",
                path.display()
            ),
            Self::Image { path, format, size } => write!(
                f,
                "Clipboard image content ({format}, {size} bytes). Saved to: {}",
                path.display()
            ),
        }
    }
}

/// Serves `read_clipboard` calls. Cheap to clone; one per in-flight request.
#[derive(Clone)]
pub struct ClipboardReader {
    source: Arc<dyn ClipboardSource>,
    store: Arc<OverflowStore>,
    state: Arc<ServerState>,
}

impl ClipboardReader {
    pub fn new(
        source: Arc<dyn ClipboardSource>,
        store: Arc<OverflowStore>,
        state: Arc<ServerState>,
    ) -> Self {
        Self {
            source,
            store,
            state,
        }
    }

    /// Reads the live clipboard and renders it per `format`. Blocking
    /// platform and filesystem work runs on the blocking pool.
    pub async fn read(&self, format: ReadFormat) -> Result<ReadOutcome, ReadError> {
        let reader = self.clone();
        tokio::task::spawn_blocking(move || reader.read_blocking(format)).await?
    }

    pub fn read_blocking(&self, format: ReadFormat) -> Result<ReadOutcome, ReadError> {
        let content = self.source.read()?;
        let outcome = self.render(content, format)?;
        if let Some(path) = outcome.path() {
            self.state.session.add(path);
        }
        Ok(outcome)
    }

    fn render(&self, content: Vec<u8>, format: ReadFormat) -> Result<ReadOutcome, ReadError> {
        if content.is_empty() {
            return Ok(ReadOutcome::Empty);
        }

        match format {
            ReadFormat::Text => {
                if content.len() > MAX_DIRECT_OUTPUT {
                    let path = self.store.write(&content, ContentKind::Text.extension())?;
                    return Ok(ReadOutcome::TextOverflow { path, size: content.len() });
                }
                Ok(ReadOutcome::RawText(String::from_utf8_lossy(&content).into_owned()))
            }
            ReadFormat::Base64 => {
                let encoded = encode_base64(&content);
                if encoded.len() > MAX_DIRECT_OUTPUT {
                    let path = self.store.write(encoded.as_bytes(), "b64")?;
                    return Ok(ReadOutcome::Base64Overflow { path, size: encoded.len() });
                }
                Ok(ReadOutcome::Base64(encoded))
            }
            ReadFormat::Auto => match classify::classify(&content) {
                ContentKind::Text => {
                    if content.len() > MAX_DIRECT_OUTPUT {
                        let path = self.store.write(&content, ContentKind::Text.extension())?;
                        return Ok(ReadOutcome::TextOverflow { path, size: content.len() });
                    }
                    Ok(ReadOutcome::Text(String::from_utf8_lossy(&content).into_owned()))
                }
                ContentKind::Image(format) => {
                    let path = self.store.write(&content, format.extension())?;
                    Ok(ReadOutcome::Image { path, format, size: content.len() })
                }
                ContentKind::Binary => {
                    let encoded = encode_base64(&content);
                    if encoded.len() > MAX_DIRECT_OUTPUT {
                        let path = self
                            .store
                            .write(encoded.as_bytes(), ContentKind::Binary.extension())?;
                        return Ok(ReadOutcome::BinaryOverflow { path, size: encoded.len() });
                    }
                    Ok(ReadOutcome::BinaryBase64(encoded))
                }
            },
        }
    }
}

fn encode_base64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}
