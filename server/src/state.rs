use crate::cache::ClipboardCache;
use crate::session::SessionTracker;

/// Shared server state, owned by `main` and handed to the poller and the
/// request handler behind an `Arc`. Each instance is independent, so tests
/// build as many as they need.
#[derive(Default)]
pub struct ServerState {
    /// Last clipboard value seen by the poller.
    pub cache: ClipboardCache,
    /// Running flag plus overflow files created this session.
    pub session: SessionTracker,
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }
}
