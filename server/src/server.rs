/// Stdio serving loop for the MCP protocol.
///
/// Input lines arrive as [`ServerEvent::Message`]s. Each request is handled
/// on its own task so a slow clipboard read never blocks other calls, and all
/// responses funnel through one writer so output lines never interleave.
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::clipboard::ClipboardSource;
use crate::event::ServerEvent;
use crate::handler::ClipboardReader;
use crate::poller::Poller;
use crate::protocol::{self, JsonRpcResponse};
use crate::state::ServerState;
use crate::store::OverflowStore;

/// Why [`Server::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    InputClosed,
    Shutdown,
}

pub struct Server {
    reader: ClipboardReader,
    responses: mpsc::Sender<JsonRpcResponse>,
    in_flight: JoinSet<()>,
}

impl Server {
    pub fn new(reader: ClipboardReader, responses: mpsc::Sender<JsonRpcResponse>) -> Self {
        Self {
            reader,
            responses,
            in_flight: JoinSet::new(),
        }
    }

    /// Dispatches events until input closes or a shutdown is requested.
    pub async fn run(&mut self, events: &mut mpsc::Receiver<ServerEvent>) -> StopReason {
        while let Some(event) = events.recv().await {
            match event {
                ServerEvent::Message(line) => self.dispatch(line),
                ServerEvent::InputClosed => return StopReason::InputClosed,
                ServerEvent::Shutdown => return StopReason::Shutdown,
            }
            // Reap finished handlers so the set doesn't grow unbounded.
            while self.in_flight.try_join_next().is_some() {}
        }
        StopReason::InputClosed
    }

    /// Waits for requests already in progress, then releases the response
    /// channel so the writer can flush and exit.
    pub async fn finish(mut self) {
        while let Some(result) = self.in_flight.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "request handler panicked");
            }
        }
    }

    fn dispatch(&mut self, line: String) {
        if line.trim().is_empty() {
            return;
        }
        let request = match protocol::parse_request(&line) {
            Ok(Some(request)) => request,
            Ok(None) => return,
            Err(response) => {
                tracing::debug!(error = ?response.error, "rejected malformed message");
                let responses = self.responses.clone();
                self.in_flight.spawn(async move {
                    let _ = responses.send(response).await;
                });
                return;
            }
        };

        let reader = self.reader.clone();
        let responses = self.responses.clone();
        self.in_flight.spawn(async move {
            if let Some(response) = protocol::handle_request(request, &reader).await {
                let _ = responses.send(response).await;
            }
        });
    }
}

/// Runs one server session over `input` / `output`:
///
/// 1. sweeps expired overflow files,
/// 2. starts the poller (which marks the session running),
/// 3. serves requests until input closes or `shutdown` resolves,
/// 4. clears the running flag, stops the poller, lets in-flight requests
///    finish and flushes their responses,
/// 5. deletes the files this session created.
///
/// Files produced by requests that complete after step 4 starts are not
/// tracked and are left to the TTL sweep. Returns the writer's result.
pub async fn serve<R, W, S>(
    store: Arc<OverflowStore>,
    source: Arc<dyn ClipboardSource>,
    state: Arc<ServerState>,
    poll_interval: Duration,
    input: R,
    output: W,
    shutdown: S,
) -> io::Result<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
    S: Future<Output = ()> + Send + 'static,
{
    // ── Startup sweep ─────────────────────────────────────────────────────────
    match store.sweep() {
        Ok(report) => tracing::debug!(
            removed = report.removed,
            errors = report.errors,
            dir = %store.dir().display(),
            ttl = %humantime::format_duration(store.ttl()),
            "startup cleanup finished"
        ),
        Err(e) => tracing::debug!(error = %e, "startup cleanup skipped"),
    }

    // ── Poller ────────────────────────────────────────────────────────────────
    let poller = Poller::start(Arc::clone(&state), Arc::clone(&source), poll_interval);
    tracing::debug!(running = state.session.is_running(), "clipboard poller started");

    let (event_tx, mut event_rx) = mpsc::channel::<ServerEvent>(64);
    let (response_tx, response_rx) = mpsc::channel(64);

    // ── Background tasks ──────────────────────────────────────────────────────
    tokio::spawn(read_input(input, event_tx.clone()));
    let writer = tokio::spawn(write_output(output, response_rx));
    {
        let tx = event_tx.clone();
        tokio::spawn(async move {
            shutdown.await;
            let _ = tx.send(ServerEvent::Shutdown).await;
        });
    }
    drop(event_tx);

    // ── Event loop ────────────────────────────────────────────────────────────
    let reader = ClipboardReader::new(source, store, Arc::clone(&state));
    let mut server = Server::new(reader, response_tx);
    let reason = server.run(&mut event_rx).await;
    tracing::debug!(?reason, "shutting down");

    // ── Shutdown ──────────────────────────────────────────────────────────────
    state.session.stop();
    if let Some(p) = poller {
        p.stop().await;
    }
    server.finish().await;

    let written = match writer.await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "output writer panicked");
            Err(io::Error::other(e))
        }
    };

    let last = state.cache.read();
    tracing::debug!(
        bytes = last.content.len(),
        observed_at = ?last.observed_at,
        "last clipboard value seen by poller"
    );

    if !state.session.is_empty() {
        tracing::debug!(files = state.session.len(), "removing session files");
        let report = state.session.drain_and_delete();
        tracing::debug!(
            removed = report.removed,
            failed = report.failed,
            "session files cleaned up"
        );
    }
    written
}

/// Forwards each input line as a [`ServerEvent::Message`], then
/// [`ServerEvent::InputClosed`] at EOF or on a read error.
pub async fn read_input<R>(input: R, tx: mpsc::Sender<ServerEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(ServerEvent::Message(line)).await.is_err() {
                    return;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read from stdin");
                break;
            }
        }
    }
    let _ = tx.send(ServerEvent::InputClosed).await;
}

/// Writes each response as one JSON line until every sender is dropped.
pub async fn write_output<W>(mut output: W, mut rx: mpsc::Receiver<JsonRpcResponse>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = match serde_json::to_vec(&response) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize response");
                continue;
            }
        };
        line.push(b'\n');
        output.write_all(&line).await?;
        output.flush().await?;
    }
    Ok(())
}
