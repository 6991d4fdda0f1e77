use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::clipboard::ClipboardSource;
use crate::state::ServerState;

/// Background clipboard watcher.
///
/// Reads the platform clipboard every `poll_interval` and feeds the result
/// into [`ServerState::cache`]. Read errors are logged and skipped. The loop
/// ends when `true` is sent on the stop channel (or the sender is dropped).
pub struct Poller {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Poller {
    /// Starts polling unless a poller already owns `state`'s running flag,
    /// in which case `None` is returned and nothing is spawned.
    pub fn start(
        state: Arc<ServerState>,
        source: Arc<dyn ClipboardSource>,
        poll_interval: Duration,
    ) -> Option<Self> {
        if !state.session.try_start() {
            tracing::debug!("clipboard poller already running");
            return None;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run(state, source, poll_interval, stop_rx));
        Some(Self { stop_tx, handle })
    }

    /// Signals the loop to stop and waits for it to finish its current tick.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "clipboard poller panicked");
        }
    }
}

async fn run(
    state: Arc<ServerState>,
    source: Arc<dyn ClipboardSource>,
    poll_interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let source = Arc::clone(&source);
                let read = tokio::task::spawn_blocking(move || source.read()).await;
                match read {
                    Ok(Ok(content)) => {
                        if state.cache.update(&content) {
                            tracing::debug!(bytes = content.len(), "clipboard changed");
                        }
                    }
                    Ok(Err(e)) => tracing::debug!(error = %e, "clipboard read error"),
                    Err(e) => tracing::warn!(error = %e, "clipboard read task failed"),
                }
            }
        }
    }

    // Leave the flag cleared however the loop ended.
    state.session.stop();
    tracing::debug!("clipboard poller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClipboardError;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a script of reads, then repeats the last one.
    struct ScriptedClipboard {
        script: Mutex<VecDeque<Result<Vec<u8>, String>>>,
        reads: AtomicUsize,
    }

    impl ScriptedClipboard {
        fn new(script: Vec<Result<&str, &str>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(
                    script
                        .into_iter()
                        .map(|r| r.map(|s| s.as_bytes().to_vec()).map_err(str::to_string))
                        .collect(),
                ),
                reads: AtomicUsize::new(0),
            })
        }
    }

    impl ClipboardSource for ScriptedClipboard {
        fn read(&self) -> Result<Vec<u8>, ClipboardError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock();
            let next = if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            };
            match next {
                Some(Ok(bytes)) => Ok(bytes),
                Some(Err(msg)) => Err(ClipboardError::PlatformRead(msg)),
                None => Ok(Vec::new()),
            }
        }
    }

    const FAST: Duration = Duration::from_millis(5);

    async fn wait_for_reads(source: &ScriptedClipboard, n: usize) {
        for _ in 0..400 {
            if source.reads.load(Ordering::SeqCst) >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("poller never reached {n} reads");
    }

    #[tokio::test]
    async fn poller_feeds_cache() {
        let state = Arc::new(ServerState::new());
        let source = ScriptedClipboard::new(vec![Ok("hello")]);
        let poller = Poller::start(Arc::clone(&state), source.clone(), FAST).unwrap();

        wait_for_reads(&source, 2).await;
        poller.stop().await;

        assert_eq!(state.cache.read().content, b"hello");
    }

    #[tokio::test]
    async fn read_errors_do_not_stop_the_loop() {
        let state = Arc::new(ServerState::new());
        let source = ScriptedClipboard::new(vec![Err("locked"), Err("locked"), Ok("after")]);
        let poller = Poller::start(Arc::clone(&state), source.clone(), FAST).unwrap();

        wait_for_reads(&source, 4).await;
        poller.stop().await;

        assert_eq!(state.cache.read().content, b"after");
    }

    #[tokio::test]
    async fn second_start_is_a_no_op() {
        let state = Arc::new(ServerState::new());
        let source = ScriptedClipboard::new(vec![Ok("x")]);
        let first = Poller::start(Arc::clone(&state), source.clone(), FAST);
        let second = Poller::start(Arc::clone(&state), source.clone(), FAST);

        assert!(first.is_some());
        assert!(second.is_none());
        first.unwrap().stop().await;
    }

    #[tokio::test]
    async fn stop_clears_running_flag_and_allows_restart() {
        let state = Arc::new(ServerState::new());
        let source = ScriptedClipboard::new(vec![Ok("x")]);

        let poller = Poller::start(Arc::clone(&state), source.clone(), FAST).unwrap();
        assert!(state.session.is_running());
        poller.stop().await;
        assert!(!state.session.is_running());

        let again = Poller::start(Arc::clone(&state), source.clone(), FAST);
        assert!(again.is_some());
        again.unwrap().stop().await;
    }

    #[tokio::test]
    async fn stop_takes_effect_within_one_tick() {
        let state = Arc::new(ServerState::new());
        let source = ScriptedClipboard::new(vec![Ok("x")]);
        let poller =
            Poller::start(Arc::clone(&state), source.clone(), Duration::from_secs(3600)).unwrap();

        let stopped = tokio::time::timeout(Duration::from_secs(5), poller.stop()).await;
        assert!(stopped.is_ok());
    }
}
