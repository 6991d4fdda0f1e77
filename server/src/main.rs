mod cache;
mod classify;
mod cli;
mod clipboard;
mod config;
mod error;
mod event;
mod handler;
mod logging;
mod paths;
mod poller;
mod protocol;
mod server;
mod session;
mod state;
mod store;

use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;

use crate::cli::Command;
use crate::config::{Config, POLL_INTERVAL};
use crate::state::ServerState;
use crate::store::OverflowStore;

#[tokio::main]
async fn main() -> ExitCode {
    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "mcp-clip".to_string());

    // ── Configuration ─────────────────────────────────────────────────────────
    let (config, config_error) = Config::from_env();
    logging::init(config.debug);
    if let Some(e) = config_error {
        tracing::warn!(error = %e, ttl = ?config.cleanup_ttl, "invalid configuration, using default");
    }

    match cli::parse_args(args) {
        Command::Help => {
            print!("{}", cli::usage(&program));
            return ExitCode::SUCCESS;
        }
        Command::Version => {
            println!("{}", cli::version_line());
            return ExitCode::SUCCESS;
        }
        Command::SelfTest => {
            return match cli::self_test(&config, clipboard::detect()) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("Clipboard test failed: {e:#}");
                    ExitCode::FAILURE
                }
            };
        }
        Command::UnknownFlag(flag) => {
            eprintln!("Unknown option: {flag}\n");
            eprint!("{}", cli::usage(&program));
            return ExitCode::from(2);
        }
        Command::Serve => {}
    }

    // A human at a terminal gets instructions instead of a silent JSON-RPC loop.
    if std::io::stdin().is_terminal() {
        print!("{}\n{}", cli::banner(), cli::usage(&program));
        return ExitCode::SUCCESS;
    }

    let code = serve(config).await;
    // The stdin reader sits in a blocking read that can't be cancelled, so
    // exit here instead of waiting for the runtime to shut down around it.
    std::process::exit(code)
}

/// Runs the MCP server on stdio until stdin closes or a signal arrives.
/// Returns the process exit status.
async fn serve(config: Config) -> i32 {
    let store = Arc::new(OverflowStore::new(config.clip_dir.clone(), config.cleanup_ttl));
    let state = Arc::new(ServerState::new());
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "mcp-clip started");

    let result = server::serve(
        store,
        clipboard::detect(),
        state,
        POLL_INTERVAL,
        tokio::io::stdin(),
        tokio::io::stdout(),
        wait_for_signal(),
    )
    .await;

    match result {
        Ok(()) => 0,
        Err(e) => {
            tracing::warn!(error = %e, "failed to write to stdout");
            1
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to install SIGTERM handler");
            wait_for_ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

/// Never resolves if the Ctrl+C handler can't be installed.
async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}
