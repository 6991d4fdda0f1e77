//! Command-line entry points other than serving: help, version, self-test.
use std::sync::Arc;

use anyhow::{Context, Result};
use base64::Engine as _;

use crate::classify;
use crate::clipboard::ClipboardSource;
use crate::config::{Config, MAX_DIRECT_OUTPUT};
use crate::store::OverflowStore;

const PREVIEW_CHARS: usize = 100;
const BASE64_PREVIEW_CHARS: usize = 50;

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// Serve MCP over stdio (no arguments).
    Serve,
    Help,
    Version,
    SelfTest,
    UnknownFlag(String),
}

/// Interprets the first argument; anything that isn't a known command or a
/// flag falls through to serving.
pub fn parse_args<I>(mut args: I) -> Command
where
    I: Iterator<Item = String>,
{
    match args.next().as_deref() {
        None => Command::Serve,
        Some("-h" | "--help") => Command::Help,
        Some("version") => Command::Version,
        Some("test") => Command::SelfTest,
        Some(flag) if flag.starts_with('-') => Command::UnknownFlag(flag.to_string()),
        Some(_) => Command::Serve,
    }
}

pub fn version_line() -> String {
    format!("MCP Clipboard Server v{}", env!("CARGO_PKG_VERSION"))
}

/// Shown when the binary is launched from an interactive terminal.
pub fn banner() -> String {
    format!(
        "{}\n\
         This is an MCP (Model Context Protocol) server for clipboard access.\n\
         It should be run by an MCP client, not directly from the command line.\n",
        version_line()
    )
}

pub fn usage(program: &str) -> String {
    format!(
        r#"USAGE:
    This MCP server provides clipboard access for MCP clients.

    For direct testing:
    {program} --help           Show this help message
    {program} test             Test clipboard functionality
    {program} version          Show version information

    For MCP client usage, add to your client configuration:
       {{
         "mcpServers": {{
           "mcp-clip": {{
             "command": "/path/to/mcp-clip"
           }}
         }}
       }}

    Available Tools:
    - read_clipboard: Read clipboard content (text inline, large text and images as temp files)

    Environment Variables:
    - MCP_DEBUG=1: Enable debug logging on stderr
    - MCP_CLEANUP_TTL: Age after which temp files are removed (e.g. 30m, 1.5h, 2h; default 1h)
    - MCP_CLIP_DIR: Directory for temp files (default: system temp directory)
"#
    )
}

/// Exercises cleanup, a live clipboard read and (for large content) the
/// overflow writer, printing a short report. Overflow files created here
/// are left for the TTL sweep.
pub fn self_test(config: &Config, source: Arc<dyn ClipboardSource>) -> Result<()> {
    println!("Testing clipboard functionality...");

    let store = OverflowStore::new(config.clip_dir.clone(), config.cleanup_ttl);
    println!("\nTesting cleanup in {}...", store.dir().display());
    match store.sweep() {
        Ok(report) => println!(
            "Cleanup completed ({} removed, {} errors)",
            report.removed, report.errors
        ),
        Err(e) => println!("Cleanup failed: {e}"),
    }

    let content = source.read().context("Failed to read clipboard")?;
    if content.is_empty() {
        println!("Clipboard is empty");
        return Ok(());
    }
    println!("Clipboard content detected ({} bytes)", content.len());

    if content.len() > MAX_DIRECT_OUTPUT {
        println!("Testing temp file creation...");
        let path = store
            .write(&content, classify::classify(&content).extension())
            .context("Failed to create temp file")?;
        println!("Created temp file: {}", path.display());
    }

    print!("{}", describe(&content));
    println!("Clipboard test completed successfully");
    Ok(())
}

/// Content type plus a short preview.
fn describe(content: &[u8]) -> String {
    match classify::classify(content) {
        classify::ContentKind::Text => {
            let text = String::from_utf8_lossy(content);
            let preview: String = text.chars().take(PREVIEW_CHARS).collect();
            let ellipsis = if text.chars().count() > PREVIEW_CHARS { "..." } else { "" };
            format!("Content type: Text\nContent: {preview}{ellipsis}\n")
        }
        classify::ContentKind::Image(format) => {
            format!("Content type: Image ({format})\n")
        }
        classify::ContentKind::Binary => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(content);
            let preview: String = encoded.chars().take(BASE64_PREVIEW_CHARS).collect();
            format!("Content type: Binary\nBase64 preview: {preview}...\n")
        }
    }
}
