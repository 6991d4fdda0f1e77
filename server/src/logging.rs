use tracing_subscriber::EnvFilter;

/// Directive used when `MCP_DEBUG=1`: everything from this crate, warnings
/// from dependencies.
const DEBUG_DIRECTIVE: &str = "mcp_clip=debug,warn";
const DEFAULT_DIRECTIVE: &str = "warn";

/// Installs the global subscriber. Logs go to stderr; stdout carries the
/// protocol and must stay clean. Safe to call more than once.
pub fn init(debug: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(debug))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}

/// `MCP_DEBUG` wins over `RUST_LOG`; otherwise `RUST_LOG`, falling back to warn.
fn filter(debug: bool) -> EnvFilter {
    if debug {
        EnvFilter::new(DEBUG_DIRECTIVE)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_filter_enables_crate_debug() {
        assert!(filter(true).to_string().contains("mcp_clip=debug"));
    }

    #[test]
    fn init_twice_does_not_panic() {
        init(false);
        init(true);
    }
}
