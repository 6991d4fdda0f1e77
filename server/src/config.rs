use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::paths;

pub const DEFAULT_CLEANUP_TTL: Duration = Duration::from_secs(60 * 60);
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Largest payload (in bytes) returned inline; anything bigger overflows to a file.
pub const MAX_DIRECT_OUTPUT: usize = 25_000;

pub const CLEANUP_TTL_ENV: &str = "MCP_CLEANUP_TTL";
pub const DEBUG_ENV: &str = "MCP_DEBUG";

/// Runtime configuration, resolved once at startup from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Age after which overflow files are swept.
    pub cleanup_ttl: Duration,
    /// Verbose diagnostics on stderr.
    pub debug: bool,
    /// Directory overflow files are written to.
    pub clip_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cleanup_ttl: DEFAULT_CLEANUP_TTL,
            debug: false,
            clip_dir: paths::overflow_dir(),
        }
    }
}

impl Config {
    /// Reads `MCP_CLEANUP_TTL`, `MCP_DEBUG` and `MCP_CLIP_DIR`. Never fails:
    /// a bad TTL is returned alongside the default so the caller can log it
    /// once logging is up.
    pub fn from_env() -> (Self, Option<ConfigError>) {
        let ttl_var = std::env::var(CLEANUP_TTL_ENV).ok();
        let debug_var = std::env::var(DEBUG_ENV).ok();
        Self::from_values(ttl_var.as_deref(), debug_var.as_deref(), paths::overflow_dir())
    }

    fn from_values(
        ttl: Option<&str>,
        debug: Option<&str>,
        clip_dir: PathBuf,
    ) -> (Self, Option<ConfigError>) {
        let (cleanup_ttl, ttl_error) = match ttl {
            None => (DEFAULT_CLEANUP_TTL, None),
            Some(raw) if raw.trim().is_empty() => (DEFAULT_CLEANUP_TTL, None),
            Some(raw) => match parse_ttl(raw) {
                Ok(ttl) => (ttl, None),
                Err(e) => (DEFAULT_CLEANUP_TTL, Some(e)),
            },
        };
        let config = Self {
            cleanup_ttl,
            debug: debug.map(str::trim) == Some("1"),
            clip_dir,
        };
        (config, ttl_error)
    }
}

/// Parses a humantime duration (`30m`, `1h`, `1h 30m`, `90s`), also
/// accepting decimal components such as `1.5h` or `1h0.5m`. Zero is rejected
/// so a misconfiguration can never disable cleanup.
pub fn parse_ttl(raw: &str) -> Result<Duration, ConfigError> {
    let value = raw.trim();
    let ttl = match humantime::parse_duration(value) {
        Ok(ttl) => ttl,
        Err(e) => parse_decimal_duration(value).ok_or_else(|| ConfigError::InvalidDuration {
            var: CLEANUP_TTL_ENV,
            value: value.to_string(),
            reason: e.to_string(),
        })?,
    };
    if ttl.is_zero() {
        return Err(ConfigError::NonPositiveDuration {
            var: CLEANUP_TTL_ENV,
            value: value.to_string(),
        });
    }
    Ok(ttl)
}

/// `<number><unit>` components with optional decimal fractions, units
/// `ns`, `us`/`µs`, `ms`, `s`, `m`, `h`.
fn parse_decimal_duration(value: &str) -> Option<Duration> {
    let mut rest = value;
    let mut total = 0.0_f64;
    if rest.is_empty() {
        return None;
    }
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        if !number.bytes().any(|b| b.is_ascii_digit()) {
            return None;
        }
        let number: f64 = number.parse().ok()?;

        let unit_len = tail.find(|c: char| c.is_ascii_digit() || c == '.').unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let scale = match unit {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => return None,
        };
        total += number * scale;
        rest = tail;
    }
    Duration::try_from_secs_f64(total).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(ttl: Option<&str>, debug: Option<&str>) -> (Config, Option<ConfigError>) {
        Config::from_values(ttl, debug, PathBuf::from("/tmp"))
    }

    // ── defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn unset_environment_uses_defaults() {
        let (config, err) = resolve(None, None);
        assert_eq!(config.cleanup_ttl, DEFAULT_CLEANUP_TTL);
        assert!(!config.debug);
        assert!(err.is_none());
    }

    #[test]
    fn default_ttl_is_one_hour() {
        assert_eq!(DEFAULT_CLEANUP_TTL, Duration::from_secs(3600));
        assert_eq!(Config::default().cleanup_ttl, DEFAULT_CLEANUP_TTL);
    }

    // ── MCP_CLEANUP_TTL ───────────────────────────────────────────────────────

    #[test]
    fn ttl_accepts_duration_strings() {
        assert_eq!(parse_ttl("30m").unwrap(), Duration::from_secs(30 * 60));
        assert_eq!(parse_ttl("2h").unwrap(), Duration::from_secs(2 * 3600));
        assert_eq!(parse_ttl("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_ttl(" 1h 30m ").unwrap(), Duration::from_secs(90 * 60));
    }

    #[test]
    fn ttl_accepts_decimal_components() {
        assert_eq!(parse_ttl("1.5h").unwrap(), Duration::from_secs(90 * 60));
        assert_eq!(parse_ttl("0.5h").unwrap(), Duration::from_secs(30 * 60));
        assert_eq!(parse_ttl("1h0.5m").unwrap(), Duration::from_secs(3630));
        assert_eq!(parse_ttl("1500ms").unwrap(), Duration::from_millis(1500));
    }

    #[test]
    fn decimal_ttl_is_used_from_environment() {
        let (config, err) = resolve(Some("0.25h"), None);
        assert_eq!(config.cleanup_ttl, Duration::from_secs(15 * 60));
        assert!(err.is_none());
    }

    #[test]
    fn decimal_parser_rejects_garbage() {
        assert_eq!(parse_decimal_duration("1.5"), None);
        assert_eq!(parse_decimal_duration(".h"), None);
        assert_eq!(parse_decimal_duration("1.5d"), None);
        assert_eq!(parse_decimal_duration("-1.5h"), None);
        assert_eq!(parse_decimal_duration("1..5h"), None);
    }

    #[test]
    fn malformed_ttl_falls_back_to_default() {
        let (config, err) = resolve(Some("soon"), None);
        assert_eq!(config.cleanup_ttl, DEFAULT_CLEANUP_TTL);
        assert!(matches!(err, Some(ConfigError::InvalidDuration { .. })));
    }

    #[test]
    fn zero_ttl_falls_back_to_default() {
        let (config, err) = resolve(Some("0s"), None);
        assert_eq!(config.cleanup_ttl, DEFAULT_CLEANUP_TTL);
        assert!(matches!(err, Some(ConfigError::NonPositiveDuration { .. })));
    }

    #[test]
    fn negative_ttl_falls_back_to_default() {
        let (config, err) = resolve(Some("-5m"), None);
        assert_eq!(config.cleanup_ttl, DEFAULT_CLEANUP_TTL);
        assert!(err.is_some());
    }

    #[test]
    fn blank_ttl_is_treated_as_unset() {
        let (config, err) = resolve(Some("   "), None);
        assert_eq!(config.cleanup_ttl, DEFAULT_CLEANUP_TTL);
        assert!(err.is_none());
    }

    #[test]
    fn valid_ttl_is_used() {
        let (config, err) = resolve(Some("15m"), None);
        assert_eq!(config.cleanup_ttl, Duration::from_secs(15 * 60));
        assert!(err.is_none());
    }

    // ── MCP_DEBUG ─────────────────────────────────────────────────────────────

    #[test]
    fn debug_requires_exactly_one() {
        assert!(resolve(None, Some("1")).0.debug);
        assert!(!resolve(None, Some("0")).0.debug);
        assert!(!resolve(None, Some("true")).0.debug);
        assert!(!resolve(None, Some("")).0.debug);
    }
}
