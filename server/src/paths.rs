/// Canonical locations and names for overflow files.
///
/// Overflow files live directly in the platform temp directory (or the
/// directory named by `MCP_CLIP_DIR`) and are named
///   `mcp-clip-<unix-timestamp>-<hex-hash>.<extension>`
/// The cleanup sweep relies on this layout, so it must stay bit-exact.
use std::path::{Path, PathBuf};

pub const FILENAME_PREFIX: &str = "mcp-clip-";
pub const CLIP_DIR_ENV: &str = "MCP_CLIP_DIR";

/// Returns the directory overflow files are written to and swept from.
pub fn overflow_dir() -> PathBuf {
    match std::env::var_os(CLIP_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir(),
    }
}

/// Builds the file name `mcp-clip-<created_at>-<hash>.<extension>`.
pub fn overflow_file_name(created_at: i64, hash: &str, extension: &str) -> String {
    format!("{FILENAME_PREFIX}{created_at}-{hash}.{extension}")
}

/// Joins `dir` with the overflow file name for the given parts.
pub fn overflow_file_path(dir: &Path, created_at: i64, hash: &str, extension: &str) -> PathBuf {
    dir.join(overflow_file_name(created_at, hash, extension))
}

/// Extracts the embedded creation timestamp from an overflow file name.
///
/// Returns `None` when the name lacks the prefix, lacks a `-` separated
/// hash segment, or the timestamp segment is not an integer.
pub fn parse_created_at(file_name: &str) -> Option<i64> {
    let rest = file_name.strip_prefix(FILENAME_PREFIX)?;
    let (timestamp, _hash) = rest.split_once('-')?;
    timestamp.parse().ok()
}
