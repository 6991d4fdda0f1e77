/// Platform clipboard access.
///
/// Two backends exist:
///   - `SystemClipboard`  native clipboard via `arboard`; images are
///     re-encoded to PNG so the classifier sees real PNG bytes.
///   - `Wsl2Clipboard`    Windows clipboard bridged through `powershell.exe`
///     when running under WSL2, where no native Linux clipboard exists.
///
/// Both are blocking, single-shot reads; callers on the async runtime wrap
/// them in `spawn_blocking`.
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use base64::Engine as _;

use crate::error::ClipboardError;

/// An opaque, fallible clipboard read.
pub trait ClipboardSource: Send + Sync {
    /// Returns the current clipboard payload; empty when the clipboard is empty.
    fn read(&self) -> Result<Vec<u8>, ClipboardError>;
}

/// Picks the WSL2 bridge when running under WSL2, the native clipboard otherwise.
pub fn detect() -> Arc<dyn ClipboardSource> {
    if is_wsl2() {
        tracing::debug!("WSL2 detected, using PowerShell clipboard bridge");
        Arc::new(Wsl2Clipboard)
    } else {
        Arc::new(SystemClipboard)
    }
}

// ── Native clipboard ──────────────────────────────────────────────────────────

pub struct SystemClipboard;

impl ClipboardSource for SystemClipboard {
    fn read(&self) -> Result<Vec<u8>, ClipboardError> {
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| ClipboardError::UnsupportedPlatform(e.to_string()))?;

        match clipboard.get_text() {
            Ok(text) => return Ok(text.into_bytes()),
            Err(arboard::Error::ContentNotAvailable) => {}
            Err(e) => return Err(ClipboardError::PlatformRead(e.to_string())),
        }

        match clipboard.get_image() {
            Ok(image) => encode_png(image.width, image.height, image.bytes.into_owned()),
            Err(arboard::Error::ContentNotAvailable) => Ok(Vec::new()),
            Err(e) => Err(ClipboardError::PlatformRead(e.to_string())),
        }
    }
}

/// Encodes raw RGBA pixels as a PNG file.
fn encode_png(width: usize, height: usize, rgba: Vec<u8>) -> Result<Vec<u8>, ClipboardError> {
    let (w, h) = u32::try_from(width)
        .ok()
        .zip(u32::try_from(height).ok())
        .ok_or_else(|| ClipboardError::PlatformRead(format!("image too large: {width}x{height}")))?;
    let buffer = image::RgbaImage::from_raw(w, h, rgba).ok_or_else(|| {
        ClipboardError::PlatformRead(format!("image buffer does not match {width}x{height}"))
    })?;
    let mut png = Cursor::new(Vec::new());
    buffer
        .write_to(&mut png, image::ImageFormat::Png)
        .map_err(|e| ClipboardError::PlatformRead(format!("failed to encode image: {e}")))?;
    Ok(png.into_inner())
}

// ── WSL2 bridge ───────────────────────────────────────────────────────────────

const POWERSHELL_CANDIDATES: &[&str] = &[
    "/mnt/c/Windows/System32/WindowsPowerShell/v1.0/powershell.exe",
    "/mnt/c/WINDOWS/System32/WindowsPowerShell/v1.0/powershell.exe",
    "/mnt/c/windows/system32/windowspowershell/v1.0/powershell.exe",
];

const READ_TEXT_SCRIPT: &str = "Get-Clipboard -Raw";

const READ_IMAGE_SCRIPT: &str = r#"
    $image = Get-Clipboard -Format Image
    if ($image -ne $null) {
        $ms = New-Object System.IO.MemoryStream
        $image.Save($ms, [System.Drawing.Imaging.ImageFormat]::Png)
        [Convert]::ToBase64String($ms.ToArray())
    }
"#;

pub struct Wsl2Clipboard;

impl ClipboardSource for Wsl2Clipboard {
    fn read(&self) -> Result<Vec<u8>, ClipboardError> {
        let powershell = find_powershell().ok_or_else(|| {
            ClipboardError::UnsupportedPlatform(
                "PowerShell not found - required for WSL2 clipboard access".to_string(),
            )
        })?;

        if let Some(text) = run_powershell(&powershell, READ_TEXT_SCRIPT) {
            return Ok(text.into_bytes());
        }

        match run_powershell(&powershell, READ_IMAGE_SCRIPT) {
            Some(encoded) => base64::engine::general_purpose::STANDARD
                .decode(encoded.as_bytes())
                .map_err(|e| {
                    ClipboardError::PlatformRead(format!("failed to decode base64 image data: {e}"))
                }),
            None => Ok(Vec::new()),
        }
    }
}

/// Runs a PowerShell command and returns its trimmed stdout, or `None` when
/// the command failed or printed nothing.
fn run_powershell(powershell: &Path, script: &str) -> Option<String> {
    let output = Command::new(powershell)
        .args(["-NoProfile", "-Command", script])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn find_powershell() -> Option<PathBuf> {
    if let Some(path) = POWERSHELL_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
    {
        return Some(path);
    }
    let output = Command::new("which").arg("powershell.exe").output().ok()?;
    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (output.status.success() && !path.is_empty()).then(|| PathBuf::from(path))
}

/// True on Linux when `/proc/version` mentions Microsoft or WSL.
pub fn is_wsl2() -> bool {
    if !cfg!(target_os = "linux") {
        return false;
    }
    std::fs::read_to_string("/proc/version")
        .map(|v| is_wsl_kernel(&v))
        .unwrap_or(false)
}

fn is_wsl_kernel(proc_version: &str) -> bool {
    let lower = proc_version.to_lowercase();
    lower.contains("microsoft") || lower.contains("wsl")
}
