//! Content classification by inspection of the raw clipboard bytes.

/// Share of text characters above which a payload counts as text.
const TEXT_RATIO_THRESHOLD: f64 = 0.8;

/// Image formats recognized by their magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
    Bmp,
}

impl ImageFormat {
    /// File extension used for overflow files holding this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Bmp => "bmp",
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// What a clipboard payload looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Image(ImageFormat),
    Binary,
}

impl ContentKind {
    /// Extension for an overflow file written with the raw payload.
    /// Binary payloads are stored base64-encoded, hence `b64`.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Image(format) => format.extension(),
            Self::Binary => "b64",
        }
    }
}

/// Text first, then image magic bytes, else opaque binary.
pub fn classify(data: &[u8]) -> ContentKind {
    if is_probably_text(data) {
        ContentKind::Text
    } else if let Some(format) = detect_image_format(data) {
        ContentKind::Image(format)
    } else {
        ContentKind::Binary
    }
}

/// True when more than 80% of the decoded characters are printable ASCII or
/// `\n`, `\r`, `\t`, measured against the byte length. Empty input is text.
pub fn is_probably_text(data: &[u8]) -> bool {
    if data.is_empty() {
        return true;
    }
    let text_chars = String::from_utf8_lossy(data)
        .chars()
        .filter(|&c| matches!(c, ' '..='~' | '\n' | '\r' | '\t'))
        .count();
    text_chars as f64 / data.len() as f64 > TEXT_RATIO_THRESHOLD
}

/// Recognizes PNG, JPEG, GIF, WEBP and BMP headers. Anything shorter than
/// eight bytes is never an image.
pub fn detect_image_format(data: &[u8]) -> Option<ImageFormat> {
    if data.len() < 8 {
        return None;
    }
    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        return Some(ImageFormat::Png);
    }
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(ImageFormat::Jpeg);
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some(ImageFormat::Gif);
    }
    if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return Some(ImageFormat::Webp);
    }
    if data.starts_with(b"BM") {
        return Some(ImageFormat::Bmp);
    }
    None
}
