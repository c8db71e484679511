//! Image decoding for hospital logos and doctor signatures.
//!
//! Images arrive as data URIs (`data:image/png;base64,...`), as a bare `;base64,` marker followed
//! by the payload, or as raw base64. Decoding never fails loudly: malformed input yields a
//! [`NoImage`] reason which the renderer records as a skipped section.

use crate::constants::MIN_IMAGE_BYTES;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::{alphabet, Engine as _};
use serde::Serialize;

const BASE64_MARKER: &str = ";base64,";

/// Standard alphabet, tolerant of both padded and unpadded payloads.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Why a string did not yield an image.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NoImage {
    #[error("no image data")]
    Empty,
    #[error("image data is not valid base64")]
    InvalidBase64,
    #[error("decoded image is implausibly small ({0} bytes)")]
    TooSmall(usize),
}

/// Best-effort format tag from the leading signature bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
    Unknown,
}

impl ImageFormat {
    /// Sniff the format from the first bytes of a decoded buffer.
    pub fn sniff(bytes: &[u8]) -> Self {
        if infer::image::is_png(bytes) {
            ImageFormat::Png
        } else if infer::image::is_jpeg(bytes) {
            ImageFormat::Jpeg
        } else if infer::image::is_gif(bytes) {
            ImageFormat::Gif
        } else if infer::image::is_webp(bytes) {
            ImageFormat::Webp
        } else {
            ImageFormat::Unknown
        }
    }

    /// Formats the PDF backend cannot embed. Failures for these are expected.
    pub fn likely_unsupported(self) -> bool {
        matches!(self, ImageFormat::Webp)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
            ImageFormat::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded image buffer with its sniffed format.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

/// Decode a data URI or base64 string into image bytes.
///
/// The buffer is returned even when the format is [`ImageFormat::Unknown`]; whether it can be
/// embedded is decided by the renderer.
pub fn decode_image(input: &str) -> Result<DecodedImage, NoImage> {
    let input = input.trim();
    if input.is_empty() {
        return Err(NoImage::Empty);
    }

    let payload = match input.find(BASE64_MARKER) {
        Some(idx) => &input[idx + BASE64_MARKER.len()..],
        None => input,
    };

    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(NoImage::Empty);
    }

    let bytes = LENIENT
        .decode(compact.as_bytes())
        .map_err(|_| NoImage::InvalidBase64)?;

    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(NoImage::TooSmall(bytes.len()));
    }

    let format = ImageFormat::sniff(&bytes);
    Ok(DecodedImage { bytes, format })
}
