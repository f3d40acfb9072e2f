//! Pure Rust image backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG) | `image::ImageReader` with content sniffing |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at the configured quality |
//! | Encode → PNG | `image::codecs::png::PngEncoder`, best compression, adaptive filter |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder`, lossless |
//!
//! The `image` crate ships only a lossless WebP encoder, so the quality knob
//! applies to JPEG alone.

use super::backend::{BackendError, ImageBackend};
use super::params::{EncodeParams, Encoding};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageReader};
use std::path::Path;
use tracing::debug;

/// Source extensions accepted by the batch pipeline (lowercase, no dot).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Returns the set of image file extensions accepted as sources.
pub fn supported_input_extensions() -> &'static [&'static str] {
    SUPPORTED_EXTENSIONS
}

/// Whether `path` has a supported source extension (case-insensitive).
pub fn is_supported_source(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(e))
        })
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    let decode_err = |message: String| BackendError::Decode {
        path: path.display().to_string(),
        message,
    };
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| decode_err(e.to_string()))
}

/// Encode `img` into an in-memory buffer.
pub fn encode_to_vec(img: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let result = match params.encoding {
        Encoding::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, params.quality.value() as u8);
            DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)
        }
        Encoding::Png => {
            let encoder = PngEncoder::new_with_quality(
                &mut buf,
                CompressionType::Best,
                image::codecs::png::FilterType::Adaptive,
            );
            normalize_depth(img).write_with_encoder(encoder)
        }
        Encoding::WebP => {
            let encoder = WebPEncoder::new_lossless(&mut buf);
            normalize_depth(img).write_with_encoder(encoder)
        }
    };
    result.map_err(|e| BackendError::Encode(format!("{:?}: {}", params.encoding, e)))?;
    Ok(buf)
}

/// Collapse to 8-bit RGB or RGBA, keeping alpha only when present.
fn normalize_depth(img: &DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img.clone(),
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        let img = load_image(path)?;
        debug!(
            path = %path.display(),
            width = img.width(),
            height = img.height(),
            "Decoded source image"
        );
        Ok(img)
    }

    fn encode(
        &self,
        image: &DynamicImage,
        path: &Path,
        params: &EncodeParams,
    ) -> Result<u64, BackendError> {
        let bytes = encode_to_vec(image, params)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "Wrote variant");
        Ok(bytes.len() as u64)
    }

    fn estimate(&self, image: &DynamicImage, params: &EncodeParams) -> Result<u64, BackendError> {
        encode_to_vec(image, params).map(|b| b.len() as u64)
    }

    fn byte_size(&self, path: &Path) -> Result<u64, BackendError> {
        Ok(std::fs::metadata(path)?.len())
    }
}
