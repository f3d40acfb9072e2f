//! Parameter types for encoding variants.
//!
//! These types describe *what* to write, not *how* to write it. They are the
//! interface between the batch pipeline (which decides which variants to
//! create) and the [`backend`](super::backend) (which does the actual encoding).
//!
//! ## Types
//!
//! - [`Quality`] — Lossy encoding quality (1–100, default 85). Clamped on construction.
//! - [`OutputFormat`] — The user-facing format choice, including "same as input".
//! - [`Encoding`] — A concrete codec, resolved per source file from [`OutputFormat`].
//! - [`EncodeOptions`] — Format choice plus quality, shared by every item of a run.
//! - [`EncodeParams`] — Resolved codec plus quality for one write.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

impl From<u32> for Quality {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u32 {
    fn from(q: Quality) -> Self {
        q.0
    }
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Keep each source's own format and extension.
    SameAsInput,
    #[default]
    Jpeg,
    Png,
    #[serde(rename = "webp")]
    WebP,
}

/// A concrete codec for one output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Jpeg,
    Png,
    WebP,
}

impl Encoding {
    /// Codec for a file extension (without the dot, any case).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }
}

impl OutputFormat {
    /// Extension for an output derived from `source`, without the leading dot.
    ///
    /// "Same as input" keeps the source extension verbatim, including case.
    pub fn extension_for(self, source: &Path) -> String {
        match self {
            Self::SameAsInput => source
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Self::Jpeg => Encoding::Jpeg.extension().to_string(),
            Self::Png => Encoding::Png.extension().to_string(),
            Self::WebP => Encoding::WebP.extension().to_string(),
        }
    }

    /// Codec for an output derived from `source`, if one is known.
    pub fn encoding_for(self, source: &Path) -> Option<Encoding> {
        match self {
            Self::SameAsInput => source
                .extension()
                .and_then(|e| e.to_str())
                .and_then(Encoding::from_extension),
            Self::Jpeg => Some(Encoding::Jpeg),
            Self::Png => Some(Encoding::Png),
            Self::WebP => Some(Encoding::WebP),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::SameAsInput => "Same as input",
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::WebP => "WebP",
        }
    }
}

/// Encoding settings shared by every item in a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    pub format: OutputFormat,
    pub quality: Quality,
}

/// Parameters for a single encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub encoding: Encoding,
    pub quality: Quality,
}

impl EncodeOptions {
    pub fn params_for(&self, source: &Path) -> Option<EncodeParams> {
        self.format.encoding_for(source).map(|encoding| EncodeParams {
            encoding,
            quality: self.quality,
        })
    }
}
