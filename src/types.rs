//! Shared value types used by the geometry, overlay, and batch modules.
//!
//! Both types here are plain values: cheap to copy or clone, serializable,
//! and valid by construction. A [`NormalizedPoint`] is always inside the unit
//! square and a [`TargetSize`] never has a zero dimension.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position expressed as fractions of an image's width and height.
///
/// Coordinates are clamped to `[0, 1]` on construction; NaN becomes `0`.
/// Serialized as a two-element array, e.g. `[0.5, 0.9]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct NormalizedPoint {
    x: f64,
    y: f64,
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

impl NormalizedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
        }
    }

    pub fn center() -> Self {
        Self::new(0.5, 0.5)
    }

    pub fn x(self) -> f64 {
        self.x
    }

    pub fn y(self) -> f64 {
        self.y
    }

    /// Project onto a pixel grid, truncating toward zero.
    pub fn to_pixels(self, width: u32, height: u32) -> (i32, i32) {
        (
            (self.x * width as f64) as i32,
            (self.y * height as f64) as i32,
        )
    }
}

impl From<[f64; 2]> for NormalizedPoint {
    fn from([x, y]: [f64; 2]) -> Self {
        Self::new(x, y)
    }
}

impl From<NormalizedPoint> for [f64; 2] {
    fn from(p: NormalizedPoint) -> Self {
        [p.x, p.y]
    }
}

/// Error returned when a target size would have a zero dimension.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("target size '{label}' has a zero dimension ({width}x{height})")]
pub struct ZeroSizeError {
    pub label: String,
    pub width: u32,
    pub height: u32,
}

/// One output size in the catalog: exact pixel dimensions plus a display label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSize {
    pub label: String,
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub fn new(label: impl Into<String>, width: u32, height: u32) -> Result<Self, ZeroSizeError> {
        let size = Self {
            label: label.into(),
            width,
            height,
        };
        size.check()?;
        Ok(size)
    }

    /// Verify both dimensions are positive.
    ///
    /// Deserialized sizes skip [`TargetSize::new`], so config validation and
    /// the batch pipeline call this before using them.
    pub fn check(&self) -> Result<(), ZeroSizeError> {
        if self.width == 0 || self.height == 0 {
            return Err(ZeroSizeError {
                label: self.label.clone(),
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Directory name used for this size's outputs, e.g. `1200x600`.
    pub fn dir_name(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}x{})", self.label, self.width, self.height)
    }
}

/// The stock size catalog, in display order.
pub fn default_catalog() -> Vec<TargetSize> {
    [
        ("Featured", 1200, 600),
        ("Large", 800, 600),
        ("Medium", 600, 400),
        ("Thumbnail", 300, 200),
    ]
    .into_iter()
    .map(|(label, width, height)| TargetSize {
        label: label.to_string(),
        width,
        height,
    })
    .collect()
}

/// Labels selected when no explicit selection is configured.
pub fn default_selection() -> Vec<String> {
    vec!["Featured".to_string()]
}
