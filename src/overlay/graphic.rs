//! Graphic watermark: a raster asset scaled relative to the target width.

use super::blend::{paste_masked, scale_alpha};
use crate::types::NormalizedPoint;
use image::imageops::FilterType;
use image::{ImageReader, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Gap between a corner-anchored graphic and the image edges, in pixels.
pub const CORNER_INSET: i64 = 20;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("IO error reading graphic: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode graphic {path}: {message}")]
    Decode { path: String, message: String },
}

/// A decoded RGBA watermark, shared cheaply between overlay snapshots.
#[derive(Clone)]
pub struct GraphicAsset {
    image: Arc<RgbaImage>,
}

impl GraphicAsset {
    pub fn load(path: &Path) -> Result<Self, AssetError> {
        let img = ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| AssetError::Decode {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(Self::from_image(img.to_rgba8()))
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

impl PartialEq for GraphicAsset {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.image, &other.image) || *self.image == *other.image
    }
}

impl fmt::Debug for GraphicAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphicAsset")
            .field("dimensions", &self.dimensions())
            .finish()
    }
}

/// Where the graphic is anchored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphicPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
    /// Center of the graphic at this point.
    Manual(NormalizedPoint),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphicOverlaySpec {
    /// Image file to load as the watermark.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Graphic width as a percentage (1–100) of the target width.
    pub size_percent: u32,
    /// 0–100; scales the graphic's own alpha.
    pub opacity: u32,
    pub position: GraphicPosition,
    /// Decoded asset; absent until [`GraphicOverlaySpec::load_asset`] succeeds.
    #[serde(skip)]
    pub asset: Option<GraphicAsset>,
}

impl Default for GraphicOverlaySpec {
    fn default() -> Self {
        Self {
            path: None,
            size_percent: 20,
            opacity: 100,
            position: GraphicPosition::BottomRight,
            asset: None,
        }
    }
}

impl GraphicOverlaySpec {
    pub fn set_size_percent(&mut self, percent: u32) {
        self.size_percent = percent.clamp(1, 100);
    }

    pub fn set_opacity(&mut self, opacity: u32) {
        self.opacity = opacity.min(100);
    }

    pub fn set_manual_position(&mut self, x: f64, y: f64) {
        self.position = GraphicPosition::Manual(NormalizedPoint::new(x, y));
    }

    /// Decode the graphic at `path` and remember both.
    pub fn load_asset(&mut self, path: &Path) -> Result<(), AssetError> {
        let asset = GraphicAsset::load(path)?;
        self.path = Some(path.to_path_buf());
        self.asset = Some(asset);
        Ok(())
    }
}

/// Scaled graphic size for an image `base_width` wide, or `None` if it
/// would vanish.
pub fn graphic_dimensions(base_width: u32, asset: (u32, u32), size_percent: u32) -> Option<(u32, u32)> {
    let (aw, ah) = asset;
    if aw == 0 || ah == 0 {
        return None;
    }
    let pct = size_percent.clamp(1, 100) as u64;
    let gw = (base_width as u64 * pct / 100) as u32;
    let aspect = aw as f64 / ah as f64;
    let gh = (gw as f64 / aspect) as u32;
    (gw > 0 && gh > 0).then_some((gw, gh))
}

/// Top-left corner of a `graphic`-sized block on a `canvas`-sized image.
pub fn graphic_origin(position: GraphicPosition, canvas: (u32, u32), graphic: (u32, u32)) -> (i64, i64) {
    let (w, h) = (canvas.0 as i64, canvas.1 as i64);
    let (gw, gh) = (graphic.0 as i64, graphic.1 as i64);
    let right = w - gw - CORNER_INSET;
    let bottom = h - gh - CORNER_INSET;
    match position {
        GraphicPosition::TopLeft => (CORNER_INSET, CORNER_INSET),
        GraphicPosition::TopRight => (right, CORNER_INSET),
        GraphicPosition::BottomLeft => (CORNER_INSET, bottom),
        GraphicPosition::BottomRight => (right, bottom),
        GraphicPosition::Center => ((w - gw).div_euclid(2), (h - gh).div_euclid(2)),
        GraphicPosition::Manual(p) => {
            let (px, py) = p.to_pixels(canvas.0, canvas.1);
            (px as i64 - gw / 2, py as i64 - gh / 2)
        }
    }
}

/// Paste the graphic described by `spec` onto `base`.
///
/// Without a loaded asset this is a no-op.
pub fn apply_graphic(base: &mut RgbaImage, spec: &GraphicOverlaySpec) {
    let Some(asset) = &spec.asset else {
        return;
    };
    let (w, h) = base.dimensions();
    let Some((gw, gh)) = graphic_dimensions(w, asset.dimensions(), spec.size_percent) else {
        debug!(width = w, "Graphic scales to nothing, skipping");
        return;
    };

    let mut scaled = if (gw, gh) == asset.dimensions() {
        asset.image().clone()
    } else {
        image::imageops::resize(asset.image(), gw, gh, FilterType::Lanczos3)
    };
    if spec.opacity < 100 {
        scaled = scale_alpha(&scaled, spec.opacity as f32 / 100.0);
    }

    let (x, y) = graphic_origin(spec.position, (w, h), (gw, gh));
    debug!(gw, gh, x, y, opacity = spec.opacity, "Pasting graphic overlay");
    paste_masked(base, &scaled, x, y);
}
