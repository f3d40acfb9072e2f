//! Text overlay: a single line of text with an optional outline.
//!
//! The point size is relative to a 1000 px wide image, so a caption keeps
//! its proportions across every target size. The outline is produced by
//! stamping the glyph run at every offset within the outline width before
//! stamping the fill on top.

use super::blend::{blend_masked, composite_over};
use super::color::Color;
use super::font::{FontCache, GlyphMask};
use crate::types::NormalizedPoint;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Smallest rendered text size in pixels.
pub const MIN_TEXT_PX: u32 = 10;

/// Gap between the text and the top or bottom edge, in pixels.
pub const EDGE_MARGIN: i64 = 20;

/// Where the text block is anchored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextPosition {
    Top,
    Center,
    #[default]
    Bottom,
    /// Center of the text block at this point.
    Manual(NormalizedPoint),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextOverlaySpec {
    pub content: String,
    /// Point size relative to a 1000 px wide image.
    pub size: u32,
    pub color: Color,
    /// 0–100; applies to fill and outline alike.
    pub opacity: u32,
    pub outline_color: Color,
    /// Outline thickness in pixels; 0 disables the outline.
    pub outline_width: u32,
    pub font: String,
    pub position: TextPosition,
}

impl Default for TextOverlaySpec {
    fn default() -> Self {
        Self {
            content: String::new(),
            size: 24,
            color: Color::WHITE,
            opacity: 100,
            outline_color: Color::BLACK,
            outline_width: 1,
            font: "Arial".to_string(),
            position: TextPosition::Bottom,
        }
    }
}

impl TextOverlaySpec {
    pub fn set_opacity(&mut self, opacity: u32) {
        self.opacity = opacity.min(100);
    }

    /// Anchor the text at a manual position (clamped to the image).
    pub fn set_manual_position(&mut self, x: f64, y: f64) {
        self.position = TextPosition::Manual(NormalizedPoint::new(x, y));
    }
}

/// Rendered pixel size for `size` points on an image `base_width` wide.
pub fn scaled_text_px(size: u32, base_width: u32) -> u32 {
    let px = (size as u64 * base_width as u64 / 1000) as u32;
    px.max(MIN_TEXT_PX)
}

/// Alpha shared by fill and outline, `floor(255 × opacity / 100)`.
pub fn text_alpha(opacity: u32) -> u8 {
    (255 * opacity.min(100) / 100) as u8
}

/// Offsets at which the outline is stamped.
///
/// Width 1 uses the four orthogonal neighbours; wider outlines use the full
/// square `[-w, w]²` without the origin.
pub fn outline_offsets(width: u32) -> Vec<(i32, i32)> {
    let w = width as i32;
    if w <= 0 {
        return Vec::new();
    }
    if w == 1 {
        return vec![(-1, 0), (1, 0), (0, -1), (0, 1)];
    }
    let mut offsets = Vec::with_capacity(((2 * w + 1) * (2 * w + 1) - 1) as usize);
    for dy in -w..=w {
        for dx in -w..=w {
            if (dx, dy) != (0, 0) {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}

/// Top-left corner of a `extent`-sized text block on a `canvas`-sized image.
pub fn text_origin(position: TextPosition, canvas: (u32, u32), extent: (u32, u32)) -> (i64, i64) {
    let (w, h) = (canvas.0 as i64, canvas.1 as i64);
    let (tw, th) = (extent.0 as i64, extent.1 as i64);
    let centered_x = (w - tw).div_euclid(2);
    match position {
        TextPosition::Bottom => (centered_x, h - th - EDGE_MARGIN),
        TextPosition::Top => (centered_x, EDGE_MARGIN),
        TextPosition::Center => (centered_x, (h - th).div_euclid(2)),
        TextPosition::Manual(p) => {
            let (px, py) = p.to_pixels(canvas.0, canvas.1);
            (px as i64 - tw / 2, py as i64 - th / 2)
        }
    }
}

/// Fill `mask` in `color` at `alpha` into `layer` with its top-left at
/// `origin`. Covered pixels move toward the ink by their coverage, so a fully
/// covered pixel ends up exactly at the ink whatever was stamped before.
fn stamp(layer: &mut RgbaImage, mask: &GlyphMask, origin: (i64, i64), color: Color, alpha: u8) {
    let (lw, lh) = (layer.width() as i64, layer.height() as i64);
    let ink = color.with_alpha(alpha);
    for (mx, my, coverage) in mask.covered() {
        let (x, y) = (origin.0 + mx as i64, origin.1 + my as i64);
        if x < 0 || y < 0 || x >= lw || y >= lh {
            continue;
        }
        let m = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
        let dst = layer.get_pixel_mut(x as u32, y as u32);
        *dst = blend_masked(*dst, ink, m);
    }
}

/// Draw the text described by `spec` over `base`.
///
/// Blank content leaves `base` untouched.
pub fn apply_text(base: &mut RgbaImage, spec: &TextOverlaySpec, fonts: &mut FontCache) {
    if spec.content.trim().is_empty() {
        return;
    }
    let (w, h) = base.dimensions();
    let px = scaled_text_px(spec.size, w);
    let face = fonts.typeface(&spec.font, px);
    let mask = face.rasterize(&spec.content);
    let origin = text_origin(spec.position, (w, h), (mask.width, mask.height));
    let alpha = text_alpha(spec.opacity);

    debug!(
        px,
        builtin = face.is_builtin(),
        x = origin.0,
        y = origin.1,
        text_w = mask.width,
        text_h = mask.height,
        "Placing text overlay"
    );

    let mut layer = RgbaImage::new(w, h);
    for (dx, dy) in outline_offsets(spec.outline_width) {
        let at = (origin.0 + dx as i64, origin.1 + dy as i64);
        stamp(&mut layer, &mask, at, spec.outline_color, alpha);
    }
    stamp(&mut layer, &mask, origin, spec.color, alpha);
    composite_over(base, &layer);
}
