//! Layered overlay compositing.
//!
//! Three categories are applied on top of a cropped variant, always in the
//! same order:
//!
//! ```text
//! base (RGBA8) → shapes layer → graphic paste → text layer → flatten onto white → RGB8
//! ```
//!
//! Each category is toggled independently in [`OverlayState`]. The same
//! state drives the interactive preview and the batch run; a batch receives
//! an `Arc` snapshot so edits made while it runs never reach it.
//!
//! | Module | Role |
//! |--------|------|
//! | [`color`] | `#RRGGBB` colors |
//! | [`blend`] | Porter-Duff over, masked paste, alpha scaling, flatten |
//! | [`shapes`] | Rectangles, ellipses, lines, polygons, parallelograms |
//! | [`graphic`] | Raster watermark placement |
//! | [`text`] | Text with outline, font fallback |
//! | [`font`] | Font discovery and the per-size typeface cache |

pub mod blend;
pub mod color;
pub mod font;
mod glyphs;
pub mod graphic;
pub mod shapes;
pub mod text;

use blend::{composite_over, flatten_onto_white};
use font::FontCache;
use graphic::{GraphicOverlaySpec, apply_graphic};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use shapes::{ShapeSpec, render_layer};
use std::path::Path;
use text::{TextOverlaySpec, apply_text};
use tracing::{debug, warn};

/// Everything the compositor needs to decorate a variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverlayState {
    pub shapes_enabled: bool,
    pub graphic_enabled: bool,
    pub text_enabled: bool,
    pub text: TextOverlaySpec,
    pub graphic: GraphicOverlaySpec,
    /// Draw order is list order.
    pub shapes: Vec<ShapeSpec>,
}

impl OverlayState {
    pub fn add_shape(&mut self, shape: ShapeSpec) {
        self.shapes.push(shape);
    }

    /// Remove the shape at `index`; out of range returns `None`.
    pub fn remove_shape(&mut self, index: usize) -> Option<ShapeSpec> {
        (index < self.shapes.len()).then(|| self.shapes.remove(index))
    }

    pub fn clear_shapes(&mut self) {
        self.shapes.clear();
    }

    pub fn any_enabled(&self) -> bool {
        self.shapes_enabled || self.graphic_enabled || self.text_enabled
    }

    /// Decode the graphic named by `graphic.path`, resolving relative paths
    /// against `base_dir`.
    ///
    /// A graphic that cannot be loaded stays unloaded and is skipped at
    /// render time.
    pub fn load_assets(&mut self, base_dir: &Path) {
        let Some(path) = self.graphic.path.clone() else {
            return;
        };
        let full = if path.is_absolute() {
            path
        } else {
            base_dir.join(path)
        };
        if let Err(e) = self.graphic.load_asset(&full) {
            warn!(path = %full.display(), error = %e, "Graphic overlay could not be loaded");
        }
    }
}

/// Applies an [`OverlayState`] to images, owning the font cache.
#[derive(Debug)]
pub struct Compositor {
    fonts: FontCache,
}

impl Compositor {
    pub fn new(fonts: FontCache) -> Self {
        Self { fonts }
    }

    /// Composite the enabled overlays onto `base`.
    ///
    /// With every category disabled the input is returned unchanged.
    /// Otherwise the result is RGB8, flattened onto white.
    pub fn apply(&mut self, base: &DynamicImage, overlay: &OverlayState) -> DynamicImage {
        if !overlay.any_enabled() {
            return base.clone();
        }
        let mut canvas = base.to_rgba8();
        let (w, h) = canvas.dimensions();

        if overlay.shapes_enabled && !overlay.shapes.is_empty() {
            debug!(count = overlay.shapes.len(), "Drawing shapes");
            let layer = render_layer(w, h, &overlay.shapes);
            composite_over(&mut canvas, &layer);
        }
        if overlay.graphic_enabled {
            apply_graphic(&mut canvas, &overlay.graphic);
        }
        if overlay.text_enabled {
            apply_text(&mut canvas, &overlay.text, &mut self.fonts);
        }

        DynamicImage::ImageRgb8(flatten_onto_white(&canvas))
    }
}
