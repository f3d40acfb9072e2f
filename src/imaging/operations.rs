//! High-level image operations.
//!
//! These functions combine the geometry calculations with pixel work. They
//! are shared by the interactive preview and the batch pipeline so both paths
//! produce identical pixels for identical inputs.

use super::calculations::{GeometryError, resolve_crop};
use crate::overlay::{Compositor, OverlayState};
use crate::types::{NormalizedPoint, TargetSize};
use image::DynamicImage;
use image::imageops::FilterType;
use tracing::debug;

/// Scale `source` to cover `target`, then cut out exactly `target` pixels.
///
/// The crop window follows `focus` when given and is centered otherwise.
/// The source buffer is never modified.
pub fn resize_and_crop(
    source: &DynamicImage,
    target: &TargetSize,
    focus: Option<NormalizedPoint>,
) -> Result<DynamicImage, GeometryError> {
    let original = (source.width(), source.height());
    let plan = resolve_crop(original, target.dimensions(), focus)?;
    let (rw, rh) = plan.resized;

    debug!(
        orig_w = original.0,
        orig_h = original.1,
        resized_w = rw,
        resized_h = rh,
        left = plan.crop.left,
        top = plan.crop.top,
        focus = focus.is_some(),
        "Resizing for {}",
        target.label
    );

    let resized = if (rw, rh) == original {
        source.clone()
    } else {
        source.resize_exact(rw, rh, FilterType::Lanczos3)
    };

    if (rw, rh) == target.dimensions() {
        return Ok(resized);
    }
    Ok(resized.crop_imm(
        plan.crop.left,
        plan.crop.top,
        plan.crop.width,
        plan.crop.height,
    ))
}

/// Produce one finished variant: resize, crop, then composite overlays.
pub fn render_variant(
    source: &DynamicImage,
    target: &TargetSize,
    focus: Option<NormalizedPoint>,
    overlay: &OverlayState,
    compositor: &mut Compositor,
) -> Result<DynamicImage, GeometryError> {
    let cropped = resize_and_crop(source, target, focus)?;
    Ok(compositor.apply(&cropped, overlay))
}
