//! Pure calculation functions for crop geometry.
//!
//! All functions here are pure and testable without any I/O or images.

use crate::types::NormalizedPoint;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    #[error("source image has a zero dimension ({0}x{1})")]
    EmptySource(u32, u32),
    #[error("target size has a zero dimension ({0}x{1})")]
    EmptyTarget(u32, u32),
}

/// Rectangle to extract from the resized buffer, in resized-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn right(&self) -> u32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.top + self.height
    }
}

/// Output of [`resolve_crop`]: scale to `resized`, then extract `crop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropPlan {
    /// Intermediate dimensions `(width, height)`; one edge matches the target.
    pub resized: (u32, u32),
    pub crop: CropRect,
}

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target` - Target area dimensions (width, height)
///
/// # Returns
/// * `(width, height)` - Fill dimensions (at least one matches target)
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height matches, width exceeds
        let h = tgt_h;
        let w = (h as f64 * src_aspect).round() as u32;
        (w.max(tgt_w), h)
    } else {
        // Source is taller (or equal): width matches, height exceeds
        let w = tgt_w;
        let h = (w as f64 / src_aspect).round() as u32;
        (w, h.max(tgt_h))
    }
}

/// Offset of a `window`-long span inside `extent`, centered on `focus`.
///
/// `focus` is a fraction of `extent`; without one the span is centered.
/// The result is clamped so the span never leaves `[0, extent]`.
fn window_offset(extent: u32, window: u32, focus: Option<f64>) -> u32 {
    let slack = extent.saturating_sub(window);
    match focus {
        Some(f) => {
            let scaled = (f * extent as f64) as i64;
            (scaled - (window / 2) as i64).clamp(0, slack as i64) as u32
        }
        None => slack / 2,
    }
}

/// Compute the resize-then-crop plan producing exactly `target` pixels.
///
/// When the source is relatively wider than the target, the height is matched
/// and the horizontal window is placed at `focus.x` (or centered). Otherwise
/// the width is matched and the vertical window follows `focus.y`.
///
/// # Examples
/// ```
/// # use webcrop::imaging::resolve_crop;
/// // 3000x1000 into 600x400: scale to 1200x400, keep the middle 600 columns
/// let plan = resolve_crop((3000, 1000), (600, 400), None).unwrap();
/// assert_eq!(plan.resized, (1200, 400));
/// assert_eq!((plan.crop.left, plan.crop.right()), (300, 900));
/// ```
pub fn resolve_crop(
    original: (u32, u32),
    target: (u32, u32),
    focus: Option<NormalizedPoint>,
) -> Result<CropPlan, GeometryError> {
    let (ow, oh) = original;
    let (tw, th) = target;
    if ow == 0 || oh == 0 {
        return Err(GeometryError::EmptySource(ow, oh));
    }
    if tw == 0 || th == 0 {
        return Err(GeometryError::EmptyTarget(tw, th));
    }

    let (rw, rh) = calculate_fill_dimensions(original, target);
    let left = window_offset(rw, tw, focus.map(NormalizedPoint::x));
    let top = window_offset(rh, th, focus.map(NormalizedPoint::y));

    // Only the overflowing axis moves; the matched one has zero slack.
    Ok(CropPlan {
        resized: (rw, rh),
        crop: CropRect {
            left,
            top,
            width: tw,
            height: th,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // calculate_fill_dimensions tests
    // =========================================================================

    #[test]
    fn fill_wider_source_to_portrait_target() {
        // 800x600 (4:3) → 400x500 target
        // Source is wider, so height matches: 500, width = 500 * (4/3) = 667
        assert_eq!(calculate_fill_dimensions((800, 600), (400, 500)), (667, 500));
    }

    #[test]
    fn fill_taller_source_to_landscape_target() {
        assert_eq!(calculate_fill_dimensions((600, 800), (500, 400)), (500, 667));
    }

    #[test]
    fn fill_same_aspect_ratio() {
        assert_eq!(calculate_fill_dimensions((800, 600), (400, 300)), (400, 300));
    }

    #[test]
    fn fill_upscales_small_sources() {
        assert_eq!(calculate_fill_dimensions((100, 50), (1200, 600)), (1200, 600));
    }

    // =========================================================================
    // resolve_crop tests
    // =========================================================================

    #[test]
    fn equal_ratio_is_full_frame() {
        let plan = resolve_crop((2000, 1000), (1200, 600), None).unwrap();
        assert_eq!(plan.resized, (1200, 600));
        assert_eq!(
            plan.crop,
            CropRect {
                left: 0,
                top: 0,
                width: 1200,
                height: 600
            }
        );
    }

    #[test]
    fn wide_source_centered_crop() {
        let plan = resolve_crop((3000, 1000), (600, 400), None).unwrap();
        assert_eq!(plan.resized, (1200, 400));
        assert_eq!(plan.crop.left, 300);
        assert_eq!(plan.crop.right(), 900);
        assert_eq!(plan.crop.top, 0);
        assert_eq!(plan.crop.bottom(), 400);
    }

    #[test]
    fn wide_source_focus_near_left_edge_clamps_to_zero() {
        let focus = NormalizedPoint::new(0.1, 0.5);
        let plan = resolve_crop((3000, 1000), (600, 400), Some(focus)).unwrap();
        assert_eq!(plan.crop.left, 0);
        assert_eq!(plan.crop.right(), 600);
    }

    #[test]
    fn wide_source_focus_near_right_edge_clamps_to_max() {
        let focus = NormalizedPoint::new(0.95, 0.5);
        let plan = resolve_crop((3000, 1000), (600, 400), Some(focus)).unwrap();
        assert_eq!(plan.crop.right(), 1200);
    }

    #[test]
    fn wide_source_focus_follows_point() {
        // 0.6 * 1200 = 720, minus half of 600
        let focus = NormalizedPoint::new(0.6, 0.0);
        let plan = resolve_crop((3000, 1000), (600, 400), Some(focus)).unwrap();
        assert_eq!(plan.crop.left, 420);
        assert_eq!(plan.crop.top, 0);
    }

    #[test]
    fn tall_source_uses_focus_y() {
        // 1000x3000 into 400x600: resized 400x1200
        let focus = NormalizedPoint::new(0.0, 0.25);
        let plan = resolve_crop((1000, 3000), (400, 600), Some(focus)).unwrap();
        assert_eq!(plan.resized, (400, 1200));
        assert_eq!(plan.crop.left, 0);
        assert_eq!(plan.crop.top, 0);

        let focus = NormalizedPoint::new(0.0, 0.5);
        let plan = resolve_crop((1000, 3000), (400, 600), Some(focus)).unwrap();
        assert_eq!(plan.crop.top, 300);
    }

    #[test]
    fn tall_source_centered_within_one_pixel() {
        let plan = resolve_crop((1001, 3333), (300, 200), None).unwrap();
        let (_, rh) = plan.resized;
        let above = plan.crop.top as i64;
        let below = rh as i64 - plan.crop.bottom() as i64;
        assert!((above - below).abs() <= 1, "above={above} below={below}");
    }

    #[test]
    fn crop_always_inside_resized_bounds() {
        let sources = [(1, 1), (7, 3000), (3000, 7), (1920, 1080), (1080, 1920), (999, 1001)];
        let targets = [(1, 1), (300, 200), (600, 400), (800, 600), (1200, 600), (17, 911)];
        let foci = [
            None,
            Some(NormalizedPoint::new(0.0, 0.0)),
            Some(NormalizedPoint::new(1.0, 1.0)),
            Some(NormalizedPoint::new(0.37, 0.81)),
        ];
        for &src in &sources {
            for &tgt in &targets {
                for &focus in &foci {
                    let plan = resolve_crop(src, tgt, focus).unwrap();
                    assert_eq!((plan.crop.width, plan.crop.height), tgt);
                    assert!(plan.crop.right() <= plan.resized.0, "{src:?} {tgt:?} {focus:?}");
                    assert!(plan.crop.bottom() <= plan.resized.1, "{src:?} {tgt:?} {focus:?}");
                }
            }
        }
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert_eq!(
            resolve_crop((0, 100), (10, 10), None),
            Err(GeometryError::EmptySource(0, 100))
        );
        assert_eq!(
            resolve_crop((100, 100), (10, 0), None),
            Err(GeometryError::EmptyTarget(10, 0))
        );
    }
}
