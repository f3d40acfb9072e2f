//! Pixel blending primitives shared by the overlay layers.
//!
//! Two blend modes are used:
//!
//! - **Over** ([`blend_over`], [`composite_over`]): Porter-Duff source-over
//!   with straight (non-premultiplied) alpha. Used to merge the shape and text
//!   layers onto the base.
//! - **Masked** ([`blend_masked`], [`paste_masked`]): every channel, alpha
//!   included, is interpolated toward the ink by a coverage mask. Repeated
//!   stamps settle at the ink instead of accumulating alpha. Used for glyph
//!   runs and the graphic.

use image::{Rgb, RgbImage, Rgba, RgbaImage};

/// Composite `top` over `bottom`.
pub fn blend_over(bottom: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    match top[3] {
        0 => return bottom,
        255 => return top,
        _ => {}
    }
    let ta = top[3] as f32 / 255.0;
    let ba = bottom[3] as f32 / 255.0;
    let out_a = ta + ba * (1.0 - ta);
    if out_a <= f32::EPSILON {
        return Rgba([0, 0, 0, 0]);
    }
    let channel = |t: u8, b: u8| -> u8 {
        let v = (t as f32 * ta + b as f32 * ba * (1.0 - ta)) / out_a;
        v.round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        channel(top[0], bottom[0]),
        channel(top[1], bottom[1]),
        channel(top[2], bottom[2]),
        (out_a * 255.0).round() as u8,
    ])
}

/// Composite a same-sized `layer` over `base` in place.
pub fn composite_over(base: &mut RgbaImage, layer: &RgbaImage) {
    debug_assert_eq!(base.dimensions(), layer.dimensions());
    for (dst, src) in base.pixels_mut().zip(layer.pixels()) {
        *dst = blend_over(*dst, *src);
    }
}

fn lerp(dst: u8, src: u8, mask: u8) -> u8 {
    let m = mask as u32;
    ((src as u32 * m + dst as u32 * (255 - m) + 127) / 255) as u8
}

/// Move every channel of `dst`, alpha included, toward `ink` by `mask`/255.
pub fn blend_masked(dst: Rgba<u8>, ink: Rgba<u8>, mask: u8) -> Rgba<u8> {
    match mask {
        0 => dst,
        255 => ink,
        _ => Rgba([
            lerp(dst[0], ink[0], mask),
            lerp(dst[1], ink[1], mask),
            lerp(dst[2], ink[2], mask),
            lerp(dst[3], ink[3], mask),
        ]),
    }
}

/// Paste `src` onto `dst` with its top-left corner at `(x, y)`, using the
/// source alpha as the mask. Parts outside `dst` are clipped.
pub fn paste_masked(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    let (dw, dh) = (dst.width() as i64, dst.height() as i64);
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + src.width() as i64).min(dw);
    let y1 = (y + src.height() as i64).min(dh);

    for ty in y0..y1 {
        for tx in x0..x1 {
            let s = *src.get_pixel((tx - x) as u32, (ty - y) as u32);
            let mask = s[3];
            if mask == 0 {
                continue;
            }
            let d = dst.get_pixel_mut(tx as u32, ty as u32);
            *d = blend_masked(*d, s, mask);
        }
    }
}

/// Return a copy of `img` with every alpha multiplied by `factor` (truncated).
///
/// `factor` is clamped to `[0, 1]`.
pub fn scale_alpha(img: &RgbaImage, factor: f32) -> RgbaImage {
    let factor = if factor.is_nan() { 0.0 } else { factor.clamp(0.0, 1.0) };
    let mut out = img.clone();
    for p in out.pixels_mut() {
        p[3] = (p[3] as f32 * factor) as u8;
    }
    out
}

/// Composite `img` over opaque white and drop the alpha channel.
pub fn flatten_onto_white(img: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let p = img.get_pixel(x, y);
        let a = p[3];
        Rgb([lerp(255, p[0], a), lerp(255, p[1], a), lerp(255, p[2], a)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::solid_rgba;

    #[test]
    fn over_opaque_top_wins() {
        let out = blend_over(Rgba([1, 2, 3, 255]), Rgba([9, 8, 7, 255]));
        assert_eq!(out, Rgba([9, 8, 7, 255]));
    }

    #[test]
    fn over_transparent_top_is_noop() {
        let out = blend_over(Rgba([1, 2, 3, 200]), Rgba([9, 8, 7, 0]));
        assert_eq!(out, Rgba([1, 2, 3, 200]));
    }

    #[test]
    fn over_half_alpha_on_opaque() {
        let out = blend_over(Rgba([0, 0, 0, 255]), Rgba([255, 255, 255, 128]));
        assert_eq!(out[3], 255);
        assert!((127..=129).contains(&out[0]), "{out:?}");
    }

    #[test]
    fn over_onto_transparent_keeps_color() {
        let out = blend_over(Rgba([0, 0, 0, 0]), Rgba([200, 100, 50, 100]));
        assert_eq!(out, Rgba([200, 100, 50, 100]));
    }

    #[test]
    fn paste_clips_to_bounds() {
        let mut dst = solid_rgba(10, 10, [0, 0, 0, 255]);
        let src = solid_rgba(4, 4, [255, 0, 0, 255]);
        paste_masked(&mut dst, &src, 8, -2);
        assert_eq!(dst.get_pixel(8, 0).0, [255, 0, 0, 255]);
        assert_eq!(dst.get_pixel(9, 1).0, [255, 0, 0, 255]);
        assert_eq!(dst.get_pixel(9, 2).0, [0, 0, 0, 255]);
        assert_eq!(dst.get_pixel(7, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn paste_fully_outside_is_noop() {
        let mut dst = solid_rgba(5, 5, [1, 1, 1, 255]);
        let before = dst.clone();
        paste_masked(&mut dst, &solid_rgba(3, 3, [9, 9, 9, 255]), 50, 50);
        paste_masked(&mut dst, &solid_rgba(3, 3, [9, 9, 9, 255]), -3, 0);
        assert_eq!(dst, before);
    }

    #[test]
    fn paste_interpolates_alpha_channel_too() {
        let mut dst = solid_rgba(1, 1, [0, 0, 0, 255]);
        paste_masked(&mut dst, &solid_rgba(1, 1, [255, 255, 255, 51]), 0, 0);
        // 20% toward white, alpha 255 -> 255*0.8 + 51*0.2
        assert_eq!(dst.get_pixel(0, 0).0, [51, 51, 51, 214]);
    }

    #[test]
    fn masked_full_coverage_replaces_pixel() {
        let out = blend_masked(Rgba([255, 0, 0, 127]), Rgba([0, 255, 0, 127]), 255);
        assert_eq!(out, Rgba([0, 255, 0, 127]));
    }

    #[test]
    fn masked_restamp_does_not_accumulate_alpha() {
        let ink = Rgba([255, 0, 0, 127]);
        let once = blend_masked(Rgba([0, 0, 0, 0]), ink, 255);
        let twice = blend_masked(once, ink, 255);
        assert_eq!(twice, ink);
        let partial = blend_masked(Rgba([0, 0, 0, 0]), ink, 128);
        assert_eq!(blend_masked(partial, ink, 0), partial);
        assert!(partial[3] < ink[3]);
    }

    #[test]
    fn scale_alpha_is_pure_and_truncates() {
        let src = solid_rgba(2, 2, [10, 20, 30, 255]);
        let half = scale_alpha(&src, 0.5);
        assert_eq!(half.get_pixel(0, 0).0, [10, 20, 30, 127]);
        assert_eq!(src.get_pixel(0, 0).0[3], 255);
        assert_eq!(scale_alpha(&src, 0.0).get_pixel(1, 1).0[3], 0);
        assert_eq!(scale_alpha(&src, 7.0).get_pixel(1, 1).0[3], 255);
    }

    #[test]
    fn flatten_transparent_is_white() {
        let img = solid_rgba(3, 3, [0, 0, 0, 0]);
        let flat = flatten_onto_white(&img);
        assert!(flat.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn flatten_opaque_keeps_color() {
        let flat = flatten_onto_white(&solid_rgba(2, 2, [12, 34, 56, 255]));
        assert!(flat.pixels().all(|p| p.0 == [12, 34, 56]));
    }
}
