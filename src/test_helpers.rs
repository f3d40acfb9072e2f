//! Shared test utilities for the webcrop test suite.
//!
//! Provides synthetic image builders, on-disk fixture writers, and pixel
//! assertions used by the imaging, overlay, and batch tests.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = source_folder(&[("a.jpg", 300, 200), ("b.png", 200, 300)]);
//! let img = solid_rgb(200, 200, [255, 0, 0]);
//! assert_eq!(count_pixels(&img, [255, 0, 0]), 40_000);
//! ```

use image::{DynamicImage, ImageEncoder, RgbImage, RgbaImage};
use std::path::Path;
use tempfile::TempDir;

// =========================================================================
// Synthetic images
// =========================================================================

/// An opaque RGB image with a horizontal/vertical color ramp.
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

/// An opaque single-color RGB image.
pub fn solid_rgb(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb(color)))
}

/// A single-color RGBA buffer.
pub fn solid_rgba(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, image::Rgba(color))
}

// =========================================================================
// Fixture files
// =========================================================================

/// Write a small valid JPEG with the given dimensions.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = gradient_image(width, height).to_rgb8();
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Write a small valid PNG with the given dimensions.
pub fn write_test_png(path: &Path, width: u32, height: u32) {
    gradient_image(width, height).save(path).unwrap();
}

/// Create a temp folder holding the listed images.
///
/// Each entry is `(file name, width, height)`; the encoder follows the
/// extension (`.png` → PNG, anything else → JPEG).
pub fn source_folder(files: &[(&str, u32, u32)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (name, w, h) in files {
        let path = tmp.path().join(name);
        if name.to_ascii_lowercase().ends_with(".png") {
            write_test_png(&path, *w, *h);
        } else {
            write_test_jpeg(&path, *w, *h);
        }
    }
    tmp
}

// =========================================================================
// Pixel assertions
// =========================================================================

/// Number of pixels exactly equal to `color` (compared as RGB).
pub fn count_pixels(img: &DynamicImage, color: [u8; 3]) -> usize {
    img.to_rgb8().pixels().filter(|p| p.0 == color).count()
}

/// Panics unless every pixel of `img` is one of `allowed`.
pub fn assert_only_colors(img: &DynamicImage, allowed: &[[u8; 3]]) {
    for (x, y, p) in img.to_rgb8().enumerate_pixels() {
        assert!(
            allowed.contains(&p.0),
            "pixel ({x}, {y}) is {:?}, expected one of {allowed:?}",
            p.0
        );
    }
}
