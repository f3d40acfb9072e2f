//! # webcrop
//!
//! Batch-produce resized, cropped, and watermarked variants of source images
//! for web publishing.
//!
//! # Architecture: One Render Path
//!
//! Every variant, whether previewed interactively or written by a batch,
//! goes through the same steps:
//!
//! ```text
//! 1. Geometry   (source dims, target dims, focus) → resize dims + crop rect
//! 2. Resample   Lanczos3 resize, then crop to exactly the target size
//! 3. Composite  shapes → graphic → text, flattened onto white
//! 4. Encode     JPEG / PNG / WebP → <dest>/<W>x<H>/<name>.<ext>
//! ```
//!
//! Steps 1–3 are pure functions of their inputs, so unit tests exercise them
//! without touching the filesystem. Step 4 sits behind the
//! [`imaging::ImageBackend`] trait so the batch pipeline can be tested against
//! an in-memory backend.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Shared values: `NormalizedPoint`, `TargetSize`, the stock size catalog |
//! | [`imaging`] | Crop geometry, resize-and-crop, encode parameters, the `image`-crate backend |
//! | [`overlay`] | Shapes, graphic watermark, and text compositing |
//! | [`process`] | The batch pipeline: work order, events, cancellation, single-flight runner |
//! | [`session`] | Interactive state: live overlay, crop focus, size selection, previews |
//! | [`config`] | `webcrop.toml` loading, merging over stock defaults, and validation |
//! | [`scan`] | Flat source-folder listing |
//! | [`naming`] | Output path derivation |
//! | [`output`] | CLI status lines and size formatting |
//!
//! # Design Decisions
//!
//! ## Cover, Then Crop
//!
//! A variant always has exactly the requested pixel dimensions. The source is
//! scaled so it covers the target on both axes, and the overflow on one axis
//! is cropped away. The crop window is centered by default; a focus point
//! slides it toward the interesting part of the image, clamped so it never
//! leaves the resized buffer.
//!
//! ## Snapshot Overlays
//!
//! A batch carries an `Arc<OverlayState>` captured when it was requested.
//! The interactive session keeps editing its own copy, so a running batch
//! renders every item with the same overlay.
//!
//! ## Failures Stay Local
//!
//! One unreadable source or unwritable destination fails only its own items.
//! The run continues, reports each failure as an event, and always ends with
//! a summary.
//!
//! ## Fonts Never Fail
//!
//! Text rendering resolves fonts through an injected source and falls back to
//! a built-in 5×7 bitmap font, so a missing font degrades the look of a
//! caption rather than failing the item.

pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod overlay;
pub mod process;
pub mod scan;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
