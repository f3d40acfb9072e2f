//! Image processing: geometry, resampling, and codecs.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Crop geometry** | [`resolve_crop`] (pure) |
//! | **Resize + crop** | `resize_exact` with `Lanczos3`, then `crop_imm` |
//! | **Decode / encode** | `image` crate codecs behind [`ImageBackend`] |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop math (unit testable)
//! - **Parameters**: Quality, output format, and per-write encode settings
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Resize-and-crop and full variant rendering

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use calculations::{CropPlan, CropRect, GeometryError, calculate_fill_dimensions, resolve_crop};
pub use operations::{render_variant, resize_and_crop};
pub use params::{EncodeOptions, EncodeParams, Encoding, OutputFormat, Quality};
pub use rust_backend::RustBackend;
