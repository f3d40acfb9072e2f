//! Destination path derivation for generated variants.
//!
//! Every variant lands in a folder named after its pixel dimensions, under
//! the source file's own stem:
//!
//! - `photos/beach.jpg` at 1200×600 as JPEG → `out/1200x600/beach.jpg`
//! - `photos/beach.JPEG` at 300×200, same as input → `out/300x200/beach.JPEG`
//! - `photos/logo.png` at 800×600 as WebP → `out/800x600/logo.webp`
//!
//! Two sources that differ only by extension collide on the same output
//! path when re-encoded; the later one wins.

use crate::imaging::OutputFormat;
use crate::types::TargetSize;
use std::path::{Path, PathBuf};

/// File stem of `source`, or `"image"` when it has none.
pub fn source_stem(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "image".to_string())
}

/// File name of `source` for display in status lines.
pub fn display_name(source: &Path) -> String {
    source
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.display().to_string())
}

/// `root/{w}x{h}/{stem}.{ext}` for one (source, size) pair.
pub fn output_path(root: &Path, size: &TargetSize, source: &Path, format: OutputFormat) -> PathBuf {
    let ext = format.extension_for(source);
    let file = if ext.is_empty() {
        source_stem(source)
    } else {
        format!("{}.{}", source_stem(source), ext)
    };
    root.join(size.dir_name()).join(file)
}
