//! Source folder listing.
//!
//! Only the files directly inside the chosen folder are considered; the scan
//! does not descend into subdirectories. Matching is on extension alone
//! (`jpg`, `jpeg`, `png`, any case). Files are returned sorted by name so runs
//! are reproducible.

use crate::imaging::rust_backend::is_supported_source;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Source folder does not exist: {0}")]
    NotFound(PathBuf),
    #[error("Source path is not a folder: {0}")]
    NotADirectory(PathBuf),
    #[error("Failed to read source folder: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Supported images directly inside `dir`, sorted by file name.
pub fn list_source_images(dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    if !dir.exists() {
        return Err(ScanError::NotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_file() && is_supported_source(entry.path()) {
            images.push(entry.into_path());
        }
    }
    debug!(dir = %dir.display(), count = images.len(), "Listed source images");
    Ok(images)
}
