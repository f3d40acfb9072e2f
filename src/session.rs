//! Interactive editing state.
//!
//! A [`Session`] holds what a front end edits between runs: the live overlay,
//! the crop focus, which catalog sizes are selected, and the encode settings.
//! Previews render through the same [`render_variant`] path as the batch
//! pipeline, so what is previewed is what gets written.
//!
//! Starting a batch snapshots the session into a [`BatchRequest`]; later
//! edits do not affect a run already in flight.

use crate::imaging::{
    BackendError, EncodeOptions, GeometryError, ImageBackend, OutputFormat, Quality, render_variant,
};
use crate::overlay::{Compositor, OverlayState};
use crate::process::{BatchRequest, CropPolicy};
use crate::types::{NormalizedPoint, TargetSize, default_catalog, default_selection};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No size at index {0}")]
    NoSuchSize(usize),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Custom crop focus with an explicit on/off switch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CropFocus {
    active: bool,
    focus: Option<NormalizedPoint>,
}

impl CropFocus {
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Turning the focus off also forgets the chosen point.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if !active {
            self.focus = None;
        }
    }

    /// Choose a focus point. Ignored while inactive; returns whether it was
    /// accepted.
    pub fn set_focus(&mut self, point: NormalizedPoint) -> bool {
        if !self.active {
            warn!(x = point.x(), y = point.y(), "Crop focus ignored: custom crop is off");
            return false;
        }
        self.focus = Some(point);
        true
    }

    pub fn reset(&mut self) {
        self.focus = None;
    }

    /// The point to crop around, if custom crop is on and a point is set.
    pub fn effective(&self) -> Option<NormalizedPoint> {
        if self.active { self.focus } else { None }
    }
}

/// Which sources a session's crop focus applies to when a batch starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CropScope {
    /// Every source in the batch.
    AllFiles,
    /// Only the most recently previewed file.
    #[default]
    PreviewedFileOnly,
}

/// One rendered preview.
#[derive(Debug, Clone)]
pub struct Preview {
    pub source: PathBuf,
    pub size: TargetSize,
    pub original: DynamicImage,
    pub rendered: DynamicImage,
    pub original_bytes: u64,
    /// Encoded size of `rendered` with the current settings, when known.
    pub estimated_bytes: Option<u64>,
}

pub struct Session {
    pub overlay: OverlayState,
    pub crop: CropFocus,
    pub encode: EncodeOptions,
    catalog: Vec<TargetSize>,
    selected: Vec<bool>,
    last_preview: Option<PathBuf>,
    compositor: Compositor,
}

impl Session {
    /// A session over `catalog` with the stock selection applied.
    pub fn new(catalog: Vec<TargetSize>, compositor: Compositor) -> Self {
        let mut session = Self {
            overlay: OverlayState::default(),
            crop: CropFocus::default(),
            encode: EncodeOptions::default(),
            selected: vec![false; catalog.len()],
            catalog,
            last_preview: None,
            compositor,
        };
        session.select_labels(&default_selection());
        session
    }

    pub fn with_default_catalog(compositor: Compositor) -> Self {
        Self::new(default_catalog(), compositor)
    }

    pub fn catalog(&self) -> &[TargetSize] {
        &self.catalog
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.get(index).copied().unwrap_or(false)
    }

    /// Toggle one catalog entry. Returns `false` for an unknown index.
    pub fn set_selected(&mut self, index: usize, on: bool) -> bool {
        match self.selected.get_mut(index) {
            Some(slot) => {
                *slot = on;
                true
            }
            None => false,
        }
    }

    /// Select exactly the catalog entries whose label is in `labels`.
    pub fn select_labels(&mut self, labels: &[String]) {
        for (slot, size) in self.selected.iter_mut().zip(&self.catalog) {
            *slot = labels.iter().any(|l| l == &size.label);
        }
    }

    /// Selected sizes in catalog order.
    pub fn selected_sizes(&self) -> Vec<TargetSize> {
        self.catalog
            .iter()
            .zip(&self.selected)
            .filter(|(_, on)| **on)
            .map(|(size, _)| size.clone())
            .collect()
    }

    pub fn set_quality(&mut self, quality: u32) {
        self.encode.quality = Quality::new(quality);
    }

    pub fn set_format(&mut self, format: OutputFormat) {
        self.encode.format = format;
    }

    pub fn last_previewed(&self) -> Option<&Path> {
        self.last_preview.as_deref()
    }

    /// Render `file` at catalog entry `size_index` with the current settings.
    pub fn preview(
        &mut self,
        backend: &impl ImageBackend,
        file: &Path,
        size_index: usize,
    ) -> Result<Preview, SessionError> {
        let size = self
            .catalog
            .get(size_index)
            .cloned()
            .ok_or(SessionError::NoSuchSize(size_index))?;

        let original = backend.decode(file)?;
        let original_bytes = backend.byte_size(file)?;
        self.last_preview = Some(file.to_path_buf());

        let rendered = render_variant(
            &original,
            &size,
            self.crop.effective(),
            &self.overlay,
            &mut self.compositor,
        )?;

        let estimated_bytes = match self.encode.params_for(file) {
            Some(params) => match backend.estimate(&rendered, &params) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "Could not estimate output size");
                    None
                }
            },
            None => None,
        };

        debug!(
            file = %file.display(),
            size = %size,
            original_bytes,
            estimated_bytes,
            "Preview rendered"
        );

        Ok(Preview {
            source: file.to_path_buf(),
            size,
            original,
            rendered,
            original_bytes,
            estimated_bytes,
        })
    }

    /// Map the crop focus to a batch policy.
    pub fn crop_policy(&self, scope: CropScope) -> CropPolicy {
        let Some(point) = self.crop.effective() else {
            return CropPolicy::None;
        };
        match scope {
            CropScope::AllFiles => CropPolicy::AllFiles(point),
            CropScope::PreviewedFileOnly => match &self.last_preview {
                Some(file) => CropPolicy::per_file([(file.clone(), point)]),
                None => {
                    warn!("Crop focus set but no file previewed; batch uses centered crops");
                    CropPolicy::None
                }
            },
        }
    }

    /// Snapshot the session into a batch over `sources`.
    pub fn batch_request(
        &self,
        sources: Vec<PathBuf>,
        destination: impl Into<PathBuf>,
        scope: CropScope,
    ) -> BatchRequest {
        BatchRequest::new(sources, self.selected_sizes(), destination)
            .with_overlay(&self.overlay)
            .with_crop(self.crop_policy(scope))
            .with_encode(self.encode)
    }
}
