//! Application configuration.
//!
//! Handles loading, validating, and merging `webcrop.toml`. Stock defaults
//! are the base layer; a user file overrides just the keys it names.
//!
//! ## Config File Location
//!
//! Pass `--config path/to/file.toml`, or place `webcrop.toml` in the working
//! directory. Without either, the stock defaults are used.
//!
//! ## Configuration Options
//!
//! ```toml
//! quality = 85                    # Lossy encoding quality (1-100)
//! output_format = "jpeg"          # same_as_input | jpeg | png | webp
//! selected_sizes = ["Featured"]   # Labels from [[sizes]] to generate
//!
//! [[sizes]]
//! label = "Featured"
//! width = 1200
//! height = 600
//!
//! [crop]
//! mode = "none"                   # none | all_files | per_file
//! # focus = [0.5, 0.3]            # Required for all_files
//!
//! [crop.files]                    # Used by per_file; file name → focus
//! # "beach.jpg" = [0.2, 0.5]
//!
//! [fonts]
//! dirs = []                       # Extra font directories (empty = system dirs)
//!
//! [overlay]
//! text_enabled = false
//! graphic_enabled = false
//! shapes_enabled = false
//!
//! [overlay.text]
//! content = ""
//! size = 24
//!
//! [overlay.graphic]
//! # path = "logo.png"
//! size_percent = 20
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Tables merge key by key; arrays such as
//! `[[sizes]]` and `[[overlay.shapes]]` replace the stock value entirely.
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{EncodeOptions, OutputFormat, Quality};
use crate::overlay::OverlayState;
use crate::overlay::font::{SystemFontSource, default_font_dirs};
use crate::process::CropPolicy;
use crate::types::{NormalizedPoint, TargetSize, default_catalog, default_selection};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "webcrop.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `webcrop.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Lossy encoding quality, 1–100.
    pub quality: u32,
    pub output_format: OutputFormat,
    /// Labels of the sizes to generate, in any order.
    pub selected_sizes: Vec<String>,
    /// Custom crop focus.
    pub crop: CropConfig,
    /// Font lookup.
    pub fonts: FontsConfig,
    /// Overlay layers applied to every variant.
    pub overlay: OverlayState,
    /// The size catalog, in output order.
    pub sizes: Vec<TargetSize>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            quality: Quality::default().value(),
            output_format: OutputFormat::default(),
            selected_sizes: default_selection(),
            crop: CropConfig::default(),
            fonts: FontsConfig::default(),
            overlay: OverlayState::default(),
            sizes: default_catalog(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropMode {
    #[default]
    None,
    AllFiles,
    PerFile,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CropConfig {
    pub mode: CropMode,
    /// Focus shared by every file in `all_files` mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<NormalizedPoint>,
    /// Per-file focus for `per_file` mode, keyed by file name.
    pub files: BTreeMap<String, NormalizedPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontsConfig {
    /// Directories searched for font files. Empty means the platform
    /// defaults.
    pub dirs: Vec<PathBuf>,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::Validation("quality must be 1-100".into()));
        }
        if self.sizes.is_empty() {
            return Err(ConfigError::Validation("sizes must not be empty".into()));
        }
        let mut labels = HashSet::new();
        for size in &self.sizes {
            size.check()
                .map_err(|e| ConfigError::Validation(e.to_string()))?;
            if !labels.insert(size.label.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate size label '{}'",
                    size.label
                )));
            }
        }
        for label in &self.selected_sizes {
            if !labels.contains(label.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "selected_sizes names unknown size '{}'",
                    label
                )));
            }
        }
        if self.crop.mode == CropMode::AllFiles && self.crop.focus.is_none() {
            return Err(ConfigError::Validation(
                "crop.focus is required when crop.mode = \"all_files\"".into(),
            ));
        }
        if self.overlay.text.opacity > 100 {
            return Err(ConfigError::Validation(
                "overlay.text.opacity must be 0-100".into(),
            ));
        }
        if self.overlay.graphic.opacity > 100 {
            return Err(ConfigError::Validation(
                "overlay.graphic.opacity must be 0-100".into(),
            ));
        }
        if !(1..=100).contains(&self.overlay.graphic.size_percent) {
            return Err(ConfigError::Validation(
                "overlay.graphic.size_percent must be 1-100".into(),
            ));
        }
        Ok(())
    }

    /// Selected sizes in catalog order.
    pub fn selected_targets(&self) -> Vec<TargetSize> {
        self.sizes
            .iter()
            .filter(|s| self.selected_sizes.contains(&s.label))
            .cloned()
            .collect()
    }

    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            format: self.output_format,
            quality: Quality::new(self.quality),
        }
    }

    /// Crop policy with per-file keys resolved against `source_dir`.
    pub fn crop_policy(&self, source_dir: &Path) -> CropPolicy {
        match self.crop.mode {
            CropMode::None => CropPolicy::None,
            CropMode::AllFiles => match self.crop.focus {
                Some(p) => CropPolicy::AllFiles(p),
                None => CropPolicy::None,
            },
            CropMode::PerFile => CropPolicy::per_file(
                self.crop
                    .files
                    .iter()
                    .map(|(name, p)| (source_dir.join(name), *p)),
            ),
        }
    }

    /// Font source over the configured directories.
    pub fn font_source(&self) -> SystemFontSource {
        if self.fonts.dirs.is_empty() {
            SystemFontSource::new(default_font_dirs())
        } else {
            SystemFontSource::new(self.fonts.dirs.clone())
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged on top of.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(AppConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
pub fn read_config_file(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Like [`read_config_file`], but a missing file is `Ok(None)`.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    read_config_file(path).map(Some)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load configuration.
///
/// An explicit `path` must exist. Without one, `webcrop.toml` in the working
/// directory is used if present, else the stock defaults.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = match path {
        Some(p) => Some(read_config_file(p)?),
        None => load_raw_config(Path::new(CONFIG_FILE_NAME))?,
    };
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `webcrop.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# webcrop configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Tables merge over the defaults key by key; arrays ([[sizes]],
# [[overlay.shapes]]) replace the default list entirely.
# Unknown keys will cause an error.

# Lossy encoding quality (1 = smallest, 100 = best). Ignored by PNG/WebP,
# which are written lossless.
quality = 85

# Output format: "same_as_input", "jpeg", "png" or "webp".
output_format = "jpeg"

# Labels from [[sizes]] to generate. Outputs go to <output>/<W>x<H>/.
selected_sizes = ["Featured"]

# ---------------------------------------------------------------------------
# Size catalog
# ---------------------------------------------------------------------------
[[sizes]]
label = "Featured"
width = 1200
height = 600

[[sizes]]
label = "Large"
width = 800
height = 600

[[sizes]]
label = "Medium"
width = 600
height = 400

[[sizes]]
label = "Thumbnail"
width = 300
height = 200

# ---------------------------------------------------------------------------
# Crop focus
# ---------------------------------------------------------------------------
# Images are scaled to cover the target and the excess is cropped. By default
# the crop is centered; a focus point [x, y] (fractions of width and height)
# moves the crop window toward that point.
[crop]
# "none", "all_files" (uses focus) or "per_file" (uses [crop.files]).
mode = "none"
# focus = [0.5, 0.3]

[crop.files]
# "beach.jpg" = [0.2, 0.5]

# ---------------------------------------------------------------------------
# Fonts
# ---------------------------------------------------------------------------
[fonts]
# Directories searched for font files. Empty = the platform font folders.
# Text falls back to a built-in bitmap font when a family is not found.
dirs = []

# ---------------------------------------------------------------------------
# Overlays (applied in order: shapes, graphic, text)
# ---------------------------------------------------------------------------
[overlay]
shapes_enabled = false
graphic_enabled = false
text_enabled = false

[overlay.text]
content = ""
# Point size relative to a 1000 px wide image; never below 10 px.
size = 24
color = "#ffffff"
opacity = 100
outline_color = "#000000"
# Outline thickness in pixels; 0 disables it.
outline_width = 1
font = "Arial"
# "top", "center", "bottom" or { manual = [x, y] }.
position = "bottom"

[overlay.graphic]
# Image file, relative to this config file.
# path = "logo.png"
# Width as a percentage of the output width (1-100).
size_percent = 20
opacity = 100
# "top_left", "top_right", "bottom_left", "bottom_right", "center"
# or { manual = [x, y] }.
position = "bottom_right"

# Shapes are drawn in list order. Kinds: rectangle, ellipse (from/to corners),
# line (from/to), polygon (points), parallelogram (origin, width, height, skew).
# [[overlay.shapes]]
# kind = "rectangle"
# from = [0.05, 0.05]
# to = [0.35, 0.2]
# fill = "#000000"
# outline = { color = "#ffffff", width = 2 }
"##
}
