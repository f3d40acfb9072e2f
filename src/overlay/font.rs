//! Font resolution, caching, and glyph rasterization.
//!
//! Text overlays name a font *family* ("Arial", "Georgia", ...). A
//! [`FontSource`] turns a family into an `ab_glyph` font; the production
//! source, [`SystemFontSource`], looks for well-known file names under the
//! platform font directories. [`FontCache`] sits in front of a source, keeps
//! every resolved face for its lifetime, and falls back to the built-in
//! bitmap font when a family cannot be loaded, so text always renders.

use super::glyphs::{self, GLYPH_ADVANCE, GLYPH_ROWS};
use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum FontError {
    #[error("no font file found for family '{0}'")]
    NotFound(String),
    #[error("IO error reading font: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid font file {0}")]
    Invalid(String),
}

/// Resolves a family name to a loaded font.
pub trait FontSource: Send {
    fn load(&self, family: &str) -> Result<FontArc, FontError>;
}

/// A source that never finds anything; every family renders with the
/// built-in bitmap font.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedOnly;

impl FontSource for EmbeddedOnly {
    fn load(&self, family: &str) -> Result<FontArc, FontError> {
        Err(FontError::NotFound(family.to_string()))
    }
}

/// File names tried, in order, for a family.
pub fn candidate_files(family: &str) -> Vec<String> {
    let key = family.trim().to_lowercase();
    let known: &[&str] = match key.as_str() {
        "arial" => &["arial.ttf", "DejaVuSans.ttf", "LiberationSans-Regular.ttf"],
        "times new roman" => &[
            "times.ttf",
            "Times New Roman.ttf",
            "DejaVuSerif.ttf",
            "LiberationSerif-Regular.ttf",
        ],
        "courier new" => &[
            "cour.ttf",
            "Courier New.ttf",
            "DejaVuSansMono.ttf",
            "LiberationMono-Regular.ttf",
        ],
        "georgia" => &["georgia.ttf", "DejaVuSerif.ttf"],
        "verdana" => &["verdana.ttf", "DejaVuSans.ttf"],
        _ => &[],
    };
    if !known.is_empty() {
        return known.iter().map(|s| s.to_string()).collect();
    }
    let compact: String = family.split_whitespace().collect();
    let mut names = vec![format!("{}.ttf", family.trim()), format!("{compact}.ttf")];
    names.push(format!("{}.otf", family.trim()));
    names.dedup();
    names
}

/// Platform font directories, most specific first.
pub fn default_font_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(home) = std::env::var_os("HOME") {
        let home = PathBuf::from(home);
        dirs.push(home.join(".fonts"));
        dirs.push(home.join(".local/share/fonts"));
        dirs.push(home.join("Library/Fonts"));
    }
    dirs.push(PathBuf::from("/usr/share/fonts"));
    dirs.push(PathBuf::from("/usr/local/share/fonts"));
    dirs.push(PathBuf::from("/Library/Fonts"));
    dirs.push(PathBuf::from("/System/Library/Fonts"));
    if let Some(windir) = std::env::var_os("WINDIR") {
        dirs.push(PathBuf::from(windir).join("Fonts"));
    }
    dirs
}

/// Finds fonts by file name under a list of directories.
///
/// The directories are indexed once, on first lookup. A family that is an
/// existing file path is loaded directly.
pub struct SystemFontSource {
    dirs: Vec<PathBuf>,
    index: OnceLock<HashMap<String, PathBuf>>,
}

impl SystemFontSource {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self {
            dirs,
            index: OnceLock::new(),
        }
    }

    fn index(&self) -> &HashMap<String, PathBuf> {
        self.index.get_or_init(|| {
            let mut index = HashMap::new();
            for dir in &self.dirs {
                for entry in WalkDir::new(dir)
                    .follow_links(true)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                {
                    let name = entry.file_name().to_string_lossy().to_lowercase();
                    // First directory wins for duplicate names.
                    index.entry(name).or_insert_with(|| entry.into_path());
                }
            }
            debug!(fonts = index.len(), "Indexed font directories");
            index
        })
    }

    fn locate(&self, family: &str) -> Option<PathBuf> {
        let direct = Path::new(family);
        if direct.is_file() {
            return Some(direct.to_path_buf());
        }
        let index = self.index();
        candidate_files(family)
            .iter()
            .find_map(|name| index.get(&name.to_lowercase()).cloned())
    }
}

impl Default for SystemFontSource {
    fn default() -> Self {
        Self::new(default_font_dirs())
    }
}

impl FontSource for SystemFontSource {
    fn load(&self, family: &str) -> Result<FontArc, FontError> {
        let path = self
            .locate(family)
            .ok_or_else(|| FontError::NotFound(family.to_string()))?;
        let bytes = std::fs::read(&path)?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|_| FontError::Invalid(path.display().to_string()))?;
        debug!(family, path = %path.display(), "Loaded font");
        Ok(font)
    }
}

/// Rasterized text: per-pixel coverage in `[0, 1]`, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphMask {
    pub width: u32,
    pub height: u32,
    coverage: Vec<f32>,
}

impl GlyphMask {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            coverage: vec![0.0; (width as usize) * (height as usize)],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.coverage[(y * self.width + x) as usize]
    }

    fn accumulate(&mut self, x: i32, y: i32, c: f32) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let slot = &mut self.coverage[(y as u32 * self.width + x as u32) as usize];
        *slot = slot.max(c.clamp(0.0, 1.0));
    }

    /// Pixels with non-zero coverage as `(x, y, coverage)`.
    pub fn covered(&self) -> impl Iterator<Item = (u32, u32, f32)> + '_ {
        self.coverage.iter().enumerate().filter_map(move |(i, &c)| {
            (c > 0.0).then(|| (i as u32 % self.width, i as u32 / self.width, c))
        })
    }
}

/// A font resolved at a fixed pixel size.
#[derive(Clone)]
pub enum Typeface {
    Outline { font: FontArc, scale: PxScale },
    /// The 5×7 bitmap font, each pixel drawn as a `scale`×`scale` block.
    Builtin { scale: u32 },
}

impl fmt::Debug for Typeface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Outline { scale, .. } => f
                .debug_struct("Outline")
                .field("px", &scale.y)
                .finish_non_exhaustive(),
            Self::Builtin { scale } => f.debug_struct("Builtin").field("scale", scale).finish(),
        }
    }
}

impl Typeface {
    /// Bitmap fallback sized so a glyph cell is roughly `px` tall.
    pub fn builtin_for(px: u32) -> Self {
        Self::Builtin {
            scale: (px / 8).max(1),
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin { .. })
    }

    /// Layout extent `(width, height)` of `text` on one line.
    pub fn measure(&self, text: &str) -> (u32, u32) {
        match self {
            Self::Outline { font, scale } => {
                let scaled = font.as_scaled(*scale);
                let mut width = 0.0f32;
                let mut prev: Option<GlyphId> = None;
                for ch in text.chars() {
                    let id = scaled.glyph_id(ch);
                    if let Some(p) = prev {
                        width += scaled.kern(p, id);
                    }
                    width += scaled.h_advance(id);
                    prev = Some(id);
                }
                let height = scaled.ascent() - scaled.descent();
                (width.max(0.0).ceil() as u32, height.max(0.0).ceil() as u32)
            }
            Self::Builtin { scale } => {
                let n = text.chars().count() as u32;
                let width = if n == 0 {
                    0
                } else {
                    (n * GLYPH_ADVANCE - 1) * scale
                };
                (width, GLYPH_ROWS * scale)
            }
        }
    }

    /// Rasterize `text` into a mask the size of [`Typeface::measure`].
    pub fn rasterize(&self, text: &str) -> GlyphMask {
        let (w, h) = self.measure(text);
        let mut mask = GlyphMask::new(w, h);
        match self {
            Self::Outline { font, scale } => {
                let scaled = font.as_scaled(*scale);
                let baseline = scaled.ascent();
                let mut cursor = 0.0f32;
                let mut prev: Option<GlyphId> = None;
                for ch in text.chars() {
                    let id = scaled.glyph_id(ch);
                    if let Some(p) = prev {
                        cursor += scaled.kern(p, id);
                    }
                    let glyph = id.with_scale_and_position(*scale, ab_glyph::point(cursor, baseline));
                    if let Some(outlined) = font.outline_glyph(glyph) {
                        let bounds = outlined.px_bounds();
                        outlined.draw(|px, py, c| {
                            mask.accumulate(
                                px as i32 + bounds.min.x as i32,
                                py as i32 + bounds.min.y as i32,
                                c,
                            );
                        });
                    }
                    cursor += scaled.h_advance(id);
                    prev = Some(id);
                }
            }
            Self::Builtin { scale } => {
                let s = *scale;
                for (i, ch) in text.chars().enumerate() {
                    let origin_x = i as u32 * GLYPH_ADVANCE * s;
                    for col in 0..glyphs::GLYPH_COLUMNS {
                        for row in 0..GLYPH_ROWS {
                            if !glyphs::is_lit(ch, col, row) {
                                continue;
                            }
                            for dy in 0..s {
                                for dx in 0..s {
                                    mask.accumulate(
                                        (origin_x + col * s + dx) as i32,
                                        (row * s + dy) as i32,
                                        1.0,
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }
        mask
    }
}

/// Caches resolved typefaces by `(family, pixel size)`.
pub struct FontCache {
    source: Box<dyn FontSource>,
    families: HashMap<String, Option<FontArc>>,
    faces: HashMap<(String, u32), Typeface>,
}

impl FontCache {
    pub fn new(source: Box<dyn FontSource>) -> Self {
        Self {
            source,
            families: HashMap::new(),
            faces: HashMap::new(),
        }
    }

    /// Typeface for `family` at `px` pixels; never fails.
    pub fn typeface(&mut self, family: &str, px: u32) -> Typeface {
        let key = (family.to_string(), px);
        if let Some(face) = self.faces.get(&key) {
            return face.clone();
        }

        let source = &self.source;
        let font = self
            .families
            .entry(family.to_string())
            .or_insert_with(|| match source.load(family) {
                Ok(font) => Some(font),
                Err(e) => {
                    warn!(family, error = %e, "Font unavailable, using built-in bitmap font");
                    None
                }
            })
            .clone();

        let face = match font {
            Some(font) => Typeface::Outline {
                font,
                scale: PxScale::from(px as f32),
            },
            None => Typeface::builtin_for(px),
        };
        self.faces.insert(key, face.clone());
        face
    }

    /// Number of cached `(family, size)` entries.
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

impl fmt::Debug for FontCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontCache")
            .field("families", &self.families.len())
            .field("faces", &self.faces.len())
            .finish()
    }
}
