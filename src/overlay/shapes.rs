//! Vector shape annotations.
//!
//! Shapes are declared in normalized coordinates and rasterized onto a
//! transparent layer the size of the target image. Each shape writes its
//! pixels directly, so a later shape replaces an earlier one where they
//! overlap. The finished layer is composited over the base in one step.
//!
//! ```toml
//! [[overlay.shapes]]
//! kind = "rectangle"
//! from = [0.05, 0.05]
//! to = [0.30, 0.20]
//! fill = "#ff0000"
//! outline = { color = "#000000", width = 2 }
//!
//! [[overlay.shapes]]
//! kind = "parallelogram"
//! origin = [0.6, 0.7]
//! width = 0.3
//! height = 0.1
//! skew = 0.2
//! fill = "#202020"
//! ```

use super::color::Color;
use crate::types::NormalizedPoint;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_ellipse_mut, draw_filled_rect_mut, draw_hollow_ellipse_mut, draw_hollow_rect_mut,
    draw_line_segment_mut, draw_polygon_mut,
};
use imageproc::point::Point;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

/// Outline color and thickness in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Stroke {
    pub color: Color,
    #[serde(default = "default_stroke_width")]
    pub width: u32,
}

fn default_stroke_width() -> u32 {
    1
}

impl Stroke {
    pub fn new(color: Color, width: u32) -> Self {
        Self {
            color,
            width: width.max(1),
        }
    }

    fn px(&self) -> u32 {
        self.width.max(1)
    }
}

/// The geometric part of a shape. Closed set; every variant is drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum ShapeGeometry {
    /// Axis-aligned box spanning two corners (inclusive).
    Rectangle {
        from: NormalizedPoint,
        to: NormalizedPoint,
    },
    /// Ellipse inscribed in the box spanning two corners.
    Ellipse {
        from: NormalizedPoint,
        to: NormalizedPoint,
    },
    /// Straight segment; drawn with the outline stroke.
    Line {
        from: NormalizedPoint,
        to: NormalizedPoint,
    },
    /// Closed polygon through the given vertices.
    Polygon { points: Vec<NormalizedPoint> },
    /// Box whose top edge is shifted right by `skew × width`.
    ///
    /// `width` and `height` are fractions of the image size; `skew` is a
    /// fraction of the shape's own pixel width and may be negative.
    Parallelogram {
        origin: NormalizedPoint,
        width: f64,
        height: f64,
        #[serde(default)]
        skew: f64,
    },
}

/// One shape annotation: geometry plus optional fill and outline.
///
/// Deserialized from a single table: `fill` and `outline` are taken out and
/// the remaining keys must form exactly one [`ShapeGeometry`], so unknown
/// keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "toml::Table")]
pub struct ShapeSpec {
    #[serde(flatten)]
    pub geometry: ShapeGeometry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<Stroke>,
}

impl ShapeSpec {
    pub fn new(geometry: ShapeGeometry) -> Self {
        Self {
            geometry,
            fill: None,
            outline: None,
        }
    }

    pub fn filled(mut self, color: Color) -> Self {
        self.fill = Some(color);
        self
    }

    pub fn outlined(mut self, stroke: Stroke) -> Self {
        self.outline = Some(stroke);
        self
    }
}

impl TryFrom<toml::Table> for ShapeSpec {
    type Error = toml::de::Error;

    fn try_from(mut table: toml::Table) -> Result<Self, Self::Error> {
        let fill = table.remove("fill").map(|v| v.try_into::<Color>()).transpose()?;
        let outline = table.remove("outline").map(|v| v.try_into::<Stroke>()).transpose()?;
        let geometry = toml::Value::Table(table).try_into::<ShapeGeometry>()?;
        Ok(Self {
            geometry,
            fill,
            outline,
        })
    }
}

fn opaque(color: Color) -> Rgba<u8> {
    color.with_alpha(255)
}

/// Pixel box `(x0, y0, x1, y1)` with `x0 <= x1`, `y0 <= y1`.
fn pixel_box(from: NormalizedPoint, to: NormalizedPoint, w: u32, h: u32) -> (i32, i32, i32, i32) {
    let (ax, ay) = from.to_pixels(w, h);
    let (bx, by) = to.to_pixels(w, h);
    (ax.min(bx), ay.min(by), ax.max(bx), ay.max(by))
}

/// Inclusive rectangle shrunk by `inset` on every side, if anything remains.
fn inset_rect(x0: i32, y0: i32, x1: i32, y1: i32, inset: i32) -> Option<Rect> {
    let (l, t, r, b) = (x0 + inset, y0 + inset, x1 - inset, y1 - inset);
    if l > r || t > b {
        return None;
    }
    Some(Rect::at(l, t).of_size((r - l + 1) as u32, (b - t + 1) as u32))
}

fn draw_rectangle(layer: &mut RgbaImage, bounds: (i32, i32, i32, i32), shape: &ShapeSpec) {
    let (x0, y0, x1, y1) = bounds;
    if let Some(fill) = shape.fill {
        if let Some(rect) = inset_rect(x0, y0, x1, y1, 0) {
            draw_filled_rect_mut(layer, rect, opaque(fill));
        }
    }
    if let Some(stroke) = shape.outline {
        for i in 0..stroke.px() as i32 {
            match inset_rect(x0, y0, x1, y1, i) {
                Some(rect) => draw_hollow_rect_mut(layer, rect, opaque(stroke.color)),
                None => break,
            }
        }
    }
}

fn draw_ellipse(layer: &mut RgbaImage, bounds: (i32, i32, i32, i32), shape: &ShapeSpec) {
    let (x0, y0, x1, y1) = bounds;
    let center = ((x0 + x1) / 2, (y0 + y1) / 2);
    let (rx, ry) = ((x1 - x0) / 2, (y1 - y0) / 2);
    if rx < 1 || ry < 1 {
        return;
    }
    if let Some(fill) = shape.fill {
        draw_filled_ellipse_mut(layer, center, rx, ry, opaque(fill));
    }
    if let Some(stroke) = shape.outline {
        for i in 0..stroke.px() as i32 {
            if rx - i < 1 || ry - i < 1 {
                break;
            }
            draw_hollow_ellipse_mut(layer, center, rx - i, ry - i, opaque(stroke.color));
        }
    }
}

/// Drop consecutive duplicates and a closing vertex equal to the first.
fn clean_polygon(mut points: Vec<Point<i32>>) -> Vec<Point<i32>> {
    points.dedup();
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

/// Draw a segment `width` pixels thick.
fn draw_thick_segment(
    layer: &mut RgbaImage,
    start: (i32, i32),
    end: (i32, i32),
    width: u32,
    color: Rgba<u8>,
) {
    if width <= 1 {
        draw_line_segment_mut(
            layer,
            (start.0 as f32, start.1 as f32),
            (end.0 as f32, end.1 as f32),
            color,
        );
        return;
    }
    let (dx, dy) = ((end.0 - start.0) as f32, (end.1 - start.1) as f32);
    let len = (dx * dx + dy * dy).sqrt();
    let half = width as f32 / 2.0;
    if len < f32::EPSILON {
        let x = start.0 - half as i32;
        let y = start.1 - half as i32;
        draw_filled_rect_mut(layer, Rect::at(x, y).of_size(width, width), color);
        return;
    }
    let (nx, ny) = (-dy / len * half, dx / len * half);
    let corner = |(x, y): (i32, i32), sign: f32| {
        Point::new(
            (x as f32 + sign * nx).round() as i32,
            (y as f32 + sign * ny).round() as i32,
        )
    };
    let quad = clean_polygon(vec![
        corner(start, 1.0),
        corner(end, 1.0),
        corner(end, -1.0),
        corner(start, -1.0),
    ]);
    if quad.len() >= 3 {
        draw_polygon_mut(layer, &quad, color);
    } else {
        draw_line_segment_mut(
            layer,
            (start.0 as f32, start.1 as f32),
            (end.0 as f32, end.1 as f32),
            color,
        );
    }
}

fn draw_closed_path(layer: &mut RgbaImage, points: Vec<Point<i32>>, shape: &ShapeSpec) {
    let points = clean_polygon(points);
    if points.len() < 3 {
        return;
    }
    if let Some(fill) = shape.fill {
        draw_polygon_mut(layer, &points, opaque(fill));
    }
    if let Some(stroke) = shape.outline {
        let n = points.len();
        for i in 0..n {
            let (a, b) = (points[i], points[(i + 1) % n]);
            draw_thick_segment(layer, (a.x, a.y), (b.x, b.y), stroke.px(), opaque(stroke.color));
        }
    }
}

/// Pixel corners of a parallelogram, clockwise from the top-left.
pub fn parallelogram_corners(
    origin: NormalizedPoint,
    width: f64,
    height: f64,
    skew: f64,
    image_w: u32,
    image_h: u32,
) -> [(i32, i32); 4] {
    let (x, y) = origin.to_pixels(image_w, image_h);
    let w = (width.clamp(0.0, 1.0) * image_w as f64) as i32;
    let h = (height.clamp(0.0, 1.0) * image_h as f64) as i32;
    let skew_px = (w as f64 * skew.clamp(-1.0, 1.0)) as i32;
    [
        (x + skew_px, y),
        (x + w + skew_px, y),
        (x + w, y + h),
        (x, y + h),
    ]
}

/// Rasterize one shape onto `layer`.
pub fn draw_shape(layer: &mut RgbaImage, shape: &ShapeSpec) {
    let (w, h) = layer.dimensions();
    match &shape.geometry {
        ShapeGeometry::Rectangle { from, to } => {
            draw_rectangle(layer, pixel_box(*from, *to, w, h), shape)
        }
        ShapeGeometry::Ellipse { from, to } => {
            draw_ellipse(layer, pixel_box(*from, *to, w, h), shape)
        }
        ShapeGeometry::Line { from, to } => {
            if let Some(stroke) = shape.outline {
                draw_thick_segment(
                    layer,
                    from.to_pixels(w, h),
                    to.to_pixels(w, h),
                    stroke.px(),
                    opaque(stroke.color),
                );
            }
        }
        ShapeGeometry::Polygon { points } => {
            let pts = points
                .iter()
                .map(|p| {
                    let (x, y) = p.to_pixels(w, h);
                    Point::new(x, y)
                })
                .collect();
            draw_closed_path(layer, pts, shape);
        }
        ShapeGeometry::Parallelogram {
            origin,
            width,
            height,
            skew,
        } => {
            let corners = parallelogram_corners(*origin, *width, *height, *skew, w, h);
            let pts = corners.iter().map(|&(x, y)| Point::new(x, y)).collect();
            draw_closed_path(layer, pts, shape);
        }
    }
}

/// Rasterize all shapes, in order, onto a fresh transparent layer.
pub fn render_layer(width: u32, height: u32, shapes: &[ShapeSpec]) -> RgbaImage {
    let mut layer = RgbaImage::new(width, height);
    for shape in shapes {
        draw_shape(&mut layer, shape);
    }
    layer
}
