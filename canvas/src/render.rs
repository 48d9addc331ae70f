//! Rendering: draws the full editor scene to a [`Surface`].
//!
//! This module receives read-only views of document, camera and overlay state
//! and produces drawing calls. It does not mutate any application state.
//! The browser backend lives in [`crate::web`], the software backend used for
//! export in [`crate::pixmap`]; tests use a recording surface.
//!
//! Paint order: background bitmap, annotations in sequence order, selection
//! chrome for the selected annotation, the in-progress draft, then the crop
//! overlay.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::f64::consts::PI;

use crate::camera::{Camera, Point};
use crate::consts::{GLYPH_WIDTH_RATIO, LINE_HEIGHT_RATIO};
use crate::crop::CropOverlay;
use crate::doc::{Annotation, AnnotationId, DocStore, Shape, Style, TextStyle};
use crate::geom::Rect;
use crate::hit::{self, HitPart};
use crate::raster::{Bitmap, RasterError};

/// Arrowhead half-angle in radians (~30°).
const ARROW_ANGLE: f64 = PI / 6.0;

/// Selection chrome color.
const SELECTION_COLOR: &str = "#1E90FF";

/// Selection dash segment length in screen pixels.
const SELECTION_DASH_PX: f64 = 4.0;

/// Drawn handle radius in screen pixels (the grab radius is larger).
const HANDLE_DRAW_PX: f64 = 5.0;

/// Dim applied outside the crop rectangle.
const CROP_SHADE: &str = "rgba(0, 0, 0, 0.5)";

/// Placeholder fill for blur regions when no background is loaded.
const BLUR_PLACEHOLDER: &str = "rgba(128, 128, 128, 0.5)";

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("surface operation failed: {0}")]
    Surface(String),
    #[error("unsupported color {0:?}")]
    Color(String),
    #[error(transparent)]
    Raster(#[from] RasterError),
}

// =============================================================
// Backend seam
// =============================================================

/// One segment of a [`Path`].
#[derive(Debug, Clone, PartialEq)]
pub enum PathOp {
    MoveTo(Point),
    LineTo(Point),
    /// Full ellipse as its own subpath.
    Ellipse { center: Point, rx: f64, ry: f64 },
    Close,
}

/// Backend-neutral vector path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    pub ops: Vec<PathOp>,
}

impl Path {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn move_to(mut self, p: Point) -> Self {
        self.ops.push(PathOp::MoveTo(p));
        self
    }

    #[must_use]
    pub fn line_to(mut self, p: Point) -> Self {
        self.ops.push(PathOp::LineTo(p));
        self
    }

    #[must_use]
    pub fn close(mut self) -> Self {
        self.ops.push(PathOp::Close);
        self
    }

    #[must_use]
    pub fn ellipse(mut self, center: Point, rx: f64, ry: f64) -> Self {
        self.ops.push(PathOp::Ellipse { center, rx, ry });
        self
    }

    /// Open polyline through `points`.
    #[must_use]
    pub fn polyline(points: &[Point]) -> Self {
        let mut path = Self::new();
        let mut iter = points.iter();
        if let Some(first) = iter.next() {
            path = path.move_to(*first);
        }
        for p in iter {
            path = path.line_to(*p);
        }
        path
    }

    /// Closed polygon through `points`.
    #[must_use]
    pub fn polygon(points: &[Point]) -> Self {
        Self::polyline(points).close()
    }

    #[must_use]
    pub fn rect(r: &Rect) -> Self {
        Self::polygon(&r.corners())
    }
}

/// Stroke parameters. Caps and joins are always round.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub color: String,
    pub width: f64,
    /// Dash pattern; empty for solid.
    pub dash: Vec<f64>,
}

impl Stroke {
    #[must_use]
    pub fn solid(color: &str, width: f64) -> Self {
        Self { color: color.to_owned(), width, dash: Vec::new() }
    }
}

/// Font for text drawing. Text is drawn with a top baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Font {
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
}

impl Font {
    /// CSS font shorthand.
    #[must_use]
    pub fn css(&self) -> String {
        let italic = if self.italic { "italic " } else { "" };
        let bold = if self.bold { "bold " } else { "" };
        format!("{italic}{bold}{}px sans-serif", self.size)
    }
}

impl From<&TextStyle> for Font {
    fn from(t: &TextStyle) -> Self {
        Self { size: t.font_size, bold: t.bold, italic: t.italic }
    }
}

/// A 2D drawing target.
///
/// Fallible methods return [`RenderError`] when the backend rejects a call.
#[allow(clippy::missing_errors_doc)]
pub trait Surface {
    fn save(&mut self);
    fn restore(&mut self);
    /// Reset the transform and clear `width` x `height` CSS pixels.
    fn reset(&mut self, width: f64, height: f64, dpr: f64) -> Result<(), RenderError>;
    fn translate(&mut self, dx: f64, dy: f64) -> Result<(), RenderError>;
    fn rotate(&mut self, radians: f64) -> Result<(), RenderError>;
    fn scale(&mut self, sx: f64, sy: f64) -> Result<(), RenderError>;
    /// Multiply subsequent drawing by `alpha`.
    fn set_alpha(&mut self, alpha: f64);
    fn stroke_path(&mut self, path: &Path, stroke: &Stroke) -> Result<(), RenderError>;
    fn fill_path(&mut self, path: &Path, color: &str) -> Result<(), RenderError>;
    /// Intersect the clip region with `path`.
    fn clip(&mut self, path: &Path) -> Result<(), RenderError>;
    fn fill_text(&mut self, text: &str, at: Point, font: Font, color: &str) -> Result<(), RenderError>;
    /// Blit a bitmap at its natural size with its top-left at `at`.
    fn draw_bitmap(&mut self, bitmap: &Bitmap, at: Point) -> Result<(), RenderError>;
    /// Draw a named image asset into `dest`. Returns `Ok(false)` if the asset
    /// is not (yet) loaded, so the caller can fall back.
    fn draw_asset(&mut self, name: &str, dest: Rect) -> Result<bool, RenderError>;
}

/// Read-only inputs for one paint.
pub struct Scene<'a> {
    pub background: Option<&'a Bitmap>,
    pub doc: &'a DocStore,
    pub camera: &'a Camera,
    /// Transient shape being drawn, not yet in the store.
    pub draft: Option<&'a Annotation>,
    pub crop: Option<&'a CropOverlay>,
    /// Text annotation currently receiving keystrokes; gets a caret.
    pub editing: Option<AnnotationId>,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub dpr: f64,
}

/// Draw the full scene.
///
/// # Errors
///
/// Returns `Err` if any surface call fails.
pub fn draw(surface: &mut dyn Surface, scene: &Scene<'_>) -> Result<(), RenderError> {
    let camera = scene.camera;

    // Layer 1: clear and set up the view transform.
    surface.reset(scene.viewport_width, scene.viewport_height, scene.dpr)?;
    surface.translate(camera.pan_x, camera.pan_y)?;
    surface.scale(camera.zoom, camera.zoom)?;

    // Layer 2: captured bitmap.
    if let Some(bg) = scene.background {
        surface.draw_bitmap(bg, Point::default())?;
    }

    // Layer 3: annotations in paint order.
    for a in scene.doc.annotations() {
        draw_annotation(surface, a, scene.background)?;
        if scene.editing == Some(a.id) {
            draw_caret(surface, a, camera)?;
        }
    }

    // Layer 4: selection chrome.
    if let Some(selected) = scene.doc.selected_annotation() {
        draw_selection(surface, selected, camera)?;
    }

    // Layer 5: in-progress shape.
    if let Some(draft) = scene.draft {
        draw_annotation(surface, draft, scene.background)?;
    }

    // Layer 6: crop overlay.
    if let Some(crop) = scene.crop {
        draw_crop(surface, crop, camera)?;
    }
    Ok(())
}

/// Draw the background and annotations in paint order with an identity
/// view: no selection chrome, caret, draft or crop overlay. This is what
/// export produces.
///
/// # Errors
///
/// Returns `Err` if any surface call fails.
pub fn draw_document(
    surface: &mut dyn Surface,
    background: Option<&Bitmap>,
    annotations: &[Annotation],
) -> Result<(), RenderError> {
    if let Some(bg) = background {
        surface.draw_bitmap(bg, Point::default())?;
    }
    for a in annotations {
        draw_annotation(surface, a, background)?;
    }
    Ok(())
}

// =============================================================
// Annotation dispatch
// =============================================================

/// Draw one annotation with its opacity and rotation.
///
/// # Errors
///
/// Returns `Err` if any surface call fails.
pub fn draw_annotation(surface: &mut dyn Surface, a: &Annotation, background: Option<&Bitmap>) -> Result<(), RenderError> {
    surface.save();
    surface.set_alpha(a.style.opacity);

    // Blur patches are sampled in unrotated image space and clipped to the
    // rotated box, so they are drawn before the rotation transform.
    if let Shape::BlurRegion { effect, intensity, .. } = &a.shape {
        surface.clip(&Path::polygon(&hit::rotated_corners(a)))?;
        let patch = background.and_then(|bg| bg.effect_patch(&hit::world_bounds(a), *effect, *intensity));
        let result = match patch {
            Some(p) => surface.draw_bitmap(&p.bitmap, Point::new(f64::from(p.x), f64::from(p.y))),
            None => surface.fill_path(&Path::polygon(&hit::rotated_corners(a)), BLUR_PLACEHOLDER),
        };
        surface.restore();
        return result;
    }

    if a.rotation != 0.0 {
        let c = hit::bounding_box(a).center();
        surface.translate(c.x, c.y)?;
        surface.rotate(a.rotation.to_radians())?;
        surface.translate(-c.x, -c.y)?;
    }
    let result = draw_shape(surface, a);
    surface.restore();
    result
}

fn draw_shape(surface: &mut dyn Surface, a: &Annotation) -> Result<(), RenderError> {
    let style = &a.style;
    let stroke = Stroke::solid(&style.stroke, style.stroke_width);
    match &a.shape {
        Shape::Arrow { start, end, has_start_head, has_end_head, head_asset } => {
            surface.stroke_path(&Path::new().move_to(*start).line_to(*end), &stroke)?;
            if *has_end_head {
                draw_arrowhead(surface, *end, *start, style, head_asset.as_deref())?;
            }
            if *has_start_head {
                draw_arrowhead(surface, *start, *end, style, head_asset.as_deref())?;
            }
            Ok(())
        }
        Shape::Line { start, end, has_start_head, has_end_head } => {
            surface.stroke_path(&Path::new().move_to(*start).line_to(*end), &stroke)?;
            if *has_end_head {
                draw_arrowhead(surface, *end, *start, style, None)?;
            }
            if *has_start_head {
                draw_arrowhead(surface, *start, *end, style, None)?;
            }
            Ok(())
        }
        Shape::Rectangle { bounds, fill } => {
            let path = Path::rect(bounds);
            if *fill {
                surface.fill_path(&path, &style.stroke)?;
            }
            surface.stroke_path(&path, &stroke)
        }
        Shape::Circle { bounds, fill } => {
            let path = Path::new().ellipse(bounds.center(), bounds.width / 2.0, bounds.height / 2.0);
            if *fill {
                surface.fill_path(&path, &style.stroke)?;
            }
            surface.stroke_path(&path, &stroke)
        }
        Shape::Freehand { points } => surface.stroke_path(&Path::polyline(points), &stroke),
        Shape::Highlight { points, radius } => {
            surface.stroke_path(&Path::polyline(points), &Stroke::solid(&style.stroke, radius * 2.0))
        }
        Shape::Text { anchor, content, text_style } => draw_text_block(surface, *anchor, content, text_style, &style.stroke),
        Shape::Emoji { anchor, symbol, size } => {
            let font = Font { size: *size, bold: false, italic: false };
            surface.fill_text(symbol, anchor.offset(-size / 2.0, -size / 2.0), font, &style.stroke)
        }
        Shape::Callout { anchor, content, text_style, label } => {
            draw_callout(surface, *anchor, content, text_style, *label, &style.stroke)
        }
        // Drawn before rotation in `draw_annotation`.
        Shape::BlurRegion { .. } => Ok(()),
    }
}

/// Draw an arrowhead at `tip` pointing away from `from`. An asset head is
/// used when named and loaded; otherwise a filled vector triangle.
fn draw_arrowhead(
    surface: &mut dyn Surface,
    tip: Point,
    from: Point,
    style: &Style,
    asset: Option<&str>,
) -> Result<(), RenderError> {
    let size = (style.stroke_width * 3.0).max(10.0);
    let angle = (tip.y - from.y).atan2(tip.x - from.x);

    if let Some(name) = asset {
        surface.save();
        surface.translate(tip.x, tip.y)?;
        surface.rotate(angle)?;
        let drawn = surface.draw_asset(name, Rect::new(-size, -size / 2.0, size, size));
        surface.restore();
        if drawn? {
            return Ok(());
        }
        tracing::trace!(asset = name, "render: asset arrowhead not loaded, using vector head");
    }

    let left = Point::new(tip.x - size * (angle - ARROW_ANGLE).cos(), tip.y - size * (angle - ARROW_ANGLE).sin());
    let right = Point::new(tip.x - size * (angle + ARROW_ANGLE).cos(), tip.y - size * (angle + ARROW_ANGLE).sin());
    surface.fill_path(&Path::polygon(&[tip, left, right]), &style.stroke)
}

// =============================================================
// Text
// =============================================================

fn draw_text_block(
    surface: &mut dyn Surface,
    origin: Point,
    content: &str,
    text_style: &TextStyle,
    color: &str,
) -> Result<(), RenderError> {
    let font = Font::from(text_style);
    let line_height = text_style.font_size * LINE_HEIGHT_RATIO;
    for (idx, line) in content.split('\n').enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let y = origin.y + idx as f64 * line_height;
        if line.is_empty() {
            continue;
        }
        surface.fill_text(line, Point::new(origin.x, y), font, color)?;
        if text_style.underline {
            let (w, _) = hit::text_extent(line, text_style.font_size);
            let uy = y + text_style.font_size * 1.05;
            let thickness = (text_style.font_size / 14.0).max(1.0);
            surface.stroke_path(
                &Path::new().move_to(Point::new(origin.x, uy)).line_to(Point::new(origin.x + w, uy)),
                &Stroke::solid(color, thickness),
            )?;
        }
    }
    Ok(())
}

fn draw_callout(
    surface: &mut dyn Surface,
    anchor: Point,
    content: &str,
    text_style: &TextStyle,
    label: u32,
    color: &str,
) -> Result<(), RenderError> {
    let r = hit::callout_badge_radius(text_style.font_size);
    surface.fill_path(&Path::new().ellipse(anchor, r, r), color)?;

    let label = label.to_string();
    let label_font = Font { size: text_style.font_size, bold: true, italic: false };
    let (lw, lh) = hit::text_extent(&label, text_style.font_size);
    surface.fill_text(&label, Point::new(anchor.x - lw / 2.0, anchor.y - lh / 2.0), label_font, "#FFFFFF")?;

    if content.is_empty() {
        return Ok(());
    }
    let (_, th) = hit::text_extent(content, text_style.font_size);
    let origin = Point::new(hit::callout_text_x(anchor, text_style.font_size), anchor.y - th / 2.0);
    draw_text_block(surface, origin, content, text_style, color)
}

/// Vertical caret after the last character of an edited text annotation.
fn draw_caret(surface: &mut dyn Surface, a: &Annotation, camera: &Camera) -> Result<(), RenderError> {
    let (origin, content, text_style) = match &a.shape {
        Shape::Text { anchor, content, text_style } => (*anchor, content.as_str(), text_style),
        Shape::Callout { anchor, content, text_style, .. } => {
            let (_, th) = hit::text_extent(content, text_style.font_size);
            (Point::new(hit::callout_text_x(*anchor, text_style.font_size), anchor.y - th / 2.0), content.as_str(), text_style)
        }
        _ => return Ok(()),
    };
    let line_height = text_style.font_size * LINE_HEIGHT_RATIO;
    let last = content.rsplit('\n').next().unwrap_or_default();
    #[allow(clippy::cast_precision_loss)]
    let line_idx = content.matches('\n').count() as f64;
    #[allow(clippy::cast_precision_loss)]
    let x = origin.x + last.chars().count() as f64 * text_style.font_size * GLYPH_WIDTH_RATIO;
    let y = origin.y + line_idx * line_height;

    surface.save();
    let c = hit::bounding_box(a).center();
    surface.translate(c.x, c.y)?;
    surface.rotate(a.rotation.to_radians())?;
    surface.translate(-c.x, -c.y)?;
    let result = surface.stroke_path(
        &Path::new().move_to(Point::new(x, y)).line_to(Point::new(x, y + text_style.font_size)),
        &Stroke::solid(SELECTION_COLOR, camera.screen_dist_to_image(1.5)),
    );
    surface.restore();
    result
}

// =============================================================
// Selection chrome
// =============================================================

fn draw_selection(surface: &mut dyn Surface, a: &Annotation, camera: &Camera) -> Result<(), RenderError> {
    let dash = camera.screen_dist_to_image(SELECTION_DASH_PX);
    let outline = Stroke { color: SELECTION_COLOR.to_owned(), width: camera.screen_dist_to_image(1.0), dash: vec![dash, dash] };
    surface.stroke_path(&Path::polygon(&hit::rotated_corners(a)), &outline)?;

    let handles = hit::handle_positions(a, camera);
    let radius = camera.screen_dist_to_image(HANDLE_DRAW_PX);
    let solid = Stroke::solid(SELECTION_COLOR, camera.screen_dist_to_image(1.0));

    let north = handles.iter().find(|h| matches!(h.part, HitPart::ResizeHandle(hit::ResizeAnchor::N)));
    let rotate = handles.iter().find(|h| h.part == HitPart::RotateHandle);
    if let (Some(n), Some(r)) = (north, rotate) {
        surface.stroke_path(&Path::new().move_to(n.position).line_to(r.position), &solid)?;
    }

    for h in &handles {
        let path = Path::new().ellipse(h.position, radius, radius);
        surface.fill_path(&path, "#FFFFFF")?;
        surface.stroke_path(&path, &solid)?;
    }
    Ok(())
}

// =============================================================
// Crop overlay
// =============================================================

fn draw_crop(surface: &mut dyn Surface, crop: &CropOverlay, camera: &Camera) -> Result<(), RenderError> {
    let outer = crop.bounds();
    let Some(r) = crop.rect() else {
        return surface.fill_path(&Path::rect(&outer), CROP_SHADE);
    };

    // Shade the four bands around the selection.
    let bands = [
        Rect::new(outer.x, outer.y, outer.width, r.y - outer.y),
        Rect::new(outer.x, r.bottom(), outer.width, outer.bottom() - r.bottom()),
        Rect::new(outer.x, r.y, r.x - outer.x, r.height),
        Rect::new(r.right(), r.y, outer.right() - r.right(), r.height),
    ];
    for band in bands.iter().filter(|b| !b.is_empty()) {
        surface.fill_path(&Path::rect(band), CROP_SHADE)?;
    }

    let dash = camera.screen_dist_to_image(SELECTION_DASH_PX);
    let width = camera.screen_dist_to_image(1.0);
    surface.stroke_path(&Path::rect(&r), &Stroke { color: "#FFFFFF".to_owned(), width, dash: vec![dash, dash] })?;

    let radius = camera.screen_dist_to_image(HANDLE_DRAW_PX);
    for (_, p) in crop.handles() {
        let path = Path::new().ellipse(p, radius, radius);
        surface.fill_path(&path, "#FFFFFF")?;
        surface.stroke_path(&path, &Stroke::solid(SELECTION_COLOR, width))?;
    }
    Ok(())
}
