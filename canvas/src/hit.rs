//! Hit-testing: bounding boxes, point containment, and transform handles.
//!
//! All functions are pure. Rotated annotations are tested by transforming the
//! query point into the annotation's local unrotated frame. Zero-size input
//! degenerates to "no hit" / "no handles" rather than failing.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::{Camera, Point};
use crate::consts::{GLYPH_WIDTH_RATIO, HANDLE_RADIUS_PX, LINE_HEIGHT_RATIO, PATH_HIT_SLOP, ROTATE_HANDLE_OFFSET_PX};
use crate::doc::{Annotation, AnnotationId, DocStore, Shape};
use crate::geom::{Rect, distance_to_polyline, distance_to_segment, rotate_point};

/// Callout badge radius as a multiple of the font size.
pub const CALLOUT_BADGE_RATIO: f64 = 0.9;

/// Gap between a callout badge and its text, as a multiple of the font size.
const CALLOUT_GAP_RATIO: f64 = 0.4;

/// Which part of an annotation was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    ResizeHandle(ResizeAnchor),
    RotateHandle,
}

/// Anchor position for resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAnchor {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

impl ResizeAnchor {
    /// All eight anchors, clockwise from the top edge.
    pub const ALL: [Self; 8] = [Self::N, Self::Ne, Self::E, Self::Se, Self::S, Self::Sw, Self::W, Self::Nw];

    /// Position relative to the box center in half-extents: `(-1..=1, -1..=1)`.
    #[must_use]
    pub fn unit(self) -> (f64, f64) {
        match self {
            Self::N => (0.0, -1.0),
            Self::Ne => (1.0, -1.0),
            Self::E => (1.0, 0.0),
            Self::Se => (1.0, 1.0),
            Self::S => (0.0, 1.0),
            Self::Sw => (-1.0, 1.0),
            Self::W => (-1.0, 0.0),
            Self::Nw => (-1.0, -1.0),
        }
    }

    /// The anchor across the box, which stays fixed while this one is dragged.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::N => Self::S,
            Self::Ne => Self::Sw,
            Self::E => Self::W,
            Self::Se => Self::Nw,
            Self::S => Self::N,
            Self::Sw => Self::Ne,
            Self::W => Self::E,
            Self::Nw => Self::Se,
        }
    }

    /// CSS cursor for an unrotated handle.
    #[must_use]
    pub fn cursor(self) -> &'static str {
        match self {
            Self::N | Self::S => "ns-resize",
            Self::E | Self::W => "ew-resize",
            Self::Ne | Self::Sw => "nesw-resize",
            Self::Se | Self::Nw => "nwse-resize",
        }
    }
}

/// A handle hotspot in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub part: HitPart,
    pub position: Point,
}

/// Result of a hit test.
#[derive(Debug, Clone, Copy)]
pub struct Hit {
    pub id: AnnotationId,
    pub part: HitPart,
}

// =============================================================
// Bounds
// =============================================================

/// Estimated `(width, height)` of a text block.
///
/// Uses a fixed glyph advance so bounds are deterministic without a font
/// backend. Empty text keeps a half-em wide box so the caret stays clickable.
#[must_use]
pub fn text_extent(content: &str, font_size: f64) -> (f64, f64) {
    let lines: Vec<&str> = content.split('\n').collect();
    let max_chars = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    #[allow(clippy::cast_precision_loss)]
    let width = (max_chars as f64 * font_size * GLYPH_WIDTH_RATIO).max(font_size * 0.5);
    #[allow(clippy::cast_precision_loss)]
    let height = lines.len() as f64 * font_size * LINE_HEIGHT_RATIO;
    (width, height)
}

/// Badge radius of a callout with the given font size.
#[must_use]
pub fn callout_badge_radius(font_size: f64) -> f64 {
    font_size * CALLOUT_BADGE_RATIO
}

/// Left edge of a callout's trailing text.
#[must_use]
pub fn callout_text_x(anchor: Point, font_size: f64) -> f64 {
    anchor.x + callout_badge_radius(font_size) + font_size * CALLOUT_GAP_RATIO
}

/// Local (unrotated) bounding box of an annotation.
#[must_use]
pub fn bounding_box(a: &Annotation) -> Rect {
    match &a.shape {
        Shape::Arrow { start, end, .. } | Shape::Line { start, end, .. } => Rect::from_corners(*start, *end),
        Shape::Rectangle { bounds, .. } | Shape::Circle { bounds, .. } | Shape::BlurRegion { bounds, .. } => *bounds,
        Shape::Freehand { points } | Shape::Highlight { points, .. } => Rect::enclosing(points).unwrap_or_default(),
        Shape::Text { anchor, content, text_style } => {
            let (w, h) = text_extent(content, text_style.font_size);
            Rect::new(anchor.x, anchor.y, w, h)
        }
        Shape::Emoji { anchor, size, .. } => Rect::new(anchor.x - size / 2.0, anchor.y - size / 2.0, *size, *size),
        Shape::Callout { anchor, content, text_style, .. } => {
            let r = callout_badge_radius(text_style.font_size);
            if content.is_empty() {
                return Rect::new(anchor.x - r, anchor.y - r, r * 2.0, r * 2.0);
            }
            let (tw, th) = text_extent(content, text_style.font_size);
            let width = callout_text_x(*anchor, text_style.font_size) + tw - (anchor.x - r);
            let height = th.max(r * 2.0);
            Rect::new(anchor.x - r, anchor.y - height / 2.0, width, height)
        }
    }
}

/// Convert an image-space point into the annotation's local unrotated frame.
#[must_use]
pub fn to_local(a: &Annotation, p: Point) -> Point {
    rotate_point(p, bounding_box(a).center(), -a.rotation)
}

/// Corners of the bounding box after rotation, clockwise from top-left.
#[must_use]
pub fn rotated_corners(a: &Annotation) -> [Point; 4] {
    let b = bounding_box(a);
    let center = b.center();
    b.corners().map(|c| rotate_point(c, center, a.rotation))
}

/// Axis-aligned box enclosing the rotated annotation.
#[must_use]
pub fn world_bounds(a: &Annotation) -> Rect {
    Rect::enclosing(&rotated_corners(a)).unwrap_or_default()
}

// =============================================================
// Containment
// =============================================================

/// Whether `p` (image coordinates) lies on or inside the annotation.
///
/// Box shapes never reach past their bounding box, so a click outside the
/// selected box always misses it. Strokes and paths keep a slop band around
/// the centerline since their box can be zero-thick.
#[must_use]
pub fn contains_point(a: &Annotation, p: Point) -> bool {
    let local = to_local(a, p);
    let half_stroke = a.style.stroke_width.max(0.0) / 2.0;
    match &a.shape {
        Shape::Rectangle { bounds, .. } => !bounds.is_empty() && bounds.contains(local, 0.0),
        Shape::Circle { bounds, .. } => {
            if bounds.is_empty() {
                return false;
            }
            let c = bounds.center();
            let rx = bounds.width / 2.0;
            let ry = bounds.height / 2.0;
            let dx = (local.x - c.x) / rx;
            let dy = (local.y - c.y) / ry;
            dx * dx + dy * dy <= 1.0
        }
        Shape::Arrow { start, end, .. } | Shape::Line { start, end, .. } => {
            start != end && distance_to_segment(local, *start, *end) <= half_stroke + PATH_HIT_SLOP
        }
        Shape::Freehand { points } => {
            points.len() >= 2 && distance_to_polyline(local, points) <= half_stroke + PATH_HIT_SLOP
        }
        Shape::Highlight { points, radius } => {
            points.len() >= 2 && distance_to_polyline(local, points) <= radius + PATH_HIT_SLOP
        }
        Shape::Text { .. } | Shape::Emoji { .. } | Shape::Callout { .. } | Shape::BlurRegion { .. } => {
            let b = bounding_box(a);
            !b.is_empty() && b.contains(local, 0.0)
        }
    }
}

/// Topmost annotation whose body contains `p`. Walks reverse paint order.
#[must_use]
pub fn topmost_at(doc: &DocStore, p: Point) -> Option<AnnotationId> {
    doc.annotations().iter().rev().find(|a| contains_point(a, p)).map(|a| a.id)
}

// =============================================================
// Handles
// =============================================================

/// Eight resize handles followed by the rotate handle, in image coordinates.
///
/// Positions are the corners and edge midpoints of the local bounding box,
/// rotated back into image space. The rotate handle sits a fixed number of
/// screen pixels above the top edge. A box with no extent has no handles.
#[must_use]
pub fn handle_positions(a: &Annotation, camera: &Camera) -> Vec<Handle> {
    let b = bounding_box(a);
    if b.width <= 0.0 && b.height <= 0.0 {
        return Vec::new();
    }
    let center = b.center();
    let hw = b.width / 2.0;
    let hh = b.height / 2.0;

    let mut handles: Vec<Handle> = ResizeAnchor::ALL
        .iter()
        .map(|&anchor| {
            let (ux, uy) = anchor.unit();
            let local = Point::new(center.x + ux * hw, center.y + uy * hh);
            Handle { part: HitPart::ResizeHandle(anchor), position: rotate_point(local, center, a.rotation) }
        })
        .collect();

    let offset = camera.screen_dist_to_image(ROTATE_HANDLE_OFFSET_PX);
    let rotate_local = Point::new(center.x, b.y - offset);
    handles.push(Handle { part: HitPart::RotateHandle, position: rotate_point(rotate_local, center, a.rotation) });
    handles
}

/// The handle of `a` under `p`, if any, using a fixed screen-pixel tolerance.
/// When several overlap, the nearest wins.
#[must_use]
pub fn hit_handle(p: Point, a: &Annotation, camera: &Camera) -> Option<HitPart> {
    let tolerance = camera.screen_dist_to_image(HANDLE_RADIUS_PX);
    handle_positions(a, camera)
        .into_iter()
        .map(|h| (h.part, h.position.distance(p)))
        .filter(|(_, d)| *d <= tolerance)
        .min_by(|x, y| x.1.total_cmp(&y.1))
        .map(|(part, _)| part)
}

/// Test what is under `p`: handles of the selected annotation first, then
/// bodies from the top of the paint order down.
#[must_use]
pub fn hit_test(p: Point, doc: &DocStore, camera: &Camera) -> Option<Hit> {
    if let Some(selected) = doc.selected_annotation() {
        if let Some(part) = hit_handle(p, selected, camera) {
            return Some(Hit { id: selected.id, part });
        }
    }
    topmost_at(doc, p).map(|id| Hit { id, part: HitPart::Body })
}

/// CSS cursor hint for a hit part.
#[must_use]
pub fn cursor_for(part: HitPart) -> &'static str {
    match part {
        HitPart::Body => "move",
        HitPart::ResizeHandle(anchor) => anchor.cursor(),
        HitPart::RotateHandle => "grab",
    }
}
