//! Document model: annotation variants, their styles, and the ordered store.
//!
//! This module defines the closed set of annotation variants (`Shape`), the
//! common envelope every annotation carries (`Annotation`), a sparse-update
//! type for property edits (`AnnotationPatch`), and the runtime store that
//! owns all live annotations plus the current selection (`DocStore`).
//!
//! Sequence order is paint order: later entries are drawn on top, and
//! hit-testing walks the sequence in reverse. Annotations are always
//! addressed by [`AnnotationId`], never by index, because indices shift on
//! delete and reorder.
//!
//! Geometry stored here is in the annotation's local, unrotated frame; the
//! `rotation` field applies about the center of the bounding box computed by
//! [`crate::hit::bounding_box`].

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::Point;
use crate::geom::Rect;

/// Unique identifier for an annotation within a session.
pub type AnnotationId = Uuid;

/// Stroke styling shared by every variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    /// Stroke (and fill) color as a CSS hex string.
    pub stroke: String,
    /// Stroke width in image pixels.
    pub stroke_width: f64,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self { stroke: "#E53935".to_owned(), stroke_width: 3.0, opacity: 1.0 }
    }
}

/// Font settings for Text and Callout.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    /// Font size in image pixels.
    pub font_size: f64,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self { font_size: 20.0, bold: false, italic: false, underline: false }
    }
}

/// Raster effect applied by a blur region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlurKind {
    #[default]
    Blur,
    Pixelate,
}

/// Variant-specific geometry and content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// Directed arrow between two points. `head_asset` names an optional
    /// image arrowhead; a vector head is drawn when it is absent or unloaded.
    Arrow {
        start: Point,
        end: Point,
        has_start_head: bool,
        has_end_head: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        head_asset: Option<String>,
    },
    /// Straight segment; heads are off by default but may be toggled.
    Line { start: Point, end: Point, has_start_head: bool, has_end_head: bool },
    Rectangle { bounds: Rect, fill: bool },
    /// Ellipse inscribed in `bounds`.
    Circle { bounds: Rect, fill: bool },
    /// Pen stroke through the recorded pointer positions.
    Freehand { points: Vec<Point> },
    /// Translucent marker stroke with its own brush radius.
    Highlight { points: Vec<Point>, radius: f64 },
    /// Text box whose top-left corner is `anchor`.
    Text { anchor: Point, content: String, text_style: TextStyle },
    /// Symbol centered on `anchor`, drawn `size` pixels tall.
    Emoji { anchor: Point, symbol: String, size: f64 },
    /// Numbered badge centered on `anchor` with optional trailing text.
    Callout { anchor: Point, content: String, text_style: TextStyle, label: u32 },
    /// Region of the background that is blurred or pixelated in place.
    BlurRegion { bounds: Rect, effect: BlurKind, intensity: f64 },
}

/// Variant tag of an annotation, for dispatch that needs no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    Arrow,
    Line,
    Rectangle,
    Circle,
    Freehand,
    Highlight,
    Text,
    Emoji,
    Callout,
    BlurRegion,
}

/// One vector drawing object overlaid on the captured bitmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    /// Clockwise rotation in degrees around the bounding-box center.
    #[serde(default)]
    pub rotation: f64,
    pub style: Style,
    #[serde(flatten)]
    pub shape: Shape,
}

impl Annotation {
    /// Create an annotation with a fresh identifier and no rotation.
    #[must_use]
    pub fn new(shape: Shape, mut style: Style) -> Self {
        style.opacity = style.opacity.clamp(0.0, 1.0);
        Self { id: Uuid::new_v4(), rotation: 0.0, style, shape }
    }

    #[must_use]
    pub fn kind(&self) -> AnnotationKind {
        match self.shape {
            Shape::Arrow { .. } => AnnotationKind::Arrow,
            Shape::Line { .. } => AnnotationKind::Line,
            Shape::Rectangle { .. } => AnnotationKind::Rectangle,
            Shape::Circle { .. } => AnnotationKind::Circle,
            Shape::Freehand { .. } => AnnotationKind::Freehand,
            Shape::Highlight { .. } => AnnotationKind::Highlight,
            Shape::Text { .. } => AnnotationKind::Text,
            Shape::Emoji { .. } => AnnotationKind::Emoji,
            Shape::Callout { .. } => AnnotationKind::Callout,
            Shape::BlurRegion { .. } => AnnotationKind::BlurRegion,
        }
    }

    /// The reference position moved by drags: start point for segments,
    /// top-left for boxes, first sample for paths, placement point otherwise.
    #[must_use]
    pub fn anchor(&self) -> Point {
        match &self.shape {
            Shape::Arrow { start, .. } | Shape::Line { start, .. } => *start,
            Shape::Rectangle { bounds, .. } | Shape::Circle { bounds, .. } | Shape::BlurRegion { bounds, .. } => {
                Point::new(bounds.x, bounds.y)
            }
            Shape::Freehand { points } | Shape::Highlight { points, .. } => {
                points.first().copied().unwrap_or_default()
            }
            Shape::Text { anchor, .. } | Shape::Emoji { anchor, .. } | Shape::Callout { anchor, .. } => *anchor,
        }
    }

    /// Move every geometric point by `(dx, dy)`.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        match &mut self.shape {
            Shape::Arrow { start, end, .. } | Shape::Line { start, end, .. } => {
                *start = start.offset(dx, dy);
                *end = end.offset(dx, dy);
            }
            Shape::Rectangle { bounds, .. } | Shape::Circle { bounds, .. } | Shape::BlurRegion { bounds, .. } => {
                *bounds = bounds.translate(dx, dy);
            }
            Shape::Freehand { points } | Shape::Highlight { points, .. } => {
                for p in points.iter_mut() {
                    *p = p.offset(dx, dy);
                }
            }
            Shape::Text { anchor, .. } | Shape::Emoji { anchor, .. } | Shape::Callout { anchor, .. } => {
                *anchor = anchor.offset(dx, dy);
            }
        }
    }

    /// Map local geometry from the box `from` onto the box `to`.
    ///
    /// Points scale per axis; text and emoji scale their size with the height
    /// ratio. An axis with zero extent in `from` is only translated.
    pub fn remap(&mut self, from: &Rect, to: &Rect) {
        let map = |p: Point| map_point(p, from, to);
        let height_ratio = if from.height > 0.0 { to.height / from.height } else { 1.0 };
        match &mut self.shape {
            Shape::Arrow { start, end, .. } | Shape::Line { start, end, .. } => {
                *start = map(*start);
                *end = map(*end);
            }
            Shape::Rectangle { bounds, .. } | Shape::Circle { bounds, .. } | Shape::BlurRegion { bounds, .. } => {
                *bounds = Rect::from_corners(map(Point::new(bounds.x, bounds.y)), map(Point::new(bounds.right(), bounds.bottom())));
            }
            Shape::Freehand { points } | Shape::Highlight { points, .. } => {
                for p in points.iter_mut() {
                    *p = map(*p);
                }
            }
            Shape::Text { anchor, text_style, .. } | Shape::Callout { anchor, text_style, .. } => {
                *anchor = map(*anchor);
                text_style.font_size = (text_style.font_size * height_ratio).clamp(6.0, 400.0);
            }
            Shape::Emoji { anchor, size, .. } => {
                *anchor = map(*anchor);
                *size = (*size * height_ratio).clamp(8.0, 1000.0);
            }
        }
    }

    /// Whether the annotation has enough geometry to be worth keeping.
    #[must_use]
    pub fn is_degenerate(&self, min_size: f64) -> bool {
        match &self.shape {
            Shape::Arrow { start, end, .. } | Shape::Line { start, end, .. } => start.distance(*end) < min_size,
            Shape::Rectangle { bounds, .. } | Shape::Circle { bounds, .. } | Shape::BlurRegion { bounds, .. } => {
                bounds.width < min_size || bounds.height < min_size
            }
            Shape::Freehand { points } | Shape::Highlight { points, .. } => {
                points.windows(2).all(|w| w[0] == w[1])
            }
            Shape::Text { content, .. } => content.trim().is_empty(),
            Shape::Emoji { symbol, size, .. } => symbol.is_empty() || *size <= 0.0,
            Shape::Callout { .. } => false,
        }
    }
}

fn map_point(p: Point, from: &Rect, to: &Rect) -> Point {
    let x = if from.width > 0.0 {
        to.x + (p.x - from.x) * (to.width / from.width)
    } else {
        p.x + (to.x - from.x)
    };
    let y = if from.height > 0.0 {
        to.y + (p.y - from.y) * (to.height / from.height)
    } else {
        p.y + (to.y - from.y)
    };
    Point::new(x, y)
}

/// Sparse property update. Only present fields are applied, and fields that
/// do not exist on the target variant are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_start_head: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_end_head: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<BlurKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Arrowhead asset name; an empty string selects the vector head.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_asset: Option<String>,
}

impl AnnotationPatch {
    /// Apply to `target`, returning whether anything actually changed.
    pub fn apply_to(&self, target: &mut Annotation) -> bool {
        let before = target.clone();

        if let Some(stroke) = &self.stroke {
            target.style.stroke.clone_from(stroke);
        }
        if let Some(w) = self.stroke_width {
            target.style.stroke_width = w.max(0.0);
        }
        if let Some(o) = self.opacity {
            target.style.opacity = o.clamp(0.0, 1.0);
        }
        if let Some(r) = self.rotation {
            target.rotation = crate::geom::normalize_degrees(r);
        }

        match &mut target.shape {
            Shape::Arrow { has_start_head, has_end_head, head_asset, .. } => {
                if let Some(v) = self.has_start_head {
                    *has_start_head = v;
                }
                if let Some(v) = self.has_end_head {
                    *has_end_head = v;
                }
                if let Some(name) = &self.head_asset {
                    *head_asset = asset_name(name);
                }
            }
            Shape::Line { has_start_head, has_end_head, .. } => {
                if let Some(v) = self.has_start_head {
                    *has_start_head = v;
                }
                if let Some(v) = self.has_end_head {
                    *has_end_head = v;
                }
            }
            Shape::Rectangle { fill, .. } | Shape::Circle { fill, .. } => {
                if let Some(v) = self.fill {
                    *fill = v;
                }
            }
            Shape::Text { content, text_style, .. } | Shape::Callout { content, text_style, .. } => {
                if let Some(v) = &self.content {
                    content.clone_from(v);
                }
                self.apply_text_style(text_style);
            }
            Shape::Emoji { symbol, .. } => {
                if let Some(v) = &self.symbol {
                    symbol.clone_from(v);
                }
            }
            Shape::BlurRegion { effect, intensity, .. } => {
                if let Some(v) = self.effect {
                    *effect = v;
                }
                if let Some(v) = self.intensity {
                    *intensity = v.max(1.0);
                }
            }
            Shape::Freehand { .. } | Shape::Highlight { .. } => {}
        }

        *target != before
    }

    /// The arrowhead asset this patch selects: `Some(None)` for the vector head.
    #[must_use]
    pub fn arrow_head(&self) -> Option<Option<String>> {
        self.head_asset.as_deref().map(asset_name)
    }

    fn apply_text_style(&self, text_style: &mut TextStyle) {
        if let Some(v) = self.font_size {
            text_style.font_size = v.clamp(6.0, 400.0);
        }
        if let Some(v) = self.bold {
            text_style.bold = v;
        }
        if let Some(v) = self.italic {
            text_style.italic = v;
        }
        if let Some(v) = self.underline {
            text_style.underline = v;
        }
    }
}

fn asset_name(name: &str) -> Option<String> {
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_owned())
}

/// Ordered store of annotations plus the current selection.
///
/// Sequence position is paint order. The store never hands out indices.
#[derive(Debug, Default)]
pub struct DocStore {
    items: Vec<Annotation>,
    selected: Option<AnnotationId>,
    dirty: bool,
}

impl DocStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append at the top of the z-order and return the identifier.
    ///
    /// An annotation whose id collides with an existing one is given a fresh id.
    pub fn add(&mut self, mut annotation: Annotation) -> AnnotationId {
        if self.position(&annotation.id).is_some() {
            annotation.id = Uuid::new_v4();
        }
        let id = annotation.id;
        self.items.push(annotation);
        self.dirty = true;
        id
    }

    /// Remove by id, clearing the selection if it referenced that id.
    pub fn remove(&mut self, id: &AnnotationId) -> Option<Annotation> {
        let idx = self.position(id)?;
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        self.dirty = true;
        Some(self.items.remove(idx))
    }

    /// Apply a sparse patch in place. Returns false if the id is unknown or
    /// nothing changed.
    pub fn update(&mut self, id: &AnnotationId, patch: &AnnotationPatch) -> bool {
        let Some(target) = self.get_mut(id) else {
            return false;
        };
        let changed = patch.apply_to(target);
        if changed {
            self.dirty = true;
        }
        changed
    }

    /// Swap in a new version of an existing annotation (same id), keeping its
    /// position in the sequence. Used for live gesture previews.
    pub fn replace(&mut self, annotation: Annotation) -> bool {
        let Some(idx) = self.position(&annotation.id) else {
            return false;
        };
        self.items[idx] = annotation;
        self.dirty = true;
        true
    }

    /// Move an annotation by `(dx, dy)`.
    pub fn translate(&mut self, id: &AnnotationId, dx: f64, dy: f64) -> bool {
        let Some(target) = self.get_mut(id) else {
            return false;
        };
        target.translate(dx, dy);
        self.dirty = true;
        true
    }

    /// Clone an annotation under a new id, offset so the copy is visible, and
    /// append it on top.
    pub fn duplicate(&mut self, id: &AnnotationId, offset: f64) -> Option<AnnotationId> {
        let mut copy = self.get(id)?.clone();
        copy.id = Uuid::new_v4();
        copy.translate(offset, offset);
        Some(self.add(copy))
    }

    /// Change the selection. Selecting an unknown id is ignored and returns false.
    pub fn select(&mut self, id: Option<AnnotationId>) -> bool {
        match id {
            Some(id) if self.position(&id).is_none() => false,
            _ => {
                self.selected = id;
                true
            }
        }
    }

    #[must_use]
    pub fn selected(&self) -> Option<AnnotationId> {
        self.selected
    }

    #[must_use]
    pub fn selected_annotation(&self) -> Option<&Annotation> {
        self.selected.as_ref().and_then(|id| self.get(id))
    }

    /// Move an annotation to the end of the sequence (drawn last).
    pub fn bring_to_front(&mut self, id: &AnnotationId) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        if idx + 1 == self.items.len() {
            return false;
        }
        let item = self.items.remove(idx);
        self.items.push(item);
        self.dirty = true;
        true
    }

    /// Move an annotation to the start of the sequence (drawn first).
    pub fn send_to_back(&mut self, id: &AnnotationId) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        if idx == 0 {
            return false;
        }
        let item = self.items.remove(idx);
        self.items.insert(0, item);
        self.dirty = true;
        true
    }

    /// Remove every annotation. Returns false if the store was already empty.
    pub fn clear(&mut self) -> bool {
        if self.items.is_empty() {
            return false;
        }
        self.items.clear();
        self.selected = None;
        self.dirty = true;
        true
    }

    /// Deep copy of the whole sequence, for history.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Annotation> {
        self.items.clone()
    }

    /// Replace the whole sequence. The selection survives only if its id is
    /// still present.
    pub fn restore(&mut self, items: Vec<Annotation>) {
        self.items = items;
        if let Some(id) = self.selected {
            if self.position(&id).is_none() {
                self.selected = None;
            }
        }
        self.dirty = true;
    }

    #[must_use]
    pub fn get(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.items.iter().find(|a| &a.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &AnnotationId) -> Option<&mut Annotation> {
        self.items.iter_mut().find(|a| &a.id == id)
    }

    fn position(&self, id: &AnnotationId) -> Option<usize> {
        self.items.iter().position(|a| &a.id == id)
    }

    /// Annotations in paint order (bottom first).
    #[must_use]
    pub fn annotations(&self) -> &[Annotation] {
        &self.items
    }

    /// Whether anything changed since the last [`DocStore::take_dirty`].
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Read and reset the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
