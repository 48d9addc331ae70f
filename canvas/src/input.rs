//! Input model: tools, modifier keys, mouse buttons, and the gesture state machine.
//!
//! This module defines the types consumed by the input engine. `Tool` and
//! `Modifiers` capture the user's intent at the time of a pointer event.
//! `UiState` holds the sticky drawing settings new annotations are created
//! with. `InputState` is the active gesture being tracked between
//! pointer-down and pointer-up, carrying the context needed to apply live
//! previews and to record exactly one history entry on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

use crate::camera::Point;
use crate::consts::{HIGHLIGHT_OPACITY, HIGHLIGHT_RADIUS};
use crate::doc::{Annotation, AnnotationId, BlurKind, Shape, Style, TextStyle};
use crate::geom::Rect;
use crate::hit::ResizeAnchor;
use crate::history::Snapshot;

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    /// Pointer / selection tool (default).
    #[default]
    Select,
    /// Freehand ink.
    Pen,
    /// Translucent marker.
    Highlight,
    /// Place a text box.
    Text,
    /// Blur or pixelate a region.
    Blur,
    Rectangle,
    Circle,
    Arrow,
    /// Stamp an emoji at the click point.
    Emoji,
    /// Stamp a numbered badge at the click point.
    Callout,
    Line,
}

impl Tool {
    /// Tools that draw a shape by dragging out two corners or endpoints.
    #[must_use]
    pub fn is_box_drawing(self) -> bool {
        matches!(self, Self::Rectangle | Self::Circle | Self::Blur | Self::Arrow | Self::Line)
    }

    /// Tools that accumulate a pointer path.
    #[must_use]
    pub fn is_stroke(self) -> bool {
        matches!(self, Self::Pen | Self::Highlight)
    }

    /// Tools that commit on a single click with no drag phase.
    #[must_use]
    pub fn is_stamp(self) -> bool {
        matches!(self, Self::Emoji | Self::Callout)
    }

    /// Whether the tool reverts to `Select` after a successful commit.
    #[must_use]
    pub fn reverts_to_select(self) -> bool {
        self.is_box_drawing()
    }

    /// Whether the tool draws two-point segments.
    #[must_use]
    pub fn is_segment(self) -> bool {
        matches!(self, Self::Arrow | Self::Line)
    }
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Alt / Option key is held.
    pub alt: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Command on macOS.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    #[default]
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

/// A keyboard key.
///
/// The inner string holds the key name as reported by the browser (e.g. `"Delete"`, `"Escape"`, `"z"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self(name.to_owned())
    }

    /// The key as a single printable character, if it is one.
    #[must_use]
    pub fn printable(&self) -> Option<char> {
        let mut chars = self.0.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_control() => Some(c),
            _ => None,
        }
    }
}

/// Sticky drawing settings applied to newly created annotations.
#[derive(Debug, Clone)]
pub struct UiState {
    /// Currently active drawing tool.
    pub tool: Tool,
    pub style: Style,
    /// Fill rectangles and circles with the stroke color.
    pub fill: bool,
    pub text_style: TextStyle,
    pub emoji: String,
    pub emoji_size: f64,
    pub blur_kind: BlurKind,
    pub blur_intensity: f64,
    pub highlight_radius: f64,
    /// Image arrowhead for new arrows; vector heads when `None`.
    pub arrow_head: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tool: Tool::Select,
            style: Style::default(),
            fill: false,
            text_style: TextStyle::default(),
            emoji: "👍".to_owned(),
            emoji_size: 48.0,
            blur_kind: BlurKind::Blur,
            blur_intensity: 8.0,
            highlight_radius: HIGHLIGHT_RADIUS,
            arrow_head: None,
        }
    }
}

/// A shape being created that has not been committed to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Draft {
    /// Two-point shapes: boxes from corner to corner, segments from start to end.
    Box { tool: Tool, start: Point, current: Point },
    /// Pen and highlighter paths.
    Path { tool: Tool, points: Vec<Point> },
}

impl Draft {
    #[must_use]
    pub fn tool(&self) -> Tool {
        match self {
            Self::Box { tool, .. } | Self::Path { tool, .. } => *tool,
        }
    }

    /// Build the annotation this draft would commit as.
    ///
    /// Returns `None` for tools that never draft.
    #[must_use]
    pub fn to_annotation(&self, ui: &UiState) -> Option<Annotation> {
        let style = ui.style.clone();
        let annotation = match self {
            Self::Box { tool, start, current } => {
                let bounds = Rect::from_corners(*start, *current);
                let shape = match tool {
                    Tool::Rectangle => Shape::Rectangle { bounds, fill: ui.fill },
                    Tool::Circle => Shape::Circle { bounds, fill: ui.fill },
                    Tool::Blur => Shape::BlurRegion { bounds, effect: ui.blur_kind, intensity: ui.blur_intensity },
                    Tool::Arrow => Shape::Arrow {
                        start: *start,
                        end: *current,
                        has_start_head: false,
                        has_end_head: true,
                        head_asset: ui.arrow_head.clone(),
                    },
                    Tool::Line => Shape::Line { start: *start, end: *current, has_start_head: false, has_end_head: false },
                    _ => return None,
                };
                Annotation::new(shape, style)
            }
            Self::Path { tool: Tool::Pen, points } => Annotation::new(Shape::Freehand { points: points.clone() }, style),
            Self::Path { tool: Tool::Highlight, points } => Annotation::new(
                Shape::Highlight { points: points.clone(), radius: ui.highlight_radius },
                Style { opacity: style.opacity.min(HIGHLIGHT_OPACITY), ..style },
            ),
            Self::Path { .. } => return None,
        };
        Some(annotation)
    }
}

/// Internal state for the input state machine.
///
/// Each active variant carries gesture context needed to apply live updates
/// and to push a single history entry on pointer-up. `before` fields hold the
/// sequence as it was when the gesture started.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// A new shape or path is being drawn.
    Drawing { draft: Draft },
    /// The selected annotation is being moved.
    Dragging {
        id: AnnotationId,
        /// Pointer position minus the annotation anchor at drag start.
        offset: Point,
        before: Snapshot,
    },
    /// The selected annotation is being resized by one of its eight handles.
    Resizing {
        id: AnnotationId,
        /// Handle being dragged; its opposite stays fixed.
        anchor: ResizeAnchor,
        /// Annotation as it was when the gesture started.
        orig: Annotation,
        before: Snapshot,
    },
    /// The selected annotation is being rotated around its center.
    Rotating {
        id: AnnotationId,
        /// Image-space pivot.
        center: Point,
        /// Pointer angle in degrees at gesture start.
        start_angle: f64,
        orig_rotation: f64,
        before: Snapshot,
    },
    /// Keystrokes are routed into a Text or Callout annotation.
    TextEditing { id: AnnotationId, before: Snapshot },
}

impl InputState {
    /// Short name for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Drawing { .. } => "drawing",
            Self::Dragging { .. } => "dragging",
            Self::Resizing { .. } => "resizing",
            Self::Rotating { .. } => "rotating",
            Self::TextEditing { .. } => "text_editing",
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}
