//! Shared numeric constants for the canvas crate.

// ── Hit-testing ─────────────────────────────────────────────────

/// Screen-space hit slop in pixels for transform handles.
pub const HANDLE_RADIUS_PX: f64 = 8.0;

/// Distance from the bounding box edge to the rotate handle, in screen pixels.
pub const ROTATE_HANDLE_OFFSET_PX: f64 = 24.0;

/// Extra slop in image pixels added to half the stroke width when testing
/// lines and freehand paths.
pub const PATH_HIT_SLOP: f64 = 4.0;

// ── Editing ─────────────────────────────────────────────────────

/// Shapes whose width or height (or line length) falls below this, in image
/// pixels, are discarded on pointer-up.
pub const MIN_SHAPE_SIZE: f64 = 5.0;

/// Smallest width/height a resize may shrink a shape to.
pub const MIN_RESIZE_SIZE: f64 = 1.0;

/// Maximum number of undo entries kept; the oldest is dropped beyond this.
pub const HISTORY_LIMIT: usize = 50;

/// Positional offset applied to a duplicated annotation so the copy is visible.
pub const DUPLICATE_OFFSET: f64 = 10.0;

/// Nudge distances for arrow keys (plain / with shift).
pub const NUDGE_STEP: f64 = 1.0;
pub const NUDGE_STEP_LARGE: f64 = 10.0;

/// Angular snap steps in degrees when shift is held.
pub const ROTATE_SNAP_DEG: f64 = 15.0;
pub const LINE_SNAP_DEG: f64 = 45.0;

// ── Crop ────────────────────────────────────────────────────────

/// Region selections smaller than this on either axis are treated as cancelled.
pub const CROP_MIN_SIZE: f64 = 10.0;

// ── Rendering ───────────────────────────────────────────────────

/// Minimum interval between two paints (60 Hz cap).
pub const FRAME_INTERVAL_MS: f64 = 16.0;

/// Default opacity for highlighter strokes.
pub const HIGHLIGHT_OPACITY: f64 = 0.4;

/// Default highlighter brush radius in image pixels.
pub const HIGHLIGHT_RADIUS: f64 = 8.0;

/// Line height as a multiple of font size for multi-line text.
pub const LINE_HEIGHT_RATIO: f64 = 1.25;

/// Approximate glyph advance as a multiple of font size, used for text bounds
/// when no measuring surface is available.
pub const GLYPH_WIDTH_RATIO: f64 = 0.6;
