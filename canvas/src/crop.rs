//! Drag-to-rectangle overlay used for region selection and re-cropping.
//!
//! The overlay is independent of the annotation store and history. It works
//! in whatever coordinate space its caller feeds it (viewport pixels for the
//! initial capture, image pixels for a re-crop) and never leaves `bounds`.
//!
//! Lifecycle: `Idle -> Selecting -> Committed | Cancelled`. With
//! [`CommitPolicy::OnRelease`] the first release decides the outcome; with
//! [`CommitPolicy::OnConfirm`] a release parks the overlay in `Ready`, where
//! the rectangle can be moved or resized by its handles until confirmed.

#[cfg(test)]
#[path = "crop_test.rs"]
mod crop_test;

use crate::camera::Point;
use crate::consts::CROP_MIN_SIZE;
use crate::geom::Rect;
use crate::hit::ResizeAnchor;

/// When a selection becomes final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitPolicy {
    /// Pointer release commits (or cancels, if too small).
    OnRelease,
    /// Pointer release only settles the rectangle; [`CropOverlay::confirm`] commits.
    OnConfirm,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CropPhase {
    /// Open, nothing drawn yet.
    Idle,
    /// Pointer is down.
    Selecting,
    /// A rectangle exists and awaits confirmation.
    Ready,
    Committed(Rect),
    Cancelled,
}

/// What the active drag does to the rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropDrag {
    Create,
    Move,
    Resize(ResizeAnchor),
}

/// Outcome of feeding an event to the overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CropEvent {
    None,
    /// The rectangle changed; redraw.
    Changed,
    Committed(Rect),
    Cancelled,
}

#[derive(Debug, Clone)]
struct DragState {
    kind: CropDrag,
    start: Point,
    /// Rectangle when the drag began.
    orig: Option<Rect>,
}

#[derive(Debug, Clone)]
pub struct CropOverlay {
    bounds: Rect,
    rect: Option<Rect>,
    drag: Option<DragState>,
    phase: CropPhase,
    policy: CommitPolicy,
    min_size: f64,
}

impl CropOverlay {
    /// Open an overlay confined to `bounds`.
    #[must_use]
    pub fn new(bounds: Rect, policy: CommitPolicy) -> Self {
        Self { bounds, rect: None, drag: None, phase: CropPhase::Idle, policy, min_size: CROP_MIN_SIZE }
    }

    /// Open with an initial rectangle already in place (re-crop starts from
    /// the full image).
    #[must_use]
    pub fn with_rect(bounds: Rect, rect: Rect, policy: CommitPolicy) -> Self {
        let mut overlay = Self::new(bounds, policy);
        overlay.rect = rect.intersect(&bounds);
        if overlay.rect.is_some() {
            overlay.phase = CropPhase::Ready;
        }
        overlay
    }

    #[must_use]
    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    #[must_use]
    pub fn phase(&self) -> CropPhase {
        self.phase
    }

    #[must_use]
    pub fn drag(&self) -> Option<CropDrag> {
        self.drag.as_ref().map(|d| d.kind)
    }

    /// Still accepting input.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.phase, CropPhase::Idle | CropPhase::Selecting | CropPhase::Ready)
    }

    /// Handle positions of the current rectangle, for drawing.
    #[must_use]
    pub fn handles(&self) -> Vec<(ResizeAnchor, Point)> {
        let Some(r) = self.rect else {
            return Vec::new();
        };
        let c = r.center();
        ResizeAnchor::ALL
            .iter()
            .map(|&a| {
                let (ux, uy) = a.unit();
                (a, Point::new(c.x + ux * r.width / 2.0, c.y + uy * r.height / 2.0))
            })
            .collect()
    }

    /// Begin a drag. `tolerance` is the handle grab radius in this overlay's units.
    pub fn pointer_down(&mut self, p: Point, tolerance: f64) -> CropEvent {
        if !self.is_active() {
            return CropEvent::None;
        }
        let kind = match (self.policy, self.rect) {
            (CommitPolicy::OnConfirm, Some(r)) => match self.handles().into_iter().find(|(_, h)| h.distance(p) <= tolerance) {
                Some((anchor, _)) => CropDrag::Resize(anchor),
                None if r.contains(p, 0.0) => CropDrag::Move,
                None => CropDrag::Create,
            },
            _ => CropDrag::Create,
        };
        self.drag = Some(DragState { kind, start: clamp_point(p, &self.bounds), orig: self.rect });
        self.phase = CropPhase::Selecting;
        tracing::debug!(?kind, "crop: drag started");
        CropEvent::None
    }

    pub fn pointer_move(&mut self, p: Point) -> CropEvent {
        let Some(drag) = &self.drag else {
            return CropEvent::None;
        };
        let next = self.apply_drag(drag, p);
        if next == self.rect {
            return CropEvent::None;
        }
        self.rect = next;
        CropEvent::Changed
    }

    pub fn pointer_up(&mut self, p: Point) -> CropEvent {
        let Some(drag) = self.drag.take() else {
            return CropEvent::None;
        };
        self.rect = self.apply_drag(&drag, p);
        let big_enough = self.rect.is_some_and(|r| r.width >= self.min_size && r.height >= self.min_size);

        match self.policy {
            CommitPolicy::OnRelease => match self.rect {
                Some(r) if big_enough => self.finish_commit(r),
                _ => {
                    tracing::debug!("crop: selection below minimum size");
                    self.cancel()
                }
            },
            CommitPolicy::OnConfirm => {
                if !big_enough {
                    // A too-small drag leaves the previous rectangle alone.
                    self.rect = drag.orig;
                }
                self.phase = if self.rect.is_some() { CropPhase::Ready } else { CropPhase::Idle };
                CropEvent::Changed
            }
        }
    }

    /// Commit the settled rectangle. Ignored mid-drag, or if there is no
    /// rectangle of at least the minimum size.
    pub fn confirm(&mut self) -> CropEvent {
        if self.drag.is_some() || !self.is_active() {
            return CropEvent::None;
        }
        match self.rect {
            Some(r) if r.width >= self.min_size && r.height >= self.min_size => self.finish_commit(r),
            _ => CropEvent::None,
        }
    }

    /// Abort from any live phase, discarding the rectangle.
    pub fn cancel(&mut self) -> CropEvent {
        if !self.is_active() {
            return CropEvent::None;
        }
        self.drag = None;
        self.rect = None;
        self.phase = CropPhase::Cancelled;
        tracing::debug!("crop: cancelled");
        CropEvent::Cancelled
    }

    fn finish_commit(&mut self, r: Rect) -> CropEvent {
        self.phase = CropPhase::Committed(r);
        tracing::debug!(x = r.x, y = r.y, width = r.width, height = r.height, "crop: committed");
        CropEvent::Committed(r)
    }

    fn apply_drag(&self, drag: &DragState, p: Point) -> Option<Rect> {
        let p = clamp_point(p, &self.bounds);
        match (drag.kind, drag.orig) {
            (CropDrag::Create, _) => Some(Rect::from_corners(drag.start, p)),
            (CropDrag::Move, Some(orig)) => {
                let dx = (p.x - drag.start.x).max(self.bounds.x - orig.x).min(self.bounds.right() - orig.right());
                let dy = (p.y - drag.start.y).max(self.bounds.y - orig.y).min(self.bounds.bottom() - orig.bottom());
                Some(orig.translate(dx, dy))
            }
            (CropDrag::Resize(anchor), Some(orig)) => {
                let (ux, uy) = anchor.unit();
                let mut x0 = orig.x;
                let mut y0 = orig.y;
                let mut x1 = orig.right();
                let mut y1 = orig.bottom();
                if ux < 0.0 {
                    x0 = p.x;
                } else if ux > 0.0 {
                    x1 = p.x;
                }
                if uy < 0.0 {
                    y0 = p.y;
                } else if uy > 0.0 {
                    y1 = p.y;
                }
                Some(Rect::from_corners(Point::new(x0, y0), Point::new(x1, y1)))
            }
            (_, None) => self.rect,
        }
    }
}

fn clamp_point(p: Point, bounds: &Rect) -> Point {
    Point::new(p.x.min(bounds.right()).max(bounds.x), p.y.min(bounds.bottom()).max(bounds.y))
}
