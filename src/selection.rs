//! Region selection before capture.
//!
//! [`RegionSelector`] owns at most one live overlay. Starting a new one
//! cancels the previous overlay first, so two never stack. Events carry the
//! id of the overlay whose listener fired; events for anything but the live
//! overlay are dropped, so a detached overlay has no lingering effect.

use canvas::camera::Point;
use canvas::crop::{CommitPolicy, CropEvent, CropOverlay};
use canvas::geom::Rect;
use canvas::input::Key;
use uuid::Uuid;

use crate::services::{OverlayId, PageHooks};

#[cfg(test)]
#[path = "selection_test.rs"]
mod selection_test;

/// A committed selection in viewport pixels. Not `Clone`: capturing
/// consumes it, so one selection yields at most one capture.
#[derive(Debug, PartialEq)]
pub struct CommittedRegion {
    overlay: OverlayId,
    rect: Rect,
}

impl CommittedRegion {
    #[must_use]
    pub fn overlay(&self) -> OverlayId {
        self.overlay
    }

    #[must_use]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    #[must_use]
    pub fn into_rect(self) -> Rect {
        self.rect
    }
}

#[derive(Debug, PartialEq)]
pub enum SelectionEvent {
    None,
    /// The rubber band moved; redraw the overlay.
    Changed,
    Committed(CommittedRegion),
    Cancelled,
}

struct Active {
    id: OverlayId,
    overlay: CropOverlay,
}

pub struct RegionSelector<H: PageHooks> {
    hooks: H,
    viewport: Rect,
    active: Option<Active>,
}

impl<H: PageHooks> RegionSelector<H> {
    pub fn new(hooks: H, viewport: Rect) -> Self {
        Self { hooks, viewport, active: None }
    }

    /// Applies to the next overlay started.
    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    /// Show a new overlay, cancelling any live one first.
    pub fn start(&mut self) -> OverlayId {
        if self.cancel() {
            tracing::debug!("selection: replaced live overlay");
        }
        let id = Uuid::new_v4();
        self.hooks.attach(id);
        self.hooks.suspend_scroll();
        self.active = Some(Active { id, overlay: CropOverlay::new(self.viewport, CommitPolicy::OnRelease) });
        tracing::debug!(overlay = %id, "selection: started");
        id
    }

    pub fn pointer_down(&mut self, overlay: OverlayId, p: Point) -> SelectionEvent {
        self.dispatch(overlay, |o| o.pointer_down(p, 0.0))
    }

    pub fn pointer_move(&mut self, overlay: OverlayId, p: Point) -> SelectionEvent {
        self.dispatch(overlay, |o| o.pointer_move(p))
    }

    pub fn pointer_up(&mut self, overlay: OverlayId, p: Point) -> SelectionEvent {
        self.dispatch(overlay, |o| o.pointer_up(p))
    }

    /// `Escape` cancels; other keys are ignored.
    pub fn key_down(&mut self, overlay: OverlayId, key: &Key) -> SelectionEvent {
        if !key.0.eq_ignore_ascii_case("escape") {
            return SelectionEvent::None;
        }
        self.dispatch(overlay, CropOverlay::cancel)
    }

    /// Tear down the live overlay. Returns whether one existed.
    pub fn cancel(&mut self) -> bool {
        let Some(mut active) = self.active.take() else {
            return false;
        };
        active.overlay.cancel();
        self.teardown(active.id);
        true
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    #[must_use]
    pub fn active_id(&self) -> Option<OverlayId> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Current rubber-band rectangle, for drawing the overlay.
    #[must_use]
    pub fn active_rect(&self) -> Option<Rect> {
        self.active.as_ref().and_then(|a| a.overlay.rect())
    }

    #[must_use]
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    fn dispatch<F>(&mut self, overlay: OverlayId, f: F) -> SelectionEvent
    where
        F: FnOnce(&mut CropOverlay) -> CropEvent,
    {
        let Some(active) = self.active.as_mut().filter(|a| a.id == overlay) else {
            tracing::debug!(%overlay, "selection: event for inactive overlay dropped");
            return SelectionEvent::None;
        };
        match f(&mut active.overlay) {
            CropEvent::None => SelectionEvent::None,
            CropEvent::Changed => SelectionEvent::Changed,
            CropEvent::Committed(rect) => {
                self.active = None;
                self.teardown(overlay);
                SelectionEvent::Committed(CommittedRegion { overlay, rect })
            }
            CropEvent::Cancelled => {
                self.active = None;
                self.teardown(overlay);
                SelectionEvent::Cancelled
            }
        }
    }

    fn teardown(&mut self, id: OverlayId) {
        self.hooks.detach(id);
        self.hooks.restore_scroll();
        tracing::debug!(overlay = %id, "selection: torn down");
    }
}
