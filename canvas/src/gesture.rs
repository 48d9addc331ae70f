//! Pointer handlers: transitions of the interaction state machine.
//!
//! Pointer positions arrive in screen (CSS pixel) coordinates and are
//! converted to image coordinates through the camera before anything else
//! happens. Live previews mutate the store directly; the snapshot taken at
//! gesture start becomes the single history entry on pointer-up, and only if
//! the store actually changed.

#[cfg(test)]
#[path = "gesture_test.rs"]
mod gesture_test;

use crate::camera::Point;
use crate::consts::{HANDLE_RADIUS_PX, LINE_SNAP_DEG, MIN_RESIZE_SIZE, MIN_SHAPE_SIZE, ROTATE_SNAP_DEG};
use crate::doc::{Annotation, Shape};
use crate::engine::{Action, EngineCore};
use crate::geom::{Rect, normalize_degrees, rotate_point, snap};
use crate::hit::{self, HitPart, ResizeAnchor};
use crate::input::{Button, Draft, InputState, Modifiers, Tool};

impl EngineCore {
    // =============================================================
    // Pointer down
    // =============================================================

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        if button != Button::Primary {
            return Vec::new();
        }
        let p = self.camera.screen_to_image(screen_pt);

        if let Some(crop) = &mut self.crop {
            let tolerance = self.camera.screen_dist_to_image(HANDLE_RADIUS_PX);
            let event = crop.pointer_down(p, tolerance);
            return self.handle_crop_event(event);
        }

        if let InputState::TextEditing { id, .. } = &self.input {
            let inside = self.doc.get(id).is_some_and(|a| hit::contains_point(a, p));
            if inside {
                return Vec::new();
            }
            // Clicking away only ends the edit.
            return self.finish_text_edit();
        }

        let mut actions = self.abort_gesture();
        match self.ui.tool {
            Tool::Select => actions.extend(self.select_down(p)),
            tool if tool.is_box_drawing() => {
                self.input = InputState::Drawing { draft: Draft::Box { tool, start: p, current: p } };
            }
            tool if tool.is_stroke() => {
                self.input = InputState::Drawing { draft: Draft::Path { tool, points: vec![p] } };
            }
            Tool::Text => actions.extend(self.text_down(p)),
            Tool::Emoji => {
                let shape = Shape::Emoji { anchor: p, symbol: self.ui.emoji.clone(), size: self.ui.emoji_size };
                actions.extend(self.stamp(shape));
            }
            Tool::Callout => {
                let label = self.next_callout_label();
                let shape = Shape::Callout { anchor: p, content: String::new(), text_style: self.ui.text_style, label };
                actions.extend(self.stamp(shape));
            }
            _ => {}
        }
        tracing::trace!(state = self.input.name(), shift = modifiers.shift, "pointer down");
        actions
    }

    fn select_down(&mut self, p: Point) -> Vec<Action> {
        let mut actions = Vec::new();
        let Some(hit) = hit::hit_test(p, &self.doc, &self.camera) else {
            if self.doc.selected().is_some() {
                self.doc.select(None);
                actions.push(Action::SelectionChanged(None));
                actions.push(Action::RenderNeeded);
            }
            return actions;
        };
        let Some(target) = self.doc.get(&hit.id).cloned() else {
            return actions;
        };
        let before = self.doc.snapshot();

        match hit.part {
            HitPart::ResizeHandle(anchor) => {
                self.input = InputState::Resizing { id: hit.id, anchor, orig: target, before };
            }
            HitPart::RotateHandle => {
                let center = hit::bounding_box(&target).center();
                self.input = InputState::Rotating {
                    id: hit.id,
                    center,
                    start_angle: angle_from(center, p),
                    orig_rotation: target.rotation,
                    before,
                };
            }
            HitPart::Body => {
                if self.doc.selected() != Some(hit.id) {
                    self.doc.select(Some(hit.id));
                    actions.push(Action::SelectionChanged(Some(hit.id)));
                    actions.push(Action::RenderNeeded);
                }
                let anchor = target.anchor();
                self.input =
                    InputState::Dragging { id: hit.id, offset: Point::new(p.x - anchor.x, p.y - anchor.y), before };
            }
        }
        actions
    }

    fn text_down(&mut self, p: Point) -> Vec<Action> {
        let existing = hit::topmost_at(&self.doc, p)
            .filter(|id| self.doc.get(id).is_some_and(|a| matches!(a.shape, Shape::Text { .. } | Shape::Callout { .. })));
        if let Some(id) = existing {
            return self.begin_text_edit(&id);
        }

        let before = self.doc.snapshot();
        let annotation = Annotation::new(
            Shape::Text { anchor: p, content: String::new(), text_style: self.ui.text_style },
            self.ui.style.clone(),
        );
        let id = self.doc.add(annotation);
        self.doc.select(Some(id));
        self.input = InputState::TextEditing { id, before };
        tracing::debug!(%id, "text box created");

        let mut actions = Vec::new();
        if let Some(a) = self.doc.get(&id) {
            actions.push(Action::AnnotationCreated(a.clone()));
        }
        actions.push(Action::SelectionChanged(Some(id)));
        actions.push(Action::TextEditStarted { id });
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Commit a click-placed annotation immediately. The tool stays active.
    fn stamp(&mut self, shape: Shape) -> Vec<Action> {
        let before = self.doc.snapshot();
        let id = self.doc.add(Annotation::new(shape, self.ui.style.clone()));
        self.doc.select(Some(id));
        tracing::debug!(%id, "annotation stamped");

        let mut actions = Vec::new();
        if let Some(a) = self.doc.get(&id) {
            actions.push(Action::AnnotationCreated(a.clone()));
        }
        actions.push(Action::SelectionChanged(Some(id)));
        actions.push(self.commit(before));
        actions.push(Action::RenderNeeded);
        actions
    }

    // =============================================================
    // Pointer move
    // =============================================================

    pub fn on_pointer_move(&mut self, screen_pt: Point, modifiers: Modifiers) -> Vec<Action> {
        let p = self.camera.screen_to_image(screen_pt);

        if let Some(crop) = &mut self.crop {
            let event = crop.pointer_move(p);
            return self.handle_crop_event(event);
        }

        match &mut self.input {
            InputState::Idle => self.hover(p),
            InputState::Drawing { draft } => {
                match draft {
                    Draft::Box { tool, start, current } => *current = constrain(*tool, *start, p, modifiers.shift),
                    Draft::Path { points, .. } => {
                        if points.last() != Some(&p) {
                            points.push(p);
                        }
                    }
                }
                vec![Action::RenderNeeded]
            }
            InputState::Dragging { id, offset, .. } => {
                let (id, offset) = (*id, *offset);
                let Some(anchor) = self.doc.get(&id).map(Annotation::anchor) else {
                    return Vec::new();
                };
                let dx = p.x - offset.x - anchor.x;
                let dy = p.y - offset.y - anchor.y;
                if dx == 0.0 && dy == 0.0 {
                    return Vec::new();
                }
                self.doc.translate(&id, dx, dy);
                vec![Action::RenderNeeded]
            }
            InputState::Resizing { anchor, orig, .. } => {
                let resized = resize(orig, *anchor, p, modifiers.shift);
                self.doc.replace(resized);
                vec![Action::RenderNeeded]
            }
            InputState::Rotating { id, center, start_angle, orig_rotation, .. } => {
                let mut rotation = *orig_rotation + angle_from(*center, p) - *start_angle;
                if modifiers.shift {
                    rotation = snap(rotation, ROTATE_SNAP_DEG);
                }
                let id = *id;
                if let Some(a) = self.doc.get_mut(&id) {
                    a.rotation = normalize_degrees(rotation);
                }
                vec![Action::RenderNeeded]
            }
            InputState::TextEditing { .. } => Vec::new(),
        }
    }

    fn hover(&mut self, p: Point) -> Vec<Action> {
        if self.ui.tool != Tool::Select {
            return Vec::new();
        }
        let cursor = hit::hit_test(p, &self.doc, &self.camera).map_or("default", |h| hit::cursor_for(h.part));
        self.set_cursor(cursor).into_iter().collect()
    }

    // =============================================================
    // Pointer up
    // =============================================================

    pub fn on_pointer_up(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        if button != Button::Primary {
            return Vec::new();
        }
        let p = self.camera.screen_to_image(screen_pt);

        if let Some(crop) = &mut self.crop {
            let event = crop.pointer_up(p);
            return self.handle_crop_event(event);
        }

        match std::mem::take(&mut self.input) {
            InputState::Idle => Vec::new(),
            InputState::Drawing { mut draft } => {
                match &mut draft {
                    Draft::Box { tool, start, current } => *current = constrain(*tool, *start, p, modifiers.shift),
                    Draft::Path { points, .. } => {
                        if points.last() != Some(&p) {
                            points.push(p);
                        }
                    }
                }
                self.finish_draft(&draft)
            }
            InputState::Dragging { id, before, .. }
            | InputState::Resizing { id, before, .. }
            | InputState::Rotating { id, before, .. } => {
                if self.doc.annotations() == before.as_slice() {
                    return Vec::new();
                }
                let mut actions = Vec::new();
                if let Some(a) = self.doc.get(&id) {
                    actions.push(Action::AnnotationUpdated(a.clone()));
                }
                actions.push(self.commit(before));
                actions.push(Action::RenderNeeded);
                actions
            }
            editing @ InputState::TextEditing { .. } => {
                self.input = editing;
                Vec::new()
            }
        }
    }

    fn finish_draft(&mut self, draft: &Draft) -> Vec<Action> {
        let tool = draft.tool();
        let annotation = match draft.to_annotation(&self.ui) {
            Some(a) if !a.is_degenerate(MIN_SHAPE_SIZE) => a,
            _ => {
                tracing::debug!(?tool, "draft below minimum size, discarded");
                return vec![Action::RenderNeeded];
            }
        };

        let before = self.doc.snapshot();
        let id = self.doc.add(annotation);
        self.doc.select(Some(id));
        tracing::debug!(%id, ?tool, "annotation created");

        let mut actions = Vec::new();
        if let Some(a) = self.doc.get(&id) {
            actions.push(Action::AnnotationCreated(a.clone()));
        }
        actions.push(Action::SelectionChanged(Some(id)));
        actions.push(self.commit(before));
        if tool.reverts_to_select() {
            actions.extend(self.set_tool(Tool::Select));
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Double-click on a Text or Callout enters text editing.
    pub fn on_double_click(&mut self, screen_pt: Point) -> Vec<Action> {
        if self.crop.is_some() {
            return Vec::new();
        }
        let p = self.camera.screen_to_image(screen_pt);
        match hit::topmost_at(&self.doc, p) {
            Some(id) => self.begin_text_edit(&id),
            None => Vec::new(),
        }
    }
}

/// Pointer angle around `center` in degrees, clockwise from the +x axis.
fn angle_from(center: Point, p: Point) -> f64 {
    (p.y - center.y).atan2(p.x - center.x).to_degrees()
}

/// Apply shift constraints to a two-point draft: boxes become squares and
/// segments snap to 45° steps.
pub(crate) fn constrain(tool: Tool, start: Point, p: Point, shift: bool) -> Point {
    if !shift {
        return p;
    }
    let dx = p.x - start.x;
    let dy = p.y - start.y;
    if tool.is_segment() {
        let length = dx.hypot(dy);
        let angle = snap(dy.atan2(dx).to_degrees(), LINE_SNAP_DEG).to_radians();
        let (sin, cos) = angle.sin_cos();
        return Point::new(start.x + length * cos, start.y + length * sin);
    }
    let side = dx.abs().max(dy.abs());
    Point::new(start.x + side.copysign(dx), start.y + side.copysign(dy))
}

/// Resize `orig` by dragging `anchor` to `p`.
///
/// Works in the annotation's local frame: the opposite handle stays fixed in
/// image space, edge handles only change one axis, and neither axis can
/// shrink below [`MIN_RESIZE_SIZE`] or flip. `keep_aspect` locks the ratio
/// for corner handles.
pub(crate) fn resize(orig: &Annotation, anchor: ResizeAnchor, p: Point, keep_aspect: bool) -> Annotation {
    let b = hit::bounding_box(orig);
    let c = b.center();
    let (ux, uy) = anchor.unit();
    let (fx, fy) = anchor.opposite().unit();
    let fixed = Point::new(c.x + fx * b.width / 2.0, c.y + fy * b.height / 2.0);
    let fixed_world = rotate_point(fixed, c, orig.rotation);
    let q = rotate_point(p, c, -orig.rotation);

    let mut width = if ux == 0.0 { b.width } else { ((q.x - fixed.x) * ux).max(MIN_RESIZE_SIZE) };
    let mut height = if uy == 0.0 { b.height } else { ((q.y - fixed.y) * uy).max(MIN_RESIZE_SIZE) };
    if keep_aspect && ux != 0.0 && uy != 0.0 && b.width > 0.0 && b.height > 0.0 {
        let scale = (width / b.width).max(height / b.height);
        width = b.width * scale;
        height = b.height * scale;
    }

    let x = match ux {
        u if u > 0.0 => fixed.x,
        u if u < 0.0 => fixed.x - width,
        _ => b.x,
    };
    let y = match uy {
        u if u > 0.0 => fixed.y,
        u if u < 0.0 => fixed.y - height,
        _ => b.y,
    };
    let target = Rect::new(x, y, width, height);

    let mut resized = orig.clone();
    resized.remap(&b, &target);

    // Rotation pivots on the new center, so shift the result back until the
    // fixed handle lands where it was.
    let nb = hit::bounding_box(&resized);
    let nc = nb.center();
    let new_fixed = Point::new(nc.x + fx * nb.width / 2.0, nc.y + fy * nb.height / 2.0);
    let moved = rotate_point(new_fixed, nc, orig.rotation);
    resized.translate(fixed_world.x - moved.x, fixed_world.y - moved.y);
    resized
}
