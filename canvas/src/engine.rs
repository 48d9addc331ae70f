use std::collections::HashMap;

use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

use crate::camera::{Camera, Point};
use crate::consts::{DUPLICATE_OFFSET, NUDGE_STEP, NUDGE_STEP_LARGE};
use crate::crop::{CommitPolicy, CropEvent, CropOverlay};
use crate::doc::{Annotation, AnnotationId, AnnotationPatch, DocStore, Shape};
use crate::geom::Rect;
use crate::history::{History, Snapshot};
use crate::input::{Button, InputState, Key, Modifiers, Tool, UiState};
use crate::keymap::{Command, Direction, Keymap};
use crate::raster::Bitmap;
use crate::assets::{AssetLookup, StaticAssets};
use crate::pixmap::PixmapSurface;
use crate::render::{self, RenderError, Scene};
use crate::schedule::{RedrawDecision, RedrawThrottle};
use crate::web::CanvasSurface;

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AnnotationCreated(Annotation),
    AnnotationUpdated(Annotation),
    AnnotationDeleted { id: AnnotationId },
    SelectionChanged(Option<AnnotationId>),
    ToolChanged(Tool),
    HistoryChanged { can_undo: bool, can_redo: bool },
    TextEditStarted { id: AnnotationId },
    TextEditFinished { id: AnnotationId },
    /// The background was cropped to this rectangle (old image coordinates).
    CropCommitted(Rect),
    CropCancelled,
    SetCursor(String),
    RenderNeeded,
}

/// Core engine state: everything that does not depend on the canvas element.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
/// One `EngineCore` is one editing session: it is created per capture and
/// dropped when the session ends.
pub struct EngineCore {
    pub doc: DocStore,
    pub history: History,
    pub camera: Camera,
    pub ui: UiState,
    pub input: InputState,
    pub keymap: Keymap,
    pub(crate) crop: Option<CropOverlay>,
    /// Last callout label handed out. Never decremented.
    pub(crate) callout_counter: u32,
    pub(crate) cursor: String,
    background: Option<Bitmap>,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub dpr: f64,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self {
            doc: DocStore::new(),
            history: History::new(),
            camera: Camera::default(),
            ui: UiState::default(),
            input: InputState::default(),
            keymap: Keymap::default(),
            crop: None,
            callout_counter: 0,
            cursor: "default".to_owned(),
            background: None,
            viewport_width: 0.0,
            viewport_height: 0.0,
            dpr: 1.0,
        }
    }
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session on a captured bitmap.
    #[must_use]
    pub fn with_background(background: Bitmap) -> Self {
        let mut core = Self::new();
        core.set_background(background);
        core
    }

    // --- Data inputs ---

    /// Replace the background bitmap and refit the camera.
    pub fn set_background(&mut self, background: Bitmap) {
        self.background = Some(background);
        self.fit_camera();
    }

    /// Update viewport dimensions and device pixel ratio.
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        self.viewport_width = width_css;
        self.viewport_height = height_css;
        self.dpr = if dpr > 0.0 { dpr } else { 1.0 };
        self.fit_camera();
    }

    fn fit_camera(&mut self) {
        let Some(bg) = &self.background else {
            return;
        };
        self.camera = if self.viewport_width > 0.0 && self.viewport_height > 0.0 {
            Camera::fit(f64::from(bg.width()), f64::from(bg.height()), self.viewport_width, self.viewport_height)
        } else {
            Camera::default()
        };
    }

    pub fn set_keymap(&mut self, keymap: Keymap) {
        self.keymap = keymap;
    }

    // --- Tool ---

    /// Set the active tool. Any gesture in progress is finished or discarded.
    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        if self.crop.is_some() || self.ui.tool == tool {
            return Vec::new();
        }
        let mut actions = self.abort_gesture();
        self.ui.tool = tool;
        tracing::debug!(?tool, "tool changed");
        actions.push(Action::ToolChanged(tool));
        actions.extend(self.set_cursor(tool_cursor(tool)));
        actions
    }

    // --- History ---

    /// Record `before` as one undo step.
    pub(crate) fn commit(&mut self, before: Snapshot) -> Action {
        self.history.push(before);
        self.history_action()
    }

    pub(crate) fn history_action(&self) -> Action {
        Action::HistoryChanged { can_undo: self.history.can_undo(), can_redo: self.history.can_redo() }
    }

    pub fn undo(&mut self) -> Vec<Action> {
        let mut actions = self.abort_gesture();
        let selected = self.doc.selected();
        let Some(prev) = self.history.undo(self.doc.snapshot()) else {
            return actions;
        };
        self.doc.restore(prev);
        tracing::debug!(remaining = self.history.undo_len(), "undo");
        self.after_restore(selected, &mut actions);
        actions
    }

    pub fn redo(&mut self) -> Vec<Action> {
        let mut actions = self.abort_gesture();
        let selected = self.doc.selected();
        let Some(next) = self.history.redo(self.doc.snapshot()) else {
            return actions;
        };
        self.doc.restore(next);
        tracing::debug!("redo");
        self.after_restore(selected, &mut actions);
        actions
    }

    fn after_restore(&self, selected_before: Option<AnnotationId>, actions: &mut Vec<Action>) {
        if self.doc.selected() != selected_before {
            actions.push(Action::SelectionChanged(self.doc.selected()));
        }
        actions.push(self.history_action());
        actions.push(Action::RenderNeeded);
    }

    // --- Editing commands ---

    /// Remove the selected annotation.
    pub fn delete_selected(&mut self) -> Vec<Action> {
        let mut actions = self.abort_gesture();
        let Some(id) = self.doc.selected() else {
            return actions;
        };
        let before = self.doc.snapshot();
        if self.doc.remove(&id).is_none() {
            return actions;
        }
        tracing::debug!(%id, "annotation deleted");
        actions.push(Action::AnnotationDeleted { id });
        actions.push(Action::SelectionChanged(None));
        actions.push(self.commit(before));
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Copy the selected annotation, offset so it is visible, and select the copy.
    pub fn duplicate_selected(&mut self) -> Vec<Action> {
        let mut actions = self.abort_gesture();
        let Some(id) = self.doc.selected() else {
            return actions;
        };
        let before = self.doc.snapshot();
        let Some(copy_id) = self.doc.duplicate(&id, DUPLICATE_OFFSET) else {
            return actions;
        };
        self.doc.select(Some(copy_id));
        if let Some(copy) = self.doc.get(&copy_id) {
            actions.push(Action::AnnotationCreated(copy.clone()));
        }
        actions.push(Action::SelectionChanged(Some(copy_id)));
        actions.push(self.commit(before));
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Apply a style change. It becomes the default for new annotations and,
    /// if something is selected and actually changes, one undo step.
    pub fn apply_style(&mut self, patch: &AnnotationPatch) -> Vec<Action> {
        absorb_patch(&mut self.ui, patch);
        let Some(id) = self.doc.selected() else {
            return Vec::new();
        };
        let before = self.doc.snapshot();
        if !self.doc.update(&id, patch) {
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

    pub fn bring_to_front(&mut self) -> Vec<Action> {
        self.reorder(DocStore::bring_to_front)
    }

    pub fn send_to_back(&mut self) -> Vec<Action> {
        self.reorder(DocStore::send_to_back)
    }

    fn reorder(&mut self, op: fn(&mut DocStore, &AnnotationId) -> bool) -> Vec<Action> {
        let mut actions = self.abort_gesture();
        let Some(id) = self.doc.selected() else {
            return actions;
        };
        let before = self.doc.snapshot();
        if op(&mut self.doc, &id) {
            actions.push(self.commit(before));
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    /// Remove every annotation as one undo step.
    pub fn clear_all(&mut self) -> Vec<Action> {
        let mut actions = self.abort_gesture();
        let before = self.doc.snapshot();
        let had_selection = self.doc.selected().is_some();
        if !self.doc.clear() {
            return actions;
        }
        actions.extend(before.iter().map(|a| Action::AnnotationDeleted { id: a.id }));
        if had_selection {
            actions.push(Action::SelectionChanged(None));
        }
        actions.push(self.commit(before));
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Move the selection one step (ten with `large`).
    pub fn nudge(&mut self, direction: Direction, large: bool) -> Vec<Action> {
        if !self.input.is_idle() {
            return Vec::new();
        }
        let Some(id) = self.doc.selected() else {
            return Vec::new();
        };
        let step = if large { NUDGE_STEP_LARGE } else { NUDGE_STEP };
        let (ux, uy) = direction.unit();
        let before = self.doc.snapshot();
        self.doc.translate(&id, ux * step, uy * step);
        let mut actions = Vec::new();
        if let Some(a) = self.doc.get(&id) {
            actions.push(Action::AnnotationUpdated(a.clone()));
        }
        actions.push(self.commit(before));
        actions.push(Action::RenderNeeded);
        actions
    }

    // --- Text editing ---

    /// Route keystrokes into an existing Text or Callout annotation.
    pub fn begin_text_edit(&mut self, id: &AnnotationId) -> Vec<Action> {
        let editable = self.doc.get(id).is_some_and(|a| matches!(a.shape, Shape::Text { .. } | Shape::Callout { .. }));
        if !editable || self.crop.is_some() {
            return Vec::new();
        }
        let mut actions = self.abort_gesture();
        let before = self.doc.snapshot();
        if self.doc.selected() != Some(*id) {
            self.doc.select(Some(*id));
            actions.push(Action::SelectionChanged(Some(*id)));
        }
        self.input = InputState::TextEditing { id: *id, before };
        tracing::debug!(%id, "text edit started");
        actions.push(Action::TextEditStarted { id: *id });
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Append text to the annotation being edited.
    pub fn insert_text(&mut self, text: &str) -> Vec<Action> {
        self.edit_content(|content| content.push_str(text))
    }

    /// Delete the last character of the annotation being edited.
    pub fn backspace(&mut self) -> Vec<Action> {
        self.edit_content(|content| {
            content.pop();
        })
    }

    fn edit_content(&mut self, edit: impl FnOnce(&mut String)) -> Vec<Action> {
        let InputState::TextEditing { id, .. } = &self.input else {
            return Vec::new();
        };
        let id = *id;
        let Some(a) = self.doc.get_mut(&id) else {
            return Vec::new();
        };
        match &mut a.shape {
            Shape::Text { content, .. } | Shape::Callout { content, .. } => edit(content),
            _ => return Vec::new(),
        }
        let updated = a.clone();
        vec![Action::AnnotationUpdated(updated), Action::RenderNeeded]
    }

    /// Leave text editing. Empty text boxes are removed; a real change is one
    /// undo step.
    pub fn finish_text_edit(&mut self) -> Vec<Action> {
        let InputState::TextEditing { id, before } = std::mem::take(&mut self.input) else {
            return Vec::new();
        };
        let mut actions = vec![Action::TextEditFinished { id }];
        if self.doc.get(&id).is_some_and(|a| a.kind() == crate::doc::AnnotationKind::Text && a.is_degenerate(0.0)) {
            self.doc.remove(&id);
            tracing::debug!(%id, "empty text discarded");
            actions.push(Action::AnnotationDeleted { id });
            actions.push(Action::SelectionChanged(self.doc.selected()));
        }
        if self.doc.annotations() != before.as_slice() {
            actions.push(self.commit(before));
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    fn text_key(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        match key.0.as_str() {
            "Enter" if modifiers.shift => self.insert_text("\n"),
            "Enter" | "Escape" => self.finish_text_edit(),
            "Backspace" => self.backspace(),
            _ => match key.printable() {
                Some(c) => self.insert_text(c.encode_utf8(&mut [0; 4])),
                None => Vec::new(),
            },
        }
    }

    // --- Crop ---

    /// Open the re-crop overlay over the whole background.
    pub fn begin_crop(&mut self) -> Vec<Action> {
        if self.crop.is_some() {
            return Vec::new();
        }
        let Some(bounds) = self.background.as_ref().map(Bitmap::bounds) else {
            return Vec::new();
        };
        let mut actions = self.abort_gesture();
        self.crop = Some(CropOverlay::with_rect(bounds, bounds, CommitPolicy::OnConfirm));
        tracing::debug!("crop started");
        actions.extend(self.set_cursor("crosshair"));
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Apply the crop overlay's current rectangle.
    pub fn confirm_crop(&mut self) -> Vec<Action> {
        let event = self.crop.as_mut().map_or(CropEvent::None, CropOverlay::confirm);
        self.handle_crop_event(event)
    }

    pub fn cancel_crop(&mut self) -> Vec<Action> {
        let event = self.crop.as_mut().map_or(CropEvent::None, CropOverlay::cancel);
        self.handle_crop_event(event)
    }

    pub(crate) fn handle_crop_event(&mut self, event: CropEvent) -> Vec<Action> {
        match event {
            CropEvent::None => Vec::new(),
            CropEvent::Changed => vec![Action::RenderNeeded],
            CropEvent::Cancelled => {
                self.crop = None;
                let mut actions = vec![Action::CropCancelled];
                actions.extend(self.set_cursor(tool_cursor(self.ui.tool)));
                actions.push(Action::RenderNeeded);
                actions
            }
            CropEvent::Committed(rect) => {
                self.crop = None;
                let mut actions = self.apply_crop(rect);
                actions.extend(self.set_cursor(tool_cursor(self.ui.tool)));
                actions
            }
        }
    }

    /// Crop the background, shift annotations into the new origin, and drop
    /// history (undo cannot restore the old bitmap).
    fn apply_crop(&mut self, rect: Rect) -> Vec<Action> {
        let Some(bg) = &self.background else {
            return vec![Action::CropCancelled, Action::RenderNeeded];
        };
        let aligned = Rect::from_corners(
            Point::new(rect.x.floor(), rect.y.floor()),
            Point::new(rect.right().ceil(), rect.bottom().ceil()),
        );
        let cropped = match bg.crop(&aligned) {
            Ok(cropped) => cropped,
            Err(e) => {
                tracing::warn!(error = %e, "crop failed");
                return vec![Action::CropCancelled, Action::RenderNeeded];
            }
        };
        self.background = Some(cropped);
        let ids: Vec<AnnotationId> = self.doc.annotations().iter().map(|a| a.id).collect();
        for id in &ids {
            self.doc.translate(id, -aligned.x, -aligned.y);
        }
        self.history.clear();
        self.fit_camera();
        tracing::info!(x = aligned.x, y = aligned.y, width = aligned.width, height = aligned.height, "crop committed");
        vec![Action::CropCommitted(aligned), self.history_action(), Action::RenderNeeded]
    }

    // --- Keyboard ---

    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        if matches!(self.input, InputState::TextEditing { .. }) && !modifiers.command() {
            return self.text_key(key, modifiers);
        }
        match self.keymap.lookup(key, modifiers) {
            Some(command) => self.execute(command, modifiers),
            None => Vec::new(),
        }
    }

    /// Run a keymap command.
    pub fn execute(&mut self, command: Command, modifiers: Modifiers) -> Vec<Action> {
        if self.crop.is_some() {
            return match command {
                Command::Confirm => self.confirm_crop(),
                Command::Cancel => self.cancel_crop(),
                _ => Vec::new(),
            };
        }
        match command {
            Command::SetTool(tool) => self.set_tool(tool),
            Command::Undo => self.undo(),
            Command::Redo => self.redo(),
            Command::Delete => self.delete_selected(),
            Command::Cancel => self.cancel(),
            Command::Duplicate => self.duplicate_selected(),
            Command::Confirm => self.finish_text_edit(),
            Command::BringToFront => self.bring_to_front(),
            Command::SendToBack => self.send_to_back(),
            Command::Nudge(direction) => self.nudge(direction, modifiers.shift),
            Command::Crop => self.begin_crop(),
        }
    }

    /// Escape: unwind the crop, then the gesture, then the selection.
    pub fn cancel(&mut self) -> Vec<Action> {
        if self.crop.is_some() {
            return self.cancel_crop();
        }
        if !self.input.is_idle() {
            return self.abort_gesture();
        }
        if self.doc.selected().is_some() {
            self.doc.select(None);
            return vec![Action::SelectionChanged(None), Action::RenderNeeded];
        }
        Vec::new()
    }

    /// Unwind the current gesture to `Idle`. Drafts are discarded and live
    /// previews reverted; text editing is finished normally.
    pub(crate) fn abort_gesture(&mut self) -> Vec<Action> {
        match std::mem::take(&mut self.input) {
            InputState::Idle => Vec::new(),
            InputState::Drawing { draft } => {
                tracing::debug!(tool = ?draft.tool(), "draft discarded");
                vec![Action::RenderNeeded]
            }
            InputState::Dragging { before, .. }
            | InputState::Resizing { before, .. }
            | InputState::Rotating { before, .. } => {
                self.doc.restore(before);
                tracing::debug!("gesture cancelled");
                vec![Action::RenderNeeded]
            }
            editing @ InputState::TextEditing { .. } => {
                self.input = editing;
                self.finish_text_edit()
            }
        }
    }

    pub(crate) fn set_cursor(&mut self, cursor: &str) -> Option<Action> {
        if self.cursor == cursor {
            return None;
        }
        cursor.clone_into(&mut self.cursor);
        Some(Action::SetCursor(cursor.to_owned()))
    }

    /// Next callout label. Labels are never reused within a session.
    pub(crate) fn next_callout_label(&mut self) -> u32 {
        self.callout_counter += 1;
        self.callout_counter
    }

    // --- Queries ---

    /// The currently selected annotation, if any.
    #[must_use]
    pub fn selection(&self) -> Option<AnnotationId> {
        self.doc.selected()
    }

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.ui.tool
    }

    /// The current camera state.
    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    /// Look up an annotation by ID.
    #[must_use]
    pub fn annotation(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.doc.get(id)
    }

    #[must_use]
    pub fn annotations(&self) -> &[Annotation] {
        self.doc.annotations()
    }

    #[must_use]
    pub fn background(&self) -> Option<&Bitmap> {
        self.background.as_ref()
    }

    #[must_use]
    pub fn crop_overlay(&self) -> Option<&CropOverlay> {
        self.crop.as_ref()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Id of the annotation receiving keystrokes, if any.
    #[must_use]
    pub fn editing(&self) -> Option<AnnotationId> {
        match &self.input {
            InputState::TextEditing { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// The uncommitted shape being drawn, for preview.
    #[must_use]
    pub fn draft_annotation(&self) -> Option<Annotation> {
        match &self.input {
            InputState::Drawing { draft } => draft.to_annotation(&self.ui),
            _ => None,
        }
    }

    /// The background with every annotation painted in at image
    /// resolution, for raster export. `None` without a background.
    ///
    /// # Errors
    ///
    /// Returns `Err` if painting fails.
    pub fn flattened(&self) -> Result<Option<Bitmap>, RenderError> {
        self.flattened_with(&HashMap::new())
    }

    /// [`EngineCore::flattened`] with loaded arrowhead images. Arrows whose
    /// asset is missing get the vector head.
    ///
    /// # Errors
    ///
    /// Returns `Err` if painting fails.
    pub fn flattened_with(&self, assets: &HashMap<String, Bitmap>) -> Result<Option<Bitmap>, RenderError> {
        let Some(bg) = &self.background else {
            return Ok(None);
        };
        let mut surface = PixmapSurface::new(bg.width(), bg.height())?;
        for (name, image) in assets {
            surface.add_asset(name, image.clone());
        }
        render::draw_document(&mut surface, Some(bg), self.doc.annotations())?;
        surface.into_bitmap().map(Some)
    }

    /// Arrowhead asset names in use by annotations or selected for new
    /// arrows, sorted and deduplicated.
    #[must_use]
    pub fn asset_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .doc
            .annotations()
            .iter()
            .filter_map(|a| match &a.shape {
                Shape::Arrow { head_asset, .. } => head_asset.clone(),
                _ => None,
            })
            .chain(self.ui.arrow_head.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Fold a style patch into the sticky defaults for new annotations.
fn absorb_patch(ui: &mut UiState, patch: &AnnotationPatch) {
    if let Some(v) = &patch.stroke {
        ui.style.stroke.clone_from(v);
    }
    if let Some(v) = patch.stroke_width {
        ui.style.stroke_width = v.max(0.0);
    }
    if let Some(v) = patch.opacity {
        ui.style.opacity = v.clamp(0.0, 1.0);
    }
    if let Some(v) = patch.fill {
        ui.fill = v;
    }
    if let Some(v) = patch.font_size {
        ui.text_style.font_size = v.clamp(6.0, 400.0);
    }
    if let Some(v) = patch.bold {
        ui.text_style.bold = v;
    }
    if let Some(v) = patch.italic {
        ui.text_style.italic = v;
    }
    if let Some(v) = patch.underline {
        ui.text_style.underline = v;
    }
    if let Some(v) = patch.effect {
        ui.blur_kind = v;
    }
    if let Some(v) = patch.intensity {
        ui.blur_intensity = v.max(1.0);
    }
    if let Some(v) = &patch.symbol {
        ui.emoji.clone_from(v);
    }
    if let Some(head) = patch.arrow_head() {
        ui.arrow_head = head;
    }
}

/// Resolve the assets `core` uses that `loaded` does not report, skipping
/// names `lookup` does not know.
#[must_use]
pub fn pending_assets(
    core: &EngineCore,
    lookup: &dyn AssetLookup,
    loaded: impl Fn(&str) -> bool,
) -> Vec<(String, String)> {
    core.asset_names()
        .into_iter()
        .filter(|name| !loaded(name))
        .filter_map(|name| match lookup.resolve(&name) {
            Some(url) => Some((name, url)),
            None => {
                tracing::debug!(asset = %name, "unknown arrowhead asset; vector head stays");
                None
            }
        })
        .collect()
}

fn tool_cursor(tool: Tool) -> &'static str {
    match tool {
        Tool::Select => "default",
        Tool::Text => "text",
        _ => "crosshair",
    }
}

/// The full canvas engine. Wraps `EngineCore` and owns the browser canvas element.
pub struct Engine {
    canvas: HtmlCanvasElement,
    pub core: EngineCore,
    throttle: RedrawThrottle,
    lookup: Box<dyn AssetLookup>,
    assets: HashMap<String, HtmlImageElement>,
}

impl Engine {
    /// Create a new engine bound to the given canvas element. Arrowhead
    /// assets resolve against the page origin.
    #[must_use]
    pub fn new(canvas: HtmlCanvasElement) -> Self {
        Self {
            canvas,
            core: EngineCore::new(),
            throttle: RedrawThrottle::new(),
            lookup: Box::new(StaticAssets::new("")),
            assets: HashMap::new(),
        }
    }

    /// Resolve arrowhead assets through `lookup` instead.
    #[must_use]
    pub fn with_lookup(mut self, lookup: Box<dyn AssetLookup>) -> Self {
        self.lookup = lookup;
        self
    }

    /// Create an engine for one capture session.
    #[must_use]
    pub fn with_background(canvas: HtmlCanvasElement, background: Bitmap) -> Self {
        Self { core: EngineCore::with_background(background), ..Self::new(canvas) }
    }

    /// Register a loaded arrowhead image under its asset name.
    pub fn add_asset(&mut self, name: &str, image: HtmlImageElement) {
        self.assets.insert(name.to_owned(), image);
    }

    /// `(name, url)` for each asset in use that has not been registered.
    /// The host loads these and calls [`Engine::add_asset`]; until then, and
    /// for names the lookup does not know, arrows keep the vector head.
    #[must_use]
    pub fn missing_assets(&self) -> Vec<(String, String)> {
        pending_assets(&self.core, self.lookup.as_ref(), |name| self.assets.contains_key(name))
    }

    // --- Delegated inputs ---

    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        self.core.set_viewport(width_css, height_css, dpr);
    }

    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        self.core.set_tool(tool)
    }

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_down(screen_pt, button, modifiers)
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_move(screen_pt, modifiers)
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_up(screen_pt, button, modifiers)
    }

    pub fn on_double_click(&mut self, screen_pt: Point) -> Vec<Action> {
        self.core.on_double_click(screen_pt)
    }

    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_key_down(key, modifiers)
    }

    // --- Render ---

    /// Ask for a repaint at time `now_ms`. Paints immediately when outside
    /// the frame window; otherwise returns the delay after which the host
    /// must call [`Engine::on_redraw_timer`].
    ///
    /// # Errors
    ///
    /// Returns `Err` if painting fails.
    pub fn request_redraw(&mut self, now_ms: f64) -> Result<Option<f64>, JsValue> {
        match self.throttle.request(now_ms) {
            RedrawDecision::PaintNow => self.render().map(|()| None),
            RedrawDecision::Scheduled { delay_ms } => Ok(Some(delay_ms)),
            RedrawDecision::Coalesced => Ok(None),
        }
    }

    /// The trailing redraw timer fired.
    ///
    /// # Errors
    ///
    /// Returns `Err` if painting fails.
    pub fn on_redraw_timer(&mut self, now_ms: f64) -> Result<(), JsValue> {
        if self.throttle.on_timer(now_ms) {
            self.render()?;
        }
        Ok(())
    }

    /// Draw the current state to the canvas.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the 2D context is unavailable or a draw call fails.
    pub fn render(&self) -> Result<(), JsValue> {
        let ctx = self
            .canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        let mut surface = CanvasSurface::new(&ctx, &self.assets);

        let core = &self.core;
        let draft = core.draft_annotation();
        let scene = Scene {
            background: core.background(),
            doc: &core.doc,
            camera: &core.camera,
            draft: draft.as_ref(),
            crop: core.crop_overlay(),
            editing: core.editing(),
            viewport_width: core.viewport_width,
            viewport_height: core.viewport_height,
            dpr: core.dpr,
        };
        render::draw(&mut surface, &scene).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}
