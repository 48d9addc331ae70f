#![allow(clippy::float_cmp)]

use std::collections::HashSet;

use super::*;
use crate::crop::CommitPolicy;
use crate::doc::BlurKind;

// =============================================================
// Recording surface
// =============================================================

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Save,
    Restore,
    Reset,
    Translate(f64, f64),
    Rotate(f64),
    Scale(f64, f64),
    Alpha(f64),
    Stroke(Path, Stroke),
    Fill(Path, String),
    Clip(Path),
    Text(String, Point, Font, String),
    Bitmap(u32, u32, Point),
    Asset(String, Rect),
}

#[derive(Default)]
struct Recorder {
    ops: Vec<Op>,
    loaded: HashSet<String>,
    fail_text: bool,
}

impl Surface for Recorder {
    fn save(&mut self) {
        self.ops.push(Op::Save);
    }
    fn restore(&mut self) {
        self.ops.push(Op::Restore);
    }
    fn reset(&mut self, _width: f64, _height: f64, _dpr: f64) -> Result<(), RenderError> {
        self.ops.push(Op::Reset);
        Ok(())
    }
    fn translate(&mut self, dx: f64, dy: f64) -> Result<(), RenderError> {
        self.ops.push(Op::Translate(dx, dy));
        Ok(())
    }
    fn rotate(&mut self, radians: f64) -> Result<(), RenderError> {
        self.ops.push(Op::Rotate(radians));
        Ok(())
    }
    fn scale(&mut self, sx: f64, sy: f64) -> Result<(), RenderError> {
        self.ops.push(Op::Scale(sx, sy));
        Ok(())
    }
    fn set_alpha(&mut self, alpha: f64) {
        self.ops.push(Op::Alpha(alpha));
    }
    fn stroke_path(&mut self, path: &Path, stroke: &Stroke) -> Result<(), RenderError> {
        self.ops.push(Op::Stroke(path.clone(), stroke.clone()));
        Ok(())
    }
    fn fill_path(&mut self, path: &Path, color: &str) -> Result<(), RenderError> {
        self.ops.push(Op::Fill(path.clone(), color.to_owned()));
        Ok(())
    }
    fn clip(&mut self, path: &Path) -> Result<(), RenderError> {
        self.ops.push(Op::Clip(path.clone()));
        Ok(())
    }
    fn fill_text(&mut self, text: &str, at: Point, font: Font, color: &str) -> Result<(), RenderError> {
        if self.fail_text {
            return Err(RenderError::Surface("text unsupported".into()));
        }
        self.ops.push(Op::Text(text.to_owned(), at, font, color.to_owned()));
        Ok(())
    }
    fn draw_bitmap(&mut self, bitmap: &Bitmap, at: Point) -> Result<(), RenderError> {
        self.ops.push(Op::Bitmap(bitmap.width(), bitmap.height(), at));
        Ok(())
    }
    fn draw_asset(&mut self, name: &str, dest: Rect) -> Result<bool, RenderError> {
        if !self.loaded.contains(name) {
            return Ok(false);
        }
        self.ops.push(Op::Asset(name.to_owned(), dest));
        Ok(true)
    }
}

impl Recorder {
    fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Text(t, ..) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&Op) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }

    fn position(&self, pred: impl Fn(&Op) -> bool) -> Option<usize> {
        self.ops.iter().position(pred)
    }
}

// =============================================================
// Helpers
// =============================================================

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn rect(x: f64, y: f64, w: f64, h: f64) -> Annotation {
    Annotation::new(Shape::Rectangle { bounds: Rect::new(x, y, w, h), fill: false }, Style::default())
}

fn arrow(head_asset: Option<&str>) -> Annotation {
    Annotation::new(
        Shape::Arrow {
            start: pt(0.0, 0.0),
            end: pt(100.0, 0.0),
            has_start_head: false,
            has_end_head: true,
            head_asset: head_asset.map(str::to_owned),
        },
        Style::default(),
    )
}

fn scene<'a>(doc: &'a DocStore, camera: &'a Camera) -> Scene<'a> {
    Scene {
        background: None,
        doc,
        camera,
        draft: None,
        crop: None,
        editing: None,
        viewport_width: 800.0,
        viewport_height: 600.0,
        dpr: 1.0,
    }
}

// =============================================================
// Scene order
// =============================================================

#[test]
fn background_is_drawn_before_annotations() {
    let mut doc = DocStore::new();
    doc.add(rect(0.0, 0.0, 10.0, 10.0));
    let camera = Camera::default();
    let bg = Bitmap::new(40, 30);
    let mut s = scene(&doc, &camera);
    s.background = Some(&bg);

    let mut r = Recorder::default();
    draw(&mut r, &s).unwrap();
    assert_eq!(r.ops[0], Op::Reset);
    let bitmap = r.position(|op| matches!(op, Op::Bitmap(40, 30, _))).unwrap();
    let stroke = r.position(|op| matches!(op, Op::Stroke(..))).unwrap();
    assert!(bitmap < stroke);
}

#[test]
fn annotations_paint_in_sequence_order() {
    let mut doc = DocStore::new();
    let mut first = rect(0.0, 0.0, 10.0, 10.0);
    first.style.stroke = "#111111".into();
    let mut second = rect(0.0, 0.0, 10.0, 10.0);
    second.style.stroke = "#222222".into();
    doc.add(first);
    doc.add(second);
    let camera = Camera::default();

    let mut r = Recorder::default();
    draw(&mut r, &scene(&doc, &camera)).unwrap();
    let colors: Vec<&str> = r
        .ops
        .iter()
        .filter_map(|op| match op {
            Op::Stroke(_, s) => Some(s.color.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(colors, vec!["#111111", "#222222"]);
}

#[test]
fn selection_chrome_only_for_selected() {
    let mut doc = DocStore::new();
    let a = doc.add(rect(0.0, 0.0, 50.0, 50.0));
    doc.add(rect(100.0, 100.0, 50.0, 50.0));
    let camera = Camera::default();

    let mut r = Recorder::default();
    draw(&mut r, &scene(&doc, &camera)).unwrap();
    let unselected_strokes = r.count(|op| matches!(op, Op::Stroke(..)));

    doc.select(Some(a));
    let mut r = Recorder::default();
    draw(&mut r, &scene(&doc, &camera)).unwrap();
    let dashed = r.count(|op| matches!(op, Op::Stroke(_, s) if !s.dash.is_empty()));
    assert_eq!(dashed, 1);
    // Eight resize handles plus the rotate handle are filled white.
    assert_eq!(r.count(|op| matches!(op, Op::Fill(_, c) if c == "#FFFFFF")), 9);
    assert!(r.count(|op| matches!(op, Op::Stroke(..))) > unselected_strokes);
}

#[test]
fn draft_is_drawn_after_selection() {
    let mut doc = DocStore::new();
    let a = doc.add(rect(0.0, 0.0, 50.0, 50.0));
    doc.select(Some(a));
    let camera = Camera::default();
    let mut draft = rect(200.0, 200.0, 10.0, 10.0);
    draft.style.stroke = "#ABCDEF".into();
    let mut s = scene(&doc, &camera);
    s.draft = Some(&draft);

    let mut r = Recorder::default();
    draw(&mut r, &s).unwrap();
    let last_stroke = r.ops.iter().rev().find(|op| matches!(op, Op::Stroke(..))).unwrap();
    assert!(matches!(last_stroke, Op::Stroke(_, st) if st.color == "#ABCDEF"));
}

#[test]
fn opacity_and_rotation_wrap_shape() {
    let mut a = rect(0.0, 0.0, 20.0, 10.0);
    a.rotation = 90.0;
    a.style.opacity = 0.5;
    let mut r = Recorder::default();
    draw_annotation(&mut r, &a, None).unwrap();
    assert_eq!(r.ops[0], Op::Save);
    assert_eq!(r.ops[1], Op::Alpha(0.5));
    assert_eq!(r.ops[2], Op::Translate(10.0, 5.0));
    assert_eq!(r.ops[3], Op::Rotate(90f64.to_radians()));
    assert_eq!(r.ops[4], Op::Translate(-10.0, -5.0));
    assert_eq!(r.ops.last(), Some(&Op::Restore));
}

#[test]
fn surface_error_propagates() {
    let text = Annotation::new(
        Shape::Text { anchor: pt(0.0, 0.0), content: "hi".into(), text_style: TextStyle::default() },
        Style::default(),
    );
    let mut r = Recorder { fail_text: true, ..Recorder::default() };
    assert!(matches!(draw_annotation(&mut r, &text, None), Err(RenderError::Surface(_))));
    // State is restored even on failure.
    assert_eq!(r.ops.last(), Some(&Op::Restore));
}

// =============================================================
// Variants
// =============================================================

#[test]
fn filled_rectangle_fills_then_strokes() {
    let mut a = rect(0.0, 0.0, 10.0, 10.0);
    a.shape = Shape::Rectangle { bounds: Rect::new(0.0, 0.0, 10.0, 10.0), fill: true };
    let mut r = Recorder::default();
    draw_annotation(&mut r, &a, None).unwrap();
    let fill = r.position(|op| matches!(op, Op::Fill(..))).unwrap();
    let stroke = r.position(|op| matches!(op, Op::Stroke(..))).unwrap();
    assert!(fill < stroke);
}

#[test]
fn highlight_stroke_width_is_brush_diameter() {
    let a = Annotation::new(Shape::Highlight { points: vec![pt(0.0, 0.0), pt(10.0, 0.0)], radius: 6.0 }, Style::default());
    let mut r = Recorder::default();
    draw_annotation(&mut r, &a, None).unwrap();
    assert_eq!(r.count(|op| matches!(op, Op::Stroke(_, s) if s.width == 12.0)), 1);
}

#[test]
fn text_honours_font_flags_and_underline() {
    let style = TextStyle { font_size: 20.0, bold: true, italic: true, underline: true };
    let a = Annotation::new(Shape::Text { anchor: pt(5.0, 5.0), content: "ab\ncd".into(), text_style: style }, Style::default());
    let mut r = Recorder::default();
    draw_annotation(&mut r, &a, None).unwrap();
    assert_eq!(r.texts(), vec!["ab", "cd"]);
    let font = r.ops.iter().find_map(|op| match op {
        Op::Text(_, _, f, _) => Some(*f),
        _ => None,
    });
    assert_eq!(font.unwrap().css(), "italic bold 20px sans-serif");
    // One underline per line.
    assert_eq!(r.count(|op| matches!(op, Op::Stroke(..))), 2);
}

#[test]
fn callout_draws_badge_label_and_text() {
    let a = Annotation::new(
        Shape::Callout { anchor: pt(50.0, 50.0), content: "note".into(), text_style: TextStyle::default(), label: 7 },
        Style::default(),
    );
    let mut r = Recorder::default();
    draw_annotation(&mut r, &a, None).unwrap();
    assert_eq!(r.texts(), vec!["7", "note"]);
    assert!(matches!(&r.ops[2], Op::Fill(p, _) if matches!(p.ops[0], PathOp::Ellipse { .. })));
}

#[test]
fn arrow_uses_loaded_asset_head() {
    let mut r = Recorder::default();
    r.loaded.insert("chevron".into());
    draw_annotation(&mut r, &arrow(Some("chevron")), None).unwrap();
    assert_eq!(r.count(|op| matches!(op, Op::Asset(..))), 1);
    assert_eq!(r.count(|op| matches!(op, Op::Fill(..))), 0);
}

#[test]
fn arrow_falls_back_to_vector_head() {
    let mut r = Recorder::default();
    draw_annotation(&mut r, &arrow(Some("chevron")), None).unwrap();
    assert_eq!(r.count(|op| matches!(op, Op::Asset(..))), 0);
    assert_eq!(r.count(|op| matches!(op, Op::Fill(..))), 1);

    let mut plain = Recorder::default();
    draw_annotation(&mut plain, &arrow(None), None).unwrap();
    assert_eq!(plain.count(|op| matches!(op, Op::Fill(..))), 1);
}

#[test]
fn blur_region_samples_background() {
    let bg = Bitmap::filled(50, 50, [200, 10, 10, 255]);
    let a = Annotation::new(
        Shape::BlurRegion { bounds: Rect::new(10.0, 10.0, 20.0, 20.0), effect: BlurKind::Pixelate, intensity: 5.0 },
        Style::default(),
    );
    let mut r = Recorder::default();
    draw_annotation(&mut r, &a, Some(&bg)).unwrap();
    let clip = r.position(|op| matches!(op, Op::Clip(_))).unwrap();
    let blit = r.position(|op| matches!(op, Op::Bitmap(20, 20, p) if *p == pt(10.0, 10.0))).unwrap();
    assert!(clip < blit);
    // No opaque overlay is drawn over the region.
    assert_eq!(r.count(|op| matches!(op, Op::Fill(..))), 0);
}

#[test]
fn blur_region_without_background_draws_placeholder() {
    let a = Annotation::new(
        Shape::BlurRegion { bounds: Rect::new(0.0, 0.0, 20.0, 20.0), effect: BlurKind::Blur, intensity: 5.0 },
        Style::default(),
    );
    let mut r = Recorder::default();
    draw_annotation(&mut r, &a, None).unwrap();
    assert_eq!(r.count(|op| matches!(op, Op::Fill(..))), 1);
}

// =============================================================
// Overlays
// =============================================================

#[test]
fn crop_overlay_shades_outside_selection() {
    let doc = DocStore::new();
    let camera = Camera::default();
    let crop = CropOverlay::with_rect(Rect::new(0.0, 0.0, 100.0, 100.0), Rect::new(10.0, 10.0, 50.0, 50.0), CommitPolicy::OnConfirm);
    let mut s = scene(&doc, &camera);
    s.crop = Some(&crop);

    let mut r = Recorder::default();
    draw(&mut r, &s).unwrap();
    assert_eq!(r.count(|op| matches!(op, Op::Fill(_, c) if c == CROP_SHADE)), 4);
    assert_eq!(r.count(|op| matches!(op, Op::Stroke(_, st) if st.color == "#FFFFFF")), 1);
}

#[test]
fn caret_drawn_for_edited_text() {
    let mut doc = DocStore::new();
    let id = doc.add(Annotation::new(
        Shape::Text { anchor: pt(0.0, 0.0), content: "abc".into(), text_style: TextStyle::default() },
        Style::default(),
    ));
    let camera = Camera::default();
    let mut s = scene(&doc, &camera);
    s.editing = Some(id);

    let mut r = Recorder::default();
    draw(&mut r, &s).unwrap();
    assert_eq!(r.count(|op| matches!(op, Op::Stroke(_, st) if st.color == SELECTION_COLOR)), 1);
}
