#![allow(clippy::clone_on_copy, clippy::float_cmp)]

use serde_json::json;

use super::*;

fn rect_at(x: f64, y: f64, w: f64, h: f64) -> Annotation {
    Annotation::new(Shape::Rectangle { bounds: Rect::new(x, y, w, h), fill: false }, Style::default())
}

fn arrow(ax: f64, ay: f64, bx: f64, by: f64) -> Annotation {
    Annotation::new(
        Shape::Arrow {
            start: Point::new(ax, ay),
            end: Point::new(bx, by),
            has_start_head: false,
            has_end_head: true,
            head_asset: None,
        },
        Style::default(),
    )
}

fn text(content: &str) -> Annotation {
    Annotation::new(
        Shape::Text { anchor: Point::new(5.0, 5.0), content: content.to_owned(), text_style: TextStyle::default() },
        Style::default(),
    )
}

// =============================================================
// Annotation serde
// =============================================================

#[test]
fn annotation_serializes_flat_with_kind_tag() {
    let a = rect_at(1.0, 2.0, 3.0, 4.0);
    let v = serde_json::to_value(&a).unwrap();
    assert_eq!(v["kind"], "rectangle");
    assert_eq!(v["bounds"], json!({ "x": 1.0, "y": 2.0, "width": 3.0, "height": 4.0 }));
    assert_eq!(v["fill"], false);
    assert_eq!(v["style"]["stroke"], "#E53935");
}

#[test]
fn annotation_deserializes_blur_region() {
    let v = json!({
        "id": "00000000-0000-0000-0000-000000000001",
        "style": { "stroke": "#000", "stroke_width": 1.0, "opacity": 1.0 },
        "kind": "blur_region",
        "bounds": { "x": 0.0, "y": 0.0, "width": 20.0, "height": 10.0 },
        "effect": "pixelate",
        "intensity": 8.0
    });
    let a: Annotation = serde_json::from_value(v).unwrap();
    assert_eq!(a.kind(), AnnotationKind::BlurRegion);
    assert_eq!(a.rotation, 0.0);
    assert!(matches!(a.shape, Shape::BlurRegion { effect: BlurKind::Pixelate, .. }));
}

#[test]
fn annotation_unknown_kind_rejected() {
    let v = json!({
        "id": "00000000-0000-0000-0000-000000000001",
        "style": { "stroke": "#000", "stroke_width": 1.0, "opacity": 1.0 },
        "kind": "hexagon"
    });
    assert!(serde_json::from_value::<Annotation>(v).is_err());
}

#[test]
fn new_clamps_opacity() {
    let style = Style { opacity: 3.0, ..Style::default() };
    let a = Annotation::new(Shape::Freehand { points: vec![] }, style);
    assert_eq!(a.style.opacity, 1.0);
}

// =============================================================
// Annotation geometry
// =============================================================

#[test]
fn anchor_per_variant() {
    assert_eq!(rect_at(4.0, 6.0, 10.0, 10.0).anchor(), Point::new(4.0, 6.0));
    assert_eq!(arrow(1.0, 2.0, 30.0, 40.0).anchor(), Point::new(1.0, 2.0));
    assert_eq!(text("hi").anchor(), Point::new(5.0, 5.0));
    let empty_path = Annotation::new(Shape::Freehand { points: vec![] }, Style::default());
    assert_eq!(empty_path.anchor(), Point::default());
}

#[test]
fn translate_moves_all_points() {
    let mut a = Annotation::new(
        Shape::Freehand { points: vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0)] },
        Style::default(),
    );
    a.translate(10.0, -2.0);
    let Shape::Freehand { points } = &a.shape else { unreachable!() };
    assert_eq!(points, &vec![Point::new(10.0, -2.0), Point::new(15.0, 3.0)]);
}

#[test]
fn remap_scales_rectangle_into_target_box() {
    let mut a = rect_at(10.0, 10.0, 100.0, 50.0);
    a.remap(&Rect::new(10.0, 10.0, 100.0, 50.0), &Rect::new(10.0, 10.0, 200.0, 25.0));
    assert_eq!(a.shape, Shape::Rectangle { bounds: Rect::new(10.0, 10.0, 200.0, 25.0), fill: false });
}

#[test]
fn remap_flat_axis_only_translates() {
    let mut a = arrow(0.0, 5.0, 100.0, 5.0);
    a.remap(&Rect::new(0.0, 5.0, 100.0, 0.0), &Rect::new(0.0, 8.0, 50.0, 30.0));
    let Shape::Arrow { start, end, .. } = a.shape else { unreachable!() };
    assert_eq!(start, Point::new(0.0, 8.0));
    assert_eq!(end, Point::new(50.0, 8.0));
}

#[test]
fn remap_scales_font_with_height() {
    let mut a = text("hello");
    a.remap(&Rect::new(5.0, 5.0, 60.0, 25.0), &Rect::new(5.0, 5.0, 120.0, 50.0));
    let Shape::Text { text_style, .. } = a.shape else { unreachable!() };
    assert_eq!(text_style.font_size, 40.0);
}

#[test]
fn degenerate_detection() {
    assert!(rect_at(0.0, 0.0, 4.0, 100.0).is_degenerate(5.0));
    assert!(!rect_at(0.0, 0.0, 5.0, 5.0).is_degenerate(5.0));
    assert!(arrow(0.0, 0.0, 3.0, 0.0).is_degenerate(5.0));
    assert!(text("   ").is_degenerate(5.0));
    let dot = Annotation::new(Shape::Freehand { points: vec![Point::new(1.0, 1.0)] }, Style::default());
    assert!(dot.is_degenerate(5.0));
}

// =============================================================
// AnnotationPatch
// =============================================================

#[test]
fn patch_reports_change_and_clamps_opacity() {
    let mut a = rect_at(0.0, 0.0, 10.0, 10.0);
    let patch = AnnotationPatch { opacity: Some(-1.0), fill: Some(true), ..Default::default() };
    assert!(patch.apply_to(&mut a));
    assert_eq!(a.style.opacity, 0.0);
    assert!(matches!(a.shape, Shape::Rectangle { fill: true, .. }));
}

#[test]
fn patch_with_same_values_is_no_change() {
    let mut a = rect_at(0.0, 0.0, 10.0, 10.0);
    let patch = AnnotationPatch { fill: Some(false), stroke: Some("#E53935".into()), ..Default::default() };
    assert!(!patch.apply_to(&mut a));
}

#[test]
fn patch_ignores_fields_of_other_variants() {
    let mut a = arrow(0.0, 0.0, 50.0, 0.0);
    let patch = AnnotationPatch { fill: Some(true), bold: Some(true), ..Default::default() };
    assert!(!patch.apply_to(&mut a));
}

#[test]
fn patch_text_style_flags() {
    let mut a = text("x");
    let patch = AnnotationPatch { bold: Some(true), underline: Some(true), ..Default::default() };
    assert!(patch.apply_to(&mut a));
    let Shape::Text { text_style, .. } = a.shape else { unreachable!() };
    assert!(text_style.bold);
    assert!(!text_style.italic);
    assert!(text_style.underline);
}

#[test]
fn patch_rotation_is_normalized() {
    let mut a = rect_at(0.0, 0.0, 10.0, 10.0);
    AnnotationPatch { rotation: Some(-90.0), ..Default::default() }.apply_to(&mut a);
    assert_eq!(a.rotation, 270.0);
}

// =============================================================
// DocStore
// =============================================================

#[test]
fn add_appends_in_paint_order() {
    let mut doc = DocStore::new();
    let a = doc.add(rect_at(0.0, 0.0, 10.0, 10.0));
    let b = doc.add(rect_at(5.0, 5.0, 10.0, 10.0));
    let ids: Vec<_> = doc.annotations().iter().map(|x| x.id).collect();
    assert_eq!(ids, vec![a, b]);
    assert!(doc.is_dirty());
}

#[test]
fn add_with_colliding_id_gets_fresh_id() {
    let mut doc = DocStore::new();
    let a = rect_at(0.0, 0.0, 10.0, 10.0);
    let copy = a.clone();
    let first = doc.add(a);
    let second = doc.add(copy);
    assert_ne!(first, second);
    assert_eq!(doc.len(), 2);
}

#[test]
fn remove_clears_matching_selection() {
    let mut doc = DocStore::new();
    let a = doc.add(rect_at(0.0, 0.0, 10.0, 10.0));
    assert!(doc.select(Some(a)));
    assert!(doc.remove(&a).is_some());
    assert!(doc.selected().is_none());
    assert!(doc.remove(&a).is_none());
}

#[test]
fn remove_keeps_other_selection() {
    let mut doc = DocStore::new();
    let a = doc.add(rect_at(0.0, 0.0, 10.0, 10.0));
    let b = doc.add(rect_at(0.0, 0.0, 10.0, 10.0));
    doc.select(Some(b));
    doc.remove(&a);
    assert_eq!(doc.selected(), Some(b));
}

#[test]
fn select_unknown_id_is_ignored() {
    let mut doc = DocStore::new();
    assert!(!doc.select(Some(Uuid::new_v4())));
    assert!(doc.selected().is_none());
    assert!(doc.select(None));
}

#[test]
fn update_marks_dirty_only_on_change() {
    let mut doc = DocStore::new();
    let a = doc.add(rect_at(0.0, 0.0, 10.0, 10.0));
    doc.take_dirty();
    assert!(!doc.update(&a, &AnnotationPatch::default()));
    assert!(!doc.is_dirty());
    assert!(doc.update(&a, &AnnotationPatch { stroke_width: Some(9.0), ..Default::default() }));
    assert!(doc.is_dirty());
    assert_eq!(doc.get(&a).unwrap().style.stroke_width, 9.0);
}

#[test]
fn duplicate_offsets_and_appends() {
    let mut doc = DocStore::new();
    let a = doc.add(rect_at(10.0, 10.0, 20.0, 20.0));
    let b = doc.duplicate(&a, 10.0).unwrap();
    assert_ne!(a, b);
    assert_eq!(doc.get(&b).unwrap().anchor(), Point::new(20.0, 20.0));
    assert_eq!(doc.annotations().last().unwrap().id, b);
    assert!(doc.duplicate(&Uuid::new_v4(), 10.0).is_none());
}

#[test]
fn bring_to_front_and_send_to_back_reorder() {
    let mut doc = DocStore::new();
    let a = doc.add(rect_at(0.0, 0.0, 1.0, 1.0));
    let b = doc.add(rect_at(0.0, 0.0, 1.0, 1.0));
    let c = doc.add(rect_at(0.0, 0.0, 1.0, 1.0));
    assert!(doc.bring_to_front(&a));
    assert!(!doc.bring_to_front(&a));
    let ids: Vec<_> = doc.annotations().iter().map(|x| x.id).collect();
    assert_eq!(ids, vec![b, c, a]);
    assert!(doc.send_to_back(&c));
    let ids: Vec<_> = doc.annotations().iter().map(|x| x.id).collect();
    assert_eq!(ids, vec![c, b, a]);
}

#[test]
fn restore_drops_stale_selection() {
    let mut doc = DocStore::new();
    let before = doc.snapshot();
    let a = doc.add(rect_at(0.0, 0.0, 10.0, 10.0));
    doc.select(Some(a));
    doc.restore(before);
    assert!(doc.is_empty());
    assert!(doc.selected().is_none());
}

#[test]
fn clear_reports_whether_anything_was_removed() {
    let mut doc = DocStore::new();
    assert!(!doc.clear());
    doc.add(rect_at(0.0, 0.0, 10.0, 10.0));
    assert!(doc.clear());
    assert!(doc.is_empty());
}

#[test]
fn replace_keeps_position() {
    let mut doc = DocStore::new();
    let a = doc.add(rect_at(0.0, 0.0, 10.0, 10.0));
    let b = doc.add(rect_at(0.0, 0.0, 10.0, 10.0));
    let mut moved = doc.get(&a).unwrap().clone();
    moved.translate(3.0, 3.0);
    assert!(doc.replace(moved));
    assert_eq!(doc.annotations()[0].id, a);
    assert_eq!(doc.annotations()[1].id, b);
    assert_eq!(doc.get(&a).unwrap().anchor(), Point::new(3.0, 3.0));
}
