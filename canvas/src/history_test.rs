use super::*;
use crate::camera::Point;
use crate::doc::{DocStore, Shape, Style};
use crate::geom::Rect;

fn rect(x: f64) -> Annotation {
    Annotation::new(Shape::Rectangle { bounds: Rect::new(x, 0.0, 10.0, 10.0), fill: false }, Style::default())
}

/// Commit `n` rectangles the way the editor does: snapshot before, then add.
fn commit_rects(doc: &mut DocStore, history: &mut History, n: usize) {
    for i in 0..n {
        history.push(doc.snapshot());
        #[allow(clippy::cast_precision_loss)]
        doc.add(rect(i as f64 * 20.0));
    }
}

#[test]
fn empty_history_cannot_undo_or_redo() {
    let mut h = History::new();
    assert!(!h.can_undo());
    assert!(!h.can_redo());
    assert!(h.undo(vec![]).is_none());
    assert!(h.redo(vec![]).is_none());
    assert!(!h.can_redo());
}

#[test]
fn undo_restores_previous_and_enables_redo() {
    let mut doc = DocStore::new();
    let mut h = History::new();
    commit_rects(&mut doc, &mut h, 1);
    assert_eq!(doc.len(), 1);

    let prev = h.undo(doc.snapshot()).unwrap();
    doc.restore(prev);
    assert!(doc.is_empty());
    assert!(h.can_redo());

    let next = h.redo(doc.snapshot()).unwrap();
    doc.restore(next);
    assert_eq!(doc.len(), 1);
    assert!(h.can_undo());
    assert!(!h.can_redo());
}

#[test]
fn push_clears_redo() {
    let mut doc = DocStore::new();
    let mut h = History::new();
    commit_rects(&mut doc, &mut h, 2);
    let prev = h.undo(doc.snapshot()).unwrap();
    doc.restore(prev);
    assert!(h.can_redo());
    commit_rects(&mut doc, &mut h, 1);
    assert!(!h.can_redo());
}

#[test]
fn undo_all_then_redo_all_restores_sequence() {
    let mut doc = DocStore::new();
    let mut h = History::new();
    commit_rects(&mut doc, &mut h, 5);
    let id = doc.annotations()[2].id;
    h.push(doc.snapshot());
    doc.translate(&id, 3.0, 4.0);
    let original = doc.snapshot();

    while let Some(prev) = h.undo(doc.snapshot()) {
        doc.restore(prev);
    }
    assert!(doc.is_empty());
    while let Some(next) = h.redo(doc.snapshot()) {
        doc.restore(next);
    }
    assert_eq!(doc.snapshot(), original);
    assert_eq!(doc.get(&id).unwrap().anchor(), Point::new(43.0, 4.0));
}

#[test]
fn capacity_evicts_oldest() {
    let mut doc = DocStore::new();
    let mut h = History::with_limit(50);
    commit_rects(&mut doc, &mut h, 51);
    assert_eq!(h.undo_len(), 50);

    for _ in 0..50 {
        let prev = h.undo(doc.snapshot()).unwrap();
        doc.restore(prev);
    }
    // The first commit fell off the bottom of the stack.
    assert_eq!(doc.len(), 1);
    assert!(h.undo(doc.snapshot()).is_none());
    assert_eq!(doc.len(), 1);
    assert_eq!(h.redo_len(), 50);
}

#[test]
fn clear_drops_both_stacks() {
    let mut doc = DocStore::new();
    let mut h = History::new();
    commit_rects(&mut doc, &mut h, 2);
    let prev = h.undo(doc.snapshot()).unwrap();
    doc.restore(prev);
    h.clear();
    assert!(!h.can_undo());
    assert!(!h.can_redo());
}

#[test]
fn zero_limit_keeps_one_step() {
    let mut h = History::with_limit(0);
    h.push(vec![]);
    h.push(vec![rect(0.0)]);
    assert_eq!(h.undo_len(), 1);
}
