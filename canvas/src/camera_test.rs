#![allow(clippy::clone_on_copy, clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-10;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn point_approx_eq(a: Point, b: Point) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

// --- Point ---

#[test]
fn point_offset_adds_delta() {
    let p = Point::new(3.0, 4.0).offset(-1.0, 2.5);
    assert_eq!(p, Point::new(2.0, 6.5));
}

#[test]
fn point_distance_is_euclidean() {
    assert!(approx_eq(Point::new(0.0, 0.0).distance(Point::new(3.0, 4.0)), 5.0));
}

#[test]
fn point_serde_uses_xy_fields() {
    let json = serde_json::to_value(Point::new(1.5, -2.0)).unwrap();
    assert_eq!(json, serde_json::json!({ "x": 1.5, "y": -2.0 }));
}

// --- Camera defaults ---

#[test]
fn camera_default_is_identity() {
    let cam = Camera::default();
    assert_eq!(cam.pan_x, 0.0);
    assert_eq!(cam.pan_y, 0.0);
    assert_eq!(cam.zoom, 1.0);
    let p = Point::new(17.0, 23.0);
    assert!(point_approx_eq(cam.screen_to_image(p), p));
}

// --- Conversions ---

#[test]
fn screen_to_image_removes_pan_and_zoom() {
    let cam = Camera { pan_x: 100.0, pan_y: 50.0, zoom: 2.0 };
    let img = cam.screen_to_image(Point::new(300.0, 250.0));
    assert!(point_approx_eq(img, Point::new(100.0, 100.0)));
}

#[test]
fn image_to_screen_inverts_screen_to_image() {
    let cam = Camera { pan_x: -12.5, pan_y: 40.0, zoom: 0.75 };
    let screen = Point::new(123.0, -45.0);
    let back = cam.image_to_screen(cam.screen_to_image(screen));
    assert!(point_approx_eq(back, screen));
}

#[test]
fn screen_dist_scales_inversely_with_zoom() {
    let cam = Camera { pan_x: 0.0, pan_y: 0.0, zoom: 4.0 };
    assert!(approx_eq(cam.screen_dist_to_image(8.0), 2.0));
}

// --- Fit ---

#[test]
fn fit_centers_small_image_without_upscaling() {
    let cam = Camera::fit(200.0, 100.0, 800.0, 600.0);
    assert_eq!(cam.zoom, 1.0);
    assert!(approx_eq(cam.pan_x, 300.0));
    assert!(approx_eq(cam.pan_y, 250.0));
}

#[test]
fn fit_shrinks_large_image_to_limiting_axis() {
    let cam = Camera::fit(1600.0, 600.0, 800.0, 600.0);
    assert!(approx_eq(cam.zoom, 0.5));
    assert!(approx_eq(cam.pan_x, 0.0));
    assert!(approx_eq(cam.pan_y, 150.0));
}

#[test]
fn fit_degenerate_sizes_fall_back_to_identity() {
    let cam = Camera::fit(0.0, 100.0, 800.0, 600.0);
    assert_eq!(cam.zoom, 1.0);
    assert_eq!(cam.pan_x, 0.0);
}
