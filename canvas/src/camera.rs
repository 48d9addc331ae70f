#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::{Deserialize, Serialize};

/// A point in either screen or image space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// This point shifted by `(dx, dy)`.
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// View transform between the displayed canvas and the captured image.
///
/// `pan_x` / `pan_y` are in CSS pixels.
/// `zoom` is CSS pixels per image pixel (1.0 = image shown at natural size).
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self { pan_x: 0.0, pan_y: 0.0, zoom: 1.0 }
    }
}

impl Camera {
    /// Convert a screen-space point (CSS pixels) to image coordinates.
    #[must_use]
    pub fn screen_to_image(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.pan_x) / self.zoom,
            y: (screen.y - self.pan_y) / self.zoom,
        }
    }

    /// Convert an image-space point to screen coordinates (CSS pixels).
    #[must_use]
    pub fn image_to_screen(&self, image: Point) -> Point {
        Point {
            x: image.x * self.zoom + self.pan_x,
            y: image.y * self.zoom + self.pan_y,
        }
    }

    /// Convert a screen-space distance (pixels) to an image-space distance.
    #[must_use]
    pub fn screen_dist_to_image(&self, screen_dist: f64) -> f64 {
        screen_dist / self.zoom
    }

    /// Fit an image of `image_w` x `image_h` inside a viewport, centered,
    /// never upscaling beyond natural size.
    #[must_use]
    pub fn fit(image_w: f64, image_h: f64, viewport_w: f64, viewport_h: f64) -> Self {
        if image_w <= 0.0 || image_h <= 0.0 || viewport_w <= 0.0 || viewport_h <= 0.0 {
            return Self::default();
        }
        let zoom = (viewport_w / image_w).min(viewport_h / image_h).min(1.0);
        Self {
            pan_x: (viewport_w - image_w * zoom) * 0.5,
            pan_y: (viewport_h - image_h * zoom) * 0.5,
            zoom,
        }
    }
}
