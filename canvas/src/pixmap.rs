//! Software backend: [`Surface`] over a `tiny_skia::Pixmap`.
//!
//! Used for raster export and headless rendering. Text is drawn with the
//! built-in 8x8 bitmap font scaled to the glyph cell the layout code assumes,
//! so exported text lines up with hit-testing and selection boxes.

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

#[cfg(test)]
#[path = "pixmap_test.rs"]
mod pixmap_test;

use std::collections::HashMap;

use font8x8::{BASIC_FONTS, UnicodeFonts};
use tiny_skia as sk;

use crate::camera::Point;
use crate::consts::GLYPH_WIDTH_RATIO;
use crate::geom::Rect;
use crate::raster::Bitmap;
use crate::render::{Font, Path, PathOp, RenderError, Stroke, Surface};

/// Horizontal shear per glyph row for italic text, as a fraction of the font size.
const ITALIC_SHEAR: f64 = 0.025;

/// Glyph pixel widening for bold text.
const BOLD_WIDEN: f64 = 1.6;

/// Save/restore state.
#[derive(Clone)]
struct State {
    transform: sk::Transform,
    alpha: f64,
    clip: Option<sk::Mask>,
}

impl Default for State {
    fn default() -> Self {
        Self { transform: sk::Transform::identity(), alpha: 1.0, clip: None }
    }
}

/// Offscreen RGBA canvas.
pub struct PixmapSurface {
    pixmap: sk::Pixmap,
    state: State,
    stack: Vec<State>,
    assets: HashMap<String, Bitmap>,
}

impl PixmapSurface {
    /// Transparent surface of `width` x `height` pixels.
    ///
    /// # Errors
    ///
    /// Returns an error when either dimension is zero.
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        let pixmap = sk::Pixmap::new(width, height)
            .ok_or_else(|| RenderError::Surface(format!("cannot allocate {width}x{height} pixmap")))?;
        Ok(Self { pixmap, state: State::default(), stack: Vec::new(), assets: HashMap::new() })
    }

    /// Make an arrowhead image available to [`Surface::draw_asset`].
    pub fn add_asset(&mut self, name: &str, bitmap: Bitmap) {
        self.assets.insert(name.to_owned(), bitmap);
    }

    /// The painted pixels as a straight-alpha bitmap.
    ///
    /// # Errors
    ///
    /// Propagates a buffer size mismatch from [`Bitmap::from_rgba`].
    pub fn into_bitmap(self) -> Result<Bitmap, RenderError> {
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        let mut data = Vec::with_capacity(self.pixmap.data().len());
        for p in self.pixmap.pixels() {
            let c = p.demultiply();
            data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        Ok(Bitmap::from_rgba(width, height, data)?)
    }

    fn paint(&self, color: &str) -> sk::Paint<'static> {
        let [r, g, b, a] = parse_color(color).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "pixmap: using black");
            [0, 0, 0, 255]
        });
        let mut paint = sk::Paint::default();
        paint.set_color_rgba8(r, g, b, (f64::from(a) * self.state.alpha).round() as u8);
        paint.anti_alias = true;
        paint
    }

    fn blit(&mut self, bitmap: &Bitmap, transform: sk::Transform, quality: sk::FilterQuality) -> Result<(), RenderError> {
        let source = to_pixmap(bitmap)?;
        let paint = sk::PixmapPaint { opacity: self.state.alpha as f32, quality, ..sk::PixmapPaint::default() };
        self.pixmap.draw_pixmap(0, 0, source.as_ref(), &paint, transform, self.state.clip.as_ref());
        Ok(())
    }
}

impl Surface for PixmapSurface {
    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn reset(&mut self, _width: f64, _height: f64, dpr: f64) -> Result<(), RenderError> {
        self.pixmap.fill(sk::Color::TRANSPARENT);
        self.stack.clear();
        self.state = State { transform: sk::Transform::from_scale(dpr as f32, dpr as f32), ..State::default() };
        Ok(())
    }

    fn translate(&mut self, dx: f64, dy: f64) -> Result<(), RenderError> {
        self.state.transform = self.state.transform.pre_translate(dx as f32, dy as f32);
        Ok(())
    }

    fn rotate(&mut self, radians: f64) -> Result<(), RenderError> {
        let rotation = sk::Transform::from_rotate(radians.to_degrees() as f32);
        self.state.transform = self.state.transform.pre_concat(rotation);
        Ok(())
    }

    fn scale(&mut self, sx: f64, sy: f64) -> Result<(), RenderError> {
        self.state.transform = self.state.transform.pre_scale(sx as f32, sy as f32);
        Ok(())
    }

    fn set_alpha(&mut self, alpha: f64) {
        self.state.alpha *= alpha.clamp(0.0, 1.0);
    }

    fn stroke_path(&mut self, path: &Path, stroke: &Stroke) -> Result<(), RenderError> {
        let Some(path) = to_sk_path(path) else {
            return Ok(());
        };
        let dash = if stroke.dash.is_empty() {
            None
        } else {
            sk::StrokeDash::new(stroke.dash.iter().map(|d| *d as f32).collect(), 0.0)
        };
        let sk_stroke = sk::Stroke {
            width: stroke.width as f32,
            line_cap: sk::LineCap::Round,
            line_join: sk::LineJoin::Round,
            dash,
            ..sk::Stroke::default()
        };
        let paint = self.paint(&stroke.color);
        self.pixmap.stroke_path(&path, &paint, &sk_stroke, self.state.transform, self.state.clip.as_ref());
        Ok(())
    }

    fn fill_path(&mut self, path: &Path, color: &str) -> Result<(), RenderError> {
        let Some(path) = to_sk_path(path) else {
            return Ok(());
        };
        let paint = self.paint(color);
        self.pixmap.fill_path(&path, &paint, sk::FillRule::Winding, self.state.transform, self.state.clip.as_ref());
        Ok(())
    }

    fn clip(&mut self, path: &Path) -> Result<(), RenderError> {
        let transform = self.state.transform;
        let Some(path) = to_sk_path(path) else {
            // An empty clip path hides everything after it.
            self.state.clip = sk::Mask::new(self.pixmap.width(), self.pixmap.height());
            return Ok(());
        };
        if let Some(mask) = self.state.clip.as_mut() {
            mask.intersect_path(&path, sk::FillRule::Winding, true, transform);
            return Ok(());
        }
        let mut mask = sk::Mask::new(self.pixmap.width(), self.pixmap.height())
            .ok_or_else(|| RenderError::Surface("cannot allocate clip mask".to_owned()))?;
        mask.fill_path(&path, sk::FillRule::Winding, true, transform);
        self.state.clip = Some(mask);
        Ok(())
    }

    fn fill_text(&mut self, text: &str, at: Point, font: Font, color: &str) -> Result<(), RenderError> {
        let Some(path) = glyph_path(text, at, font) else {
            return Ok(());
        };
        let paint = self.paint(color);
        self.pixmap.fill_path(&path, &paint, sk::FillRule::Winding, self.state.transform, self.state.clip.as_ref());
        Ok(())
    }

    fn draw_bitmap(&mut self, bitmap: &Bitmap, at: Point) -> Result<(), RenderError> {
        let transform = self.state.transform.pre_translate(at.x as f32, at.y as f32);
        self.blit(bitmap, transform, sk::FilterQuality::Nearest)
    }

    fn draw_asset(&mut self, name: &str, dest: Rect) -> Result<bool, RenderError> {
        let Some(bitmap) = self.assets.get(name).cloned() else {
            return Ok(false);
        };
        let sx = dest.width / f64::from(bitmap.width());
        let sy = dest.height / f64::from(bitmap.height());
        let transform = self
            .state
            .transform
            .pre_translate(dest.x as f32, dest.y as f32)
            .pre_scale(sx as f32, sy as f32);
        self.blit(&bitmap, transform, sk::FilterQuality::Bilinear)?;
        Ok(true)
    }
}

fn to_pixmap(bitmap: &Bitmap) -> Result<sk::Pixmap, RenderError> {
    let mut data = Vec::with_capacity(bitmap.as_rgba().len());
    for px in bitmap.as_rgba().chunks_exact(4) {
        let c = sk::ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    let size = sk::IntSize::from_wh(bitmap.width(), bitmap.height())
        .ok_or_else(|| RenderError::Surface("cannot draw an empty bitmap".to_owned()))?;
    sk::Pixmap::from_vec(data, size).ok_or_else(|| RenderError::Surface("bitmap buffer rejected".to_owned()))
}

fn to_sk_path(path: &Path) -> Option<sk::Path> {
    let mut pb = sk::PathBuilder::new();
    for op in &path.ops {
        match op {
            PathOp::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathOp::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathOp::Ellipse { center, rx, ry } => {
                let oval = sk::Rect::from_xywh(
                    (center.x - rx) as f32,
                    (center.y - ry) as f32,
                    (rx * 2.0) as f32,
                    (ry * 2.0) as f32,
                );
                if let Some(oval) = oval {
                    pb.push_oval(oval);
                }
            }
            PathOp::Close => pb.close(),
        }
    }
    pb.finish()
}

/// One rectangle per lit glyph pixel, top-left of the first cell at `at`.
/// Characters missing from the font render as `?`.
fn glyph_path(text: &str, at: Point, font: Font) -> Option<sk::Path> {
    let cell_w = font.size * GLYPH_WIDTH_RATIO;
    let px_w = cell_w / 8.0;
    let px_h = font.size / 8.0;
    let dot_w = if font.bold { px_w * BOLD_WIDEN } else { px_w };
    let shear = if font.italic { font.size * ITALIC_SHEAR } else { 0.0 };

    let mut pb = sk::PathBuilder::new();
    for (idx, ch) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) else {
            continue;
        };
        #[allow(clippy::cast_precision_loss)]
        let x0 = at.x + idx as f64 * cell_w;
        for (row, bits) in glyph.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let row = row as f64;
            let slant = (7.0 - row) * shear;
            for col in 0..8u8 {
                if (*bits >> col) & 1 == 0 {
                    continue;
                }
                let x = x0 + f64::from(col) * px_w + slant;
                let y = at.y + row * px_h;
                if let Some(r) = sk::Rect::from_xywh(x as f32, y as f32, dot_w as f32, px_h as f32) {
                    pb.push_rect(r);
                }
            }
        }
    }
    pb.finish()
}

/// Parse `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(...)` and `rgba(...)`.
///
/// # Errors
///
/// Returns [`RenderError::Color`] for anything else.
pub fn parse_color(s: &str) -> Result<[u8; 4], RenderError> {
    let bad = || RenderError::Color(s.to_owned());
    let trimmed = s.trim();
    if let Some(hex) = trimmed.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(bad);
    }
    let lower = trimmed.to_ascii_lowercase();
    let body = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
        .and_then(|b| b.strip_suffix(')'))
        .ok_or_else(bad)?;
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    if !(3..=4).contains(&parts.len()) {
        return Err(bad());
    }
    let mut out = [0, 0, 0, 255];
    for (slot, part) in out.iter_mut().zip(&parts[..3]) {
        *slot = part.parse::<u8>().map_err(|_| bad())?;
    }
    if let Some(alpha) = parts.get(3) {
        let a = alpha.parse::<f64>().map_err(|_| bad())?;
        out[3] = (a.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
    Ok(out)
}

fn parse_hex(hex: &str) -> Option<[u8; 4]> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let digit = |i: usize| hex.as_bytes().get(i).and_then(|b| char::from(*b).to_digit(16));
    let mut out = [255u8; 4];
    match hex.len() {
        3 | 4 => {
            for (i, slot) in out.iter_mut().enumerate().take(hex.len()) {
                *slot = (digit(i)? * 17) as u8;
            }
        }
        6 | 8 => {
            for (i, slot) in out.iter_mut().enumerate().take(hex.len() / 2) {
                *slot = (digit(i * 2)? * 16 + digit(i * 2 + 1)?) as u8;
            }
        }
        _ => return None,
    }
    Some(out)
}
