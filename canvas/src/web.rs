//! Browser backend: [`Surface`] over a `CanvasRenderingContext2d`.

use std::collections::HashMap;
use std::f64::consts::PI;

use wasm_bindgen::{Clamped, JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, ImageData};

use crate::camera::Point;
use crate::geom::Rect;
use crate::raster::Bitmap;
use crate::render::{Font, Path, PathOp, RenderError, Stroke, Surface};

fn js_err(e: &JsValue) -> RenderError {
    RenderError::Surface(format!("{e:?}"))
}

/// Canvas 2D context plus the arrowhead images the host has loaded.
pub struct CanvasSurface<'a> {
    ctx: &'a CanvasRenderingContext2d,
    assets: &'a HashMap<String, HtmlImageElement>,
}

impl<'a> CanvasSurface<'a> {
    #[must_use]
    pub fn new(ctx: &'a CanvasRenderingContext2d, assets: &'a HashMap<String, HtmlImageElement>) -> Self {
        Self { ctx, assets }
    }

    fn trace(&self, path: &Path) -> Result<(), RenderError> {
        let ctx = self.ctx;
        ctx.begin_path();
        for op in &path.ops {
            match op {
                PathOp::MoveTo(p) => ctx.move_to(p.x, p.y),
                PathOp::LineTo(p) => ctx.line_to(p.x, p.y),
                PathOp::Ellipse { center, rx, ry } => {
                    ctx.move_to(center.x + rx, center.y);
                    ctx.ellipse(center.x, center.y, *rx, *ry, 0.0, 0.0, 2.0 * PI).map_err(|e| js_err(&e))?;
                }
                PathOp::Close => ctx.close_path(),
            }
        }
        Ok(())
    }

    fn set_dash(&self, dash: &[f64]) -> Result<(), RenderError> {
        let dash_array = js_sys::Array::new();
        for d in dash {
            dash_array.push(&(*d).into());
        }
        self.ctx.set_line_dash(&dash_array).map_err(|e| js_err(&e))
    }

    /// Copy the bitmap into an offscreen canvas so it can be drawn under the
    /// current transform (`putImageData` ignores transforms).
    fn offscreen(bitmap: &Bitmap) -> Result<HtmlCanvasElement, RenderError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| RenderError::Surface("no document".to_owned()))?;
        let canvas = document
            .create_element("canvas")
            .map_err(|e| js_err(&e))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|e| js_err(&e))?;
        canvas.set_width(bitmap.width());
        canvas.set_height(bitmap.height());
        let ctx = canvas
            .get_context("2d")
            .map_err(|e| js_err(&e))?
            .ok_or_else(|| RenderError::Surface("offscreen canvas has no 2d context".to_owned()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|e| js_err(&e))?;
        let data = ImageData::new_with_u8_clamped_array_and_sh(Clamped(bitmap.as_rgba()), bitmap.width(), bitmap.height())
            .map_err(|e| js_err(&e))?;
        ctx.put_image_data(&data, 0.0, 0.0).map_err(|e| js_err(&e))?;
        Ok(canvas)
    }
}

impl Surface for CanvasSurface<'_> {
    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    fn reset(&mut self, width: f64, height: f64, dpr: f64) -> Result<(), RenderError> {
        self.ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0).map_err(|e| js_err(&e))?;
        self.ctx.set_global_alpha(1.0);
        self.ctx.clear_rect(0.0, 0.0, width, height);
        self.ctx.set_line_cap("round");
        self.ctx.set_line_join("round");
        self.ctx.set_text_baseline("top");
        Ok(())
    }

    fn translate(&mut self, dx: f64, dy: f64) -> Result<(), RenderError> {
        self.ctx.translate(dx, dy).map_err(|e| js_err(&e))
    }

    fn rotate(&mut self, radians: f64) -> Result<(), RenderError> {
        self.ctx.rotate(radians).map_err(|e| js_err(&e))
    }

    fn scale(&mut self, sx: f64, sy: f64) -> Result<(), RenderError> {
        self.ctx.scale(sx, sy).map_err(|e| js_err(&e))
    }

    fn set_alpha(&mut self, alpha: f64) {
        self.ctx.set_global_alpha(self.ctx.global_alpha() * alpha.clamp(0.0, 1.0));
    }

    fn stroke_path(&mut self, path: &Path, stroke: &Stroke) -> Result<(), RenderError> {
        self.trace(path)?;
        self.ctx.set_stroke_style_str(&stroke.color);
        self.ctx.set_line_width(stroke.width);
        self.set_dash(&stroke.dash)?;
        self.ctx.stroke();
        if !stroke.dash.is_empty() {
            self.set_dash(&[])?;
        }
        Ok(())
    }

    fn fill_path(&mut self, path: &Path, color: &str) -> Result<(), RenderError> {
        self.trace(path)?;
        self.ctx.set_fill_style_str(color);
        self.ctx.fill();
        Ok(())
    }

    fn clip(&mut self, path: &Path) -> Result<(), RenderError> {
        self.trace(path)?;
        self.ctx.clip();
        Ok(())
    }

    fn fill_text(&mut self, text: &str, at: Point, font: Font, color: &str) -> Result<(), RenderError> {
        self.ctx.set_font(&font.css());
        self.ctx.set_fill_style_str(color);
        self.ctx.fill_text(text, at.x, at.y).map_err(|e| js_err(&e))
    }

    fn draw_bitmap(&mut self, bitmap: &Bitmap, at: Point) -> Result<(), RenderError> {
        let canvas = Self::offscreen(bitmap)?;
        self.ctx.draw_image_with_html_canvas_element(&canvas, at.x, at.y).map_err(|e| js_err(&e))
    }

    fn draw_asset(&mut self, name: &str, dest: Rect) -> Result<bool, RenderError> {
        let Some(image) = self.assets.get(name) else {
            return Ok(false);
        };
        if !image.complete() || image.natural_width() == 0 {
            return Ok(false);
        }
        self.ctx
            .draw_image_with_html_image_element_and_dw_and_dh(image, dest.x, dest.y, dest.width, dest.height)
            .map_err(|e| js_err(&e))?;
        Ok(true)
    }
}
