//! Raster side of the editor: the captured background bitmap and the blur /
//! pixelate filters behind `BlurRegion` annotations.
//!
//! The background is never modified by rendering. Effects are computed as
//! patches sampled from the original pixels and painted over it.

#[cfg(test)]
#[path = "raster_test.rs"]
mod raster_test;

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage, imageops};

use crate::doc::BlurKind;
use crate::geom::Rect;

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("pixel buffer of {len} bytes does not match {width}x{height} RGBA")]
    BufferSize { width: u32, height: u32, len: usize },
    #[error("image decode failed: {0}")]
    Decode(String),
    #[error("PNG encoding failed: {0}")]
    Encode(String),
    #[error("crop rectangle does not overlap the image")]
    EmptyCrop,
}

/// An effect patch to paint at `(x, y)` in image pixels.
#[derive(Debug, Clone)]
pub struct Patch {
    pub x: u32,
    pub y: u32,
    pub bitmap: Bitmap,
}

/// RGBA8 image.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    image: RgbaImage,
}

impl Bitmap {
    /// Fully transparent bitmap.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { image: RgbaImage::new(width, height) }
    }

    /// Bitmap filled with one color.
    #[must_use]
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self { image: RgbaImage::from_pixel(width, height, Rgba(rgba)) }
    }

    /// Wrap a row-major RGBA buffer, as delivered by a capture.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer length is not `width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RasterError> {
        let len = data.len();
        RgbaImage::from_raw(width, height, data)
            .map(|image| Self { image })
            .ok_or(RasterError::BufferSize { width, height, len })
    }

    /// Decode PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a decodable PNG.
    pub fn decode_png(bytes: &[u8]) -> Result<Self, RasterError> {
        let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Png)
            .map_err(|e| RasterError::Decode(e.to_string()))?;
        Ok(Self { image: decoded.to_rgba8() })
    }

    /// Encode as PNG.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder fails (e.g. a zero-sized image).
    pub fn encode_png(&self) -> Result<Vec<u8>, RasterError> {
        let mut bytes = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| RasterError::Encode(e.to_string()))?;
        Ok(bytes)
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Row-major RGBA bytes.
    #[must_use]
    pub fn as_rgba(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Pixel at `(x, y)`, or `None` outside the image.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.image.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Image bounds as a rect at the origin.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width()), f64::from(self.height()))
    }

    /// Copy of the region covered by `rect`, clipped to the image.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::EmptyCrop`] when the clipped region is empty.
    pub fn crop(&self, rect: &Rect) -> Result<Self, RasterError> {
        let (x, y, w, h) = self.pixel_bounds(rect).ok_or(RasterError::EmptyCrop)?;
        Ok(Self { image: imageops::crop_imm(&self.image, x, y, w, h).to_image() })
    }

    /// Filtered copy of the region under `bounds`, clipped to the image.
    /// `intensity` is the Gaussian sigma for blur and the block size for
    /// pixelate. `None` if the region misses the image.
    #[must_use]
    pub fn effect_patch(&self, bounds: &Rect, kind: BlurKind, intensity: f64) -> Option<Patch> {
        let (x, y, w, h) = self.pixel_bounds(bounds)?;
        let region = imageops::crop_imm(&self.image, x, y, w, h).to_image();
        let filtered = match kind {
            #[allow(clippy::cast_possible_truncation)]
            BlurKind::Blur => imageops::blur(&region, intensity.max(0.5) as f32),
            BlurKind::Pixelate => pixelate(&region, block_size(intensity)),
        };
        Some(Patch { x, y, bitmap: Self { image: filtered } })
    }

    /// Integer pixel bounds of `rect` clipped to the image, outward-rounded.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn pixel_bounds(&self, rect: &Rect) -> Option<(u32, u32, u32, u32)> {
        let clipped = rect.intersect(&self.bounds())?;
        let x0 = clipped.x.floor().max(0.0) as u32;
        let y0 = clipped.y.floor().max(0.0) as u32;
        let x1 = (clipped.right().ceil() as u32).min(self.width());
        let y1 = (clipped.bottom().ceil() as u32).min(self.height());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0, y0, x1 - x0, y1 - y0))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn block_size(intensity: f64) -> u32 {
    intensity.round().max(1.0) as u32
}

/// Replace each `block` x `block` cell with its average color.
fn pixelate(src: &RgbaImage, block: u32) -> RgbaImage {
    let (w, h) = src.dimensions();
    let mut out = RgbaImage::new(w, h);
    for by in (0..h).step_by(block as usize) {
        for bx in (0..w).step_by(block as usize) {
            let bw = block.min(w - bx);
            let bh = block.min(h - by);
            let mut sum = [0u64; 4];
            for y in by..by + bh {
                for x in bx..bx + bw {
                    for (acc, c) in sum.iter_mut().zip(src.get_pixel(x, y).0) {
                        *acc += u64::from(c);
                    }
                }
            }
            let count = u64::from(bw) * u64::from(bh);
            #[allow(clippy::cast_possible_truncation)]
            let avg = Rgba(sum.map(|s| (s / count) as u8));
            for y in by..by + bh {
                for x in bx..bx + bw {
                    out.put_pixel(x, y, avg);
                }
            }
        }
    }
    out
}
