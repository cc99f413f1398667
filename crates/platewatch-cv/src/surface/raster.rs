//! RGBA pixel buffer surface backed by `imageproc`.

use crate::overlay::{Color, StrokeStyle, TextStyle};
use crate::traits::DrawingSurface;
use crate::Result;
use ab_glyph::{FontArc, PxScale};
use anyhow::Context;
use image::{ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use platewatch_core::DisplayRect;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Transparent RGBA canvas. Labels need a font; without one they are skipped.
#[derive(Clone)]
pub struct RasterSurface {
    buffer: RgbaImage,
    font: Option<FontArc>,
}

impl RasterSurface {
    pub fn new() -> Self {
        Self {
            buffer: RgbaImage::new(0, 0),
            font: None,
        }
    }

    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    /// Load a TTF/OTF font for labels
    pub fn load_font<P: AsRef<Path>>(path: P) -> Result<FontArc> {
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read font: {:?}", path.as_ref()))?;
        FontArc::try_from_vec(bytes)
            .with_context(|| format!("Invalid font file: {:?}", path.as_ref()))
    }

    pub fn image(&self) -> &RgbaImage {
        &self.buffer
    }

    pub fn into_image(self) -> RgbaImage {
        self.buffer
    }

    /// Whether every pixel is fully transparent
    pub fn is_blank(&self) -> bool {
        self.buffer.pixels().all(|p| p.0[3] == 0)
    }

    /// Encode the current buffer as PNG
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.buffer
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .context("Failed to encode overlay as PNG")?;
        Ok(bytes)
    }
}

impl Default for RasterSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RasterSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterSurface")
            .field("size", &self.buffer.dimensions())
            .field("font", &self.font.is_some())
            .finish()
    }
}

impl DrawingSurface for RasterSurface {
    fn resize(&mut self, width: u32, height: u32) {
        self.buffer = RgbaImage::new(width, height);
    }

    fn clear(&mut self) {
        let transparent = to_rgba(Color::TRANSPARENT);
        self.buffer.pixels_mut().for_each(|p| *p = transparent);
    }

    fn size(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    fn stroke_rect(&mut self, rect: DisplayRect, style: &StrokeStyle) {
        let color = to_rgba(style.color);
        let passes = style.width.round().clamp(1.0, 256.0) as i64;

        // edges beyond the buffer are pinned just outside it, so they stay
        // invisible and the integer math below cannot overflow
        let (buffer_width, buffer_height) = self.buffer.dimensions();
        let margin = (passes + 1) as f64;
        let pin = |v: f64, limit: u32| v.round().clamp(-margin, limit as f64 + margin) as i64;
        let left = pin(rect.x, buffer_width);
        let top = pin(rect.y, buffer_height);
        let right = pin(rect.right(), buffer_width);
        let bottom = pin(rect.bottom(), buffer_height);

        // the stroke is centered on the path, like a canvas strokeRect
        for pass in 0..passes {
            let inset = pass - passes / 2;
            let width = (right - left - 2 * inset).max(1) as u32;
            let height = (bottom - top - 2 * inset).max(1) as u32;
            let outline =
                Rect::at((left + inset) as i32, (top + inset) as i32).of_size(width, height);
            draw_hollow_rect_mut(&mut self.buffer, outline, color);
        }
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, style: &TextStyle) {
        let Some(font) = &self.font else {
            debug!(text, "no font loaded, label not rasterized");
            return;
        };
        if text.is_empty() {
            return;
        }

        // imageproc positions text by its top edge
        let top = (y - style.size as f64).round() as i32;
        draw_text_mut(
            &mut self.buffer,
            to_rgba(style.color),
            x.round() as i32,
            top,
            PxScale::from(style.size),
            font,
            text,
        );
    }
}

fn to_rgba(color: Color) -> Rgba<u8> {
    Rgba(color.0)
}
