//! Image loading and compositing utilities

use crate::Result;
use anyhow::Context;
use image::{imageops, DynamicImage, ImageFormat, Rgba, RgbaImage};
use platewatch_core::{Dimensions, DisplayTransform};
use std::io::Cursor;
use std::path::Path;

/// Image utility functions used around the overlay renderer
pub struct ImageUtils;

impl ImageUtils {
    /// Load an image from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        image::open(&path).with_context(|| format!("Failed to open image: {:?}", path.as_ref()))
    }

    /// Decode an in-memory JPEG/PNG
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(bytes).context("Failed to decode image bytes")
    }

    /// Natural size of the image
    pub fn dimensions(image: &DynamicImage) -> Dimensions {
        Dimensions::new(image.width() as f64, image.height() as f64)
    }

    /// Encode as JPEG for upload to the recognition service
    pub fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image.to_rgb8())
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
            .context("Failed to encode JPEG")?;
        Ok(bytes)
    }

    /// Draw `image` contain-scaled into a black `container`-sized canvas,
    /// the way the dashboard shows media behind the overlay.
    pub fn letterbox(
        image: &DynamicImage,
        transform: &DisplayTransform,
        container: (u32, u32),
    ) -> RgbaImage {
        let mut canvas = RgbaImage::from_pixel(container.0, container.1, Rgba([0, 0, 0, 255]));
        let content = transform.content_rect(Self::dimensions(image));

        let width = content.width.round().max(1.0) as u32;
        let height = content.height.round().max(1.0) as u32;
        let scaled =
            imageops::resize(&image.to_rgba8(), width, height, imageops::FilterType::Triangle);

        imageops::overlay(
            &mut canvas,
            &scaled,
            content.x.round() as i64,
            content.y.round() as i64,
        );
        canvas
    }

    /// Alpha-blend `overlay` on top of `base`
    pub fn composite(base: &mut RgbaImage, overlay: &RgbaImage) {
        imageops::overlay(base, overlay, 0, 0);
    }

    /// Save, creating parent directories as needed
    pub fn save<P: AsRef<Path>>(image: &RgbaImage, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        image
            .save(path)
            .with_context(|| format!("Failed to save image: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platewatch_core::compute_display_transform;

    #[test]
    fn test_letterbox_places_content() -> Result<()> {
        let red = RgbaImage::from_pixel(100, 50, Rgba([255, 0, 0, 255]));
        let source = DynamicImage::ImageRgba8(red);
        let container = Dimensions::new(200.0, 200.0);
        let transform = compute_display_transform(ImageUtils::dimensions(&source), container)?;

        let canvas = ImageUtils::letterbox(&source, &transform, (200, 200));
        assert_eq!(canvas.dimensions(), (200, 200));
        // 100x50 scaled by 2 sits between y=50 and y=150
        assert_eq!(*canvas.get_pixel(100, 10), Rgba([0, 0, 0, 255]));
        assert_eq!(*canvas.get_pixel(100, 100), Rgba([255, 0, 0, 255]));
        assert_eq!(*canvas.get_pixel(100, 190), Rgba([0, 0, 0, 255]));
        Ok(())
    }

    #[test]
    fn test_composite_keeps_transparent_areas() {
        let mut base = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        let mut overlay = RgbaImage::new(4, 4);
        overlay.put_pixel(1, 1, Rgba([255, 255, 255, 255]));

        ImageUtils::composite(&mut base, &overlay);
        assert_eq!(*base.get_pixel(0, 0), Rgba([10, 20, 30, 255]));
        assert_eq!(*base.get_pixel(1, 1), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_jpeg_round_trip_keeps_size() -> Result<()> {
        let image = DynamicImage::ImageRgba8(RgbaImage::new(32, 16));
        let bytes = ImageUtils::encode_jpeg(&image)?;
        let decoded = ImageUtils::decode(&bytes)?;
        assert_eq!(ImageUtils::dimensions(&decoded), Dimensions::new(32.0, 16.0));
        Ok(())
    }
}
