//! Contain-scaling from source media space onto a display container.
//!
//! Every overlay coordinate goes through [`DisplayTransform`]. Character boxes
//! are re-based onto their plate box in source space first and then mapped with
//! the same transform as the plate, so both tiers can never drift apart.

use crate::bbox::BoundingBox;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Width and height in pixels. Fractional values are allowed for containers.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both sides known and positive.
    pub fn is_ready(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width as f64, height as f64)
    }
}

/// Which side of the mapping is missing its size.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum NotReady {
    #[error("source dimensions unknown ({width}x{height})")]
    Source { width: f64, height: f64 },
    #[error("container dimensions unknown ({width}x{height})")]
    Container { width: f64, height: f64 },
}

/// Rectangle in display (container) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DisplayRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DisplayRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Uniform scale followed by a centering offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayTransform {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl DisplayTransform {
    pub fn map_point(&self, x: f64, y: f64) -> (f64, f64) {
        (self.offset_x + x * self.scale, self.offset_y + y * self.scale)
    }

    /// Map an absolute source box.
    pub fn map_box(&self, bbox: &BoundingBox) -> DisplayRect {
        let (x, y) = self.map_point(bbox.x_min, bbox.y_min);
        DisplayRect::new(x, y, bbox.width() * self.scale, bbox.height() * self.scale)
    }

    /// Map a box given relative to `outer`'s minimum corner.
    pub fn map_child_box(&self, outer: &BoundingBox, child: &BoundingBox) -> DisplayRect {
        self.map_box(&child.translate(outer.x_min, outer.y_min))
    }

    /// Area covered by the scaled media inside the container.
    pub fn content_rect(&self, source: Dimensions) -> DisplayRect {
        DisplayRect::new(
            self.offset_x,
            self.offset_y,
            source.width * self.scale,
            source.height * self.scale,
        )
    }
}

/// Compute the contain transform for `source` shown inside `container`.
pub fn compute_display_transform(
    source: Dimensions,
    container: Dimensions,
) -> Result<DisplayTransform, NotReady> {
    if !source.is_ready() {
        return Err(NotReady::Source {
            width: source.width,
            height: source.height,
        });
    }
    if !container.is_ready() {
        return Err(NotReady::Container {
            width: container.width,
            height: container.height,
        });
    }

    let scale = (container.width / source.width).min(container.height / source.height);

    Ok(DisplayTransform {
        scale,
        offset_x: (container.width - source.width * scale) / 2.0,
        offset_y: (container.height - source.height * scale) / 2.0,
    })
}

/// Source media size paired with the container it is shown in.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DisplaySurface {
    pub source: Dimensions,
    pub container: Dimensions,
}

impl DisplaySurface {
    pub fn new(source: Dimensions, container: Dimensions) -> Self {
        Self { source, container }
    }

    pub fn transform(&self) -> Result<DisplayTransform, NotReady> {
        compute_display_transform(self.source, self.container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn transform(source: (f64, f64), container: (f64, f64)) -> Result<DisplayTransform, NotReady> {
        compute_display_transform(
            Dimensions::new(source.0, source.1),
            Dimensions::new(container.0, container.1),
        )
    }

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_pillarbox_offsets() {
        // 4:3 source in a 16:9 container: bars left and right
        let t = transform((640.0, 480.0), (1280.0, 720.0)).unwrap();
        assert!((t.scale - 1.5).abs() < EPSILON);
        assert!((t.offset_x - 160.0).abs() < EPSILON);
        assert_eq!(t.offset_y, 0.0);
    }

    #[test]
    fn test_letterbox_offsets() {
        let t = transform((1920.0, 1080.0), (400.0, 400.0)).unwrap();
        assert!((t.scale - 400.0 / 1920.0).abs() < EPSILON);
        assert_eq!(t.offset_x, 0.0);
        assert!((t.offset_y - (400.0 - 225.0) / 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_not_ready_source_and_container() {
        let err = transform((0.0, 150.0), (400.0, 300.0));
        assert!(matches!(err, Err(NotReady::Source { .. })));

        let err = transform((200.0, f64::NAN), (400.0, 300.0));
        assert!(matches!(err, Err(NotReady::Source { .. })));

        let err = transform((200.0, 150.0), (400.0, 0.0));
        assert!(matches!(err, Err(NotReady::Container { .. })));
    }

    #[test]
    fn test_child_box_composition() {
        let surface =
            DisplaySurface::new(Dimensions::new(200.0, 150.0), Dimensions::new(400.0, 300.0));
        let t = surface.transform().unwrap();
        assert_eq!((t.scale, t.offset_x, t.offset_y), (2.0, 0.0, 0.0));

        let outer = BoundingBox::new(10.0, 10.0, 110.0, 60.0);
        let child = BoundingBox::new(5.0, 5.0, 15.0, 25.0);

        assert_eq!(t.map_box(&outer), DisplayRect::new(20.0, 20.0, 200.0, 100.0));
        assert_eq!(t.map_child_box(&outer, &child), DisplayRect::new(30.0, 30.0, 20.0, 40.0));
    }

    #[test]
    fn test_child_box_with_offset() {
        let t = transform((100.0, 100.0), (300.0, 200.0)).unwrap();
        let outer = BoundingBox::new(20.0, 30.0, 60.0, 50.0);
        let child = BoundingBox::new(2.0, 4.0, 6.0, 8.0);

        let rect = t.map_child_box(&outer, &child);
        let (x, y) = t.map_point(22.0, 34.0);
        assert_eq!((rect.x, rect.y), (x, y));
        assert!((rect.width - 8.0).abs() < EPSILON);
        assert!((rect.height - 8.0).abs() < EPSILON);
    }

    #[test]
    fn test_contain_properties_random() {
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let source = Dimensions::new(rng.gen_range(1.0..5000.0), rng.gen_range(1.0..5000.0));
            let container = Dimensions::new(rng.gen_range(1.0..3000.0), rng.gen_range(1.0..3000.0));
            let t = compute_display_transform(source, container).unwrap();

            assert!(t.scale.is_finite() && t.scale > 0.0);
            assert!(source.width * t.scale <= container.width + 1e-6);
            assert!(source.height * t.scale <= container.height + 1e-6);
            assert!(
                t.scale * source.width.max(source.height)
                    <= container.width.max(container.height) + 1e-6
            );
            assert!(t.offset_x >= -1e-6 && t.offset_y >= -1e-6);
            // one axis is always filled exactly
            assert!(t.offset_x.abs() < 1e-6 || t.offset_y.abs() < 1e-6);

            let content = t.content_rect(source);
            assert!((content.x + content.right() - container.width).abs() < 1e-6);
            assert!((content.y + content.bottom() - container.height).abs() < 1e-6);
        }
    }
}
