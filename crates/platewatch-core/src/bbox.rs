//! Axis-aligned bounding boxes in source pixel space.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a box cannot be placed on screen.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum BoxError {
    #[error("box has non-finite coordinates")]
    NonFinite,
    #[error("box is inverted (x: {x_min}..{x_max}, y: {y_min}..{y_max})")]
    Inverted {
        x_min: f64,
        y_min: f64,
        x_max: f64,
        y_max: f64,
    },
}

/// Rectangle given by its minimum and maximum corners.
///
/// Outer (plate) boxes are absolute source coordinates. Character boxes use
/// the same type but are relative to the minimum corner of their plate box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox {
    /// Create a new bounding box from its corners
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Create from an origin and a size
    pub fn from_origin_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Move the box by `(dx, dy)`.
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x_min + dx, self.y_min + dy, self.x_max + dx, self.y_max + dy)
    }

    /// Check the box can be drawn. Zero-area boxes are accepted.
    pub fn validate(&self) -> Result<(), BoxError> {
        let coords = [self.x_min, self.y_min, self.x_max, self.y_max];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(BoxError::NonFinite);
        }

        if self.x_max < self.x_min || self.y_max < self.y_min {
            return Err(BoxError::Inverted {
                x_min: self.x_min,
                y_min: self.y_min,
                x_max: self.x_max,
                y_max: self.y_max,
            });
        }

        Ok(())
    }

    pub fn is_well_formed(&self) -> bool {
        self.validate().is_ok()
    }
}
