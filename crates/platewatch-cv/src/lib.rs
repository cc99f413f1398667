//! Platewatch overlay rendering
//!
//! Maps recognition results onto a contain-scaled display surface and draws
//! plate and character boxes with their labels.

pub mod annotate;
pub mod overlay;
pub mod surface;
pub mod utils;

// Re-export commonly used types
pub use annotate::{AnnotationJob, Annotator};
pub use overlay::{
    Color, OverlayRenderer, OverlayScene, OverlayStyle, RenderStatus, RenderSummary, SceneEvent,
    SkipReason, SkippedPlate, SourceKind, StrokeStyle, TextStyle,
};
pub use surface::{DrawCommand, RasterSurface, RecordingSurface};
pub use utils::ImageUtils;

// Error handling
pub type Result<T> = anyhow::Result<T>;

/// Core traits for the overlay system
pub mod traits {
    use super::overlay::{StrokeStyle, TextStyle};
    use platewatch_core::DisplayRect;

    /// A 2D target the overlay renderer draws on.
    ///
    /// Resizing discards the current content, as it does for a browser canvas.
    pub trait DrawingSurface {
        fn resize(&mut self, width: u32, height: u32);
        fn clear(&mut self);
        fn size(&self) -> (u32, u32);
        fn stroke_rect(&mut self, rect: DisplayRect, style: &StrokeStyle);
        /// `(x, y)` is the left end of the text baseline.
        fn fill_text(&mut self, text: &str, x: f64, y: f64, style: &TextStyle);
    }
}
