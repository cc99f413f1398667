//! Overlay rendering module

pub mod renderer;
pub mod scene;
pub mod style;

pub use renderer::{OverlayRenderer, RenderStatus, RenderSummary, SkipReason, SkippedPlate};
pub use scene::{OverlayScene, SceneEvent, SourceKind};
pub use style::{Color, OverlayStyle, StrokeStyle, TextStyle};
