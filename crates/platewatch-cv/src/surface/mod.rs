//! Drawing surfaces

pub mod raster;
pub mod recording;

pub use raster::RasterSurface;
pub use recording::{DrawCommand, RecordingSurface};
