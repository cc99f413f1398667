//! Plate recognition data model and display geometry.

pub mod bbox;
pub mod geometry;
pub mod plate;
pub mod records;

pub use bbox::{BoundingBox, BoxError};
pub use geometry::{
    compute_display_transform, Dimensions, DisplayRect, DisplaySurface, DisplayTransform, NotReady,
};
pub use plate::{BatchStats, DetectionBatch, PlateResult};
pub use records::{
    DetectionRecord, DetectionStatus, HistoryStats, NewDetection, NewWatchListEntry, WatchList,
    WatchListEntry, WatchStatus,
};
