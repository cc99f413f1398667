//! External collaborators of the dashboard: the recognition endpoint, the
//! detection store and the live capture loop.

pub mod camera;
pub mod error;
pub mod live;
pub mod recognition;
pub mod store;

pub use camera::{Camera, CameraGuard, DirectoryCamera, Frame, SnapshotCamera};
pub use error::ClientError;
pub use live::{dispatch, LatestBatch, LiveEvent, LiveSession, LiveSettings, LiveUpdate};
pub use recognition::{
    parse_batch, RecognitionClient, RecognitionSettings, Recognizer, Upload, DEFAULT_API_URL,
};
pub use store::{StoreSettings, SupabaseStore};
