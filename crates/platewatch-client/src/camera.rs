//! Frame sources for live mode.

use crate::error::ClientError;
use crate::recognition::Upload;
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// One captured frame, encoded as delivered by the camera.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Frame {
    pub fn to_upload(&self) -> Upload {
        Upload::new(self.file_name.clone(), self.bytes.clone())
    }
}

/// A live frame source. Hardware is held until `release` is called.
#[async_trait]
pub trait Camera: Send {
    async fn capture(&mut self) -> Result<Frame, ClientError>;

    fn release(&mut self);

    fn name(&self) -> String;
}

/// Owns a camera and releases it when dropped, on every exit path.
pub struct CameraGuard {
    camera: Box<dyn Camera>,
}

impl CameraGuard {
    pub fn acquire(camera: Box<dyn Camera>) -> Self {
        info!(camera = %camera.name(), "camera acquired");
        Self { camera }
    }

    pub async fn capture(&mut self) -> Result<Frame, ClientError> {
        self.camera.capture().await
    }
}

impl Drop for CameraGuard {
    fn drop(&mut self) {
        self.camera.release();
        info!(camera = %self.camera.name(), "camera released");
    }
}

/// Camera exposing its latest JPEG over HTTP, such as the ESP32 `/latest` endpoint.
pub struct SnapshotCamera {
    http_client: Option<Client>,
    url: String,
    timeout: Duration,
}

impl SnapshotCamera {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http_client: None,
            url: url.into(),
            timeout,
        }
    }

    fn client(&mut self) -> Result<&Client, ClientError> {
        if self.http_client.is_none() {
            self.http_client = Some(Client::builder().timeout(self.timeout).build()?);
        }
        self.http_client
            .as_ref()
            .ok_or_else(|| ClientError::Camera("snapshot client unavailable".into()))
    }
}

#[async_trait]
impl Camera for SnapshotCamera {
    async fn capture(&mut self) -> Result<Frame, ClientError> {
        // cache-busting parameter, the camera serves the same path every time
        let stamp = chrono::Utc::now().timestamp_millis().to_string();
        let url = self.url.clone();
        let response = self.client()?.get(&url).query(&[("t", stamp)]).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::UnexpectedStatus { status, text });
        }

        let bytes = response.bytes().await?.to_vec();
        debug!(size = bytes.len(), "snapshot captured");
        Ok(Frame {
            file_name: "latest.jpg".to_string(),
            bytes,
        })
    }

    fn release(&mut self) {
        self.http_client = None;
    }

    fn name(&self) -> String {
        format!("snapshot:{}", self.url)
    }
}

/// Replays image files from a directory in name order, looping.
pub struct DirectoryCamera {
    dir: PathBuf,
    files: Vec<PathBuf>,
    position: usize,
}

impl DirectoryCamera {
    const SUPPORTED_EXTENSIONS: [&'static str; 4] = ["png", "jpg", "jpeg", "bmp"];

    /// Scan `dir` for image files
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, ClientError> {
        let dir = dir.as_ref().to_path_buf();
        let mut files = Vec::new();

        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            let supported = path
                .extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .is_some_and(|ext| Self::SUPPORTED_EXTENSIONS.contains(&ext.as_str()));
            if supported {
                files.push(path);
            }
        }

        if files.is_empty() {
            return Err(ClientError::Camera(format!("no image files in {}", dir.display())));
        }
        files.sort();

        Ok(Self {
            dir,
            files,
            position: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[async_trait]
impl Camera for DirectoryCamera {
    async fn capture(&mut self) -> Result<Frame, ClientError> {
        let path = self
            .files
            .get(self.position % self.files.len().max(1))
            .cloned()
            .ok_or_else(|| ClientError::Camera("camera released".into()))?;
        self.position += 1;

        let bytes = tokio::fs::read(&path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "frame.jpg".to_string());
        Ok(Frame { file_name, bytes })
    }

    fn release(&mut self) {
        self.files.clear();
    }

    fn name(&self) -> String {
        format!("directory:{}", self.dir.display())
    }
}
