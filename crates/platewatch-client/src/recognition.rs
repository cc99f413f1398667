//! Client for the external plate recognition endpoint.

use crate::error::ClientError;
use async_trait::async_trait;
use platewatch_core::DetectionBatch;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/recognize";

/// Recognition endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionSettings {
    pub api_url: String,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            connect_timeout_secs: 5,
            timeout_secs: 30,
        }
    }
}

/// One image file to submit.
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime = mime_guess::from_path(&file_name)
            .first_or(mime_guess::mime::IMAGE_JPEG)
            .to_string();
        Self {
            file_name,
            mime,
            bytes,
        }
    }

    /// Read an image file from disk
    pub async fn from_path(path: &Path) -> Result<Self, ClientError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "frame.jpg".to_string());
        Ok(Self::new(file_name, bytes))
    }
}

/// Anything that can turn an image into a detection batch.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, upload: Upload) -> Result<DetectionBatch, ClientError>;
}

pub struct RecognitionClient {
    http_client: Client,
    api_url: String,
}

impl RecognitionClient {
    /// Create recognition client
    ///
    /// # Errors
    /// If the HTTP client can't be built.
    pub fn new(settings: &RecognitionSettings) -> Result<Self, ClientError> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            http_client,
            api_url: settings.api_url.clone(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl Recognizer for RecognitionClient {
    /// Upload one image as multipart field `file`.
    ///
    /// # Errors
    /// * If the POST request can't be made.
    /// * If a non-2xx status is received.
    /// * If the body is not a detection batch.
    async fn recognize(&self, upload: Upload) -> Result<DetectionBatch, ClientError> {
        let size = upload.bytes.len();
        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime)?;
        let form = Form::new().part("file", part);

        debug!(file = %upload.file_name, size, url = %self.api_url, "submitting frame");
        let response = self.http_client.post(&self.api_url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::UnexpectedStatus { status, text });
        }

        let body = response.text().await?;
        let batch = parse_batch(&body)?;
        info!(
            plates = batch.len(),
            time_taken_ms = ?batch.time_taken_ms,
            "recognition finished"
        );
        Ok(batch)
    }
}

/// Parse a recognition response body.
pub fn parse_batch(body: &str) -> Result<DetectionBatch, ClientError> {
    Ok(serde_json::from_str(body)?)
}
