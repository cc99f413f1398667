use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API Error: {status} {text}")]
    UnexpectedStatus { status: StatusCode, text: String },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Camera error: {0}")]
    Camera(String),
    #[error("Missing configuration: {0}")]
    NotConfigured(&'static str),
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}
