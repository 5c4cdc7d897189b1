//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while rendering or concatenating.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Render service error ({status:?}): {message}")]
    Service { status: Option<u16>, message: String },

    #[error("Invalid render service response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn service(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Service {
            status,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether another attempt could succeed.
    ///
    /// Missing or unreadable sources and rejected input fail the same way
    /// every time; process crashes, timeouts, I/O and overloaded services
    /// are transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            MediaError::FfmpegFailed { .. } | MediaError::Timeout(_) | MediaError::Io(_) => true,
            MediaError::Service { status, .. } => match status {
                Some(code) => *code == 429 || *code >= 500,
                None => true,
            },
            MediaError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            MediaError::FfmpegNotFound
            | MediaError::FileNotFound(_)
            | MediaError::Cancelled
            | MediaError::JsonParse(_)
            | MediaError::InvalidVideo(_)
            | MediaError::InvalidInput(_)
            | MediaError::InvalidResponse(_)
            | MediaError::Config(_)
            | MediaError::Internal(_) => false,
        }
    }
}
