//! Worker error types.

use std::time::Duration;

use clipforge_models::JobId;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Store(#[from] clipforge_store::StoreError),

    #[error("Media error: {0}")]
    Media(#[from] clipforge_media::MediaError),

    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Render queue is shut down")]
    QueueClosed,

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkerError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
