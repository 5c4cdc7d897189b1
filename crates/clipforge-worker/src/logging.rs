//! Structured job logging utilities.
//!
//! Provides consistent, structured logging for render and assembly jobs
//! with tracing spans and contextual information.

use tracing::{error, info, warn, Span};

use clipforge_models::JobHandle;

/// Job logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: &'static str,
    project_id: String,
    clip_id: Option<String>,
}

impl JobLogger {
    /// Create a logger for a job handle.
    pub fn new(handle: &JobHandle) -> Self {
        Self {
            job_id: handle.job_id.to_string(),
            operation: handle.kind.as_str(),
            project_id: handle.project_id.to_string(),
            clip_id: handle.clip_id.as_ref().map(ToString::to_string),
        }
    }

    fn clip(&self) -> &str {
        self.clip_id.as_deref().unwrap_or("-")
    }

    /// Log the start of a job operation.
    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            project_id = %self.project_id,
            clip_id = self.clip(),
            "Job started: {}", message
        );
    }

    /// Log a progress update during job execution.
    pub fn log_progress(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            project_id = %self.project_id,
            clip_id = self.clip(),
            "Job progress: {}", message
        );
    }

    /// Log a warning during job execution.
    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            operation = self.operation,
            project_id = %self.project_id,
            clip_id = self.clip(),
            "Job warning: {}", message
        );
    }

    /// Log an error during job execution.
    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = self.operation,
            project_id = %self.project_id,
            clip_id = self.clip(),
            "Job error: {}", message
        );
    }

    /// Log the completion of a job operation.
    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            project_id = %self.project_id,
            clip_id = self.clip(),
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &str {
        self.operation
    }

    /// Create a tracing span for this job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            operation = self.operation,
            project_id = %self.project_id
        )
    }
}
