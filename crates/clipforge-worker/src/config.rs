//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Renders executing at once across all projects
    pub render_concurrency: usize,
    /// Total render attempts per render cycle
    pub render_max_attempts: u32,
    /// Backoff base; doubles after every failed attempt
    pub retry_base_delay: Duration,
    /// Backoff ceiling
    pub retry_max_delay: Duration,
    /// Total concatenation attempts per assembly
    pub assembly_max_attempts: u32,
    /// Finished job records kept for polling
    pub job_history_limit: usize,
    /// Buffered events per subscriber before it starts lagging
    pub event_channel_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            render_concurrency: 4,
            render_max_attempts: 3,
            retry_base_delay: Duration::from_millis(500),
            retry_max_delay: Duration::from_secs(30),
            assembly_max_attempts: 3,
            job_history_limit: 1000,
            event_channel_capacity: 256,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            render_concurrency: std::env::var("RENDER_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.render_concurrency),
            render_max_attempts: std::env::var("RENDER_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.render_max_attempts),
            retry_base_delay: Duration::from_millis(
                std::env::var("RETRY_BASE_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(500),
            ),
            retry_max_delay: Duration::from_millis(
                std::env::var("RETRY_MAX_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30_000),
            ),
            assembly_max_attempts: std::env::var("ASSEMBLY_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.assembly_max_attempts),
            job_history_limit: std::env::var("JOB_HISTORY_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.job_history_limit),
            event_channel_capacity: std::env::var("EVENT_CHANNEL_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.event_channel_capacity),
        }
    }
}
