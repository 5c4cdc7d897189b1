//! API configuration.

use std::path::PathBuf;
use std::time::Duration;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second, per client IP
    pub rate_limit_rps: u32,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// JSON file the store persists to; in-memory only when unset
    pub state_file: Option<PathBuf>,
    /// Projects and clips to ingest at startup
    pub seed_file: Option<PathBuf>,
    /// URL prefix rendered artifacts are served under
    pub media_url_prefix: String,
    /// Upper bound for `POST /assemble?wait=true`
    pub assemble_wait_timeout: Duration,
    /// Expose Prometheus metrics at `/metrics`
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 20,
            max_body_size: 1024 * 1024, // 1MB
            environment: "development".to_string(),
            state_file: None,
            seed_file: None,
            media_url_prefix: "/media".to_string(),
            assemble_wait_timeout: Duration::from_secs(300),
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rate_limit_rps),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            state_file: std::env::var("STATE_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            seed_file: std::env::var("SEED_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            media_url_prefix: std::env::var("MEDIA_URL_PREFIX")
                .map(|s| normalize_prefix(&s))
                .unwrap_or(defaults.media_url_prefix),
            assemble_wait_timeout: std::env::var("ASSEMBLE_WAIT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.assemble_wait_timeout),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.metrics_enabled),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

/// `media/` and `/media/` both become `/media`.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/media".to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.rate_limit_rps, 20);
        assert_eq!(config.media_url_prefix, "/media");
        assert!(!config.is_production());
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("media/"), "/media");
        assert_eq!(normalize_prefix("/files/out/"), "/files/out");
        assert_eq!(normalize_prefix("/"), "/media");
    }
}
