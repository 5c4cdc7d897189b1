//! Render backend configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::RenderBackend;
use crate::error::{MediaError, MediaResult};
use crate::ffmpeg::FfmpegRenderer;
use crate::remote::RemoteRenderer;

/// Default video codec.
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default encoding preset.
pub const DEFAULT_PRESET: &str = "veryfast";
/// Default CRF value (quality).
pub const DEFAULT_CRF: u8 = 20;
/// Default audio codec.
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default audio bitrate.
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";

/// Video encoding configuration for clip renders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncodingConfig {
    pub codec: String,
    pub preset: String,
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
        }
    }
}

/// Which render capability to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Ffmpeg,
    Remote,
}

impl std::str::FromStr for BackendKind {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ffmpeg" | "local" => Ok(BackendKind::Ffmpeg),
            "remote" | "http" => Ok(BackendKind::Remote),
            other => Err(MediaError::config(format!("unknown RENDER_BACKEND: {other}"))),
        }
    }
}

/// Renderer configuration.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub backend: BackendKind,
    /// Root directory artifact keys resolve against
    pub output_dir: PathBuf,
    pub ffmpeg_timeout: Duration,
    pub encoding: EncodingConfig,
    /// Base URL of the remote render service
    pub service_url: Option<String>,
    pub service_timeout: Duration,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Ffmpeg,
            output_dir: PathBuf::from("./outputs"),
            ffmpeg_timeout: Duration::from_secs(900),
            encoding: EncodingConfig::default(),
            service_url: None,
            service_timeout: Duration::from_secs(600),
        }
    }
}

impl RendererConfig {
    /// Create config from environment variables.
    pub fn from_env() -> MediaResult<Self> {
        let defaults = Self::default();
        let backend = match std::env::var("RENDER_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.backend,
        };

        let encoding = EncodingConfig {
            codec: std::env::var("RENDER_VIDEO_CODEC").unwrap_or(defaults.encoding.codec),
            preset: std::env::var("RENDER_PRESET").unwrap_or(defaults.encoding.preset),
            crf: std::env::var("RENDER_CRF")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.encoding.crf),
            audio_codec: std::env::var("RENDER_AUDIO_CODEC").unwrap_or(defaults.encoding.audio_codec),
            audio_bitrate: std::env::var("RENDER_AUDIO_BITRATE")
                .unwrap_or(defaults.encoding.audio_bitrate),
        };

        Ok(Self {
            backend,
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            ffmpeg_timeout: std::env::var("FFMPEG_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.ffmpeg_timeout),
            encoding,
            service_url: std::env::var("RENDER_SERVICE_URL").ok().filter(|s| !s.is_empty()),
            service_timeout: std::env::var("RENDER_SERVICE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.service_timeout),
        })
    }

    /// Build the configured backend.
    pub fn build(&self) -> MediaResult<Arc<dyn RenderBackend>> {
        match self.backend {
            BackendKind::Ffmpeg => Ok(Arc::new(FfmpegRenderer::new(
                self.output_dir.clone(),
                self.encoding.clone(),
                self.ffmpeg_timeout,
            ))),
            BackendKind::Remote => {
                let url = self
                    .service_url
                    .as_deref()
                    .ok_or_else(|| MediaError::config("RENDER_SERVICE_URL is required for the remote backend"))?;
                Ok(Arc::new(RemoteRenderer::new(url, self.service_timeout)?))
            }
        }
    }
}
