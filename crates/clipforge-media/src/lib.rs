//! Render capability for the ClipForge pipeline.
//!
//! This crate provides:
//! - The [`RenderBackend`] trait the worker renders and concatenates through
//! - A local FFmpeg backend (trim + encode, concat demuxer)
//! - A remote render service client
//! - Error classification into retryable and permanent failures

pub mod backend;
pub mod command;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod remote;

pub use backend::{path_segment, ConcatRequest, RenderBackend, RenderRequest};
pub use command::{check_ffmpeg, FfmpegCommand, FfmpegProgress, FfmpegRunner};
pub use config::{BackendKind, EncodingConfig, RendererConfig};
pub use error::{MediaError, MediaResult};
pub use ffmpeg::FfmpegRenderer;
pub use remote::RemoteRenderer;
