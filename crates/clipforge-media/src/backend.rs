//! The render capability consumed by the pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use clipforge_models::{ArtifactKey, ClipId, JobId, ProjectId};

use crate::error::{MediaError, MediaResult};

/// Render one clip from its raw source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    pub project_id: ProjectId,
    pub clip_id: ClipId,
    /// Render job; each render cycle gets its own output
    pub job_id: JobId,
    pub source_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
}

impl RenderRequest {
    /// Trim window as `(start, duration)`; `None` renders the whole source
    /// and a missing duration runs to the end of the source.
    pub fn window(&self) -> MediaResult<Option<(f64, Option<f64>)>> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => {
                if !start.is_finite() || !end.is_finite() || start < 0.0 || end <= start {
                    return Err(MediaError::invalid_input(format!(
                        "invalid clip window {start}..{end}"
                    )));
                }
                Ok(Some((start, Some(end - start))))
            }
            (Some(start), None) if start.is_finite() && start >= 0.0 => Ok(Some((start, None))),
            (None, Some(end)) if end.is_finite() && end > 0.0 => Ok(Some((0.0, Some(end)))),
            (None, None) => Ok(None),
            (start, end) => Err(MediaError::invalid_input(format!(
                "invalid clip window {start:?}..{end:?}"
            ))),
        }
    }
}

/// Concatenate rendered clips, in the given order, into one output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcatRequest {
    pub project_id: ProjectId,
    pub inputs: Vec<ArtifactKey>,
    /// File stem for the output, unique per input set
    pub output_name: String,
}

/// External render capability.
///
/// Both operations may be slow and may fail; failures say whether a retry
/// could help through [`MediaError::is_retryable`].
#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// Backend name for logs and health output.
    fn name(&self) -> &'static str;

    async fn render(&self, request: &RenderRequest) -> MediaResult<ArtifactKey>;

    async fn concatenate(&self, request: &ConcatRequest) -> MediaResult<ArtifactKey>;

    /// Cheap readiness check.
    async fn health_check(&self) -> MediaResult<()>;
}

/// Map an id to a single path segment.
///
/// Ids made only of ASCII alphanumerics, `-` and `_` are used as-is. Any
/// other id is cleaned and suffixed with `~` plus a hash of the raw id. A
/// plain id never contains `~`, so distinct ids never share a segment.
pub fn path_segment(id: &str) -> String {
    let is_plain = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    if !id.is_empty() && id.chars().all(is_plain) {
        return id.to_string();
    }

    let cleaned: String = id.chars().map(|c| if is_plain(c) { c } else { '_' }).collect();
    let digest = Sha256::digest(id.as_bytes());
    let hash: String = digest[..8].iter().map(|b| format!("{b:02x}")).collect();
    format!("{cleaned}~{hash}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(start: Option<f64>, end: Option<f64>) -> RenderRequest {
        RenderRequest {
            project_id: ProjectId::from("p1"),
            clip_id: ClipId::from("c1"),
            job_id: JobId::from_string("j1"),
            source_path: "/raw/a.mp4".to_string(),
            start,
            end,
        }
    }

    #[test]
    fn test_window() {
        assert_eq!(request(None, None).window().unwrap(), None);
        assert_eq!(request(Some(2.0), Some(5.0)).window().unwrap(), Some((2.0, Some(3.0))));
        assert!(request(Some(5.0), Some(2.0)).window().is_err());
        assert_eq!(request(Some(4.0), None).window().unwrap(), Some((4.0, None)));
        assert!(request(Some(-1.0), None).window().is_err());
    }

    #[test]
    fn test_path_segment() {
        assert_eq!(path_segment("clip-01_a"), "clip-01_a");
        assert!(path_segment("../etc").starts_with("___etc~"));
        assert!(path_segment("C:\\x").starts_with("C__x~"));
        assert!(path_segment("").starts_with('~'));
        assert!(!path_segment("a/b").contains('/'));
    }

    #[test]
    fn test_path_segment_keeps_ids_apart() {
        let segments: Vec<String> = ["a.b", "a b", "a_b", "a_b~", "a:b"]
            .iter()
            .map(|id| path_segment(id))
            .collect();
        for (i, a) in segments.iter().enumerate() {
            for b in &segments[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(segments[2], "a_b");
        assert_eq!(path_segment("a.b"), path_segment("a.b"));
    }
}
