//! Local FFmpeg render backend.
//!
//! Clip renders land at `shorts/{project}/{clip}/{job}.mp4` and long-form
//! outputs at `longform/{project}/{name}.mp4`, both relative to the output
//! root. A new render cycle never overwrites a file already being served.
//! Outputs are written to a `.part` file first and renamed into place, so a
//! key is only ever handed out for a complete file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use clipforge_models::ArtifactKey;

use crate::backend::{path_segment, ConcatRequest, RenderBackend, RenderRequest};
use crate::command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
use crate::config::EncodingConfig;
use crate::error::{MediaError, MediaResult};

pub struct FfmpegRenderer {
    output_dir: PathBuf,
    encoding: EncodingConfig,
    timeout: Duration,
}

impl FfmpegRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, encoding: EncodingConfig, timeout: Duration) -> Self {
        Self {
            output_dir: output_dir.into(),
            encoding,
            timeout,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Host path of an artifact key.
    pub fn resolve(&self, key: &ArtifactKey) -> PathBuf {
        self.output_dir.join(key.as_str())
    }

    fn runner(&self) -> FfmpegRunner {
        FfmpegRunner::new().with_timeout(self.timeout.as_secs().max(1))
    }

    /// Run `cmd` writing to `partial`, then move it to `output`.
    async fn produce(&self, cmd: FfmpegCommand, partial: &Path, output: &Path) -> MediaResult<()> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        if let Err(e) = self.runner().run(&cmd).await {
            let _ = tokio::fs::remove_file(partial).await;
            return Err(e);
        }
        tokio::fs::rename(partial, output).await?;
        Ok(())
    }
}

fn artifact_key(raw: String) -> MediaResult<ArtifactKey> {
    ArtifactKey::new(raw).map_err(|e| MediaError::internal(format!("bad artifact key: {e}")))
}

/// Output key of a clip render.
fn clip_key(request: &RenderRequest) -> MediaResult<ArtifactKey> {
    artifact_key(format!(
        "shorts/{}/{}/{}.mp4",
        path_segment(request.project_id.as_str()),
        path_segment(request.clip_id.as_str()),
        path_segment(request.job_id.as_str())
    ))
}

fn partial_path(output: &Path) -> PathBuf {
    output.with_extension("part.mp4")
}

/// Escape a path for a concat demuxer `file '...'` line.
fn concat_line(path: &Path) -> String {
    format!("file '{}'\n", path.to_string_lossy().replace('\'', "'\\''"))
}

#[async_trait]
impl RenderBackend for FfmpegRenderer {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn render(&self, request: &RenderRequest) -> MediaResult<ArtifactKey> {
        let source = Path::new(&request.source_path);
        if !tokio::fs::try_exists(source).await.unwrap_or(false) {
            return Err(MediaError::FileNotFound(source.to_path_buf()));
        }
        let window = request.window()?;

        let key = clip_key(request)?;
        let output = self.resolve(&key);
        let partial = partial_path(&output);

        let mut cmd = FfmpegCommand::new(source, &partial);
        if let Some((start, duration)) = window {
            cmd = cmd.seek(start);
            if let Some(duration) = duration {
                cmd = cmd.duration(duration);
            }
        }
        let cmd = cmd
            .video_codec(&self.encoding.codec)
            .preset(&self.encoding.preset)
            .crf(self.encoding.crf)
            .audio_codec(&self.encoding.audio_codec)
            .audio_bitrate(&self.encoding.audio_bitrate)
            .faststart();

        info!(
            project_id = %request.project_id,
            clip_id = %request.clip_id,
            key = %key,
            "Rendering clip"
        );
        self.produce(cmd, &partial, &output).await?;
        Ok(key)
    }

    async fn concatenate(&self, request: &ConcatRequest) -> MediaResult<ArtifactKey> {
        if request.inputs.is_empty() {
            return Err(MediaError::invalid_input("no inputs to concatenate"));
        }

        let mut list_body = String::new();
        for key in &request.inputs {
            let path = self.resolve(key);
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Err(MediaError::FileNotFound(path));
            }
            let absolute = tokio::fs::canonicalize(&path).await?;
            list_body.push_str(&concat_line(&absolute));
        }

        let key = artifact_key(format!(
            "longform/{}/{}.mp4",
            path_segment(request.project_id.as_str()),
            path_segment(&request.output_name)
        ))?;
        let output = self.resolve(&key);
        let partial = partial_path(&output);

        // The list file lives in a scratch dir removed on drop.
        let scratch = tempfile::tempdir()?;
        let list_path = scratch.path().join("concat.txt");
        tokio::fs::write(&list_path, list_body).await?;

        let cmd = FfmpegCommand::new(&list_path, &partial)
            .concat_list()
            .codec_copy()
            .faststart();

        info!(
            project_id = %request.project_id,
            inputs = request.inputs.len(),
            key = %key,
            "Concatenating clips"
        );
        self.produce(cmd, &partial, &output).await?;
        debug!(key = %key, "Concatenation finished");
        Ok(key)
    }

    async fn health_check(&self) -> MediaResult<()> {
        check_ffmpeg()?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_models::{ClipId, JobId, ProjectId};

    fn request(clip: &str, job: &str) -> RenderRequest {
        RenderRequest {
            project_id: ProjectId::from("p1"),
            clip_id: ClipId::from(clip),
            job_id: JobId::from_string(job),
            source_path: "/raw/a.mp4".to_string(),
            start: None,
            end: None,
        }
    }

    fn renderer(dir: &Path) -> FfmpegRenderer {
        FfmpegRenderer::new(dir, EncodingConfig::default(), Duration::from_secs(30))
    }

    #[test]
    fn test_concat_line_escapes_quotes() {
        assert_eq!(
            concat_line(Path::new("/out/it's.mp4")),
            "file '/out/it'\\''s.mp4'\n"
        );
    }

    #[test]
    fn test_resolve_stays_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path());
        let key = ArtifactKey::new("shorts/p1/c1.mp4").unwrap();
        assert!(r.resolve(&key).starts_with(dir.path()));
    }

    #[test]
    fn test_clip_keys_are_distinct_per_clip() {
        let keys: Vec<ArtifactKey> = ["a.b", "a b", "a_b"]
            .iter()
            .map(|clip| clip_key(&request(clip, "j1")).unwrap())
            .collect();
        assert_ne!(keys[0], keys[1]);
        assert_ne!(keys[0], keys[2]);
        assert_ne!(keys[1], keys[2]);
        assert_eq!(keys[2].as_str(), "shorts/p1/a_b/j1.mp4");
    }

    #[test]
    fn test_clip_keys_are_distinct_per_cycle() {
        let first = clip_key(&request("c1", "j1")).unwrap();
        let second = clip_key(&request("c1", "j2")).unwrap();
        assert_ne!(first, second);
        assert_ne!(
            partial_path(&PathBuf::from(first.as_str())),
            partial_path(&PathBuf::from(second.as_str()))
        );
    }

    #[tokio::test]
    async fn test_missing_source_is_not_retryable() {
        let dir = tempfile::tempdir().unwrap();
        let err = renderer(dir.path())
            .render(&RenderRequest {
                source_path: dir.path().join("missing.mp4").to_string_lossy().to_string(),
                ..request("c1", "j1")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_concat_requires_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path());
        let err = r
            .concatenate(&ConcatRequest {
                project_id: ProjectId::from("p1"),
                inputs: vec![],
                output_name: "x".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidInput(_)));

        let err = r
            .concatenate(&ConcatRequest {
                project_id: ProjectId::from("p1"),
                inputs: vec![ArtifactKey::new("shorts/p1/none.mp4").unwrap()],
                output_name: "x".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
