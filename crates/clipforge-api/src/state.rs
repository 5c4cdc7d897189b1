//! Application state.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use clipforge_media::RendererConfig;
use clipforge_store::{ClipStore, SeedFile, StoreOptions};
use clipforge_worker::{Pipeline, WorkerConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub pipeline: Pipeline,
    /// Directory served under `config.media_url_prefix`
    pub media_root: PathBuf,
}

impl AppState {
    /// Open the store, apply the seed file and start the pipeline.
    pub async fn new(
        config: ApiConfig,
        worker: WorkerConfig,
        renderer: RendererConfig,
    ) -> anyhow::Result<Self> {
        let store = ClipStore::open(StoreOptions {
            state_file: config.state_file.clone(),
            max_render_attempts: worker.render_max_attempts,
        })
        .await
        .context("failed to open clip store")?;

        if let Some(path) = &config.seed_file {
            let seed = SeedFile::load(path)
                .await
                .with_context(|| format!("failed to load seed file {}", path.display()))?;
            seed.apply(&store).await.context("failed to apply seed file")?;
        }

        let backend = renderer.build().context("failed to build render backend")?;
        info!(backend = backend.name(), "Render backend ready");

        let pipeline = Pipeline::new(&worker, Arc::new(store), backend);
        Ok(Self::from_parts(config, pipeline, renderer.output_dir))
    }

    pub fn from_parts(config: ApiConfig, pipeline: Pipeline, media_root: PathBuf) -> Self {
        Self {
            config: Arc::new(config),
            pipeline,
            media_root,
        }
    }

    /// URL prefix for artifact keys.
    pub fn media_prefix(&self) -> &str {
        &self.config.media_url_prefix
    }
}
