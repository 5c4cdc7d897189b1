//! JSON state file with atomic replace.

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::metrics;
use crate::state::StoreState;

/// Writes serialized [`StoreState`] snapshots to disk.
///
/// Snapshots are written to a sibling temp file and renamed over the target.
/// Writes carry the state generation; an older generation arriving after a
/// newer one is skipped so the file never moves backwards.
#[derive(Debug)]
pub struct StateFile {
    path: PathBuf,
    last_written: Mutex<u64>,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_written: Mutex::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load state, or `None` when the file does not exist yet.
    pub async fn load(&self) -> StoreResult<Option<StoreState>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state: StoreState = serde_json::from_slice(&bytes).map_err(|e| {
            StoreError::persistence(format!("corrupt state file {}: {}", self.path.display(), e))
        })?;
        *self.last_written.lock().await = state.generation;
        info!(
            path = %self.path.display(),
            projects = state.projects.len(),
            generation = state.generation,
            "Loaded state file"
        );
        Ok(Some(state))
    }

    /// Write a serialized snapshot for `generation`.
    pub async fn write(&self, generation: u64, bytes: Vec<u8>) -> StoreResult<()> {
        let mut last = self.last_written.lock().await;
        if generation <= *last {
            debug!(generation, last = *last, "Skipping superseded state snapshot");
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        *last = generation;

        metrics::record_persist(bytes.len());
        Ok(())
    }
}
