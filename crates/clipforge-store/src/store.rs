//! The authoritative clip store.

use std::path::PathBuf;

use clipforge_models::{
    Clip, ClipId, JobId, NewClip, Project, ProjectId, ProjectSnapshot, ProjectSummary,
    ReviewDecision,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::metrics;
use crate::persist::StateFile;
use crate::state::{
    AssemblyOutcome, AssemblyPlan, AssemblyRecord, ProjectEntry, RenderAdmission, RenderOutcome,
    RenderRecord, ReviewOutcome, StoreState,
};

/// Store construction options.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// JSON file backing the store; `None` keeps everything in memory
    pub state_file: Option<PathBuf>,
    /// Total render attempts allowed per render cycle
    pub max_render_attempts: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            state_file: None,
            max_render_attempts: 3,
        }
    }
}

/// Single source of truth for projects and clips.
///
/// All transitions run under one write lock, so each is atomic with respect
/// to every other transition. When a state file is configured the new state
/// is written after the lock is released. A failed write leaves the store
/// degraded until a later write succeeds; see [`ClipStore::persistence_status`].
pub struct ClipStore {
    state: RwLock<StoreState>,
    file: Option<StateFile>,
    max_render_attempts: u32,
    /// Last state file write failure, cleared by the next successful write
    persist_error: Mutex<Option<String>>,
}

impl ClipStore {
    /// Open the store, loading and recovering the state file if configured.
    pub async fn open(options: StoreOptions) -> StoreResult<Self> {
        let file = options.state_file.map(StateFile::new);
        let mut state = match &file {
            Some(file) => file.load().await?.unwrap_or_default(),
            None => StoreState::default(),
        };

        let recovered = state.recover_interrupted();
        let store = Self {
            state: RwLock::new(state),
            file,
            max_render_attempts: options.max_render_attempts.max(1),
            persist_error: Mutex::new(None),
        };

        if recovered > 0 {
            warn!(recovered, "Reset work interrupted by restart");
            store.mutate("recover", |_| Ok(())).await?;
        }
        Ok(store)
    }

    /// Memory-only store.
    pub fn in_memory(max_render_attempts: u32) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            file: None,
            max_render_attempts: max_render_attempts.max(1),
            persist_error: Mutex::new(None),
        }
    }

    pub fn max_render_attempts(&self) -> u32 {
        self.max_render_attempts
    }

    /// `Err(Persistence)` while the latest state is not on disk.
    pub async fn persistence_status(&self) -> StoreResult<()> {
        match self.persist_error.lock().await.as_ref() {
            Some(reason) => Err(StoreError::persistence(format!(
                "state not saved: {reason}"
            ))),
            None => Ok(()),
        }
    }

    /// Apply a transition under the write lock and persist the result.
    async fn mutate<T, F>(&self, operation: &'static str, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut StoreState) -> StoreResult<T>,
    {
        let (result, pending) = {
            let mut state = self.state.write().await;
            match f(&mut state) {
                Ok(value) => {
                    state.generation += 1;
                    let pending = self
                        .file
                        .as_ref()
                        .map(|_| (state.generation, serde_json::to_vec(&*state)));
                    (Ok(value), pending)
                }
                Err(e) => (Err(e), None),
            }
        };
        metrics::record_transition(operation, result.is_ok());

        if let (Some(file), Some((generation, bytes))) = (&self.file, pending) {
            let written = match bytes {
                Ok(bytes) => file.write(generation, bytes).await,
                Err(e) => Err(e.into()),
            };
            let mut persist_error = self.persist_error.lock().await;
            match written {
                Ok(()) => {
                    if persist_error.take().is_some() {
                        info!(generation, path = %file.path().display(), "State file writable again");
                    }
                }
                Err(e) => {
                    metrics::record_persist_error();
                    error!(
                        operation,
                        generation,
                        path = %file.path().display(),
                        error = %e,
                        "Failed to persist state"
                    );
                    *persist_error = Some(e.to_string());
                }
            }
        }
        result
    }

    async fn read<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&StoreState) -> StoreResult<T>,
    {
        let state = self.state.read().await;
        f(&state)
    }

    /// Create a project; an existing project with the same id is returned as-is.
    pub async fn create_project(&self, id: ProjectId, name: impl Into<String>) -> StoreResult<Project> {
        let name = name.into();
        self.mutate("create_project", move |state| {
            let entry = state
                .projects
                .entry(id.clone())
                .or_insert_with(|| ProjectEntry::new(Project::new(id, name)));
            Ok(entry.project.clone())
        })
        .await
    }

    /// Add a clip to an existing project. Returns `(clip, inserted)`; an
    /// existing clip id leaves the stored clip unchanged.
    pub async fn insert_clip(&self, new: NewClip) -> StoreResult<(Clip, bool)> {
        self.mutate("insert_clip", move |state| {
            let entry = state.entry_mut(&new.project_id)?;
            Ok(entry.insert_clip(new))
        })
        .await
    }

    pub async fn get_clip(&self, project_id: &ProjectId, clip_id: &ClipId) -> StoreResult<Clip> {
        self.read(|state| state.entry(project_id)?.clip(clip_id).cloned())
            .await
    }

    pub async fn snapshot(&self, project_id: &ProjectId) -> StoreResult<ProjectSnapshot> {
        self.read(|state| Ok(state.entry(project_id)?.snapshot()))
            .await
    }

    pub async fn list_projects(&self) -> Vec<ProjectSummary> {
        let state = self.state.read().await;
        state
            .projects
            .values()
            .map(|entry| entry.snapshot().summary())
            .collect()
    }

    /// Approved clips in assembly order.
    pub async fn approved_clips(&self, project_id: &ProjectId) -> StoreResult<Vec<Clip>> {
        self.read(|state| {
            Ok(state
                .entry(project_id)?
                .approved()
                .into_iter()
                .cloned()
                .collect())
        })
        .await
    }

    pub async fn set_review_state(
        &self,
        project_id: &ProjectId,
        clip_id: &ClipId,
        decision: ReviewDecision,
    ) -> StoreResult<ReviewOutcome> {
        let outcome = self
            .mutate("review", |state| {
                state.entry_mut(project_id)?.apply_review(clip_id, decision)
            })
            .await?;
        info!(
            project_id = %project_id,
            clip_id = %clip_id,
            review_state = %outcome.clip.review_state,
            "Review decision recorded"
        );
        Ok(outcome)
    }

    pub async fn mark_render_queued(
        &self,
        project_id: &ProjectId,
        clip_id: &ClipId,
        job_id: &JobId,
    ) -> StoreResult<RenderAdmission> {
        self.mutate("render_queued", |state| {
            state.entry_mut(project_id)?.queue_render(clip_id, job_id)
        })
        .await
    }

    /// Returns the attempt number, or `None` if `job_id` lost the clip.
    pub async fn mark_rendering(
        &self,
        project_id: &ProjectId,
        clip_id: &ClipId,
        job_id: &JobId,
    ) -> StoreResult<Option<u32>> {
        self.mutate("rendering", |state| {
            state.entry_mut(project_id)?.start_render(clip_id, job_id)
        })
        .await
    }

    pub async fn record_render_result(
        &self,
        project_id: &ProjectId,
        clip_id: &ClipId,
        job_id: &JobId,
        outcome: RenderOutcome,
    ) -> StoreResult<RenderRecord> {
        let max_attempts = self.max_render_attempts;
        self.mutate("render_result", |state| {
            state
                .entry_mut(project_id)?
                .record_render(clip_id, job_id, outcome, max_attempts)
        })
        .await
    }

    pub async fn cancel_render(
        &self,
        project_id: &ProjectId,
        clip_id: &ClipId,
        job_id: &JobId,
    ) -> StoreResult<bool> {
        self.mutate("render_cancel", |state| {
            state.entry_mut(project_id)?.cancel_render(clip_id, job_id)
        })
        .await
    }

    /// Check assembly preconditions and move the project to `Assembling`.
    pub async fn begin_assembly(&self, project_id: &ProjectId, job_id: &JobId) -> StoreResult<AssemblyPlan> {
        self.mutate("assembly_begin", |state| {
            state.entry_mut(project_id)?.begin_assembly(job_id)
        })
        .await
    }

    pub async fn finish_assembly(
        &self,
        project_id: &ProjectId,
        job_id: &JobId,
        outcome: AssemblyOutcome,
    ) -> StoreResult<AssemblyRecord> {
        self.mutate("assembly_finish", |state| {
            Ok(state.entry_mut(project_id)?.finish_assembly(job_id, outcome))
        })
        .await
    }

    /// Apply new clip positions. Returns how many clips moved.
    pub async fn set_clip_order(&self, project_id: &ProjectId, orders: &[(ClipId, i64)]) -> StoreResult<usize> {
        self.mutate("set_order", |state| state.entry_mut(project_id)?.set_orders(orders))
            .await
    }

    /// Fail fast when a project is unknown.
    pub async fn ensure_project(&self, project_id: &ProjectId) -> StoreResult<()> {
        self.read(|state| state.entry(project_id).map(|_| ())).await
    }
}

impl std::fmt::Debug for ClipStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipStore")
            .field("file", &self.file)
            .field("max_render_attempts", &self.max_render_attempts)
            .finish()
    }
}
