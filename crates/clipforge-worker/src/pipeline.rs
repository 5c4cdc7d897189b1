//! Project operations exposed to the HTTP layer.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;

use clipforge_media::RenderBackend;
use clipforge_models::timeline::{approved_in_order, arrange_for_longform, fingerprint_clips};
use clipforge_models::{
    ArtifactKey, AssemblyState, Clip, ClipId, JobHandle, JobId, JobRecord, PipelineEvent,
    ProjectId, ProjectSnapshot, ProjectSummary, RenderState, ReviewDecision,
};
use clipforge_store::{ClipStore, StoreError};

use crate::assembly::AssemblyCoordinator;
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::events::EventBus;
use crate::jobs::JobRegistry;
use crate::render_queue::RenderQueue;
use crate::retry::RetryConfig;

/// One row of the long-form timeline preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub clip_id: ClipId,
    pub order: i64,
    pub emotion_label: String,
    pub score: f64,
    pub render_state: RenderState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered_path: Option<ArtifactKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Rendered and usable as assembly input
    pub ready: bool,
}

/// Approved clips in assembly order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelinePreview {
    pub project_id: ProjectId,
    pub assembly_state: AssemblyState,
    /// Fingerprint the set would assemble with; absent until every entry is ready
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    pub ready: bool,
    pub entries: Vec<TimelineEntry>,
}

impl TimelinePreview {
    fn build(snapshot: &ProjectSnapshot) -> Self {
        let approved = approved_in_order(&snapshot.clips);
        let ready = !approved.is_empty() && approved.iter().all(|c| c.is_assembly_ready());
        let entries = approved
            .iter()
            .map(|clip| TimelineEntry {
                clip_id: clip.id.clone(),
                order: clip.order,
                emotion_label: clip.emotion_label.clone(),
                score: clip.score,
                render_state: clip.render_state,
                rendered_path: clip.rendered_path.clone(),
                duration: clip.duration(),
                ready: clip.is_assembly_ready(),
            })
            .collect();

        Self {
            project_id: snapshot.project.id.clone(),
            assembly_state: snapshot.project.assembly_state,
            fingerprint: ready.then(|| fingerprint_clips(&approved)),
            ready,
            entries,
        }
    }
}

/// Review, render and assembly operations over one store.
///
/// Every call returns once state is updated; rendering and assembly run in
/// the background and report through job records and pipeline events.
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<ClipStore>,
    backend: Arc<dyn RenderBackend>,
    jobs: Arc<JobRegistry>,
    events: EventBus,
    renders: RenderQueue,
    assembler: AssemblyCoordinator,
}

impl Pipeline {
    /// Wire up the pipeline and start the render workers.
    pub fn new(config: &WorkerConfig, store: Arc<ClipStore>, backend: Arc<dyn RenderBackend>) -> Self {
        let jobs = Arc::new(JobRegistry::new(config.job_history_limit));
        let events = EventBus::new(config.event_channel_capacity);

        let render_retry = RetryConfig::new(
            config.render_max_attempts,
            config.retry_base_delay,
            config.retry_max_delay,
        );
        let assembly_retry = RetryConfig::new(
            config.assembly_max_attempts,
            config.retry_base_delay,
            config.retry_max_delay,
        );

        let renders = RenderQueue::start(
            Arc::clone(&store),
            Arc::clone(&backend),
            Arc::clone(&jobs),
            events.clone(),
            render_retry,
            config.render_concurrency,
        );
        let assembler = AssemblyCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&backend),
            Arc::clone(&jobs),
            events.clone(),
            assembly_retry,
        );

        Self {
            store,
            backend,
            jobs,
            events,
            renders,
            assembler,
        }
    }

    pub async fn approve(&self, project_id: &ProjectId, clip_id: &ClipId) -> WorkerResult<Clip> {
        let outcome = self
            .store
            .set_review_state(project_id, clip_id, ReviewDecision::Approve)
            .await?;
        Ok(outcome.clip)
    }

    /// Reject a clip and drop any render it had queued or running.
    pub async fn reject(&self, project_id: &ProjectId, clip_id: &ClipId) -> WorkerResult<Clip> {
        let outcome = self
            .store
            .set_review_state(project_id, clip_id, ReviewDecision::Reject)
            .await?;
        if let Some(job_id) = &outcome.cancelled_job {
            self.renders
                .release(project_id, clip_id, job_id, "clip rejected")
                .await;
        }
        Ok(outcome.clip)
    }

    pub async fn enqueue_render(&self, project_id: &ProjectId, clip_id: &ClipId) -> WorkerResult<JobHandle> {
        self.renders.enqueue(project_id, clip_id).await
    }

    pub async fn cancel_render(&self, project_id: &ProjectId, clip_id: &ClipId) -> WorkerResult<bool> {
        self.renders.cancel(project_id, clip_id).await
    }

    /// Queue every approved clip that is neither rendered nor in flight.
    pub async fn render_all(&self, project_id: &ProjectId) -> WorkerResult<Vec<JobHandle>> {
        let approved = self.store.approved_clips(project_id).await?;
        if approved.is_empty() {
            return Err(StoreError::empty_input(format!(
                "project {project_id} has no approved clips"
            ))
            .into());
        }

        let mut handles = Vec::new();
        for clip in approved {
            if clip.render_state == RenderState::Rendered || clip.render_state.is_in_flight() {
                continue;
            }
            handles.push(self.renders.enqueue(project_id, &clip.id).await?);
        }
        info!(project_id = %project_id, queued = handles.len(), "Batch render queued");
        Ok(handles)
    }

    pub async fn assemble(&self, project_id: &ProjectId) -> WorkerResult<JobHandle> {
        self.assembler.assemble(project_id).await
    }

    /// Wait for a job to finish, up to `timeout`.
    pub async fn wait_for_job(&self, job_id: &JobId, timeout: Duration) -> WorkerResult<JobRecord> {
        self.jobs.wait(job_id, timeout).await
    }

    pub async fn job(&self, job_id: &JobId) -> WorkerResult<JobRecord> {
        self.jobs
            .get(job_id)
            .await
            .ok_or_else(|| WorkerError::JobNotFound(job_id.clone()))
    }

    pub async fn status(&self, project_id: &ProjectId) -> WorkerResult<ProjectSnapshot> {
        Ok(self.store.snapshot(project_id).await?)
    }

    pub async fn list_projects(&self) -> Vec<ProjectSummary> {
        self.store.list_projects().await
    }

    pub async fn timeline(&self, project_id: &ProjectId) -> WorkerResult<TimelinePreview> {
        let snapshot = self.store.snapshot(project_id).await?;
        Ok(TimelinePreview::build(&snapshot))
    }

    /// Rewrite the approved clips' order hints for long-form pacing and
    /// return the resulting timeline.
    pub async fn arrange(&self, project_id: &ProjectId) -> WorkerResult<TimelinePreview> {
        let approved = self.store.approved_clips(project_id).await?;
        if approved.is_empty() {
            return Err(StoreError::empty_input(format!(
                "project {project_id} has no approved clips"
            ))
            .into());
        }

        let refs: Vec<&Clip> = approved.iter().collect();
        let orders = arrange_for_longform(&refs);
        let moved = self.store.set_clip_order(project_id, &orders).await?;
        info!(project_id = %project_id, moved, "Timeline arranged");

        self.timeline(project_id).await
    }

    /// Events for every project. Receivers filter by project themselves.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &Arc<ClipStore> {
        &self.store
    }

    pub fn backend(&self) -> &Arc<dyn RenderBackend> {
        &self.backend
    }

    /// Jobs waiting for a render slot.
    pub async fn queue_depth(&self) -> usize {
        self.renders.depth().await
    }

    pub fn shutdown(&self) {
        self.renders.shutdown();
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("store", &self.store)
            .field("backend", &self.backend.name())
            .field("renders", &self.renders)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use clipforge_media::{path_segment, ConcatRequest, MediaError, MediaResult, RenderRequest};
    use clipforge_models::{JobState, NewClip, ReviewState};

    const WAIT: Duration = Duration::from_secs(5);

    /// Backend whose behaviour is scripted per clip.
    #[derive(Default)]
    struct ScriptedBackend {
        renders: AtomicUsize,
        running: AtomicUsize,
        peak_running: AtomicUsize,
        concats: AtomicUsize,
        /// Errors returned by the next render calls of a clip, in order
        failures: Mutex<HashMap<String, Vec<MediaError>>>,
        /// When set, renders block until released
        gate: Option<Arc<Notify>>,
        started: Notify,
    }

    impl ScriptedBackend {
        fn gated(gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Default::default()
            }
        }

        fn fail_next(&self, clip: &str, errors: Vec<MediaError>) {
            self.failures.lock().unwrap().insert(clip.to_string(), errors);
        }
    }

    #[async_trait]
    impl RenderBackend for ScriptedBackend {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn render(&self, request: &RenderRequest) -> MediaResult<ArtifactKey> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_running.fetch_max(running, Ordering::SeqCst);
            self.started.notify_one();

            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.running.fetch_sub(1, Ordering::SeqCst);

            let scripted = {
                let mut failures = self.failures.lock().unwrap();
                failures.get_mut(request.clip_id.as_str()).and_then(|errors| {
                    if errors.is_empty() {
                        None
                    } else {
                        Some(errors.remove(0))
                    }
                })
            };
            if let Some(error) = scripted {
                return Err(error);
            }

            ArtifactKey::new(format!(
                "shorts/{}/{}.mp4",
                path_segment(request.project_id.as_str()),
                path_segment(request.clip_id.as_str())
            ))
            .map_err(|e| MediaError::internal(e.to_string()))
        }

        async fn concatenate(&self, request: &ConcatRequest) -> MediaResult<ArtifactKey> {
            self.concats.fetch_add(1, Ordering::SeqCst);
            ArtifactKey::new(format!(
                "longform/{}/{}.mp4",
                path_segment(request.project_id.as_str()),
                request.output_name
            ))
            .map_err(|e| MediaError::internal(e.to_string()))
        }

        async fn health_check(&self) -> MediaResult<()> {
            Ok(())
        }
    }

    fn config() -> WorkerConfig {
        WorkerConfig {
            render_concurrency: 4,
            render_max_attempts: 3,
            retry_base_delay: Duration::from_millis(5),
            retry_max_delay: Duration::from_millis(20),
            assembly_max_attempts: 2,
            ..Default::default()
        }
    }

    async fn setup(backend: Arc<ScriptedBackend>, clips: &[(&str, i64)]) -> Pipeline {
        setup_with(config(), backend, clips).await
    }

    async fn setup_with(
        config: WorkerConfig,
        backend: Arc<ScriptedBackend>,
        clips: &[(&str, i64)],
    ) -> Pipeline {
        let store = Arc::new(ClipStore::in_memory(3));
        let pid = ProjectId::from("p1");
        store.create_project(pid.clone(), "Demo").await.unwrap();
        for (id, order) in clips {
            store
                .insert_clip(NewClip {
                    id: ClipId::from(*id),
                    project_id: pid.clone(),
                    source_path: format!("/raw/{id}.mp4"),
                    start: Some(0.0),
                    end: Some(10.0),
                    order: Some(*order),
                    emotion_label: "Funny".to_string(),
                    score: 0.5,
                })
                .await
                .unwrap();
        }
        Pipeline::new(&config, store, backend)
    }

    fn pid() -> ProjectId {
        ProjectId::from("p1")
    }

    async fn wait_until(condition: impl Fn() -> bool) {
        tokio::time::timeout(WAIT, async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("condition not reached");
    }

    async fn approve_and_render(pipeline: &Pipeline, clip: &str) -> JobRecord {
        let cid = ClipId::from(clip);
        pipeline.approve(&pid(), &cid).await.unwrap();
        let handle = pipeline.enqueue_render(&pid(), &cid).await.unwrap();
        pipeline.wait_for_job(&handle.job_id, WAIT).await.unwrap()
    }

    #[tokio::test]
    async fn test_render_requires_approval() {
        let pipeline = setup(Arc::new(ScriptedBackend::default()), &[("c1", 0)]).await;
        let err = pipeline.enqueue_render(&pid(), &ClipId::from("c1")).await.unwrap_err();
        assert!(matches!(err, WorkerError::Store(StoreError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_duplicate_enqueue_runs_once() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(ScriptedBackend::gated(Arc::clone(&gate)));
        let pipeline = setup(Arc::clone(&backend), &[("c1", 0)]).await;
        let cid = ClipId::from("c1");
        pipeline.approve(&pid(), &cid).await.unwrap();

        let project_id = pid();
        let (a, b) = tokio::join!(
            pipeline.enqueue_render(&project_id, &cid),
            pipeline.enqueue_render(&project_id, &cid)
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.job_id, b.job_id);

        backend.started.notified().await;
        gate.notify_one();
        let record = pipeline.wait_for_job(&a.job_id, WAIT).await.unwrap();

        assert_eq!(record.state, JobState::Succeeded);
        assert_eq!(backend.renders.load(Ordering::SeqCst), 1);
        let clip = pipeline.store().get_clip(&pid(), &cid).await.unwrap();
        assert_eq!(clip.render_state, RenderState::Rendered);
        assert_eq!(clip.rendered_path.unwrap().as_str(), "shorts/p1/c1.mp4");
    }

    #[tokio::test]
    async fn test_reject_while_queued_cancels_render() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(ScriptedBackend::gated(Arc::clone(&gate)));
        let single_slot = WorkerConfig {
            render_concurrency: 1,
            ..config()
        };
        let pipeline = setup_with(single_slot, Arc::clone(&backend), &[("c1", 0), ("c2", 1)]).await;
        for clip in ["c1", "c2"] {
            pipeline.approve(&pid(), &ClipId::from(clip)).await.unwrap();
        }
        let running = pipeline.enqueue_render(&pid(), &ClipId::from("c1")).await.unwrap();
        backend.started.notified().await;
        let waiting = pipeline.enqueue_render(&pid(), &ClipId::from("c2")).await.unwrap();
        assert_eq!(pipeline.queue_depth().await, 1);

        let clip = pipeline.reject(&pid(), &ClipId::from("c2")).await.unwrap();
        assert_eq!(clip.review_state, ReviewState::Rejected);
        let record = pipeline.wait_for_job(&waiting.job_id, WAIT).await.unwrap();
        assert_eq!(record.state, JobState::Cancelled);
        assert_eq!(pipeline.queue_depth().await, 0);

        gate.notify_one();
        let record = pipeline.wait_for_job(&running.job_id, WAIT).await.unwrap();
        assert_eq!(record.state, JobState::Succeeded);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(backend.renders.load(Ordering::SeqCst), 1);
        let clip = pipeline.store().get_clip(&pid(), &ClipId::from("c2")).await.unwrap();
        assert_eq!(clip.render_state, RenderState::NotRendered);
        assert!(clip.rendered_path.is_none());
        assert!(clip.render_job.is_none());
    }

    #[tokio::test]
    async fn test_reject_during_retry_backoff_cancels_render() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.fail_next("c1", vec![MediaError::Timeout(1)]);
        let slow_retry = WorkerConfig {
            retry_base_delay: Duration::from_millis(300),
            retry_max_delay: Duration::from_secs(1),
            ..config()
        };
        let pipeline = setup_with(slow_retry, Arc::clone(&backend), &[("c1", 0)]).await;
        let cid = ClipId::from("c1");
        pipeline.approve(&pid(), &cid).await.unwrap();
        let handle = pipeline.enqueue_render(&pid(), &cid).await.unwrap();

        tokio::time::timeout(WAIT, async {
            while pipeline.job(&handle.job_id).await.unwrap().state != JobState::Retrying {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("render never entered backoff");
        assert_eq!(backend.renders.load(Ordering::SeqCst), 1);

        pipeline.reject(&pid(), &cid).await.unwrap();
        let record = pipeline.wait_for_job(&handle.job_id, WAIT).await.unwrap();
        assert_eq!(record.state, JobState::Cancelled);

        // Outlast the backoff so a stray requeue would have run.
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(backend.renders.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.queue_depth().await, 0);
        let clip = pipeline.store().get_clip(&pid(), &cid).await.unwrap();
        assert_ne!(clip.render_state, RenderState::Rendered);
        assert!(clip.rendered_path.is_none());
        let record = pipeline.job(&handle.job_id).await.unwrap();
        assert_eq!(record.state, JobState::Cancelled);
    }

    #[tokio::test]
    async fn test_reject_while_rendering_discards_result() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(ScriptedBackend::gated(Arc::clone(&gate)));
        let pipeline = setup(Arc::clone(&backend), &[("c1", 0)]).await;
        let cid = ClipId::from("c1");
        pipeline.approve(&pid(), &cid).await.unwrap();
        let handle = pipeline.enqueue_render(&pid(), &cid).await.unwrap();

        backend.started.notified().await;
        let clip = pipeline.reject(&pid(), &cid).await.unwrap();
        assert_eq!(clip.review_state, ReviewState::Rejected);
        gate.notify_one();

        let record = pipeline.wait_for_job(&handle.job_id, WAIT).await.unwrap();
        assert_eq!(record.state, JobState::Cancelled);

        // Give the finished render time to report back.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let clip = pipeline.store().get_clip(&pid(), &cid).await.unwrap();
        assert_ne!(clip.render_state, RenderState::Rendered);
        assert!(clip.rendered_path.is_none());
    }

    #[tokio::test]
    async fn test_enqueue_after_shutdown() {
        let pipeline = setup(Arc::new(ScriptedBackend::default()), &[("c1", 0)]).await;
        pipeline.shutdown();

        let cid = ClipId::from("c1");
        pipeline.approve(&pid(), &cid).await.unwrap();
        let err = pipeline.enqueue_render(&pid(), &cid).await.unwrap_err();
        assert!(matches!(err, WorkerError::QueueClosed));
        assert!(!pipeline.cancel_render(&pid(), &cid).await.unwrap());
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(ScriptedBackend::gated(Arc::clone(&gate)));
        let single_slot = WorkerConfig {
            render_concurrency: 1,
            ..config()
        };
        let pipeline = setup_with(single_slot, Arc::clone(&backend), &[("c1", 0), ("c2", 1)]).await;
        for clip in ["c1", "c2"] {
            pipeline.approve(&pid(), &ClipId::from(clip)).await.unwrap();
        }
        let running = pipeline.enqueue_render(&pid(), &ClipId::from("c1")).await.unwrap();
        backend.started.notified().await;
        let waiting = pipeline.enqueue_render(&pid(), &ClipId::from("c2")).await.unwrap();
        assert_eq!(pipeline.queue_depth().await, 1);

        assert!(pipeline.cancel_render(&pid(), &ClipId::from("c2")).await.unwrap());
        let record = pipeline.wait_for_job(&waiting.job_id, WAIT).await.unwrap();
        assert_eq!(record.state, JobState::Cancelled);
        assert_eq!(pipeline.queue_depth().await, 0);

        gate.notify_one();
        let record = pipeline.wait_for_job(&running.job_id, WAIT).await.unwrap();
        assert_eq!(record.state, JobState::Succeeded);
        assert_eq!(backend.renders.load(Ordering::SeqCst), 1);

        let clip = pipeline.store().get_clip(&pid(), &ClipId::from("c2")).await.unwrap();
        assert_eq!(clip.render_state, RenderState::NotRendered);
        assert!(clip.render_job.is_none());
    }

    #[tokio::test]
    async fn test_retry_then_fail_is_final() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.fail_next(
            "c1",
            vec![
                MediaError::Timeout(1),
                MediaError::Timeout(1),
                MediaError::Timeout(1),
            ],
        );
        let pipeline = setup(Arc::clone(&backend), &[("c1", 0)]).await;

        let record = approve_and_render(&pipeline, "c1").await;
        assert_eq!(record.state, JobState::Failed);
        assert_eq!(record.attempts, 3);
        assert_eq!(backend.renders.load(Ordering::SeqCst), 3);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(backend.renders.load(Ordering::SeqCst), 3);
        let clip = pipeline.store().get_clip(&pid(), &ClipId::from("c1")).await.unwrap();
        assert_eq!(clip.render_state, RenderState::Failed);
        assert!(clip.render_error.is_some());
    }

    #[tokio::test]
    async fn test_transient_failure_recovers() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.fail_next("c1", vec![MediaError::service(Some(503), "busy")]);
        let pipeline = setup(Arc::clone(&backend), &[("c1", 0)]).await;

        let record = approve_and_render(&pipeline, "c1").await;
        assert_eq!(record.state, JobState::Succeeded);
        assert_eq!(record.attempts, 2);
    }

    #[tokio::test]
    async fn test_malformed_input_fails_after_one_attempt() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.fail_next("c1", vec![MediaError::invalid_input("unreadable source")]);
        let pipeline = setup(Arc::clone(&backend), &[("c1", 0)]).await;

        let record = approve_and_render(&pipeline, "c1").await;
        assert_eq!(record.state, JobState::Failed);
        assert_eq!(backend.renders.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_two_clips_render_concurrently() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(ScriptedBackend::gated(Arc::clone(&gate)));
        let pipeline = setup(Arc::clone(&backend), &[("c1", 0), ("c2", 1)]).await;
        for clip in ["c1", "c2"] {
            pipeline.approve(&pid(), &ClipId::from(clip)).await.unwrap();
        }

        let handles = pipeline.render_all(&pid()).await.unwrap();
        assert_eq!(handles.len(), 2);

        wait_until(|| backend.running.load(Ordering::SeqCst) == 2).await;
        assert_eq!(backend.peak_running.load(Ordering::SeqCst), 2);
        gate.notify_waiters();

        for handle in &handles {
            let record = pipeline.wait_for_job(&handle.job_id, WAIT).await.unwrap();
            assert_eq!(record.state, JobState::Succeeded);
        }
        let snapshot = pipeline.status(&pid()).await.unwrap();
        assert!(snapshot.clips.iter().all(|c| c.render_state == RenderState::Rendered));
    }

    #[tokio::test]
    async fn test_render_all_requires_approved_clips() {
        let pipeline = setup(Arc::new(ScriptedBackend::default()), &[("c1", 0)]).await;
        let err = pipeline.render_all(&pid()).await.unwrap_err();
        assert!(matches!(err, WorkerError::Store(StoreError::EmptyInput(_))));
    }

    #[tokio::test]
    async fn test_assembly_preconditions() {
        let pipeline = setup(Arc::new(ScriptedBackend::default()), &[("c1", 0), ("c2", 1)]).await;

        let err = pipeline.assemble(&pid()).await.unwrap_err();
        assert!(matches!(err, WorkerError::Store(StoreError::EmptyInput(_))));

        approve_and_render(&pipeline, "c1").await;
        pipeline.approve(&pid(), &ClipId::from("c2")).await.unwrap();
        let err = pipeline.assemble(&pid()).await.unwrap_err();
        match err {
            WorkerError::Store(StoreError::NotReady { clips }) => {
                assert_eq!(clips, vec![ClipId::from("c2")]);
            }
            other => panic!("expected NotReady, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reassembly_after_new_approval() {
        let backend = Arc::new(ScriptedBackend::default());
        let pipeline = setup(Arc::clone(&backend), &[("c1", 0), ("c2", 1)]).await;
        approve_and_render(&pipeline, "c1").await;

        let first = pipeline.assemble(&pid()).await.unwrap();
        let first = pipeline.wait_for_job(&first.job_id, WAIT).await.unwrap();
        assert_eq!(first.state, JobState::Succeeded);
        let snapshot = pipeline.status(&pid()).await.unwrap();
        assert_eq!(snapshot.project.assembly_state, AssemblyState::Assembled);

        approve_and_render(&pipeline, "c2").await;
        let snapshot = pipeline.status(&pid()).await.unwrap();
        assert_eq!(snapshot.project.assembly_state, AssemblyState::Idle);
        assert!(snapshot.project.assembled_output_path.is_none());

        let second = pipeline.assemble(&pid()).await.unwrap();
        let second = pipeline.wait_for_job(&second.job_id, WAIT).await.unwrap();
        assert_eq!(second.state, JobState::Succeeded);
        assert_ne!(first.output, second.output);
        assert_eq!(backend.concats.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_timeline_and_arrange() {
        let pipeline = setup(
            Arc::new(ScriptedBackend::default()),
            &[("a", 2), ("b", 1), ("c1", 1), ("c0", 1)],
        )
        .await;
        for clip in ["a", "b", "c1", "c0"] {
            pipeline.approve(&pid(), &ClipId::from(clip)).await.unwrap();
        }

        let preview = pipeline.timeline(&pid()).await.unwrap();
        let ids: Vec<&str> = preview.entries.iter().map(|e| e.clip_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c0", "c1", "a"]);
        assert!(!preview.ready);
        assert!(preview.fingerprint.is_none());

        let arranged = pipeline.arrange(&pid()).await.unwrap();
        let orders: Vec<i64> = arranged.entries.iter().map(|e| e.order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3]);
    }
}
