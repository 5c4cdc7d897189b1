//! Bounded-concurrency render queue.
//!
//! Jobs run in FIFO order on a fixed number of slots. A clip is never
//! rendered by two jobs at once: while one execution for a clip is running,
//! later jobs for the same clip stay queued behind it.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{watch, Mutex, Notify, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn, Instrument};

use clipforge_media::{RenderBackend, RenderRequest};
use clipforge_models::{ClipId, JobHandle, JobId, JobKind, PipelineEventKind, ProjectId};
use clipforge_store::{ClipStore, RenderAdmission, RenderOutcome, RenderRecord};

use crate::error::{WorkerError, WorkerResult};
use crate::events::EventBus;
use crate::jobs::JobRegistry;
use crate::logging::JobLogger;
use crate::metrics;
use crate::retry::RetryConfig;

type ClipKey = (ProjectId, ClipId);

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<JobHandle>,
    executing: HashSet<ClipKey>,
}

impl QueueState {
    /// Pop the oldest job whose clip is not currently executing.
    fn take_next(&mut self) -> Option<JobHandle> {
        let index = self
            .pending
            .iter()
            .position(|job| !self.executing.contains(&clip_key(job)))?;
        let job = self.pending.remove(index)?;
        self.executing.insert(clip_key(&job));
        Some(job)
    }

    fn remove_pending(&mut self, job_id: &JobId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|job| &job.job_id != job_id);
        self.pending.len() != before
    }
}

fn clip_key(job: &JobHandle) -> ClipKey {
    (
        job.project_id.clone(),
        job.clip_id.clone().unwrap_or_else(|| ClipId::from("")),
    )
}

fn render_handle(project_id: &ProjectId, clip_id: &ClipId, job_id: JobId) -> JobHandle {
    JobHandle {
        job_id,
        kind: JobKind::Render,
        project_id: project_id.clone(),
        clip_id: Some(clip_id.clone()),
    }
}

struct QueueInner {
    store: Arc<ClipStore>,
    backend: Arc<dyn RenderBackend>,
    jobs: Arc<JobRegistry>,
    events: EventBus,
    retry: RetryConfig,
    slots: Arc<Semaphore>,
    state: Mutex<QueueState>,
    wake: Notify,
    shutdown: watch::Sender<bool>,
}

/// Render job queue backed by a worker pool.
#[derive(Clone)]
pub struct RenderQueue {
    inner: Arc<QueueInner>,
}

impl RenderQueue {
    /// Create the queue and spawn its dispatcher on the current runtime.
    pub fn start(
        store: Arc<ClipStore>,
        backend: Arc<dyn RenderBackend>,
        jobs: Arc<JobRegistry>,
        events: EventBus,
        retry: RetryConfig,
        concurrency: usize,
    ) -> Self {
        let concurrency = concurrency.max(1);
        let (shutdown, _) = watch::channel(false);
        let inner = Arc::new(QueueInner {
            store,
            backend,
            jobs,
            events,
            retry,
            slots: Arc::new(Semaphore::new(concurrency)),
            state: Mutex::new(QueueState::default()),
            wake: Notify::new(),
            shutdown,
        });

        info!(concurrency, backend = inner.backend.name(), "Starting render queue");
        tokio::spawn(Arc::clone(&inner).dispatch());

        Self { inner }
    }

    /// Admit a render for an approved clip.
    ///
    /// A clip that is already queued or rendering returns the handle of the
    /// job that owns it; no second job is created.
    pub async fn enqueue(&self, project_id: &ProjectId, clip_id: &ClipId) -> WorkerResult<JobHandle> {
        if *self.inner.shutdown.borrow() {
            return Err(WorkerError::QueueClosed);
        }

        let handle = JobHandle::render(project_id.clone(), clip_id.clone());
        self.inner.jobs.register(handle.clone()).await;

        let admission = match self
            .inner
            .store
            .mark_render_queued(project_id, clip_id, &handle.job_id)
            .await
        {
            Ok(admission) => admission,
            Err(e) => {
                self.inner.jobs.remove(&handle.job_id).await;
                return Err(e.into());
            }
        };

        match admission {
            RenderAdmission::InFlight { job_id, .. } => {
                self.inner.jobs.remove(&handle.job_id).await;
                debug!(
                    project_id = %project_id,
                    clip_id = %clip_id,
                    job_id = %job_id,
                    "Render already in flight"
                );
                Ok(render_handle(project_id, clip_id, job_id))
            }
            RenderAdmission::Admitted(_) => {
                self.inner.push(handle.clone()).await;
                self.inner.events.publish(
                    project_id,
                    &handle.job_id,
                    PipelineEventKind::RenderQueued {
                        clip_id: clip_id.clone(),
                    },
                );
                info!(
                    project_id = %project_id,
                    clip_id = %clip_id,
                    job_id = %handle.job_id,
                    "Render queued"
                );
                Ok(handle)
            }
        }
    }

    /// Cancel the clip's current render, if any.
    ///
    /// A job that has not started is dropped from the queue. A job that is
    /// already executing finishes, but its result is discarded. Returns
    /// whether a job was cancelled.
    pub async fn cancel(&self, project_id: &ProjectId, clip_id: &ClipId) -> WorkerResult<bool> {
        let clip = self.inner.store.get_clip(project_id, clip_id).await?;
        let Some(job_id) = clip.render_job.filter(|_| clip.render_state.is_in_flight()) else {
            return Ok(false);
        };

        let released = self
            .inner
            .store
            .cancel_render(project_id, clip_id, &job_id)
            .await?;
        if released {
            self.release(project_id, clip_id, &job_id, "cancelled").await;
        }
        Ok(released)
    }

    /// Forget a job the store has already released, e.g. after a rejection.
    pub async fn release(&self, project_id: &ProjectId, clip_id: &ClipId, job_id: &JobId, reason: &str) {
        let was_pending = self.inner.state.lock().await.remove_pending(job_id);
        if was_pending {
            self.inner.update_depth().await;
        }
        self.inner
            .finish_cancelled(project_id, clip_id, job_id, reason, "cancelled")
            .await;
    }

    /// Jobs waiting for a slot.
    pub async fn depth(&self) -> usize {
        self.inner.state.lock().await.pending.len()
    }

    /// Stop dispatching. Executing renders are left to finish.
    pub fn shutdown(&self) {
        info!("Stopping render queue");
        self.inner.shutdown.send_replace(true);
    }
}

impl std::fmt::Debug for RenderQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderQueue")
            .field("backend", &self.inner.backend.name())
            .field("available_slots", &self.inner.slots.available_permits())
            .finish()
    }
}

impl QueueInner {
    async fn push(&self, handle: JobHandle) {
        let depth = {
            let mut state = self.state.lock().await;
            state.pending.push_back(handle);
            state.pending.len()
        };
        metrics::set_queue_depth(depth);
        self.wake.notify_one();
    }

    async fn update_depth(&self) {
        let depth = self.state.lock().await.pending.len();
        metrics::set_queue_depth(depth);
    }

    async fn dispatch(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();

        loop {
            let permit = tokio::select! {
                _ = shutdown.changed() => break,
                permit = Arc::clone(&self.slots).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let job = loop {
                let next = self.state.lock().await.take_next();
                if let Some(job) = next {
                    break Some(job);
                }
                tokio::select! {
                    _ = shutdown.changed() => break None,
                    _ = self.wake.notified() => {}
                }
            };
            let Some(job) = job else { break };

            self.update_depth().await;
            tokio::spawn(Arc::clone(&self).execute(job, permit));
        }

        info!("Render queue dispatcher stopped");
    }

    async fn execute(self: Arc<Self>, job: JobHandle, permit: OwnedSemaphorePermit) {
        let _permit = permit;
        let logger = JobLogger::new(&job);
        let span = logger.create_span();

        self.run_render(&job, &logger).instrument(span).await;

        self.state.lock().await.executing.remove(&clip_key(&job));
        self.wake.notify_one();
    }

    async fn run_render(self: &Arc<Self>, job: &JobHandle, logger: &JobLogger) {
        let project_id = &job.project_id;
        let Some(clip_id) = job.clip_id.as_ref() else {
            logger.log_error("render job without a clip");
            self.jobs.mark_failed(&job.job_id, 0, "render job without a clip".to_string()).await;
            return;
        };

        let clip = match self.store.get_clip(project_id, clip_id).await {
            Ok(clip) => clip,
            Err(e) => {
                logger.log_error(&e.to_string());
                self.jobs.mark_failed(&job.job_id, 0, e.to_string()).await;
                return;
            }
        };

        let attempt = match self.store.mark_rendering(project_id, clip_id, &job.job_id).await {
            Ok(Some(attempt)) => attempt,
            Ok(None) => {
                logger.log_warning("clip no longer owned by this job, skipping");
                self.finish_cancelled(project_id, clip_id, &job.job_id, "cancelled", "cancelled")
                    .await;
                return;
            }
            Err(e) => {
                logger.log_error(&e.to_string());
                self.jobs.mark_failed(&job.job_id, 0, e.to_string()).await;
                return;
            }
        };

        self.jobs.mark_running(&job.job_id, attempt).await;
        self.events.publish(
            project_id,
            &job.job_id,
            PipelineEventKind::RenderStarted {
                clip_id: clip_id.clone(),
                attempt,
            },
        );
        logger.log_start(&format!("attempt {attempt}"));

        let request = RenderRequest {
            project_id: project_id.clone(),
            clip_id: clip_id.clone(),
            job_id: job.job_id.clone(),
            source_path: clip.source_path,
            start: clip.start,
            end: clip.end,
        };

        let started = Instant::now();
        let result = self.backend.render(&request).await;
        metrics::record_render_duration(started.elapsed());

        let (outcome, reason) = match result {
            Ok(output) => (RenderOutcome::Success { output }, None),
            Err(e) => {
                let reason = e.to_string();
                let retryable = e.is_retryable();
                logger.log_warning(&format!("render failed (retryable: {retryable}): {reason}"));
                (
                    RenderOutcome::Failure {
                        reason: reason.clone(),
                        retryable,
                    },
                    Some(reason),
                )
            }
        };
        let reason = reason.unwrap_or_default();

        let record = match self
            .store
            .record_render_result(project_id, clip_id, &job.job_id, outcome)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                logger.log_error(&e.to_string());
                self.jobs.mark_failed(&job.job_id, attempt, e.to_string()).await;
                return;
            }
        };

        match record {
            RenderRecord::Rendered(clip) => {
                let Some(output) = clip.rendered_path else {
                    self.jobs
                        .mark_failed(&job.job_id, attempt, "rendered without artifact".to_string())
                        .await;
                    return;
                };
                self.jobs.mark_succeeded(&job.job_id, attempt, output.clone()).await;
                self.events.publish(
                    project_id,
                    &job.job_id,
                    PipelineEventKind::RenderSucceeded {
                        clip_id: clip_id.clone(),
                        output: output.clone(),
                    },
                );
                metrics::record_render("succeeded");
                logger.log_completion(output.as_str());
            }
            RenderRecord::RetryScheduled { attempts, .. } => {
                let delay = self.retry.delay_for_attempt(attempts);
                self.jobs.mark_retrying(&job.job_id, attempts, reason.clone()).await;
                self.events.publish(
                    project_id,
                    &job.job_id,
                    PipelineEventKind::RenderRetrying {
                        clip_id: clip_id.clone(),
                        attempt: attempts,
                        delay_ms: delay.as_millis() as u64,
                        error: reason,
                    },
                );
                metrics::record_render("retrying");
                logger.log_progress(&format!("retrying in {delay:?}"));
                tokio::spawn(Arc::clone(self).requeue_after(job.clone(), delay));
            }
            RenderRecord::Failed(clip) => {
                self.jobs
                    .mark_failed(&job.job_id, clip.render_attempts, reason.clone())
                    .await;
                self.events.publish(
                    project_id,
                    &job.job_id,
                    PipelineEventKind::RenderFailed {
                        clip_id: clip_id.clone(),
                        attempts: clip.render_attempts,
                        error: reason,
                    },
                );
                metrics::record_render("failed");
                logger.log_error(&format!("gave up after {} attempts", clip.render_attempts));
            }
            RenderRecord::Discarded => {
                logger.log_warning("result discarded, clip was released while rendering");
                self.finish_cancelled(project_id, clip_id, &job.job_id, "result discarded", "discarded")
                    .await;
            }
        }
    }

    async fn requeue_after(self: Arc<Self>, job: JobHandle, delay: Duration) {
        let mut shutdown = self.shutdown.subscribe();
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = tokio::time::sleep(delay) => {}
        }

        // Cancelled while backing off.
        match self.jobs.get(&job.job_id).await {
            Some(record) if !record.state.is_terminal() => {}
            _ => return,
        }

        self.jobs.mark_queued(&job.job_id).await;
        self.push(job).await;
    }

    async fn finish_cancelled(
        &self,
        project_id: &ProjectId,
        clip_id: &ClipId,
        job_id: &JobId,
        reason: &str,
        outcome: &'static str,
    ) {
        if !self.jobs.mark_cancelled(job_id, reason).await {
            return;
        }
        self.events.publish(
            project_id,
            job_id,
            PipelineEventKind::RenderCancelled {
                clip_id: clip_id.clone(),
            },
        );
        metrics::record_render(outcome);
        warn!(
            project_id = %project_id,
            clip_id = %clip_id,
            job_id = %job_id,
            reason,
            "Render job cancelled"
        );
    }
}
