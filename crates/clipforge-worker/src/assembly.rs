//! Long-form assembly jobs.

use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use clipforge_media::{ConcatRequest, MediaError, RenderBackend};
use clipforge_models::{ArtifactKey, JobHandle, PipelineEventKind, ProjectId};
use clipforge_store::{AssemblyOutcome, AssemblyPlan, AssemblyRecord, ClipStore};

use crate::error::WorkerResult;
use crate::events::EventBus;
use crate::jobs::JobRegistry;
use crate::logging::JobLogger;
use crate::metrics;
use crate::retry::RetryConfig;

/// Runs at most one concatenation per project.
///
/// Preconditions and the `Assembling` claim are checked atomically by the
/// store; the concatenation itself runs on a spawned task and its result is
/// kept only if the approved set still matches the captured fingerprint.
#[derive(Clone)]
pub struct AssemblyCoordinator {
    store: Arc<ClipStore>,
    backend: Arc<dyn RenderBackend>,
    jobs: Arc<JobRegistry>,
    events: EventBus,
    retry: RetryConfig,
}

impl AssemblyCoordinator {
    pub fn new(
        store: Arc<ClipStore>,
        backend: Arc<dyn RenderBackend>,
        jobs: Arc<JobRegistry>,
        events: EventBus,
        retry: RetryConfig,
    ) -> Self {
        Self {
            store,
            backend,
            jobs,
            events,
            retry,
        }
    }

    /// Start assembling a project.
    ///
    /// Fails with `Conflict` while another assembly runs, `NotReady` when an
    /// approved clip is not rendered and `EmptyInput` when nothing is approved.
    pub async fn assemble(&self, project_id: &ProjectId) -> WorkerResult<JobHandle> {
        let handle = JobHandle::assemble(project_id.clone());
        let plan = self.store.begin_assembly(project_id, &handle.job_id).await?;
        self.jobs.register(handle.clone()).await;

        let logger = JobLogger::new(&handle);
        let span = logger.create_span();
        let this = self.clone();
        let job = handle.clone();
        tokio::spawn(async move { this.run(job, plan, logger).await }.instrument(span));

        Ok(handle)
    }

    async fn run(&self, handle: JobHandle, plan: AssemblyPlan, logger: JobLogger) {
        let project_id = &handle.project_id;
        let job_id = &handle.job_id;
        let started = Instant::now();

        self.events.publish(
            project_id,
            job_id,
            PipelineEventKind::AssemblyStarted {
                clips: plan.inputs.len(),
                fingerprint: plan.fingerprint.clone(),
            },
        );
        logger.log_start(&format!("{} clips", plan.inputs.len()));

        let request = ConcatRequest {
            project_id: project_id.clone(),
            inputs: plan.inputs.iter().map(|(_, key)| key.clone()).collect(),
            output_name: output_name(&plan.fingerprint),
        };

        let (attempts, result) = self.concatenate_with_retry(&handle, &request, &logger).await;

        let outcome = match &result {
            Ok(output) => AssemblyOutcome::Success {
                output: output.clone(),
            },
            Err(e) => AssemblyOutcome::Failure {
                reason: e.to_string(),
            },
        };

        let record = match self.store.finish_assembly(project_id, job_id, outcome).await {
            Ok(record) => record,
            Err(e) => {
                logger.log_error(&e.to_string());
                self.jobs.mark_failed(job_id, attempts, e.to_string()).await;
                metrics::record_assembly("failed", started.elapsed());
                return;
            }
        };

        match (record, result) {
            (AssemblyRecord::Assembled(project), Ok(output)) => {
                let output = project.assembled_output_path.unwrap_or(output);
                self.jobs.mark_succeeded(job_id, attempts, output.clone()).await;
                self.events.publish(
                    project_id,
                    job_id,
                    PipelineEventKind::AssemblyCompleted {
                        output: output.clone(),
                    },
                );
                metrics::record_assembly("succeeded", started.elapsed());
                logger.log_completion(output.as_str());
            }
            (AssemblyRecord::Failed(project), result) => {
                let reason = project
                    .assembly_error
                    .or_else(|| result.err().map(|e| e.to_string()))
                    .unwrap_or_else(|| "assembly failed".to_string());
                self.jobs.mark_failed(job_id, attempts, reason.clone()).await;
                self.events.publish(
                    project_id,
                    job_id,
                    PipelineEventKind::AssemblyFailed {
                        error: reason.clone(),
                    },
                );
                metrics::record_assembly("failed", started.elapsed());
                logger.log_error(&reason);
            }
            (AssemblyRecord::Discarded(_), _) => {
                self.jobs
                    .mark_cancelled(job_id, "approved clips changed during assembly")
                    .await;
                self.events
                    .publish(project_id, job_id, PipelineEventKind::AssemblyDiscarded);
                metrics::record_assembly("discarded", started.elapsed());
                logger.log_warning("approved clips changed during assembly, output discarded");
            }
            (AssemblyRecord::Stale, _) => {
                self.jobs.mark_cancelled(job_id, "assembly superseded").await;
                metrics::record_assembly("discarded", started.elapsed());
                logger.log_warning("project no longer owned by this job");
            }
            (AssemblyRecord::Assembled(_), Err(e)) => {
                // The store only records success for a successful outcome.
                self.jobs.mark_failed(job_id, attempts, e.to_string()).await;
                metrics::record_assembly("failed", started.elapsed());
            }
        }
    }

    /// Call the backend until it succeeds, fails permanently or the attempt
    /// budget runs out. Returns the number of attempts made.
    async fn concatenate_with_retry(
        &self,
        handle: &JobHandle,
        request: &ConcatRequest,
        logger: &JobLogger,
    ) -> (u32, Result<ArtifactKey, MediaError>) {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.jobs.mark_running(&handle.job_id, attempt).await;

            let error = match self.backend.concatenate(request).await {
                Ok(output) => return (attempt, Ok(output)),
                Err(e) => e,
            };

            let Some(delay) = self.retry.next_delay(attempt, error.is_retryable()) else {
                return (attempt, Err(error));
            };

            logger.log_warning(&format!("attempt {attempt} failed, retrying in {delay:?}: {error}"));
            self.jobs
                .mark_retrying(&handle.job_id, attempt, error.to_string())
                .await;
            self.events.publish(
                &handle.project_id,
                &handle.job_id,
                PipelineEventKind::AssemblyRetrying {
                    attempt,
                    delay_ms: delay.as_millis() as u64,
                    error: error.to_string(),
                },
            );
            tokio::time::sleep(delay).await;
        }
    }
}

impl std::fmt::Debug for AssemblyCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssemblyCoordinator")
            .field("backend", &self.backend.name())
            .field("retry", &self.retry)
            .finish()
    }
}

/// Output file stem for an input set. Distinct sets get distinct names.
pub fn output_name(fingerprint: &str) -> String {
    let short: String = fingerprint.chars().take(16).collect();
    format!("longform_{short}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_name_follows_fingerprint() {
        let a = output_name("0123456789abcdef0123456789abcdef");
        let b = output_name("fedcba9876543210fedcba9876543210");
        assert_eq!(a, "longform_0123456789abcdef");
        assert_ne!(a, b);
        assert_eq!(output_name("abc"), "longform_abc");
    }
}
