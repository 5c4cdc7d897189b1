//! Job status registry.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Notify, RwLock};

use clipforge_models::{ArtifactKey, JobHandle, JobId, JobRecord, JobState};

use crate::error::{WorkerError, WorkerResult};

#[derive(Debug, Default)]
struct JobTable {
    records: HashMap<JobId, JobRecord>,
    /// Insertion order, used to evict the oldest finished records.
    order: VecDeque<JobId>,
}

/// Bounded in-memory record of render and assembly jobs.
///
/// Active jobs are never evicted; once more than `history_limit` records
/// exist, the oldest finished ones are dropped.
#[derive(Debug)]
pub struct JobRegistry {
    table: RwLock<JobTable>,
    finished: Notify,
    history_limit: usize,
}

impl JobRegistry {
    pub fn new(history_limit: usize) -> Self {
        Self {
            table: RwLock::new(JobTable::default()),
            finished: Notify::new(),
            history_limit: history_limit.max(1),
        }
    }

    /// Start tracking a job in `Queued`.
    pub async fn register(&self, handle: JobHandle) -> JobRecord {
        let record = JobRecord::new(handle);
        let mut table = self.table.write().await;
        table.order.push_back(record.job_id().clone());
        table.records.insert(record.job_id().clone(), record.clone());
        self.evict(&mut table);
        record
    }

    fn evict(&self, table: &mut JobTable) {
        let mut excess = table.records.len().saturating_sub(self.history_limit);
        if excess == 0 {
            return;
        }
        let JobTable { records, order } = table;
        order.retain(|id| {
            if excess == 0 {
                return true;
            }
            match records.get(id) {
                Some(record) if record.state.is_terminal() => {
                    records.remove(id);
                    excess -= 1;
                    false
                }
                Some(_) => true,
                None => false,
            }
        });
    }

    /// Forget a job that was never admitted.
    pub async fn remove(&self, job_id: &JobId) {
        let mut table = self.table.write().await;
        table.records.remove(job_id);
        table.order.retain(|id| id != job_id);
    }

    pub async fn get(&self, job_id: &JobId) -> Option<JobRecord> {
        self.table.read().await.records.get(job_id).cloned()
    }

    /// Apply `f` to a job record. Terminal records are left alone.
    /// Returns whether the record changed.
    async fn update<F>(&self, job_id: &JobId, f: F) -> bool
    where
        F: FnOnce(&mut JobRecord),
    {
        let mut table = self.table.write().await;
        let Some(record) = table.records.get_mut(job_id) else {
            return false;
        };
        if record.state.is_terminal() {
            return false;
        }
        f(record);
        record.updated_at = Utc::now();
        let finished = record.state.is_terminal();
        drop(table);

        if finished {
            self.finished.notify_waiters();
        }
        true
    }

    pub async fn mark_running(&self, job_id: &JobId, attempt: u32) {
        self.update(job_id, |r| {
            r.state = JobState::Running;
            r.attempts = attempt;
        })
        .await;
    }

    pub async fn mark_retrying(&self, job_id: &JobId, attempts: u32, error: String) {
        self.update(job_id, |r| {
            r.state = JobState::Retrying;
            r.attempts = attempts;
            r.error = Some(error);
        })
        .await;
    }

    pub async fn mark_queued(&self, job_id: &JobId) {
        self.update(job_id, |r| r.state = JobState::Queued).await;
    }

    pub async fn mark_succeeded(&self, job_id: &JobId, attempts: u32, output: ArtifactKey) {
        self.update(job_id, |r| {
            r.state = JobState::Succeeded;
            r.attempts = attempts;
            r.output = Some(output);
            r.error = None;
        })
        .await;
    }

    pub async fn mark_failed(&self, job_id: &JobId, attempts: u32, error: String) {
        self.update(job_id, |r| {
            r.state = JobState::Failed;
            r.attempts = attempts.max(r.attempts);
            r.error = Some(error);
        })
        .await;
    }

    /// Returns false when the job had already finished.
    pub async fn mark_cancelled(&self, job_id: &JobId, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        self.update(job_id, |r| {
            r.state = JobState::Cancelled;
            r.error = Some(reason);
        })
        .await
    }

    /// Jobs not yet finished.
    pub async fn active_count(&self) -> usize {
        self.table
            .read()
            .await
            .records
            .values()
            .filter(|r| !r.state.is_terminal())
            .count()
    }

    /// Wait until the job reaches a terminal state.
    pub async fn wait(&self, job_id: &JobId, timeout: Duration) -> WorkerResult<JobRecord> {
        let wait = async {
            loop {
                let notified = self.finished.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                match self.get(job_id).await {
                    Some(record) if record.state.is_terminal() => return Ok(record),
                    Some(_) => notified.await,
                    None => return Err(WorkerError::JobNotFound(job_id.clone())),
                }
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| WorkerError::Timeout(timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use clipforge_models::{ClipId, ProjectId};

    fn render_handle() -> JobHandle {
        JobHandle::render(ProjectId::from("p1"), ClipId::from("c1"))
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let registry = JobRegistry::new(10);
        let handle = render_handle();
        registry.register(handle.clone()).await;

        registry.mark_running(&handle.job_id, 1).await;
        registry
            .mark_succeeded(&handle.job_id, 1, ArtifactKey::new("shorts/p1/c1.mp4").unwrap())
            .await;
        // Terminal records do not move again.
        registry.mark_failed(&handle.job_id, 2, "late".to_string()).await;
        assert!(!registry.mark_cancelled(&handle.job_id, "late").await);

        let record = registry.get(&handle.job_id).await.unwrap();
        assert_eq!(record.state, JobState::Succeeded);
        assert_eq!(record.attempts, 1);
    }

    #[tokio::test]
    async fn test_eviction_keeps_active_jobs() {
        let registry = JobRegistry::new(2);
        let active = render_handle();
        registry.register(active.clone()).await;

        let mut finished = Vec::new();
        for _ in 0..3 {
            let handle = render_handle();
            registry.register(handle.clone()).await;
            registry.mark_failed(&handle.job_id, 1, "boom".to_string()).await;
            finished.push(handle);
        }
        registry.register(render_handle()).await;

        assert!(registry.get(&active.job_id).await.is_some());
        assert!(registry.get(&finished[0].job_id).await.is_none());
    }

    #[tokio::test]
    async fn test_wait_returns_on_completion() {
        let registry = Arc::new(JobRegistry::new(10));
        let handle = render_handle();
        registry.register(handle.clone()).await;

        let waiter = {
            let registry = Arc::clone(&registry);
            let job_id = handle.job_id.clone();
            tokio::spawn(async move { registry.wait(&job_id, Duration::from_secs(5)).await })
        };
        tokio::task::yield_now().await;
        registry.mark_failed(&handle.job_id, 1, "boom".to_string()).await;

        let record = waiter.await.unwrap().unwrap();
        assert_eq!(record.state, JobState::Failed);
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let registry = JobRegistry::new(10);
        let handle = render_handle();
        registry.register(handle.clone()).await;
        let err = registry
            .wait(&handle.job_id, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Timeout(_)));

        let err = registry
            .wait(&JobId::new(), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::JobNotFound(_)));
    }
}
