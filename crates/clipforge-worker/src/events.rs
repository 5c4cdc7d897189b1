//! In-process pipeline event bus.

use tokio::sync::broadcast;
use tracing::debug;

use clipforge_models::{JobId, PipelineEvent, PipelineEventKind, ProjectId};

/// Broadcast channel for [`PipelineEvent`]s.
///
/// Publishing never blocks; subscribers that fall behind skip the oldest
/// events and see a `Lagged` error from their receiver.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, project_id: &ProjectId, job_id: &JobId, kind: PipelineEventKind) {
        let event = PipelineEvent::new(project_id.clone(), job_id.clone(), kind);
        debug!(
            project_id = %project_id,
            job_id = %job_id,
            event = event.kind.name(),
            "Publishing pipeline event"
        );
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_models::ClipId;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let job = JobId::new();

        bus.publish(
            &ProjectId::from("p1"),
            &job,
            PipelineEventKind::RenderQueued {
                clip_id: ClipId::from("c1"),
            },
        );

        let event = rx.recv().await.unwrap();
        assert_eq!(event.job_id, job);
        assert_eq!(event.kind.name(), "render_queued");
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(1);
        bus.publish(&ProjectId::from("p1"), &JobId::new(), PipelineEventKind::AssemblyDiscarded);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
