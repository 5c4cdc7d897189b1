//! In-memory project state and the transitions applied to it.
//!
//! Every method here runs under the store's write lock, so a transition either
//! fully applies or returns an error without touching the entry.

use std::collections::BTreeMap;

use clipforge_models::timeline::{assembly_order, fingerprint_clips};
use clipforge_models::{
    ArtifactKey, AssemblyState, Clip, ClipId, JobId, NewClip, Project, ProjectId,
    ProjectSnapshot, RenderState, ReviewDecision, ReviewState,
};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Everything the store owns. Serialized as-is to the state file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreState {
    /// Bumped on every mutation; persisted snapshots never go backwards.
    #[serde(default)]
    pub generation: u64,
    #[serde(default)]
    pub projects: BTreeMap<ProjectId, ProjectEntry>,
}

impl StoreState {
    pub fn entry(&self, project_id: &ProjectId) -> StoreResult<&ProjectEntry> {
        self.projects
            .get(project_id)
            .ok_or_else(|| StoreError::ProjectNotFound(project_id.clone()))
    }

    pub fn entry_mut(&mut self, project_id: &ProjectId) -> StoreResult<&mut ProjectEntry> {
        self.projects
            .get_mut(project_id)
            .ok_or_else(|| StoreError::ProjectNotFound(project_id.clone()))
    }

    /// Reset work that cannot survive a restart.
    ///
    /// Queued/rendering clips fall back to not rendered and running
    /// assemblies are marked failed. Returns the number of records touched.
    pub fn recover_interrupted(&mut self) -> usize {
        let mut touched = 0;
        for entry in self.projects.values_mut() {
            for clip in entry.clips.values_mut() {
                if clip.render_state.is_in_flight() {
                    clip.render_state = RenderState::NotRendered;
                    clip.render_job = None;
                    clip.touch();
                    touched += 1;
                }
            }
            if entry.project.assembly_state == AssemblyState::Assembling {
                entry.project.assembly_state = AssemblyState::Failed;
                entry.project.assembly_job = None;
                entry.project.assembly_error = Some("interrupted by restart".to_string());
                entry.project.touch();
                touched += 1;
            }
        }
        touched
    }
}

/// A project together with its clips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub project: Project,
    #[serde(default)]
    pub clips: BTreeMap<ClipId, Clip>,
}

/// Result of a review decision.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub clip: Clip,
    /// Render job that lost ownership of the clip because it was rejected
    pub cancelled_job: Option<JobId>,
}

/// Result of asking to put a clip in the render queue.
#[derive(Debug, Clone)]
pub enum RenderAdmission {
    /// The clip now belongs to the given job.
    Admitted(Clip),
    /// A render is already queued or running for this clip.
    InFlight { clip: Clip, job_id: JobId },
}

/// Outcome of one render attempt reported by a worker.
#[derive(Debug, Clone)]
pub enum RenderOutcome {
    Success { output: ArtifactKey },
    Failure { reason: String, retryable: bool },
}

/// What the store did with a reported render attempt.
#[derive(Debug, Clone)]
pub enum RenderRecord {
    Rendered(Clip),
    /// Failed but within budget; the clip waits in `Queued` for another try.
    RetryScheduled { clip: Clip, attempts: u32 },
    Failed(Clip),
    /// The job no longer owns the clip; the result was ignored.
    Discarded,
}

/// Inputs captured when an assembly starts.
#[derive(Debug, Clone)]
pub struct AssemblyPlan {
    pub project_id: ProjectId,
    pub job_id: JobId,
    /// Approved clips in assembly order with their artifacts
    pub inputs: Vec<(ClipId, ArtifactKey)>,
    pub fingerprint: String,
}

/// Outcome of an assembly job.
#[derive(Debug, Clone)]
pub enum AssemblyOutcome {
    Success { output: ArtifactKey },
    Failure { reason: String },
}

/// What the store did with a reported assembly outcome.
#[derive(Debug, Clone)]
pub enum AssemblyRecord {
    Assembled(Project),
    Failed(Project),
    /// The approved set changed while assembling; the project is back to idle.
    Discarded(Project),
    /// The job no longer owns the project.
    Stale,
}

impl ProjectEntry {
    pub fn new(project: Project) -> Self {
        Self {
            project,
            clips: BTreeMap::new(),
        }
    }

    pub fn clip(&self, clip_id: &ClipId) -> StoreResult<&Clip> {
        self.clips
            .get(clip_id)
            .ok_or_else(|| StoreError::clip_not_found(&self.project.id, clip_id))
    }

    fn clip_mut(&mut self, clip_id: &ClipId) -> StoreResult<&mut Clip> {
        let project_id = &self.project.id;
        self.clips
            .get_mut(clip_id)
            .ok_or_else(|| StoreError::clip_not_found(project_id, clip_id))
    }

    /// Project plus clips in insertion order.
    pub fn snapshot(&self) -> ProjectSnapshot {
        let clips = self
            .project
            .clip_ids
            .iter()
            .filter_map(|id| self.clips.get(id).cloned())
            .collect();
        ProjectSnapshot {
            project: self.project.clone(),
            clips,
        }
    }

    /// Approved clips in assembly order.
    pub fn approved(&self) -> Vec<&Clip> {
        assembly_order(
            self.clips
                .values()
                .filter(|c| c.review_state == ReviewState::Approved),
        )
    }

    fn mark_changed(&mut self) {
        self.project.invalidate_assembly();
        self.project.touch();
    }

    /// Add a clip. Existing ids are left untouched; returns `(clip, inserted)`.
    pub fn insert_clip(&mut self, mut new: NewClip) -> (Clip, bool) {
        if let Some(existing) = self.clips.get(&new.id) {
            return (existing.clone(), false);
        }
        new.project_id = self.project.id.clone();
        let position = self.project.clip_ids.len() as i64;
        new.order.get_or_insert(position);

        let clip = Clip::new(new);
        self.project.clip_ids.push(clip.id.clone());
        self.clips.insert(clip.id.clone(), clip.clone());
        self.project.touch();
        (clip, true)
    }

    pub fn apply_review(
        &mut self,
        clip_id: &ClipId,
        decision: ReviewDecision,
    ) -> StoreResult<ReviewOutcome> {
        let clip = self.clip_mut(clip_id)?;
        if !clip.review_state.can_transition_to(decision) {
            return Err(StoreError::InvalidTransition {
                clip_id: clip_id.clone(),
                from: clip.review_state.to_string(),
                to: decision.target_state().to_string(),
            });
        }

        clip.review_state = decision.target_state();
        let mut cancelled_job = None;
        if decision == ReviewDecision::Reject && clip.render_state.is_in_flight() {
            clip.render_state = RenderState::NotRendered;
            cancelled_job = clip.render_job.take();
        }
        clip.touch();
        let clip = clip.clone();
        self.mark_changed();

        Ok(ReviewOutcome { clip, cancelled_job })
    }

    /// Hand the clip to `job_id` for rendering.
    ///
    /// Only approved clips may render. A clip that is already queued or
    /// rendering keeps its current job. Otherwise a new render cycle starts:
    /// attempts reset and any previous artifact is dropped.
    pub fn queue_render(&mut self, clip_id: &ClipId, job_id: &JobId) -> StoreResult<RenderAdmission> {
        let clip = self.clip_mut(clip_id)?;
        if clip.review_state != ReviewState::Approved {
            return Err(StoreError::invalid_state(format!(
                "clip {} is {}, only approved clips can be rendered",
                clip_id, clip.review_state
            )));
        }
        if clip.render_state.is_in_flight() {
            if let Some(current) = clip.render_job.clone() {
                return Ok(RenderAdmission::InFlight {
                    clip: clip.clone(),
                    job_id: current,
                });
            }
        }

        clip.render_state = RenderState::Queued;
        clip.render_job = Some(job_id.clone());
        clip.render_attempts = 0;
        clip.rendered_path = None;
        clip.render_error = None;
        clip.touch();
        let clip = clip.clone();
        self.mark_changed();

        Ok(RenderAdmission::Admitted(clip))
    }

    /// Move an owned, queued clip to `Rendering`. Returns the attempt number,
    /// or `None` when the job no longer owns the clip.
    pub fn start_render(&mut self, clip_id: &ClipId, job_id: &JobId) -> StoreResult<Option<u32>> {
        let clip = self.clip_mut(clip_id)?;
        if !owns_render(clip, job_id) || clip.render_state != RenderState::Queued {
            return Ok(None);
        }
        clip.render_state = RenderState::Rendering;
        clip.touch();
        let attempt = clip.render_attempts + 1;
        self.mark_changed();
        Ok(Some(attempt))
    }

    pub fn record_render(
        &mut self,
        clip_id: &ClipId,
        job_id: &JobId,
        outcome: RenderOutcome,
        max_attempts: u32,
    ) -> StoreResult<RenderRecord> {
        let clip = self.clip_mut(clip_id)?;
        if !owns_render(clip, job_id) || clip.render_state != RenderState::Rendering {
            return Ok(RenderRecord::Discarded);
        }

        clip.render_attempts += 1;
        let record = match outcome {
            RenderOutcome::Success { output } => {
                clip.render_state = RenderState::Rendered;
                clip.rendered_path = Some(output);
                clip.render_error = None;
                clip.render_job = None;
                clip.touch();
                RenderRecord::Rendered(clip.clone())
            }
            RenderOutcome::Failure { reason, retryable } => {
                clip.render_error = Some(reason);
                clip.touch();
                if retryable && clip.render_attempts < max_attempts {
                    clip.render_state = RenderState::Queued;
                    RenderRecord::RetryScheduled {
                        clip: clip.clone(),
                        attempts: clip.render_attempts,
                    }
                } else {
                    clip.render_state = RenderState::Failed;
                    clip.render_job = None;
                    RenderRecord::Failed(clip.clone())
                }
            }
        };
        self.mark_changed();
        Ok(record)
    }

    /// Release a clip from `job_id`. Returns false when the job did not own it.
    pub fn cancel_render(&mut self, clip_id: &ClipId, job_id: &JobId) -> StoreResult<bool> {
        let clip = self.clip_mut(clip_id)?;
        if !clip.render_state.is_in_flight() || clip.render_job.as_ref() != Some(job_id) {
            return Ok(false);
        }
        clip.render_state = RenderState::NotRendered;
        clip.render_job = None;
        clip.touch();
        self.mark_changed();
        Ok(true)
    }

    pub fn begin_assembly(&mut self, job_id: &JobId) -> StoreResult<AssemblyPlan> {
        if self.project.assembly_state == AssemblyState::Assembling {
            return Err(StoreError::conflict(format!(
                "project {} is already assembling",
                self.project.id
            )));
        }

        let approved = self.approved();
        let not_ready: Vec<ClipId> = approved
            .iter()
            .filter(|c| !c.is_assembly_ready())
            .map(|c| c.id.clone())
            .collect();
        if !not_ready.is_empty() {
            return Err(StoreError::NotReady { clips: not_ready });
        }
        if approved.is_empty() {
            return Err(StoreError::empty_input(format!(
                "project {} has no approved clips",
                self.project.id
            )));
        }

        let fingerprint = fingerprint_clips(&approved);
        let inputs = approved
            .iter()
            .filter_map(|c| c.rendered_path.clone().map(|p| (c.id.clone(), p)))
            .collect();

        let project = &mut self.project;
        project.assembly_state = AssemblyState::Assembling;
        project.assembly_job = Some(job_id.clone());
        project.assembly_fingerprint = Some(fingerprint.clone());
        project.assembled_output_path = None;
        project.assembly_error = None;
        project.touch();

        Ok(AssemblyPlan {
            project_id: project.id.clone(),
            job_id: job_id.clone(),
            inputs,
            fingerprint,
        })
    }

    /// Fingerprint of the approved set, if every approved clip is rendered.
    pub fn current_fingerprint(&self) -> Option<String> {
        let approved = self.approved();
        if approved.is_empty() || approved.iter().any(|c| !c.is_assembly_ready()) {
            return None;
        }
        Some(fingerprint_clips(&approved))
    }

    pub fn finish_assembly(&mut self, job_id: &JobId, outcome: AssemblyOutcome) -> AssemblyRecord {
        if self.project.assembly_state != AssemblyState::Assembling
            || self.project.assembly_job.as_ref() != Some(job_id)
        {
            return AssemblyRecord::Stale;
        }

        let current = self.current_fingerprint();
        let project = &mut self.project;
        project.assembly_job = None;
        project.touch();

        if current.is_none() || current != project.assembly_fingerprint {
            project.assembly_state = AssemblyState::Idle;
            project.assembly_fingerprint = None;
            return AssemblyRecord::Discarded(project.clone());
        }

        match outcome {
            AssemblyOutcome::Success { output } => {
                project.assembly_state = AssemblyState::Assembled;
                project.assembled_output_path = Some(output);
                project.assembly_error = None;
                AssemblyRecord::Assembled(project.clone())
            }
            AssemblyOutcome::Failure { reason } => {
                project.assembly_state = AssemblyState::Failed;
                project.assembly_error = Some(reason);
                AssemblyRecord::Failed(project.clone())
            }
        }
    }

    /// Apply new `order` values. Unknown clip ids fail the whole batch.
    /// Returns how many clips actually moved.
    pub fn set_orders(&mut self, orders: &[(ClipId, i64)]) -> StoreResult<usize> {
        for (clip_id, _) in orders {
            self.clip(clip_id)?;
        }

        let mut changed = 0;
        for (clip_id, order) in orders {
            let clip = self.clip_mut(clip_id)?;
            if clip.order != *order {
                clip.order = *order;
                clip.touch();
                changed += 1;
            }
        }
        if changed > 0 {
            self.mark_changed();
        }
        Ok(changed)
    }
}

fn owns_render(clip: &Clip, job_id: &JobId) -> bool {
    clip.review_state == ReviewState::Approved && clip.render_job.as_ref() == Some(job_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_with(ids: &[&str]) -> ProjectEntry {
        let mut entry = ProjectEntry::new(Project::new(ProjectId::from("p1"), "Demo"));
        for id in ids {
            entry.insert_clip(NewClip {
                id: ClipId::from(*id),
                project_id: ProjectId::from("p1"),
                source_path: format!("/raw/{id}.mp4"),
                start: None,
                end: None,
                order: None,
                emotion_label: "Funny".to_string(),
                score: 0.5,
            });
        }
        entry
    }

    fn key(s: &str) -> ArtifactKey {
        ArtifactKey::new(s).unwrap()
    }

    fn render_ok(entry: &mut ProjectEntry, id: &str) {
        let clip_id = ClipId::from(id);
        let job = JobId::new();
        entry.queue_render(&clip_id, &job).unwrap();
        entry.start_render(&clip_id, &job).unwrap();
        let record = entry
            .record_render(
                &clip_id,
                &job,
                RenderOutcome::Success {
                    output: key(&format!("shorts/p1/{id}.mp4")),
                },
                3,
            )
            .unwrap();
        assert!(matches!(record, RenderRecord::Rendered(_)));
    }

    fn approve(entry: &mut ProjectEntry, id: &str) {
        entry.apply_review(&ClipId::from(id), ReviewDecision::Approve).unwrap();
    }

    #[test]
    fn test_insert_is_idempotent_and_assigns_order() {
        let mut entry = entry_with(&["a", "b"]);
        assert_eq!(entry.clip(&ClipId::from("b")).unwrap().order, 1);

        let (clip, inserted) = entry.insert_clip(NewClip {
            id: ClipId::from("a"),
            project_id: ProjectId::from("p1"),
            source_path: "/other.mp4".to_string(),
            start: None,
            end: None,
            order: Some(9),
            emotion_label: "Sad".to_string(),
            score: 0.1,
        });
        assert!(!inserted);
        assert_eq!(clip.source_path, "/raw/a.mp4");
        assert_eq!(entry.project.clip_ids.len(), 2);
    }

    #[test]
    fn test_review_rules() {
        let mut entry = entry_with(&["a"]);
        let a = ClipId::from("a");
        approve(&mut entry, "a");

        let err = entry.apply_review(&a, ReviewDecision::Approve).unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));

        entry.apply_review(&a, ReviewDecision::Reject).unwrap();
        let err = entry.apply_review(&a, ReviewDecision::Approve).unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
        assert_eq!(entry.clip(&a).unwrap().review_state, ReviewState::Rejected);
    }

    #[test]
    fn test_render_requires_approval() {
        let mut entry = entry_with(&["a"]);
        let err = entry.queue_render(&ClipId::from("a"), &JobId::new()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidState(_)));
        assert_eq!(
            entry.clip(&ClipId::from("a")).unwrap().render_state,
            RenderState::NotRendered
        );
    }

    #[test]
    fn test_queue_render_keeps_existing_job() {
        let mut entry = entry_with(&["a"]);
        approve(&mut entry, "a");
        let a = ClipId::from("a");
        let first = JobId::new();
        entry.queue_render(&a, &first).unwrap();

        match entry.queue_render(&a, &JobId::new()).unwrap() {
            RenderAdmission::InFlight { job_id, .. } => assert_eq!(job_id, first),
            other => panic!("expected in-flight, got {other:?}"),
        }
    }

    #[test]
    fn test_retry_budget() {
        let mut entry = entry_with(&["a"]);
        approve(&mut entry, "a");
        let a = ClipId::from("a");
        let job = JobId::new();
        entry.queue_render(&a, &job).unwrap();

        let fail = || RenderOutcome::Failure {
            reason: "encoder crashed".to_string(),
            retryable: true,
        };

        assert_eq!(entry.start_render(&a, &job).unwrap(), Some(1));
        assert!(matches!(
            entry.record_render(&a, &job, fail(), 2).unwrap(),
            RenderRecord::RetryScheduled { attempts: 1, .. }
        ));
        assert_eq!(entry.clip(&a).unwrap().render_state, RenderState::Queued);

        assert_eq!(entry.start_render(&a, &job).unwrap(), Some(2));
        assert!(matches!(
            entry.record_render(&a, &job, fail(), 2).unwrap(),
            RenderRecord::Failed(_)
        ));
        let clip = entry.clip(&a).unwrap();
        assert_eq!(clip.render_state, RenderState::Failed);
        assert_eq!(clip.render_attempts, 2);
        assert!(clip.rendered_path.is_none());
        assert!(clip.render_job.is_none());
    }

    #[test]
    fn test_non_retryable_fails_immediately() {
        let mut entry = entry_with(&["a"]);
        approve(&mut entry, "a");
        let a = ClipId::from("a");
        let job = JobId::new();
        entry.queue_render(&a, &job).unwrap();
        entry.start_render(&a, &job).unwrap();
        let record = entry
            .record_render(
                &a,
                &job,
                RenderOutcome::Failure {
                    reason: "source missing".to_string(),
                    retryable: false,
                },
                5,
            )
            .unwrap();
        assert!(matches!(record, RenderRecord::Failed(_)));
    }

    #[test]
    fn test_reject_discards_late_render() {
        let mut entry = entry_with(&["a"]);
        approve(&mut entry, "a");
        let a = ClipId::from("a");
        let job = JobId::new();
        entry.queue_render(&a, &job).unwrap();
        entry.start_render(&a, &job).unwrap();

        let outcome = entry.apply_review(&a, ReviewDecision::Reject).unwrap();
        assert_eq!(outcome.cancelled_job, Some(job.clone()));

        let record = entry
            .record_render(&a, &job, RenderOutcome::Success { output: key("shorts/p1/a.mp4") }, 3)
            .unwrap();
        assert!(matches!(record, RenderRecord::Discarded));
        let clip = entry.clip(&a).unwrap();
        assert_eq!(clip.render_state, RenderState::NotRendered);
        assert!(clip.rendered_path.is_none());
    }

    #[test]
    fn test_rerender_starts_new_cycle() {
        let mut entry = entry_with(&["a"]);
        approve(&mut entry, "a");
        render_ok(&mut entry, "a");
        let a = ClipId::from("a");

        entry.queue_render(&a, &JobId::new()).unwrap();
        let clip = entry.clip(&a).unwrap();
        assert_eq!(clip.render_state, RenderState::Queued);
        assert_eq!(clip.render_attempts, 0);
        assert!(clip.rendered_path.is_none());
    }

    #[test]
    fn test_assembly_preconditions() {
        let mut entry = entry_with(&["a", "b", "c"]);
        let err = entry.begin_assembly(&JobId::new()).unwrap_err();
        assert!(matches!(err, StoreError::EmptyInput(_)));

        approve(&mut entry, "a");
        approve(&mut entry, "b");
        render_ok(&mut entry, "a");
        match entry.begin_assembly(&JobId::new()).unwrap_err() {
            StoreError::NotReady { clips } => assert_eq!(clips, vec![ClipId::from("b")]),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(entry.project.assembly_state, AssemblyState::Idle);

        render_ok(&mut entry, "b");
        let plan = entry.begin_assembly(&JobId::new()).unwrap();
        assert_eq!(plan.inputs.len(), 2);
        assert_eq!(plan.inputs[0].0, ClipId::from("a"));

        let err = entry.begin_assembly(&JobId::new()).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn test_assembled_output_goes_stale() {
        let mut entry = entry_with(&["a", "b"]);
        approve(&mut entry, "a");
        render_ok(&mut entry, "a");
        let job = JobId::new();
        entry.begin_assembly(&job).unwrap();
        let record = entry.finish_assembly(
            &job,
            AssemblyOutcome::Success {
                output: key("longform/p1/out.mp4"),
            },
        );
        assert!(matches!(record, AssemblyRecord::Assembled(_)));
        assert!(entry.project.assembled_output_path.is_some());

        approve(&mut entry, "b");
        assert_eq!(entry.project.assembly_state, AssemblyState::Idle);
        assert!(entry.project.assembled_output_path.is_none());
    }

    #[test]
    fn test_set_change_during_assembly_is_discarded() {
        let mut entry = entry_with(&["a", "b"]);
        approve(&mut entry, "a");
        approve(&mut entry, "b");
        render_ok(&mut entry, "a");
        render_ok(&mut entry, "b");
        let job = JobId::new();
        entry.begin_assembly(&job).unwrap();

        entry.apply_review(&ClipId::from("b"), ReviewDecision::Reject).unwrap();
        let record = entry.finish_assembly(
            &job,
            AssemblyOutcome::Success {
                output: key("longform/p1/out.mp4"),
            },
        );
        assert!(matches!(record, AssemblyRecord::Discarded(_)));
        assert_eq!(entry.project.assembly_state, AssemblyState::Idle);
        assert!(entry.project.assembled_output_path.is_none());
    }

    #[test]
    fn test_order_change_invalidates() {
        let mut entry = entry_with(&["a", "b"]);
        approve(&mut entry, "a");
        approve(&mut entry, "b");
        render_ok(&mut entry, "a");
        render_ok(&mut entry, "b");
        let job = JobId::new();
        entry.begin_assembly(&job).unwrap();
        entry.finish_assembly(&job, AssemblyOutcome::Success { output: key("longform/p1/x.mp4") });

        assert_eq!(entry.set_orders(&[(ClipId::from("a"), 0)]).unwrap(), 0);
        assert_eq!(entry.project.assembly_state, AssemblyState::Assembled);

        assert_eq!(entry.set_orders(&[(ClipId::from("a"), 5)]).unwrap(), 1);
        assert_eq!(entry.project.assembly_state, AssemblyState::Idle);

        let err = entry.set_orders(&[(ClipId::from("zzz"), 1)]).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_recover_interrupted() {
        let mut state = StoreState::default();
        let mut entry = entry_with(&["a", "b"]);
        approve(&mut entry, "a");
        approve(&mut entry, "b");
        render_ok(&mut entry, "a");
        entry.queue_render(&ClipId::from("b"), &JobId::new()).unwrap();
        entry.project.assembly_state = AssemblyState::Assembling;
        entry.project.assembly_job = Some(JobId::new());
        state.projects.insert(ProjectId::from("p1"), entry);

        assert_eq!(state.recover_interrupted(), 2);
        let entry = state.entry(&ProjectId::from("p1")).unwrap();
        assert_eq!(entry.clip(&ClipId::from("b")).unwrap().render_state, RenderState::NotRendered);
        assert_eq!(entry.clip(&ClipId::from("a")).unwrap().render_state, RenderState::Rendered);
        assert_eq!(entry.project.assembly_state, AssemblyState::Failed);
        assert_eq!(entry.project.assembly_error.as_deref(), Some("interrupted by restart"));
    }
}
