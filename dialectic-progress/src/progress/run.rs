//! Per-run progress state mutated by the lifecycle reducer.

use crate::core::{DocumentSlot, DocumentStatus, JobState, ProgressKey, StepStatus};
use crate::utils::{iso_timestamp, version_hash};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Error payload carried by a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl JobError {
    /// Creates a job error.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Rendering status of one `(document_key, model)` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    /// Current status.
    pub status: DocumentStatus,
    /// The job that last touched the document.
    pub job_id: String,
    /// The producing model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    /// The most recent rendered resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_rendered_resource_id: Option<String>,
    /// Hash of the latest rendered resource id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_hash: Option<String>,
    /// The resource of the last completed render.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_rendered_resource_id: Option<String>,
    /// When the last render landed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_render_at_iso: Option<String>,
    /// The step that produces the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_key: Option<String>,
    /// Error of the last failed job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl DocumentDescriptor {
    /// Creates a descriptor for a document that started generating.
    #[must_use]
    pub fn generating(job_id: impl Into<String>, model_id: Option<&str>) -> Self {
        Self {
            status: DocumentStatus::Generating,
            job_id: job_id.into(),
            model_id: model_id.map(str::to_string),
            ..Self::default()
        }
    }

    /// Records a rendered resource without changing the status.
    pub fn record_render(&mut self, resource_id: &str) {
        self.latest_rendered_resource_id = Some(resource_id.to_string());
        self.version_hash = Some(version_hash(resource_id));
        self.last_rendered_resource_id = Some(resource_id.to_string());
        self.last_render_at_iso = Some(iso_timestamp());
    }

    /// Marks the document completed with the given rendered resource.
    pub fn complete(&mut self, resource_id: &str) {
        if self.latest_rendered_resource_id.as_deref() != Some(resource_id) {
            self.record_render(resource_id);
        }
        self.status = DocumentStatus::Completed;
        self.error = None;
    }

    /// Marks the document failed.
    pub fn fail(&mut self, error: Option<JobError>) {
        self.status = DocumentStatus::Failed;
        self.error = error;
    }

    /// Returns true if completed with a rendered resource.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == DocumentStatus::Completed
            && self
                .latest_rendered_resource_id
                .as_deref()
                .is_some_and(|id| !id.is_empty())
    }
}

/// Job counters for one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCounts {
    /// Jobs observed.
    pub total_jobs: u32,
    /// Jobs completed.
    pub completed_jobs: u32,
    /// Jobs running.
    pub in_progress_jobs: u32,
    /// Jobs failed.
    pub failed_jobs: u32,
}

impl std::ops::Add for JobCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            total_jobs: self.total_jobs + rhs.total_jobs,
            completed_jobs: self.completed_jobs + rhs.completed_jobs,
            in_progress_jobs: self.in_progress_jobs + rhs.in_progress_jobs,
            failed_jobs: self.failed_jobs + rhs.failed_jobs,
        }
    }
}

/// Job tracking for one step.
///
/// Counters are derived from the per-job map, so replaying an event for a
/// job that is already recorded never changes them. Counters copied from a
/// server snapshot cover jobs the snapshot did not identify; each one is
/// released when the job or model it stands for is first recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobProgress {
    jobs: BTreeMap<String, JobState>,
    model_job_statuses: BTreeMap<String, JobState>,
    seeded: JobCounts,
    seeded_models: BTreeMap<String, JobState>,
}

impl JobCounts {
    fn bucket_mut(&mut self, state: JobState) -> &mut u32 {
        match state {
            JobState::InProgress => &mut self.in_progress_jobs,
            JobState::Completed => &mut self.completed_jobs,
            JobState::Failed => &mut self.failed_jobs,
        }
    }

    /// Removes one job from a bucket; returns false if the bucket is empty.
    fn release(&mut self, state: JobState) -> bool {
        let bucket = self.bucket_mut(state);
        if *bucket == 0 {
            return false;
        }
        *bucket -= 1;
        self.total_jobs = self.total_jobs.saturating_sub(1);
        true
    }
}

impl JobProgress {
    /// Creates job progress from snapshot counters.
    #[must_use]
    pub fn from_counts(counts: JobCounts, model_job_statuses: BTreeMap<String, JobState>) -> Self {
        Self {
            jobs: BTreeMap::new(),
            seeded_models: model_job_statuses.clone(),
            model_job_statuses,
            seeded: counts,
        }
    }

    /// Records a job state and returns the state in effect afterwards.
    ///
    /// A completed job stays completed: a late failure or start for the
    /// same job is ignored. A failed job may restart.
    pub fn record(&mut self, job_id: &str, model_id: Option<&str>, state: JobState) -> JobState {
        self.upsert(job_id, model_id, state, JobState::InProgress)
    }

    /// Records a job known from a server snapshot.
    ///
    /// Unlike [`JobProgress::record`], a job the snapshot already counted
    /// is matched against the snapshot bucket of its own state.
    pub fn seed_job(&mut self, job_id: &str, model_id: Option<&str>, state: JobState) -> JobState {
        self.upsert(job_id, model_id, state, state)
    }

    fn upsert(&mut self, job_id: &str, model_id: Option<&str>, state: JobState, unmatched: JobState) -> JobState {
        let model_id = model_id.filter(|m| !m.is_empty());
        let effective = match self.jobs.get(job_id) {
            Some(JobState::Completed) => JobState::Completed,
            Some(_) => state,
            None => {
                self.release_seeded(model_id, unmatched);
                state
            }
        };
        self.jobs.insert(job_id.to_string(), effective);
        if let Some(model_id) = model_id {
            self.model_job_statuses.insert(model_id.to_string(), effective);
        }
        effective
    }

    // A snapshot entry for the same model is the job being recorded; without
    // one, the job can only be one the snapshot counted in `unmatched`.
    fn release_seeded(&mut self, model_id: Option<&str>, unmatched: JobState) {
        if let Some(seeded) = model_id.and_then(|m| self.seeded_models.remove(m)) {
            if self.seeded.release(seeded) {
                return;
            }
        }
        self.seeded.release(unmatched);
    }

    /// Returns the latest job state recorded for a model.
    #[must_use]
    pub fn model_status(&self, model_id: &str) -> Option<JobState> {
        self.model_job_statuses.get(model_id).copied()
    }

    /// Returns the per-model job states.
    #[must_use]
    pub fn model_job_statuses(&self) -> &BTreeMap<String, JobState> {
        &self.model_job_statuses
    }

    /// Returns true if any model job is running.
    #[must_use]
    pub fn has_running_model_jobs(&self) -> bool {
        self.model_job_statuses.values().any(|s| *s == JobState::InProgress)
    }

    /// Fails every running job; returns how many changed.
    pub fn fail_running(&mut self) -> usize {
        let mut changed = 0;
        for state in self
            .jobs
            .values_mut()
            .chain(self.model_job_statuses.values_mut())
            .chain(self.seeded_models.values_mut())
        {
            if *state == JobState::InProgress {
                *state = JobState::Failed;
                changed += 1;
            }
        }
        self.seeded.failed_jobs += std::mem::take(&mut self.seeded.in_progress_jobs);
        changed
    }

    /// Returns the job counters.
    #[must_use]
    pub fn counts(&self) -> JobCounts {
        let derived = self.jobs.values().fold(JobCounts::default(), |mut acc, state| {
            acc.total_jobs += 1;
            *acc.bucket_mut(*state) += 1;
            acc
        });
        self.seeded + derived
    }
}

/// Auxiliary display record from `dialectic_progress_update` events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressDisplay {
    /// The step being worked on.
    pub current_step: u32,
    /// Total steps reported by the service.
    pub total_steps: u32,
    /// Status message.
    pub message: String,
}

/// Progress of one `(session, stage, iteration)` run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageRunProgress {
    /// Status of each step, by step key.
    pub step_statuses: BTreeMap<String, StepStatus>,
    /// Document descriptors, by slot.
    pub documents: BTreeMap<DocumentSlot, DocumentDescriptor>,
    /// Job tracking, by step key.
    pub job_progress: BTreeMap<String, JobProgress>,
    /// Latest display record, if any.
    pub display: Option<ProgressDisplay>,
}

impl StageRunProgress {
    /// Returns a step's status, defaulting to `NotStarted`.
    #[must_use]
    pub fn step_status(&self, step_key: &str) -> StepStatus {
        self.step_statuses.get(step_key).copied().unwrap_or_default()
    }

    /// Sets a step's status; returns the previous status if it changed.
    pub fn set_step_status(&mut self, step_key: &str, status: StepStatus) -> Option<StepStatus> {
        let previous = self.step_status(step_key);
        if previous == status && self.step_statuses.contains_key(step_key) {
            return None;
        }
        self.step_statuses.insert(step_key.to_string(), status);
        (previous != status).then_some(previous)
    }

    /// Returns the descriptor in a slot.
    #[must_use]
    pub fn document(&self, slot: &DocumentSlot) -> Option<&DocumentDescriptor> {
        self.documents.get(slot)
    }

    /// Returns job tracking for a step, creating it if absent.
    pub fn job_progress_mut(&mut self, step_key: &str) -> &mut JobProgress {
        self.job_progress.entry(step_key.to_string()).or_default()
    }

    /// Returns true if any completed descriptor carries the document key.
    #[must_use]
    pub fn has_completed_document(&self, document_key: &str) -> bool {
        self.documents
            .iter()
            .any(|(slot, d)| slot.document_key == document_key && d.is_completed())
    }
}

/// Every run progress bucket, keyed by [`ProgressKey`].
///
/// Buckets are created lazily and removed only by [`RunProgressMap::clear`].
#[derive(Debug, Clone, Default)]
pub struct RunProgressMap {
    runs: BTreeMap<ProgressKey, StageRunProgress>,
}

impl RunProgressMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a bucket.
    #[must_use]
    pub fn get(&self, key: &ProgressKey) -> Option<&StageRunProgress> {
        self.runs.get(key)
    }

    /// Returns a bucket, creating it if absent.
    pub fn get_or_create(&mut self, key: &ProgressKey) -> &mut StageRunProgress {
        self.runs.entry(key.clone()).or_default()
    }

    /// Iterates the buckets of one session mutably.
    pub fn session_runs_mut<'a>(
        &'a mut self,
        session_id: &'a str,
    ) -> impl Iterator<Item = (&'a ProgressKey, &'a mut StageRunProgress)> + 'a {
        self.runs
            .iter_mut()
            .filter(move |(key, _)| key.session_id == session_id)
    }

    /// Iterates every bucket.
    pub fn iter(&self) -> impl Iterator<Item = (&ProgressKey, &StageRunProgress)> {
        self.runs.iter()
    }

    /// Returns the number of buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Returns true if there are no buckets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Removes every bucket.
    pub fn clear(&mut self) {
        self.runs.clear();
    }
}
