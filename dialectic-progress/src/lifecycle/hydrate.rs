//! Seeds run progress from server snapshots.
//!
//! Payloads are validated in full before anything is written, so a rejected
//! payload leaves the state untouched.

use crate::core::{DocumentSlot, DocumentStatus, JobState, ProgressKey, StepStatus};
use crate::errors::HydrationError;
use crate::events::ProgressNotification;
use crate::progress::{DocumentDescriptor, JobCounts, JobProgress, StageRunProgress};
use crate::recipe::StageRecipe;
use crate::state::DialecticState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info};

/// One rendered document as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    /// The logical document key.
    pub document_key: String,
    /// The producing model.
    pub model_id: String,
    /// The job that produced the document.
    pub job_id: String,
    /// The rendered resource.
    pub latest_rendered_resource_id: String,
    /// Document status.
    pub status: DocumentStatus,
    /// The producing step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_key: Option<String>,
}

impl DocumentSnapshot {
    fn invalid_field(&self) -> Option<&'static str> {
        [
            ("documentKey", &self.document_key),
            ("modelId", &self.model_id),
            ("jobId", &self.job_id),
            ("latestRenderedResourceId", &self.latest_rendered_resource_id),
        ]
        .into_iter()
        .find(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
    }
}

/// Job counters for one step as reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobProgressSnapshot {
    /// Jobs observed.
    pub total_jobs: u32,
    /// Jobs completed.
    pub completed_jobs: u32,
    /// Jobs running.
    pub in_progress_jobs: u32,
    /// Jobs failed.
    pub failed_jobs: u32,
    /// Latest job state per model.
    pub model_job_statuses: BTreeMap<String, JobState>,
}

impl JobProgressSnapshot {
    fn to_job_progress(&self) -> JobProgress {
        JobProgress::from_counts(
            JobCounts {
                total_jobs: self.total_jobs,
                completed_jobs: self.completed_jobs,
                in_progress_jobs: self.in_progress_jobs,
                failed_jobs: self.failed_jobs,
            },
            self.model_job_statuses.clone(),
        )
    }
}

/// Progress of one stage as reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageProgressSnapshot {
    /// The stage.
    pub stage_slug: String,
    /// Step statuses; unknown values are skipped.
    #[serde(default)]
    pub step_statuses: BTreeMap<String, String>,
    /// Job counters by step key.
    #[serde(default)]
    pub job_progress: BTreeMap<String, JobProgressSnapshot>,
    /// Rendered documents.
    #[serde(default)]
    pub documents: Vec<DocumentSnapshot>,
}

fn validate(key: &ProgressKey, documents: &[DocumentSnapshot]) -> Result<(), HydrationError> {
    for document in documents {
        if let Some(field) = document.invalid_field() {
            error!(progress_key = %key, field, "rejecting progress snapshot");
            return Err(HydrationError::new(
                key.to_string(),
                format!("every document must have a non-empty {field}"),
            ));
        }
    }
    Ok(())
}

fn job_state(status: DocumentStatus) -> JobState {
    match status {
        DocumentStatus::Completed => JobState::Completed,
        DocumentStatus::Failed => JobState::Failed,
        _ => JobState::InProgress,
    }
}

fn upsert_documents(run: &mut StageRunProgress, recipe: Option<&StageRecipe>, documents: &[DocumentSnapshot]) {
    for document in documents {
        let step_key = document.step_key.as_deref().or_else(|| {
            recipe
                .and_then(|r| r.document_producer(&document.document_key))
                .map(|step| step.step_key.as_str())
        });
        if let Some(step_key) = step_key {
            run.job_progress_mut(step_key).seed_job(
                &document.job_id,
                Some(document.model_id.as_str()),
                job_state(document.status),
            );
        }

        let slot = DocumentSlot::new(document.document_key.as_str(), document.model_id.as_str());
        let descriptor = run.documents.entry(slot).or_insert_with(|| {
            DocumentDescriptor::generating(document.job_id.as_str(), Some(document.model_id.as_str()))
        });
        descriptor.job_id = document.job_id.clone();
        descriptor.model_id = Some(document.model_id.clone());
        descriptor.record_render(&document.latest_rendered_resource_id);
        descriptor.status = document.status;
        if document.step_key.is_some() {
            descriptor.step_key = document.step_key.clone();
        }
    }
}

/// Seeds one run's documents from a snapshot.
///
/// # Errors
///
/// Returns [`HydrationError`] if any document lacks a required field; the
/// state is not modified in that case.
pub fn hydrate_stage_progress(
    state: &mut DialecticState,
    session_id: &str,
    stage_slug: &str,
    iteration_number: u32,
    documents: &[DocumentSnapshot],
) -> Result<Vec<ProgressNotification>, HydrationError> {
    let key = ProgressKey::new(session_id, stage_slug, iteration_number);
    validate(&key, documents)?;

    upsert_documents(
        state.run_progress.get_or_create(&key),
        state.recipes.get(stage_slug),
        documents,
    );
    info!(progress_key = %key, documents = documents.len(), "hydrated stage progress");
    Ok(vec![ProgressNotification::Hydrated {
        progress_keys: vec![key],
    }])
}

/// Seeds every stage of one session iteration from a snapshot.
///
/// # Errors
///
/// Returns [`HydrationError`] if any document of any stage lacks a required
/// field; no stage is modified in that case.
pub fn hydrate_all_stage_progress(
    state: &mut DialecticState,
    session_id: &str,
    iteration_number: u32,
    entries: &[StageProgressSnapshot],
) -> Result<Vec<ProgressNotification>, HydrationError> {
    if entries.is_empty() {
        return Ok(Vec::new());
    }
    let keyed: Vec<(ProgressKey, &StageProgressSnapshot)> = entries
        .iter()
        .map(|entry| (ProgressKey::new(session_id, entry.stage_slug.as_str(), iteration_number), entry))
        .collect();
    for (key, entry) in &keyed {
        validate(key, &entry.documents)?;
    }

    for (key, entry) in &keyed {
        let run = state.run_progress.get_or_create(key);
        for (step_key, jobs) in &entry.job_progress {
            run.job_progress.insert(step_key.clone(), jobs.to_job_progress());
        }
        for (step_key, raw) in &entry.step_statuses {
            if let Some(status) = StepStatus::parse(raw) {
                run.set_step_status(step_key, status);
            }
        }
        upsert_documents(run, state.recipes.get(&entry.stage_slug), &entry.documents);
    }

    info!(session_id, iteration_number, stages = keyed.len(), "hydrated session progress");
    Ok(vec![ProgressNotification::Hydrated {
        progress_keys: keyed.into_iter().map(|(key, _)| key).collect(),
    }])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::version_hash;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn document(key: &str, model: &str, status: DocumentStatus) -> DocumentSnapshot {
        DocumentSnapshot {
            document_key: key.to_string(),
            model_id: model.to_string(),
            job_id: format!("job-{key}-{model}"),
            latest_rendered_resource_id: format!("res-{key}-{model}"),
            status,
            step_key: Some("draft".to_string()),
        }
    }

    #[test]
    fn test_hydrate_stage_progress() {
        let mut state = DialecticState::new();
        let notes = hydrate_stage_progress(
            &mut state,
            "s1",
            "thesis",
            1,
            &[document("summary", "m1", DocumentStatus::Completed)],
        )
        .unwrap();

        let run = state.run(&ProgressKey::new("s1", "thesis", 1)).unwrap();
        let descriptor = run.document(&DocumentSlot::new("summary", "m1")).unwrap();
        assert!(descriptor.is_completed());
        assert_eq!(descriptor.version_hash, Some(version_hash("res-summary-m1")));
        assert_eq!(descriptor.step_key.as_deref(), Some("draft"));
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn test_invalid_document_rejects_whole_payload() {
        let mut state = DialecticState::new();
        let mut bad = document("critique", "m1", DocumentStatus::Completed);
        bad.job_id.clear();

        let err = hydrate_stage_progress(
            &mut state,
            "s1",
            "thesis",
            1,
            &[document("summary", "m1", DocumentStatus::Completed), bad],
        )
        .unwrap_err();
        assert_eq!(err.progress_key, "s1:thesis:1");
        assert!(err.reason.contains("jobId"));
        assert!(state.run_progress.is_empty());
    }

    #[test]
    fn test_hydrate_all_stage_progress() {
        let mut state = DialecticState::new();
        let entries: Vec<StageProgressSnapshot> = serde_json::from_value(json!([
            {
                "stageSlug": "thesis",
                "stepStatuses": {"plan": "completed", "draft": "in_progress", "odd": "exploded"},
                "jobProgress": {
                    "draft": {"totalJobs": 2, "completedJobs": 1, "inProgressJobs": 1,
                              "modelJobStatuses": {"m1": "completed", "m2": "in_progress"}}
                },
                "documents": [{
                    "documentKey": "summary", "modelId": "m1", "jobId": "job-1",
                    "latestRenderedResourceId": "res-1", "status": "completed"
                }]
            },
            {"stageSlug": "antithesis"}
        ]))
        .unwrap();

        let notes = hydrate_all_stage_progress(&mut state, "s1", 1, &entries).unwrap();

        let run = state.run(&ProgressKey::new("s1", "thesis", 1)).unwrap();
        assert_eq!(run.step_status("plan"), StepStatus::Completed);
        assert_eq!(run.step_status("draft"), StepStatus::InProgress);
        assert!(!run.step_statuses.contains_key("odd"));
        assert_eq!(run.job_progress["draft"].counts().completed_jobs, 1);
        assert!(run.job_progress["draft"].has_running_model_jobs());
        assert!(state.run(&ProgressKey::new("s1", "antithesis", 1)).is_some());
        assert_eq!(
            notes,
            vec![ProgressNotification::Hydrated {
                progress_keys: vec![
                    ProgressKey::new("s1", "thesis", 1),
                    ProgressKey::new("s1", "antithesis", 1),
                ],
            }]
        );
    }

    #[test]
    fn test_hydrate_all_is_all_or_nothing() {
        let mut state = DialecticState::new();
        let mut bad = document("summary", "m2", DocumentStatus::Completed);
        bad.model_id.clear();
        let entries = vec![
            StageProgressSnapshot {
                stage_slug: "thesis".to_string(),
                documents: vec![document("summary", "m1", DocumentStatus::Completed)],
                ..StageProgressSnapshot::default()
            },
            StageProgressSnapshot {
                stage_slug: "antithesis".to_string(),
                documents: vec![bad],
                ..StageProgressSnapshot::default()
            },
        ];

        assert!(hydrate_all_stage_progress(&mut state, "s1", 1, &entries).is_err());
        assert!(state.run_progress.is_empty());
    }

    #[test]
    fn test_empty_snapshot_is_a_no_op() {
        let mut state = DialecticState::new();
        assert!(hydrate_all_stage_progress(&mut state, "s1", 1, &[]).unwrap().is_empty());
        assert!(state.run_progress.is_empty());
    }
}
