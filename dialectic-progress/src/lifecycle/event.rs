//! Inbound lifecycle events.
//!
//! Events arrive as JSON objects tagged by `type`. Scope fields use the
//! service's camelCase names; snake_case aliases are accepted as well.

use crate::core::ProgressKey;
use crate::errors::ProgressError;
use crate::progress::JobError;
use serde::{Deserialize, Serialize};

/// Payload shared by every job-scoped event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEvent {
    /// The session the job belongs to.
    #[serde(rename = "sessionId", alias = "session_id")]
    pub session_id: String,
    /// The stage the job belongs to.
    #[serde(rename = "stageSlug", alias = "stage_slug")]
    pub stage_slug: String,
    /// The iteration the job belongs to.
    #[serde(rename = "iterationNumber", alias = "iteration_number")]
    pub iteration_number: u32,
    /// The job id. A `job_failed` without one fails the whole session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// The recipe step the job runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_key: Option<String>,
    /// The document the job produces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_key: Option<String>,
    /// The model running the job.
    #[serde(default, rename = "modelId", alias = "model_id", skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    /// The rendered resource the job produced.
    #[serde(
        default,
        rename = "latestRenderedResourceId",
        alias = "latest_rendered_resource_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub latest_rendered_resource_id: Option<String>,
    /// Marks the last chunk of a chunked document.
    #[serde(default, rename = "isFinalChunk", alias = "is_final_chunk")]
    pub is_final_chunk: bool,
    /// Error payload of a failed job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl JobEvent {
    /// Creates an event scoped to one stage run.
    #[must_use]
    pub fn new(session_id: impl Into<String>, stage_slug: impl Into<String>, iteration_number: u32) -> Self {
        Self {
            session_id: session_id.into(),
            stage_slug: stage_slug.into(),
            iteration_number,
            ..Self::default()
        }
    }

    /// Sets the job id.
    #[must_use]
    pub fn with_job(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    /// Sets the step key.
    #[must_use]
    pub fn with_step(mut self, step_key: impl Into<String>) -> Self {
        self.step_key = Some(step_key.into());
        self
    }

    /// Sets the document key.
    #[must_use]
    pub fn with_document(mut self, document_key: impl Into<String>) -> Self {
        self.document_key = Some(document_key.into());
        self
    }

    /// Sets the model id.
    #[must_use]
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Sets the rendered resource id.
    #[must_use]
    pub fn with_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.latest_rendered_resource_id = Some(resource_id.into());
        self
    }

    /// Marks the event as the final chunk.
    #[must_use]
    pub fn final_chunk(mut self) -> Self {
        self.is_final_chunk = true;
        self
    }

    /// Sets the error payload.
    #[must_use]
    pub fn with_error(mut self, error: JobError) -> Self {
        self.error = Some(error);
        self
    }

    /// Returns the run this event belongs to.
    #[must_use]
    pub fn progress_key(&self) -> ProgressKey {
        ProgressKey::new(self.session_id.clone(), self.stage_slug.clone(), self.iteration_number)
    }

    /// Returns the job id if present and non-empty.
    #[must_use]
    pub fn job(&self) -> Option<&str> {
        non_empty(self.job_id.as_deref())
    }

    /// Returns the step key if present and non-empty.
    #[must_use]
    pub fn step(&self) -> Option<&str> {
        non_empty(self.step_key.as_deref())
    }

    /// Returns the document key if present and non-empty.
    #[must_use]
    pub fn document(&self) -> Option<&str> {
        non_empty(self.document_key.as_deref())
    }

    /// Returns the model id if present and non-empty.
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        non_empty(self.model_id.as_deref())
    }

    /// Returns the rendered resource id if present and non-empty.
    #[must_use]
    pub fn resource(&self) -> Option<&str> {
        non_empty(self.latest_rendered_resource_id.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// A session-wide generation failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFailure {
    /// The failed session.
    #[serde(rename = "sessionId", alias = "session_id")]
    pub session_id: String,
    /// The job that reported the failure, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Error payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

/// Display-only progress counters reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// The session.
    #[serde(rename = "sessionId", alias = "session_id")]
    pub session_id: String,
    /// The stage.
    #[serde(rename = "stageSlug", alias = "stage_slug")]
    pub stage_slug: String,
    /// The iteration.
    #[serde(rename = "iterationNumber", alias = "iteration_number")]
    pub iteration_number: u32,
    /// The step being worked on.
    #[serde(default)]
    pub current_step: u32,
    /// Total steps.
    #[serde(default)]
    pub total_steps: u32,
    /// Status message.
    #[serde(default)]
    pub message: String,
}

/// Every lifecycle event the reducer understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A planner job started.
    PlannerStarted(JobEvent),
    /// A contribution job started.
    DialecticContributionStarted(JobEvent),
    /// A planner job finished.
    PlannerCompleted(JobEvent),
    /// An execute job started for one model.
    ExecuteStarted(JobEvent),
    /// A render job started.
    RenderStarted(JobEvent),
    /// A document started generating.
    DocumentStarted(JobEvent),
    /// A chunk of a document landed.
    DocumentChunkCompleted(JobEvent),
    /// A document was rendered.
    RenderCompleted(JobEvent),
    /// A document finished generating.
    DocumentCompleted(JobEvent),
    /// A job failed.
    JobFailed(JobEvent),
    /// Generation failed for the whole session.
    ContributionGenerationFailed(SessionFailure),
    /// Display counters changed.
    DialecticProgressUpdate(ProgressUpdate),
    /// Any other event type; ignored.
    #[serde(other)]
    Unknown,
}

impl LifecycleEvent {
    /// Decodes an event from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError::Serialization`] if the payload is malformed.
    pub fn from_json(json: &str) -> Result<Self, ProgressError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns the wire name of the event type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::PlannerStarted(_) => "planner_started",
            Self::DialecticContributionStarted(_) => "dialectic_contribution_started",
            Self::PlannerCompleted(_) => "planner_completed",
            Self::ExecuteStarted(_) => "execute_started",
            Self::RenderStarted(_) => "render_started",
            Self::DocumentStarted(_) => "document_started",
            Self::DocumentChunkCompleted(_) => "document_chunk_completed",
            Self::RenderCompleted(_) => "render_completed",
            Self::DocumentCompleted(_) => "document_completed",
            Self::JobFailed(_) => "job_failed",
            Self::ContributionGenerationFailed(_) => "contribution_generation_failed",
            Self::DialecticProgressUpdate(_) => "dialectic_progress_update",
            Self::Unknown => "unknown",
        }
    }

    /// Returns the run the event targets, for run-scoped events.
    #[must_use]
    pub fn progress_key(&self) -> Option<ProgressKey> {
        match self {
            Self::PlannerStarted(e)
            | Self::DialecticContributionStarted(e)
            | Self::PlannerCompleted(e)
            | Self::ExecuteStarted(e)
            | Self::RenderStarted(e)
            | Self::DocumentStarted(e)
            | Self::DocumentChunkCompleted(e)
            | Self::RenderCompleted(e)
            | Self::DocumentCompleted(e)
            | Self::JobFailed(e) => Some(e.progress_key()),
            Self::DialecticProgressUpdate(u) => Some(ProgressKey::new(
                u.session_id.clone(),
                u.stage_slug.clone(),
                u.iteration_number,
            )),
            Self::ContributionGenerationFailed(_) | Self::Unknown => None,
        }
    }

    /// Returns the session the event belongs to.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::PlannerStarted(e)
            | Self::DialecticContributionStarted(e)
            | Self::PlannerCompleted(e)
            | Self::ExecuteStarted(e)
            | Self::RenderStarted(e)
            | Self::DocumentStarted(e)
            | Self::DocumentChunkCompleted(e)
            | Self::RenderCompleted(e)
            | Self::DocumentCompleted(e)
            | Self::JobFailed(e) => Some(&e.session_id),
            Self::ContributionGenerationFailed(f) => Some(&f.session_id),
            Self::DialecticProgressUpdate(u) => Some(&u.session_id),
            Self::Unknown => None,
        }
    }
}
