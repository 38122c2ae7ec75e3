//! Projects, sessions, and the models selected for generation.

use super::ProcessTemplate;
use crate::core::{Contribution, FeedbackEntry, ProjectResource};
use serde::{Deserialize, Serialize};

/// A model chosen to take part in fan-out steps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectedModel {
    /// Model id.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub display_name: String,
}

impl SelectedModel {
    /// Creates a selected model.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
        }
    }
}

/// One dialectic session of a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DialecticSession {
    /// Session id.
    pub id: String,
    /// The stage the session is in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage_id: Option<String>,
    /// Iterations completed so far.
    #[serde(default)]
    pub iteration_count: u32,
    /// Documents produced in the session.
    #[serde(default, rename = "dialectic_contributions", alias = "contributions")]
    pub contributions: Vec<Contribution>,
    /// Feedback recorded in the session.
    #[serde(default)]
    pub feedback: Vec<FeedbackEntry>,
}

impl DialecticSession {
    /// Creates an empty session.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            iteration_count: 1,
            ..Self::default()
        }
    }

    /// Sets the current stage.
    #[must_use]
    pub fn with_current_stage(mut self, stage_id: impl Into<String>) -> Self {
        self.current_stage_id = Some(stage_id.into());
        self
    }

    /// Adds a contribution.
    #[must_use]
    pub fn with_contribution(mut self, contribution: Contribution) -> Self {
        self.contributions.push(contribution);
        self
    }

    /// Adds a feedback entry.
    #[must_use]
    pub fn with_feedback(mut self, feedback: FeedbackEntry) -> Self {
        self.feedback.push(feedback);
        self
    }
}

/// Snapshot of a project as delivered by the remote service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DialecticProject {
    /// Project id.
    pub id: String,
    /// The template the project runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_template: Option<ProcessTemplate>,
    /// Project-level resources.
    #[serde(default)]
    pub resources: Vec<ProjectResource>,
    /// Sessions of the project.
    #[serde(default, rename = "dialectic_sessions", alias = "sessions")]
    pub sessions: Vec<DialecticSession>,
}

impl DialecticProject {
    /// Creates an empty project.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Sets the process template.
    #[must_use]
    pub fn with_template(mut self, template: ProcessTemplate) -> Self {
        self.process_template = Some(template);
        self
    }

    /// Adds a resource.
    #[must_use]
    pub fn with_resource(mut self, resource: ProjectResource) -> Self {
        self.resources.push(resource);
        self
    }

    /// Adds a session.
    #[must_use]
    pub fn with_session(mut self, session: DialecticSession) -> Self {
        self.sessions.push(session);
        self
    }

    /// Finds a session by id.
    #[must_use]
    pub fn session(&self, session_id: &str) -> Option<&DialecticSession> {
        self.sessions.iter().find(|s| s.id == session_id)
    }

    /// Finds a session by id for mutation.
    pub fn session_mut(&mut self, session_id: &str) -> Option<&mut DialecticSession> {
        self.sessions.iter_mut().find(|s| s.id == session_id)
    }
}
