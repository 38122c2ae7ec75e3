//! Step, document, and roll-up status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of job a recipe step runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobType {
    /// A planning job (produces header contexts and plans child jobs).
    Plan,
    /// An execution job (one per selected model).
    Execute,
    /// A render job (turns raw output into a rendered document).
    Render,
}

impl Default for JobType {
    fn default() -> Self {
        Self::Execute
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plan => write!(f, "PLAN"),
            Self::Execute => write!(f, "EXECUTE"),
            Self::Render => write!(f, "RENDER"),
        }
    }
}

/// The status of a recipe step within one stage run.
///
/// Usually monotonic, but `Failed -> InProgress` is a legal retry transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// No event has been observed for the step.
    NotStarted,
    /// A job for the step is running.
    InProgress,
    /// The step planned child jobs and is waiting on them.
    WaitingForChildren,
    /// The step finished.
    Completed,
    /// The step failed (retry-eligible).
    Failed,
}

impl Default for StepStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StepStatus {
    /// Returns the wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::WaitingForChildren => "waiting_for_children",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a wire name, returning `None` for unknown values.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "not_started" => Some(Self::NotStarted),
            "in_progress" => Some(Self::InProgress),
            "waiting_for_children" => Some(Self::WaitingForChildren),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns true if the status is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if the step has completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// The status of one rendered document descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Not yet generating.
    NotStarted,
    /// Generation is in flight.
    Generating,
    /// A chunk finished and more chunks follow.
    Continuing,
    /// Rendered; the descriptor carries a rendered resource id.
    Completed,
    /// Generation or rendering failed.
    Failed,
}

impl Default for DocumentStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::Generating => write!(f, "generating"),
            Self::Continuing => write!(f, "continuing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl DocumentStatus {
    /// Returns true if the status is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true while the document is being produced.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Generating | Self::Continuing)
    }
}

/// Roll-up status for steps, stages, and projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    /// Nothing has happened yet.
    NotStarted,
    /// Work is underway.
    InProgress,
    /// Everything finished.
    Completed,
    /// Something failed.
    Failed,
}

impl Default for ProgressStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl From<StepStatus> for ProgressStatus {
    fn from(status: StepStatus) -> Self {
        match status {
            StepStatus::NotStarted => Self::NotStarted,
            StepStatus::InProgress | StepStatus::WaitingForChildren => Self::InProgress,
            StepStatus::Completed => Self::Completed,
            StepStatus::Failed => Self::Failed,
        }
    }
}

/// State of a single job as tracked in job progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// The job is running.
    InProgress,
    /// The job finished successfully.
    Completed,
    /// The job failed.
    Failed,
}
