//! Outbound progress notifications.
//!
//! The reducer describes what changed as [`ProgressNotification`] values.
//! The store hands them to an injected [`EventSink`] after each mutation.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use crate::core::{DocumentSlot, DocumentStatus, ProgressKey, StepStatus};
use serde_json::json;

/// A step's status changed.
pub const STEP_STATUS_CHANGED: &str = "progress.step_status_changed";
/// A document descriptor was created or changed.
pub const DOCUMENT_UPDATED: &str = "progress.document_updated";
/// A session-wide failure marked every open step failed.
pub const SESSION_FAILED: &str = "progress.session_failed";
/// Run progress was seeded from a server snapshot.
pub const HYDRATED: &str = "progress.hydrated";

/// A change produced by applying an event or a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressNotification {
    /// A step moved between statuses.
    StepStatusChanged {
        /// The run the step belongs to.
        progress_key: ProgressKey,
        /// The step.
        step_key: String,
        /// Previous status.
        from: StepStatus,
        /// New status.
        to: StepStatus,
    },
    /// A document descriptor changed.
    DocumentUpdated {
        /// The run the document belongs to.
        progress_key: ProgressKey,
        /// The document slot.
        slot: DocumentSlot,
        /// New status.
        status: DocumentStatus,
    },
    /// Every open step of a session was failed at once.
    SessionFailed {
        /// The session.
        session_id: String,
        /// Number of steps that were failed.
        failed_steps: usize,
        /// Error code, if the event carried one.
        code: Option<String>,
    },
    /// Buckets were seeded from a snapshot.
    Hydrated {
        /// The hydrated buckets.
        progress_keys: Vec<ProgressKey>,
    },
}

impl ProgressNotification {
    /// Returns the event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::StepStatusChanged { .. } => STEP_STATUS_CHANGED,
            Self::DocumentUpdated { .. } => DOCUMENT_UPDATED,
            Self::SessionFailed { .. } => SESSION_FAILED,
            Self::Hydrated { .. } => HYDRATED,
        }
    }

    /// Renders the event payload.
    #[must_use]
    pub fn to_data(&self) -> serde_json::Value {
        match self {
            Self::StepStatusChanged {
                progress_key,
                step_key,
                from,
                to,
            } => json!({
                "progress_key": progress_key.to_string(),
                "step_key": step_key,
                "from": from.as_str(),
                "to": to.as_str(),
            }),
            Self::DocumentUpdated {
                progress_key,
                slot,
                status,
            } => json!({
                "progress_key": progress_key.to_string(),
                "document_key": slot.document_key,
                "model_id": slot.model_id,
                "status": status.to_string(),
            }),
            Self::SessionFailed {
                session_id,
                failed_steps,
                code,
            } => json!({
                "session_id": session_id,
                "failed_steps": failed_steps,
                "code": code,
            }),
            Self::Hydrated { progress_keys } => json!({
                "progress_keys": progress_keys.iter().map(ToString::to_string).collect::<Vec<_>>(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_names() {
        let hydrated = ProgressNotification::Hydrated {
            progress_keys: vec![ProgressKey::new("s1", "thesis", 1)],
        };
        assert_eq!(hydrated.name(), HYDRATED);
        assert_eq!(hydrated.to_data()["progress_keys"][0], "s1:thesis:1");
    }

    #[test]
    fn test_document_updated_payload() {
        let notification = ProgressNotification::DocumentUpdated {
            progress_key: ProgressKey::new("s1", "thesis", 1),
            slot: DocumentSlot::new("summary", "model-a"),
            status: DocumentStatus::Completed,
        };
        let data = notification.to_data();
        assert_eq!(notification.name(), DOCUMENT_UPDATED);
        assert_eq!(data["model_id"], "model-a");
        assert_eq!(data["status"], "completed");
    }
}
