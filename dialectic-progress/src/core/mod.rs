//! Core domain model types.
//!
//! This module contains the fundamental types used throughout the engine:
//! - Step, document, and roll-up status enums
//! - Composite keys for run-progress buckets and document slots
//! - Project artifacts (resources, contributions, feedback, seed prompts)

mod artifact;
mod keys;
mod status;

pub use artifact::{
    Contribution, FeedbackEntry, ProjectResource, ResourceDescription, ResourceScope, SeedPrompt,
};
pub use keys::{DocumentSlot, ProgressKey, StageDocumentKey, DOCUMENT_KEY_SEPARATOR};
pub use status::{DocumentStatus, JobState, JobType, ProgressStatus, StepStatus};
