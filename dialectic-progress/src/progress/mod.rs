//! Run progress state and the projections computed from it.
//!
//! [`run`] holds the mutable per-run buckets. Everything else in this module
//! is a pure function of a [`DialecticState`](crate::state::DialecticState)
//! snapshot and is recomputed on every call.

mod aggregate;
mod run;
pub mod selectors;
mod summary;

pub use aggregate::{
    project_progress, resolve_step, stage_progress, StageProgressDetail, StepProgressDetail,
    UnifiedProjectProgress,
};
pub use run::{
    DocumentDescriptor, JobCounts, JobError, JobProgress, ProgressDisplay, RunProgressMap,
    StageRunProgress,
};
pub use summary::{stage_document_checklist, stage_progress_summary, ChecklistEntry, StageDocumentSummary};
