//! Lifecycle events and the reducer that applies them.
//!
//! Inbound events are decoded into [`LifecycleEvent`] and applied with
//! [`apply`]. Server snapshots go through the hydration loaders instead.

mod event;
mod hydrate;
mod reducer;

pub use event::{JobEvent, LifecycleEvent, ProgressUpdate, SessionFailure};
pub use hydrate::{
    hydrate_all_stage_progress, hydrate_stage_progress, DocumentSnapshot, JobProgressSnapshot,
    StageProgressSnapshot,
};
pub use reducer::apply;
