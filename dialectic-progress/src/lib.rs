//! # Dialectic Progress
//!
//! Readiness and progress tracking for multi-stage, multi-model dialectic
//! generation.
//!
//! A stage runs a recipe: an ordered list of steps, each declaring the inputs
//! it needs and the documents it produces. This crate answers two questions
//! about any `(session, stage, iteration)` run:
//!
//! - **Is it ready?** The earliest incomplete step gates the run; it is ready
//!   when every required input of that step can be located.
//! - **How far along is it?** Step, stage, and project roll-ups computed from
//!   per-model document status.
//!
//! Run progress is driven by lifecycle events from the generation service and
//! can be seeded from server snapshots.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dialectic_progress::prelude::*;
//!
//! let store = DialecticStore::new();
//! store.load_recipe(StageRecipe::from_json(recipe_json)?);
//! store.set_project(project);
//!
//! store.dispatch_json(event_json)?;
//!
//! if store.is_ready("project-1", "session-1", "thesis", 1) {
//!     // start the next job
//! }
//! let progress = store.project_progress("session-1");
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod drafts;
pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod observability;
pub mod progress;
pub mod project;
pub mod readiness;
pub mod recipe;
pub mod state;
pub mod store;
pub mod testing;
pub mod utils;


/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{LoggingConfig, ProgressConfig, RoundingMode};
    pub use crate::core::{
        DocumentSlot, DocumentStatus, JobState, JobType, ProgressKey, ProgressStatus, ProjectResource,
        SeedPrompt, StageDocumentKey, StepStatus,
    };
    pub use crate::errors::{HydrationError, ProgressError, RecipeValidationError};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink, ProgressNotification};
    pub use crate::lifecycle::{JobEvent, LifecycleEvent};
    pub use crate::progress::{StageProgressDetail, StepProgressDetail, UnifiedProjectProgress};
    pub use crate::project::{DialecticProject, DialecticSession, DialecticStage, ProcessTemplate, SelectedModel};
    pub use crate::readiness::Readiness;
    pub use crate::recipe::{InputRequirement, OutputRequirement, RecipeStep, StageRecipe};
    pub use crate::state::DialecticState;
    pub use crate::store::DialecticStore;
}
