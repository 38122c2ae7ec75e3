//! Stage readiness evaluation.
//!
//! A stage run is ready when the inputs of its gating step are available.
//! The gating step is the earliest step (by `execution_order`) that has not
//! completed. Later steps are never consulted, and a failed gating step is
//! evaluated like any other so it can be retried.

mod locator;

pub use locator::{locate, LocateContext};

use crate::core::{ProgressKey, StepStatus};
use crate::recipe::{InputRequirement, RecipeStep};
use crate::state::DialecticState;
use serde::Serialize;

/// Outcome of evaluating one stage run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Readiness {
    /// True if the run may proceed.
    pub ready: bool,
    /// The gating step, if any step is incomplete.
    pub gating_step_key: Option<String>,
    /// Status of the gating step.
    pub gating_status: Option<StepStatus>,
    /// Required inputs of the gating step that were not found.
    pub missing: Vec<InputRequirement>,
}

impl Readiness {
    fn not_ready() -> Self {
        Self {
            ready: false,
            gating_step_key: None,
            gating_status: None,
            missing: Vec::new(),
        }
    }

    fn complete() -> Self {
        Self {
            ready: true,
            ..Self::not_ready()
        }
    }
}

/// Returns the gating step of a run and its status.
#[must_use]
pub fn gating_step<'a>(
    state: &'a DialecticState,
    progress_key: &ProgressKey,
) -> Option<(&'a RecipeStep, StepStatus)> {
    let run = state.run(progress_key);
    state
        .recipes
        .steps(&progress_key.stage_slug)
        .iter()
        .map(|step| {
            let status = run.map_or(StepStatus::NotStarted, |r| r.step_status(&step.step_key));
            (step, status)
        })
        .find(|(_, status)| *status != StepStatus::Completed)
}

/// Evaluates a stage run, reporting the gating step and what it lacks.
///
/// Unknown projects, sessions, or recipes yield a not-ready result.
#[must_use]
pub fn evaluate(
    state: &DialecticState,
    project_id: &str,
    session_id: &str,
    stage_slug: &str,
    iteration_number: u32,
) -> Readiness {
    let Some(project) = state.project.as_ref().filter(|p| p.id == project_id) else {
        return Readiness::not_ready();
    };
    let Some(session) = project.session(session_id) else {
        return Readiness::not_ready();
    };
    if state.recipes.get(stage_slug).is_none() {
        return Readiness::not_ready();
    }

    let progress_key = ProgressKey::new(session_id, stage_slug, iteration_number);
    let Some((step, status)) = gating_step(state, &progress_key) else {
        return Readiness::complete();
    };

    let ctx = LocateContext {
        state,
        project,
        session,
        progress_key: &progress_key,
    };
    let missing: Vec<InputRequirement> = step
        .inputs_required
        .iter()
        .filter(|requirement| requirement.required && !locate(requirement, &ctx))
        .cloned()
        .collect();

    Readiness {
        ready: missing.is_empty(),
        gating_step_key: Some(step.step_key.clone()),
        gating_status: Some(status),
        missing,
    }
}

/// Returns true if the stage run may proceed.
#[must_use]
pub fn is_ready(
    state: &DialecticState,
    project_id: &str,
    session_id: &str,
    stage_slug: &str,
    iteration_number: u32,
) -> bool {
    evaluate(state, project_id, session_id, stage_slug, iteration_number).ready
}
