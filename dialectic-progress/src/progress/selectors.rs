//! Point lookups over the state snapshot.

use super::StageRunProgress;
use crate::core::{DocumentSlot, DocumentStatus, FeedbackEntry, ProgressKey, StepStatus};
use crate::project::DialecticStage;
use crate::recipe::RecipeStep;
use crate::state::DialecticState;
use std::collections::BTreeSet;

/// Returns a stage's steps in gating order; empty without a recipe.
#[must_use]
pub fn step_list<'a>(state: &'a DialecticState, stage_slug: &str) -> &'a [RecipeStep] {
    state.recipes.steps(stage_slug)
}

/// Returns the template's stages in transition order.
#[must_use]
pub fn sorted_stages(state: &DialecticState) -> Vec<&DialecticStage> {
    state
        .project
        .as_ref()
        .and_then(|p| p.process_template.as_ref())
        .map(|t| t.sorted_stages())
        .unwrap_or_default()
}

/// Returns the progress bucket of one run.
#[must_use]
pub fn stage_run_progress<'a>(
    state: &'a DialecticState,
    session_id: &str,
    stage_slug: &str,
    iteration_number: u32,
) -> Option<&'a StageRunProgress> {
    state.run(&ProgressKey::new(session_id, stage_slug, iteration_number))
}

/// Returns a recorded step status; `None` if the run or step is untracked.
#[must_use]
pub fn step_status(state: &DialecticState, progress_key: &ProgressKey, step_key: &str) -> Option<StepStatus> {
    state
        .run(progress_key)
        .and_then(|run| run.step_statuses.get(step_key).copied())
}

/// Returns the status of a document slot.
#[must_use]
pub fn document_status(
    state: &DialecticState,
    progress_key: &ProgressKey,
    slot: &DocumentSlot,
) -> Option<DocumentStatus> {
    state
        .run(progress_key)
        .and_then(|run| run.document(slot))
        .map(|d| d.status)
}

/// Returns the latest rendered resource of a document slot.
#[must_use]
pub fn latest_rendered_ref<'a>(
    state: &'a DialecticState,
    progress_key: &ProgressKey,
    slot: &DocumentSlot,
) -> Option<&'a str> {
    state
        .run(progress_key)
        .and_then(|run| run.document(slot))
        .and_then(|d| d.latest_rendered_resource_id.as_deref())
}

/// Returns a session's feedback for one stage iteration.
#[must_use]
pub fn feedback_for_stage_iteration<'a>(
    state: &'a DialecticState,
    session_id: &str,
    stage_slug: &str,
    iteration_number: u32,
) -> Vec<&'a FeedbackEntry> {
    state.session(session_id).map_or_else(Vec::new, |session| {
        session
            .feedback
            .iter()
            .filter(|f| f.stage_slug == stage_slug && f.iteration_number == iteration_number)
            .collect()
    })
}

/// Returns the markdown document keys a stage's recipe declares.
#[must_use]
pub fn valid_markdown_document_keys<'a>(state: &'a DialecticState, stage_slug: &str) -> BTreeSet<&'a str> {
    state
        .recipes
        .get(stage_slug)
        .map(|recipe| recipe.markdown_document_keys())
        .unwrap_or_default()
}
