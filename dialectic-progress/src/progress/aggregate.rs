//! Stage and project roll-ups.
//!
//! Everything here is recomputed from the snapshot on every call. Missing
//! recipes, templates, or sessions produce zero-valued results.

use super::StageRunProgress;
use crate::config::RoundingMode;
use crate::core::{DocumentSlot, DocumentStatus, ProgressKey, ProgressStatus, StepStatus};
use crate::project::DialecticStage;
use crate::recipe::RecipeStep;
use crate::state::DialecticState;
use serde::Serialize;

/// Roll-up of one recipe step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepProgressDetail {
    /// The step key.
    pub step_key: String,
    /// The step name.
    pub step_name: String,
    /// Models the step fans out to (1 for non-model steps).
    pub total_models: usize,
    /// Models whose documents all completed.
    pub completed_models: usize,
    /// Share of models completed.
    pub step_percentage: f64,
    /// Resolved status.
    pub status: ProgressStatus,
}

/// Roll-up of one stage run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageProgressDetail {
    /// The stage slug.
    pub stage_slug: String,
    /// Steps in the recipe.
    pub total_steps: usize,
    /// Steps resolved as completed.
    pub completed_steps: usize,
    /// Steps resolved as failed.
    pub failed_steps: usize,
    /// `completed_steps / total_steps * 100`, rounded.
    pub stage_percentage: f64,
    /// Stage status.
    pub stage_status: ProgressStatus,
    /// Per-step detail in gating order.
    pub steps_detail: Vec<StepProgressDetail>,
}

impl StageProgressDetail {
    /// A zero-valued detail for a stage with no recipe.
    #[must_use]
    pub fn empty(stage_slug: impl Into<String>) -> Self {
        Self {
            stage_slug: stage_slug.into(),
            total_steps: 0,
            completed_steps: 0,
            failed_steps: 0,
            stage_percentage: 0.0,
            stage_status: ProgressStatus::NotStarted,
            steps_detail: Vec::new(),
        }
    }
}

/// Roll-up of a whole session across the template's stages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedProjectProgress {
    /// Stages in the template.
    pub total_stages: usize,
    /// Completed stages before the current one.
    pub completed_stages: usize,
    /// Slug of the session's current stage.
    pub current_stage_slug: Option<String>,
    /// The session's current stage.
    pub current_stage: Option<DialecticStage>,
    /// Overall completion, clamped to `[0, 100]`.
    pub overall_percentage: f64,
    /// Project status.
    pub project_status: ProgressStatus,
    /// Per-stage detail in transition order.
    pub stage_details: Vec<StageProgressDetail>,
}

impl UnifiedProjectProgress {
    fn empty() -> Self {
        Self {
            total_stages: 0,
            completed_stages: 0,
            current_stage_slug: None,
            current_stage: None,
            overall_percentage: 0.0,
            project_status: ProgressStatus::NotStarted,
            stage_details: Vec::new(),
        }
    }
}

/// Resolves one step against the selected models.
///
/// Model steps with a model selection are driven by their document
/// descriptors: every `(model, markdown key)` pair must complete. Other
/// steps mirror their own status entry.
#[must_use]
pub fn resolve_step(
    step: &RecipeStep,
    run: Option<&StageRunProgress>,
    model_ids: &[&str],
    rounding: RoundingMode,
) -> StepProgressDetail {
    let own = run.map_or(StepStatus::NotStarted, |r| r.step_status(&step.step_key));

    if !step.is_model_step() || model_ids.is_empty() {
        let done = own == StepStatus::Completed;
        return StepProgressDetail {
            step_key: step.step_key.clone(),
            step_name: step.step_name.clone(),
            total_models: 1,
            completed_models: usize::from(done),
            step_percentage: if done { 100.0 } else { 0.0 },
            status: own.into(),
        };
    }

    let keys: Vec<&str> = step.markdown_document_keys().collect();
    let mut completed_models = 0;
    let mut any_failed = false;
    let mut any_started = false;

    for model_id in model_ids {
        let mut model_done = true;
        for key in &keys {
            let descriptor = run.and_then(|r| r.document(&DocumentSlot::new(*key, *model_id)));
            match descriptor {
                Some(d) if d.is_completed() => any_started = true,
                Some(d) => {
                    model_done = false;
                    any_failed |= d.status == DocumentStatus::Failed;
                    any_started |= d.status.is_active();
                }
                None => model_done = false,
            }
        }
        if model_done {
            completed_models += 1;
        }
    }

    let jobs_running = run
        .and_then(|r| r.job_progress.get(&step.step_key))
        .is_some_and(super::JobProgress::has_running_model_jobs);

    let status = if any_failed {
        ProgressStatus::Failed
    } else if completed_models == model_ids.len() {
        ProgressStatus::Completed
    } else if own == StepStatus::Failed {
        ProgressStatus::Failed
    } else if any_started
        || jobs_running
        || matches!(own, StepStatus::InProgress | StepStatus::WaitingForChildren)
    {
        ProgressStatus::InProgress
    } else {
        ProgressStatus::NotStarted
    };

    StepProgressDetail {
        step_key: step.step_key.clone(),
        step_name: step.step_name.clone(),
        total_models: model_ids.len(),
        completed_models,
        step_percentage: rounding.percentage(completed_models, model_ids.len()),
        status,
    }
}

/// Computes the roll-up of one stage run.
#[must_use]
pub fn stage_progress(
    state: &DialecticState,
    session_id: &str,
    stage_slug: &str,
    iteration_number: u32,
    rounding: RoundingMode,
) -> StageProgressDetail {
    let steps = state.recipes.steps(stage_slug);
    if steps.is_empty() {
        return StageProgressDetail::empty(stage_slug);
    }

    let run = state.run(&ProgressKey::new(session_id, stage_slug, iteration_number));
    let model_ids: Vec<&str> = state.selected_model_ids().collect();
    let steps_detail: Vec<StepProgressDetail> = steps
        .iter()
        .map(|step| resolve_step(step, run, &model_ids, rounding))
        .collect();

    let total_steps = steps_detail.len();
    let count = |status: ProgressStatus| steps_detail.iter().filter(|s| s.status == status).count();
    let completed_steps = count(ProgressStatus::Completed);
    let failed_steps = count(ProgressStatus::Failed);
    let any_in_progress = count(ProgressStatus::InProgress) > 0;

    let stage_status = if failed_steps > 0 {
        ProgressStatus::Failed
    } else if completed_steps == total_steps {
        ProgressStatus::Completed
    } else if any_in_progress || completed_steps > 0 {
        ProgressStatus::InProgress
    } else {
        ProgressStatus::NotStarted
    };

    StageProgressDetail {
        stage_slug: stage_slug.to_string(),
        total_steps,
        completed_steps,
        failed_steps,
        stage_percentage: rounding.percentage(completed_steps, total_steps),
        stage_status,
        steps_detail,
    }
}

/// Computes the roll-up of a session across every template stage.
///
/// Stages are visited in transition order. Only stages before the current
/// stage count toward `completed_stages`; the current stage contributes its
/// percentage. With no current stage, every completed stage counts.
#[must_use]
pub fn project_progress(
    state: &DialecticState,
    session_id: &str,
    rounding: RoundingMode,
) -> UnifiedProjectProgress {
    let Some(project) = state.project.as_ref() else {
        return UnifiedProjectProgress::empty();
    };
    let Some(template) = project.process_template.as_ref() else {
        return UnifiedProjectProgress::empty();
    };
    let stages = template.sorted_stages();
    if stages.is_empty() {
        return UnifiedProjectProgress::empty();
    }

    let session = project.session(session_id);
    let iteration_number = session.map_or(0, |s| s.iteration_count);
    let current_index = session
        .and_then(|s| s.current_stage_id.as_deref())
        .and_then(|id| stages.iter().position(|stage| stage.id == id));
    let current_stage = current_index.map(|i| stages[i].clone());

    let stage_details: Vec<StageProgressDetail> = stages
        .iter()
        .map(|stage| stage_progress(state, session_id, &stage.slug, iteration_number, rounding))
        .collect();

    let total_stages = stage_details.len();
    let counted = current_index.unwrap_or(total_stages);
    let completed_stages = stage_details[..counted]
        .iter()
        .filter(|d| d.stage_status == ProgressStatus::Completed)
        .count();
    let current_percentage = current_index.map_or(0.0, |i| stage_details[i].stage_percentage);

    #[allow(clippy::cast_precision_loss)]
    let raw = (completed_stages as f64 * 100.0 + current_percentage) / total_stages as f64;
    let overall_percentage = rounding.apply(raw).clamp(0.0, 100.0);

    let visited = current_index.map_or(total_stages, |i| i + 1);
    let project_status = if stage_details[..visited]
        .iter()
        .any(|d| d.stage_status == ProgressStatus::Failed)
    {
        ProgressStatus::Failed
    } else if stage_details
        .iter()
        .all(|d| d.stage_status == ProgressStatus::Completed)
    {
        ProgressStatus::Completed
    } else if overall_percentage > 0.0
        || stage_details
            .iter()
            .any(|d| d.stage_status == ProgressStatus::InProgress)
    {
        ProgressStatus::InProgress
    } else {
        ProgressStatus::NotStarted
    };

    UnifiedProjectProgress {
        total_stages,
        completed_stages,
        current_stage_slug: current_stage.as_ref().map(|s| s.slug.clone()),
        current_stage,
        overall_percentage,
        project_status,
        stage_details,
    }
}
