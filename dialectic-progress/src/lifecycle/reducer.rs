//! Applies lifecycle events to run progress.
//!
//! The reducer is the only writer of [`StageRunProgress`] outside hydration.
//! It never fails: events that cannot be applied are logged and dropped.
//! Replaying an event is a no-op because job states are keyed by job id and
//! a completed job or document never regresses.

use super::event::{JobEvent, LifecycleEvent, ProgressUpdate, SessionFailure};
use crate::core::{DocumentSlot, DocumentStatus, JobState, ProgressKey, StepStatus};
use crate::events::ProgressNotification;
use crate::progress::{DocumentDescriptor, JobError, ProgressDisplay, StageRunProgress};
use crate::project::SelectedModel;
use crate::recipe::{RecipeRegistry, RecipeStep};
use crate::state::DialecticState;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Applies one event and returns the changes it made.
pub fn apply(state: &mut DialecticState, event: &LifecycleEvent) -> Vec<ProgressNotification> {
    let mut notes = Vec::new();
    match event {
        LifecycleEvent::PlannerStarted(e)
        | LifecycleEvent::DialecticContributionStarted(e)
        | LifecycleEvent::ExecuteStarted(e)
        | LifecycleEvent::RenderStarted(e) => {
            let key = e.progress_key();
            RunWriter::new(&key, state.run_progress.get_or_create(&key), &mut notes)
                .job_started(event.type_name(), e);
        }
        LifecycleEvent::PlannerCompleted(e) => {
            let key = e.progress_key();
            RunWriter::new(&key, state.run_progress.get_or_create(&key), &mut notes).planner_completed(e);
        }
        LifecycleEvent::DocumentStarted(e) => {
            let key = e.progress_key();
            let markdown_keys = markdown_keys(&state.recipes, &e.stage_slug);
            RunWriter::new(&key, state.run_progress.get_or_create(&key), &mut notes)
                .document_started(e, &markdown_keys);
        }
        LifecycleEvent::DocumentChunkCompleted(e) => {
            let key = e.progress_key();
            RunWriter::new(&key, state.run_progress.get_or_create(&key), &mut notes)
                .document_chunk_completed(e);
        }
        LifecycleEvent::RenderCompleted(e) => {
            let key = e.progress_key();
            let step = e.step().and_then(|s| find_step(&state.recipes, &e.stage_slug, s));
            RunWriter::new(&key, state.run_progress.get_or_create(&key), &mut notes).render_completed(
                e,
                step,
                &state.selected_models,
            );
        }
        LifecycleEvent::DocumentCompleted(e) => {
            let key = e.progress_key();
            let step = e.step().and_then(|s| find_step(&state.recipes, &e.stage_slug, s));
            RunWriter::new(&key, state.run_progress.get_or_create(&key), &mut notes).document_completed(
                e,
                step,
                &state.selected_models,
            );
        }
        LifecycleEvent::JobFailed(e) if e.job().is_none() => {
            fail_session(state, &e.session_id, e.error.as_ref(), &mut notes);
        }
        LifecycleEvent::JobFailed(e) => {
            let key = e.progress_key();
            RunWriter::new(&key, state.run_progress.get_or_create(&key), &mut notes).job_failed(e);
        }
        LifecycleEvent::ContributionGenerationFailed(SessionFailure { session_id, error, .. }) => {
            fail_session(state, session_id, error.as_ref(), &mut notes);
        }
        LifecycleEvent::DialecticProgressUpdate(update) => {
            record_display(state, update);
        }
        LifecycleEvent::Unknown => {
            debug!("ignoring unknown lifecycle event");
        }
    }
    notes
}

fn markdown_keys(recipes: &RecipeRegistry, stage_slug: &str) -> BTreeSet<String> {
    recipes
        .get(stage_slug)
        .map(|r| r.markdown_document_keys().into_iter().map(str::to_string).collect())
        .unwrap_or_default()
}

fn find_step<'a>(recipes: &'a RecipeRegistry, stage_slug: &str, step_key: &str) -> Option<&'a RecipeStep> {
    recipes.get(stage_slug).and_then(|r| r.step(step_key))
}

/// Returns true once every selected model has completed every markdown
/// document the step declares.
///
/// Steps that do not fan out, unknown steps, and runs without a model
/// selection complete on the first completion event.
fn fan_out_complete(step: Option<&RecipeStep>, run: &StageRunProgress, models: &[SelectedModel]) -> bool {
    let Some(step) = step.filter(|s| s.is_model_step()) else {
        return true;
    };
    if models.is_empty() {
        return true;
    }
    models.iter().all(|model| {
        step.markdown_document_keys().all(|key| {
            run.document(&DocumentSlot::new(key, model.id.as_str()))
                .is_some_and(DocumentDescriptor::is_completed)
        })
    })
}

/// Mutation context for one run bucket.
struct RunWriter<'a> {
    key: &'a ProgressKey,
    run: &'a mut StageRunProgress,
    notes: &'a mut Vec<ProgressNotification>,
}

impl<'a> RunWriter<'a> {
    fn new(
        key: &'a ProgressKey,
        run: &'a mut StageRunProgress,
        notes: &'a mut Vec<ProgressNotification>,
    ) -> Self {
        Self { key, run, notes }
    }

    fn set_step(&mut self, step_key: &str, status: StepStatus) {
        if let Some(from) = self.run.set_step_status(step_key, status) {
            debug!(
                progress_key = %self.key,
                step_key,
                from = from.as_str(),
                to = status.as_str(),
                "step status changed"
            );
            self.notes.push(ProgressNotification::StepStatusChanged {
                progress_key: self.key.clone(),
                step_key: step_key.to_string(),
                from,
                to: status,
            });
        }
    }

    /// Moves a step to in progress unless it already completed.
    fn start_step(&mut self, step_key: &str) {
        if self.run.step_status(step_key) == StepStatus::Completed {
            debug!(progress_key = %self.key, step_key, "start ignored; step already completed");
            return;
        }
        self.set_step(step_key, StepStatus::InProgress);
    }

    fn record_job(&mut self, e: &JobEvent, state: JobState) -> Option<JobState> {
        let (Some(step_key), Some(job_id)) = (e.step(), e.job()) else {
            return None;
        };
        Some(self.run.job_progress_mut(step_key).record(job_id, e.model(), state))
    }

    fn document_changed(&mut self, slot: &DocumentSlot, before: Option<DocumentDescriptor>) {
        let Some(after) = self.run.document(slot) else {
            return;
        };
        if before.as_ref() == Some(after) {
            return;
        }
        debug!(
            progress_key = %self.key,
            document_key = %slot.document_key,
            model_id = slot.model_id.as_deref().unwrap_or_default(),
            job_id = %after.job_id,
            status = ?after.status,
            "document updated"
        );
        self.notes.push(ProgressNotification::DocumentUpdated {
            progress_key: self.key.clone(),
            slot: slot.clone(),
            status: after.status,
        });
    }

    fn job_started(&mut self, kind: &str, e: &JobEvent) {
        let Some(step_key) = e.step() else {
            warn!(progress_key = %self.key, event = kind, "start ignored; step_key missing");
            return;
        };
        self.record_job(e, JobState::InProgress);
        self.start_step(step_key);
    }

    fn planner_completed(&mut self, e: &JobEvent) {
        let Some(step_key) = e.step() else {
            warn!(progress_key = %self.key, "planner_completed ignored; step_key missing");
            return;
        };
        self.record_job(e, JobState::Completed);
        self.set_step(step_key, StepStatus::Completed);
    }

    fn document_started(&mut self, e: &JobEvent, markdown_keys: &BTreeSet<String>) {
        let Some(document_key) = e.document() else {
            warn!(progress_key = %self.key, "document_started ignored; document_key missing");
            return;
        };
        let job_id = e.job().unwrap_or_default();
        if let Some(step_key) = e.step() {
            self.record_job(e, JobState::InProgress);
            self.start_step(step_key);
        }

        let slot = DocumentSlot::from_parts(document_key, e.model());
        let before = self.run.document(&slot).cloned();
        if before.as_ref().is_some_and(DocumentDescriptor::is_completed) {
            debug!(progress_key = %self.key, document_key, "document_started ignored; document completed");
            return;
        }

        let descriptor = self
            .run
            .documents
            .entry(slot.clone())
            .or_insert_with(|| DocumentDescriptor::generating(job_id, e.model()));
        descriptor.status = DocumentStatus::Generating;
        descriptor.job_id = job_id.to_string();
        descriptor.model_id = e.model().map(str::to_string);
        if let Some(step_key) = e.step() {
            descriptor.step_key = Some(step_key.to_string());
        }
        match e.resource() {
            Some(resource_id) => descriptor.record_render(resource_id),
            // Control-plane outputs have no rendered resource; the job id
            // stands in for one.
            None if !markdown_keys.contains(document_key) && !job_id.is_empty() => {
                descriptor.latest_rendered_resource_id = Some(job_id.to_string());
                descriptor.last_rendered_resource_id = Some(job_id.to_string());
            }
            None => {}
        }
        self.document_changed(&slot, before);
    }

    fn document_chunk_completed(&mut self, e: &JobEvent) {
        let Some(document_key) = e.document() else {
            warn!(progress_key = %self.key, "document_chunk_completed ignored; document_key missing");
            return;
        };
        let slot = DocumentSlot::from_parts(document_key, e.model());
        let Some(descriptor) = self.run.documents.get_mut(&slot) else {
            warn!(progress_key = %self.key, document_key, "document_chunk_completed ignored; document not tracked");
            return;
        };
        if descriptor.is_completed() {
            return;
        }
        let before = descriptor.clone();

        if let Some(job_id) = e.job() {
            descriptor.job_id = job_id.to_string();
        }
        if descriptor.step_key.is_none() {
            descriptor.step_key = e.step().map(str::to_string);
        }
        if let Some(resource_id) = e.resource() {
            if descriptor.latest_rendered_resource_id.as_deref() != Some(resource_id) {
                descriptor.record_render(resource_id);
            }
        }
        if e.is_final_chunk {
            let resource_id = descriptor
                .latest_rendered_resource_id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| descriptor.job_id.clone());
            descriptor.complete(&resource_id);
        } else {
            descriptor.status = DocumentStatus::Continuing;
        }
        self.document_changed(&slot, Some(before));
    }

    fn render_completed(&mut self, e: &JobEvent, step: Option<&RecipeStep>, models: &[SelectedModel]) {
        let Some(resource_id) = e.resource() else {
            warn!(progress_key = %self.key, "render_completed ignored; latestRenderedResourceId missing");
            return;
        };
        let Some(document_key) = e.document() else {
            warn!(progress_key = %self.key, "render_completed ignored; document_key missing");
            return;
        };
        let job_id = e.job().unwrap_or_default();
        let slot = DocumentSlot::from_parts(document_key, e.model());
        let before = self.run.document(&slot).cloned();

        let descriptor = self
            .run
            .documents
            .entry(slot.clone())
            .or_insert_with(|| DocumentDescriptor::generating(job_id, e.model()));
        if !job_id.is_empty() {
            descriptor.job_id = job_id.to_string();
        }
        if let Some(step_key) = e.step() {
            descriptor.step_key = Some(step_key.to_string());
        }
        descriptor.complete(resource_id);
        self.document_changed(&slot, before);

        self.record_job(e, JobState::Completed);
        self.advance_step(e, step, models);
    }

    fn document_completed(&mut self, e: &JobEvent, step: Option<&RecipeStep>, models: &[SelectedModel]) {
        let Some(document_key) = e.document() else {
            warn!(progress_key = %self.key, "document_completed ignored; document_key missing");
            return;
        };
        let slot = DocumentSlot::from_parts(document_key, e.model());
        let Some(descriptor) = self.run.documents.get_mut(&slot) else {
            warn!(progress_key = %self.key, document_key, "document_completed ignored; document not tracked");
            return;
        };
        let before = descriptor.clone();
        if let Some(job_id) = e.job() {
            descriptor.job_id = job_id.to_string();
        }
        if let Some(step_key) = e.step() {
            descriptor.step_key = Some(step_key.to_string());
        }
        let resource_id = e
            .resource()
            .map(str::to_string)
            .or_else(|| descriptor.latest_rendered_resource_id.clone().filter(|id| !id.is_empty()))
            .unwrap_or_else(|| descriptor.job_id.clone());
        descriptor.complete(&resource_id);
        self.document_changed(&slot, Some(before));

        self.record_job(e, JobState::Completed);
        self.advance_step(e, step, models);
    }

    fn advance_step(&mut self, e: &JobEvent, step: Option<&RecipeStep>, models: &[SelectedModel]) {
        let Some(step_key) = e.step() else {
            return;
        };
        if fan_out_complete(step, self.run, models) {
            self.set_step(step_key, StepStatus::Completed);
        } else if self.run.step_status(step_key) != StepStatus::Failed {
            // A failed step leaves `failed` only through a start event.
            self.start_step(step_key);
        }
    }

    fn job_failed(&mut self, e: &JobEvent) {
        let job_id = e.job().unwrap_or_default();
        if let Some(step_key) = e.step() {
            if self.record_job(e, JobState::Failed) == Some(JobState::Completed) {
                debug!(progress_key = %self.key, step_key, job_id, "job_failed ignored; job already completed");
                return;
            }
            self.set_step(step_key, StepStatus::Failed);
        }

        let (Some(document_key), Some(model_id)) = (e.document(), e.model()) else {
            return;
        };
        let slot = DocumentSlot::new(document_key, model_id);
        let before = self.run.document(&slot).cloned();
        if before
            .as_ref()
            .is_some_and(|d| d.is_completed() && d.job_id == job_id)
        {
            return;
        }
        let descriptor = self
            .run
            .documents
            .entry(slot.clone())
            .or_insert_with(|| DocumentDescriptor::generating(job_id, Some(model_id)));
        descriptor.job_id = job_id.to_string();
        if descriptor.step_key.is_none() {
            descriptor.step_key = e.step().map(str::to_string);
        }
        if let Some(resource_id) = e.resource() {
            descriptor.record_render(resource_id);
        }
        descriptor.fail(e.error.clone());
        warn!(
            progress_key = %self.key,
            document_key,
            model_id,
            job_id,
            code = e.error.as_ref().map(|err| err.code.as_str()),
            "document failed"
        );
        self.document_changed(&slot, before);
    }
}

/// Fails every open step, document, and job of a session.
fn fail_session(
    state: &mut DialecticState,
    session_id: &str,
    error: Option<&JobError>,
    notes: &mut Vec<ProgressNotification>,
) {
    let mut failed_steps = 0;

    for (key, run) in state.run_progress.session_runs_mut(session_id) {
        let mut step_keys: BTreeSet<String> = run.step_statuses.keys().cloned().collect();
        step_keys.extend(state.recipes.steps(&key.stage_slug).iter().map(|s| s.step_key.clone()));

        let mut writer = RunWriter::new(key, run, notes);
        for step_key in &step_keys {
            if !writer.run.step_status(step_key).is_terminal() {
                writer.set_step(step_key, StepStatus::Failed);
                failed_steps += 1;
            }
        }

        let open: Vec<DocumentSlot> = writer
            .run
            .documents
            .iter()
            .filter(|(_, d)| !d.status.is_terminal())
            .map(|(slot, _)| slot.clone())
            .collect();
        for slot in open {
            let before = writer.run.document(&slot).cloned();
            if let Some(descriptor) = writer.run.documents.get_mut(&slot) {
                descriptor.fail(error.cloned());
            }
            writer.document_changed(&slot, before);
        }

        for jobs in writer.run.job_progress.values_mut() {
            jobs.fail_running();
        }
    }

    warn!(
        session_id,
        failed_steps,
        code = error.map(|e| e.code.as_str()),
        "session generation failed"
    );
    notes.push(ProgressNotification::SessionFailed {
        session_id: session_id.to_string(),
        failed_steps,
        code: error.map(|e| e.code.clone()),
    });
}

fn record_display(state: &mut DialecticState, update: &ProgressUpdate) {
    let key = ProgressKey::new(update.session_id.clone(), update.stage_slug.clone(), update.iteration_number);
    info!(
        progress_key = %key,
        current_step = update.current_step,
        total_steps = update.total_steps,
        "progress update"
    );
    state.run_progress.get_or_create(&key).display = Some(ProgressDisplay {
        current_step: update.current_step,
        total_steps: update.total_steps,
        message: update.message.clone(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::JobType;
    use crate::recipe::{OutputRequirement, StageRecipe};
    use pretty_assertions::assert_eq;

    const MODELS: [&str; 2] = ["m1", "m2"];

    fn state() -> DialecticState {
        let mut state = DialecticState::new();
        state.recipes.insert(
            StageRecipe::new(
                "thesis",
                "inst",
                vec![
                    RecipeStep::new("plan", 1, JobType::Plan)
                        .with_output(OutputRequirement::header_context("header_context")),
                    RecipeStep::new("draft", 2, JobType::Execute)
                        .with_output(OutputRequirement::markdown("summary")),
                ],
            )
            .unwrap(),
        );
        state.selected_models = MODELS.iter().map(|m| SelectedModel::new(*m)).collect();
        state
    }

    fn base() -> JobEvent {
        JobEvent::new("s1", "thesis", 1)
    }

    fn key() -> ProgressKey {
        ProgressKey::new("s1", "thesis", 1)
    }

    fn render(model: &str) -> LifecycleEvent {
        LifecycleEvent::RenderCompleted(
            base()
                .with_job(format!("job-{model}"))
                .with_step("draft")
                .with_document("summary")
                .with_model(model)
                .with_resource(format!("res-{model}")),
        )
    }

    #[test]
    fn test_planner_started_creates_bucket() {
        let mut state = state();
        let notes = apply(
            &mut state,
            &LifecycleEvent::PlannerStarted(base().with_job("job-p").with_step("plan")),
        );
        assert_eq!(state.run(&key()).unwrap().step_status("plan"), StepStatus::InProgress);
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn test_start_never_regresses_completed_step() {
        let mut state = state();
        apply(&mut state, &LifecycleEvent::PlannerCompleted(base().with_job("job-p").with_step("plan")));
        let notes = apply(
            &mut state,
            &LifecycleEvent::PlannerStarted(base().with_job("job-p").with_step("plan")),
        );
        assert!(notes.is_empty());
        assert_eq!(state.run(&key()).unwrap().step_status("plan"), StepStatus::Completed);
    }

    #[test]
    fn test_render_completed_waits_for_every_model() {
        let mut state = state();
        apply(&mut state, &render("m1"));
        assert_eq!(state.run(&key()).unwrap().step_status("draft"), StepStatus::InProgress);

        apply(&mut state, &render("m2"));
        assert_eq!(state.run(&key()).unwrap().step_status("draft"), StepStatus::Completed);
    }

    #[test]
    fn test_render_completed_is_idempotent() {
        let mut state = state();
        apply(&mut state, &render("m1"));
        let once = state.run(&key()).unwrap().clone();

        let notes = apply(&mut state, &render("m1"));
        let twice = state.run(&key()).unwrap();
        assert!(notes.is_empty());
        assert_eq!(&once, twice);
        assert_eq!(twice.job_progress["draft"].counts().completed_jobs, 1);
    }

    #[test]
    fn test_render_completed_without_resource_is_ignored() {
        let mut state = state();
        let event = LifecycleEvent::RenderCompleted(base().with_job("j").with_step("draft").with_document("summary"));
        assert!(apply(&mut state, &event).is_empty());
        assert!(state.run(&key()).unwrap().documents.is_empty());
    }

    #[test]
    fn test_job_failed_after_completion_is_ignored() {
        let mut state = state();
        apply(&mut state, &render("m1"));
        let failed = LifecycleEvent::JobFailed(
            base()
                .with_job("job-m1")
                .with_step("draft")
                .with_document("summary")
                .with_model("m1"),
        );
        apply(&mut state, &failed);

        let run = state.run(&key()).unwrap();
        assert_eq!(run.step_status("draft"), StepStatus::InProgress);
        assert!(run.document(&DocumentSlot::new("summary", "m1")).unwrap().is_completed());
    }

    #[test]
    fn test_job_failed_marks_step_and_document() {
        let mut state = state();
        let failed = LifecycleEvent::JobFailed(
            base()
                .with_job("job-m2")
                .with_step("draft")
                .with_document("summary")
                .with_model("m2")
                .with_error(JobError::new("MODEL_ERROR", "boom")),
        );
        apply(&mut state, &failed);

        let run = state.run(&key()).unwrap();
        assert_eq!(run.step_status("draft"), StepStatus::Failed);
        let descriptor = run.document(&DocumentSlot::new("summary", "m2")).unwrap();
        assert_eq!(descriptor.status, DocumentStatus::Failed);
        assert_eq!(descriptor.error, Some(JobError::new("MODEL_ERROR", "boom")));
        assert_eq!(run.job_progress["draft"].counts().failed_jobs, 1);
    }

    #[test]
    fn test_document_started_for_control_plane_output() {
        let mut state = state();
        apply(
            &mut state,
            &LifecycleEvent::DocumentStarted(
                base().with_job("job-p").with_step("plan").with_document("header_context"),
            ),
        );
        let descriptor = state.run(&key()).unwrap().document(&DocumentSlot::bare("header_context")).unwrap();
        assert_eq!(descriptor.status, DocumentStatus::Generating);
        assert_eq!(descriptor.latest_rendered_resource_id.as_deref(), Some("job-p"));
    }

    #[test]
    fn test_chunked_document_lifecycle() {
        let mut state = state();
        let started = base().with_job("job-m1").with_step("draft").with_document("summary").with_model("m1");
        apply(&mut state, &LifecycleEvent::DocumentStarted(started.clone()));
        apply(&mut state, &LifecycleEvent::DocumentChunkCompleted(started.clone().with_resource("res-1")));

        let slot = DocumentSlot::new("summary", "m1");
        let status = state.run(&key()).unwrap().document(&slot).unwrap().status;
        assert_eq!(status, DocumentStatus::Continuing);

        apply(&mut state, &LifecycleEvent::DocumentChunkCompleted(started.final_chunk()));
        let descriptor = state.run(&key()).unwrap().document(&slot).unwrap();
        assert!(descriptor.is_completed());
        assert_eq!(descriptor.latest_rendered_resource_id.as_deref(), Some("res-1"));
    }

    #[test]
    fn test_untracked_document_events_are_ignored() {
        let mut state = state();
        let event = base().with_job("j").with_document("summary").with_model("m1").final_chunk();
        assert!(apply(&mut state, &LifecycleEvent::DocumentChunkCompleted(event.clone())).is_empty());
        assert!(apply(&mut state, &LifecycleEvent::DocumentCompleted(event)).is_empty());
    }

    #[test]
    fn test_document_completed_uses_job_as_placeholder() {
        let mut state = state();
        let started = base().with_job("job-p").with_document("notes").with_model("m1");
        apply(&mut state, &LifecycleEvent::DocumentStarted(started.clone()));
        apply(&mut state, &LifecycleEvent::DocumentCompleted(started));

        let descriptor = state.run(&key()).unwrap().document(&DocumentSlot::new("notes", "m1")).unwrap();
        assert!(descriptor.is_completed());
        assert_eq!(descriptor.latest_rendered_resource_id.as_deref(), Some("job-p"));
    }

    #[test]
    fn test_job_failed_without_job_fails_session() {
        let mut state = state();
        apply(&mut state, &LifecycleEvent::PlannerCompleted(base().with_job("job-p").with_step("plan")));
        apply(
            &mut state,
            &LifecycleEvent::DocumentStarted(
                base().with_job("job-m1").with_step("draft").with_document("summary").with_model("m1"),
            ),
        );

        let notes = apply(
            &mut state,
            &LifecycleEvent::JobFailed(base().with_error(JobError::new("INTERNAL", "crash"))),
        );

        let run = state.run(&key()).unwrap();
        assert_eq!(run.step_status("plan"), StepStatus::Completed);
        assert_eq!(run.step_status("draft"), StepStatus::Failed);
        assert_eq!(
            run.document(&DocumentSlot::new("summary", "m1")).unwrap().status,
            DocumentStatus::Failed
        );
        assert!(!run.job_progress["draft"].has_running_model_jobs());
        assert!(matches!(
            notes.last(),
            Some(ProgressNotification::SessionFailed { failed_steps: 1, .. })
        ));
    }

    #[test]
    fn test_contribution_generation_failed_spares_other_sessions() {
        let mut state = state();
        let other = JobEvent::new("s2", "thesis", 1).with_job("j").with_step("plan");
        apply(&mut state, &LifecycleEvent::PlannerStarted(other));
        apply(&mut state, &LifecycleEvent::PlannerStarted(base().with_job("j").with_step("plan")));

        apply(
            &mut state,
            &LifecycleEvent::ContributionGenerationFailed(SessionFailure {
                session_id: "s1".to_string(),
                ..SessionFailure::default()
            }),
        );

        assert_eq!(state.run(&key()).unwrap().step_status("plan"), StepStatus::Failed);
        assert_eq!(
            state.run(&ProgressKey::new("s2", "thesis", 1)).unwrap().step_status("plan"),
            StepStatus::InProgress
        );
    }

    #[test]
    fn test_sibling_completion_keeps_step_failed() {
        let mut state = state();
        let failed = LifecycleEvent::JobFailed(
            base()
                .with_job("job-m1")
                .with_step("draft")
                .with_document("summary")
                .with_model("m1"),
        );
        apply(&mut state, &failed);
        apply(&mut state, &render("m2"));
        assert_eq!(state.run(&key()).unwrap().step_status("draft"), StepStatus::Failed);

        apply(
            &mut state,
            &LifecycleEvent::ExecuteStarted(base().with_job("job-m1-retry").with_step("draft").with_model("m1")),
        );
        assert_eq!(state.run(&key()).unwrap().step_status("draft"), StepStatus::InProgress);

        apply(&mut state, &render("m1"));
        assert_eq!(state.run(&key()).unwrap().step_status("draft"), StepStatus::Completed);
    }

    #[test]
    fn test_failed_step_may_restart() {
        let mut state = state();
        apply(&mut state, &LifecycleEvent::JobFailed(base().with_job("j1").with_step("plan")));
        apply(&mut state, &LifecycleEvent::PlannerStarted(base().with_job("j2").with_step("plan")));
        assert_eq!(state.run(&key()).unwrap().step_status("plan"), StepStatus::InProgress);
    }

    #[test]
    fn test_progress_update_is_display_only() {
        let mut state = state();
        let notes = apply(
            &mut state,
            &LifecycleEvent::DialecticProgressUpdate(ProgressUpdate {
                session_id: "s1".to_string(),
                stage_slug: "thesis".to_string(),
                iteration_number: 1,
                current_step: 2,
                total_steps: 5,
                message: "drafting".to_string(),
            }),
        );
        assert!(notes.is_empty());
        let run = state.run(&key()).unwrap();
        assert_eq!(run.display.as_ref().unwrap().message, "drafting");
        assert!(run.step_statuses.is_empty());
    }
}
