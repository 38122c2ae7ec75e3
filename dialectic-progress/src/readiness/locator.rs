//! Matches input requirements against available artifacts.
//!
//! Every lookup fails closed: a malformed resource description, an unknown
//! stage, or a missing bucket means "not found", never an error.

use crate::core::{ProgressKey, ResourceDescription, StepStatus};
use crate::project::{DialecticProject, DialecticSession};
use crate::recipe::{InputKind, InputRequirement};
use crate::state::DialecticState;

/// The run a requirement is evaluated for.
#[derive(Debug, Clone, Copy)]
pub struct LocateContext<'a> {
    /// The whole snapshot.
    pub state: &'a DialecticState,
    /// The loaded project.
    pub project: &'a DialecticProject,
    /// The session being evaluated.
    pub session: &'a DialecticSession,
    /// The run being evaluated.
    pub progress_key: &'a ProgressKey,
}

impl LocateContext<'_> {
    fn source_key(&self, source_stage: &str) -> ProgressKey {
        self.progress_key.for_stage(source_stage)
    }

    fn step_completed(&self, source_stage: &str, step_key: &str) -> bool {
        self.state
            .run(&self.source_key(source_stage))
            .is_some_and(|run| run.step_status(step_key) == StepStatus::Completed)
    }
}

/// Returns true if an artifact satisfying the requirement exists.
#[must_use]
pub fn locate(requirement: &InputRequirement, ctx: &LocateContext<'_>) -> bool {
    match requirement.kind {
        InputKind::SeedPrompt => locate_seed_prompt(ctx),
        InputKind::Feedback => locate_feedback(requirement, ctx),
        InputKind::Document => locate_document(requirement, ctx),
        InputKind::HeaderContext => locate_header_context(requirement, ctx),
    }
}

fn locate_seed_prompt(ctx: &LocateContext<'_>) -> bool {
    let key = ctx.progress_key;
    ctx.state
        .active_seed_prompt
        .as_ref()
        .is_some_and(|prompt| prompt.applies_to(&key.session_id, &key.stage_slug, key.iteration_number))
}

fn locate_feedback(requirement: &InputRequirement, ctx: &LocateContext<'_>) -> bool {
    let source_stage = requirement.source_stage(&ctx.progress_key.stage_slug);
    let iteration = ctx.progress_key.iteration_number;
    let wanted = requirement.document_key.as_deref();

    ctx.session.feedback.iter().any(|entry| {
        entry.iteration_number == iteration
            && entry.stage_slug == source_stage
            && wanted.map_or(true, |key| entry.feedback_type.as_deref() == Some(key))
    })
}

fn locate_document(requirement: &InputRequirement, ctx: &LocateContext<'_>) -> bool {
    let current_stage = ctx.progress_key.stage_slug.as_str();
    let source_stage = requirement.source_stage(current_stage);
    let iteration = ctx.progress_key.iteration_number;
    let wanted = requirement.document_key.as_deref();

    // Documents of the stage being evaluated count only once their producing
    // step has completed.
    if source_stage == current_stage {
        if let Some(key) = wanted {
            let producer = ctx
                .state
                .recipes
                .get(source_stage)
                .and_then(|recipe| recipe.document_producer(key));
            if let Some(step) = producer {
                if !ctx.step_completed(source_stage, &step.step_key) {
                    return false;
                }
            }
        }
    }

    if let Some(key) = wanted {
        let has_descriptor = ctx
            .state
            .run(&ctx.source_key(source_stage))
            .is_some_and(|run| run.has_completed_document(key));
        if has_descriptor {
            return true;
        }
    }

    ctx.session.contributions.iter().any(|contribution| {
        contribution.iteration_number == iteration
            && contribution.stage == source_stage
            && wanted.map_or(true, |key| contribution.contribution_type.as_deref() == Some(key))
    })
}

fn locate_header_context(requirement: &InputRequirement, ctx: &LocateContext<'_>) -> bool {
    let source_stage = requirement.source_stage(&ctx.progress_key.stage_slug);
    let wanted = requirement.document_key.as_deref();

    let Some(producer) = ctx
        .state
        .recipes
        .get(source_stage)
        .and_then(|recipe| recipe.header_context_producer(wanted))
    else {
        return false;
    };
    if !ctx.step_completed(source_stage, &producer.step_key) {
        return false;
    }

    ctx.project.resources.iter().any(|resource| {
        let Some(ResourceDescription::HeaderContext(scope)) = resource.description() else {
            return false;
        };
        scope.stage_slug == source_stage
            && scope.iteration == ctx.progress_key.iteration_number
            && scope
                .session_id
                .as_deref()
                .map_or(true, |s| s == ctx.progress_key.session_id)
            && wanted.map_or(true, |key| scope.document_key.as_deref() == Some(key))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        Contribution, DocumentSlot, FeedbackEntry, JobType, ProjectResource, SeedPrompt,
    };
    use crate::progress::DocumentDescriptor;
    use crate::project::{DialecticProject, DialecticSession};
    use crate::recipe::{OutputRequirement, RecipeStep, StageRecipe};
    use serde_json::json;

    fn header_resource(stage: &str, iteration: u32, key: &str) -> ProjectResource {
        ProjectResource::new(
            format!("hc-{stage}-{iteration}"),
            json!({
                "type": "header_context",
                "session_id": "s1",
                "stage_slug": stage,
                "iteration": iteration,
                "document_key": key,
            }),
        )
    }

    fn state_with(project: DialecticProject) -> DialecticState {
        let mut state = DialecticState::new();
        let recipe = StageRecipe::new(
            "thesis",
            "inst",
            vec![
                RecipeStep::new("plan", 1, JobType::Plan)
                    .with_output(OutputRequirement::header_context("header_context")),
                RecipeStep::new("draft", 2, JobType::Execute)
                    .with_output(OutputRequirement::markdown("summary")),
            ],
        )
        .unwrap();
        state.recipes.insert(recipe);
        state.project = Some(project);
        state
    }

    fn check(state: &DialecticState, requirement: &InputRequirement, stage: &str) -> bool {
        let project = state.project.as_ref().unwrap();
        let session = project.session("s1").unwrap();
        let key = ProgressKey::new("s1", stage, 1);
        locate(
            requirement,
            &LocateContext {
                state,
                project,
                session,
                progress_key: &key,
            },
        )
    }

    #[test]
    fn test_seed_prompt_presence() {
        let mut state = state_with(DialecticProject::new("p1").with_session(DialecticSession::new("s1")));
        let requirement = InputRequirement::seed_prompt();
        assert!(!check(&state, &requirement, "thesis"));

        state.active_seed_prompt = Some(SeedPrompt::new("prompt"));
        assert!(check(&state, &requirement, "thesis"));

        state.active_seed_prompt = Some(SeedPrompt::new("prompt").for_context("s1", "antithesis", 1));
        assert!(!check(&state, &requirement, "thesis"));
    }

    #[test]
    fn test_header_context_needs_completed_producer() {
        let project = DialecticProject::new("p1")
            .with_session(DialecticSession::new("s1"))
            .with_resource(header_resource("thesis", 1, "header_context"));
        let mut state = state_with(project);
        let requirement = InputRequirement::header_context("header_context");

        assert!(!check(&state, &requirement, "thesis"));

        state
            .run_progress
            .get_or_create(&ProgressKey::new("s1", "thesis", 1))
            .set_step_status("plan", StepStatus::Completed);
        assert!(check(&state, &requirement, "thesis"));
    }

    #[test]
    fn test_header_context_scope_is_strict() {
        let project = DialecticProject::new("p1")
            .with_session(DialecticSession::new("s1"))
            .with_resource(header_resource("thesis", 2, "header_context"))
            .with_resource(header_resource("thesis", 1, "other_key"))
            .with_resource(ProjectResource::new("bad", json!("{not json")));
        let mut state = state_with(project);
        state
            .run_progress
            .get_or_create(&ProgressKey::new("s1", "thesis", 1))
            .set_step_status("plan", StepStatus::Completed);

        assert!(!check(&state, &InputRequirement::header_context("header_context"), "thesis"));
    }

    #[test]
    fn test_document_from_contribution() {
        let project = DialecticProject::new("p1").with_session(
            DialecticSession::new("s1").with_contribution(Contribution::new("c1", "thesis", 1, "summary")),
        );
        let state = state_with(project);
        let requirement = InputRequirement::document("summary").with_slug("thesis.summary");

        assert!(check(&state, &requirement, "antithesis"));
        assert!(!check(
            &state,
            &InputRequirement::document("critique").with_slug("thesis.critique"),
            "antithesis"
        ));
    }

    #[test]
    fn test_document_from_completed_descriptor() {
        let mut state = state_with(DialecticProject::new("p1").with_session(DialecticSession::new("s1")));
        let requirement = InputRequirement::document("summary").with_slug("thesis.summary");
        let run = state.run_progress.get_or_create(&ProgressKey::new("s1", "thesis", 1));

        let mut descriptor = DocumentDescriptor::generating("job-1", Some("model-a"));
        run.documents.insert(DocumentSlot::new("summary", "model-a"), descriptor.clone());
        assert!(!check(&state, &requirement, "antithesis"));

        descriptor.complete("res-1");
        state
            .run_progress
            .get_or_create(&ProgressKey::new("s1", "thesis", 1))
            .documents
            .insert(DocumentSlot::new("summary", "model-a"), descriptor);
        assert!(check(&state, &requirement, "antithesis"));
    }

    #[test]
    fn test_same_stage_document_waits_for_producer() {
        let project = DialecticProject::new("p1").with_session(
            DialecticSession::new("s1").with_contribution(Contribution::new("c1", "thesis", 1, "summary")),
        );
        let mut state = state_with(project);
        let requirement = InputRequirement::document("summary");

        assert!(!check(&state, &requirement, "thesis"));

        state
            .run_progress
            .get_or_create(&ProgressKey::new("s1", "thesis", 1))
            .set_step_status("draft", StepStatus::Completed);
        assert!(check(&state, &requirement, "thesis"));
    }

    #[test]
    fn test_feedback_match() {
        let project = DialecticProject::new("p1").with_session(
            DialecticSession::new("s1").with_feedback(FeedbackEntry::new("f1", "thesis", 1, "user_feedback")),
        );
        let state = state_with(project);

        assert!(check(
            &state,
            &InputRequirement::feedback("user_feedback").with_slug("thesis.user_feedback"),
            "antithesis"
        ));
        assert!(!check(&state, &InputRequirement::feedback("user_feedback"), "antithesis"));
    }
}
