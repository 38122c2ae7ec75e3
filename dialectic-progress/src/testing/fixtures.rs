//! Builders for recipes, projects, and lifecycle events.

use crate::core::{Contribution, FeedbackEntry, JobType, ProgressKey, ProjectResource};
use crate::errors::RecipeValidationError;
use crate::lifecycle::{JobEvent, LifecycleEvent, SessionFailure};
use crate::progress::JobError;
use crate::project::{DialecticProject, DialecticSession, DialecticStage, ProcessTemplate};
use crate::recipe::{InputRequirement, OutputRequirement, RecipeStep, StageRecipe};
use serde_json::json;

/// A recipe step builder.
#[derive(Debug, Clone)]
pub struct StepFixture {
    step: RecipeStep,
}

impl StepFixture {
    /// A planning step.
    #[must_use]
    pub fn plan(step_key: &str, order: u32) -> Self {
        Self {
            step: RecipeStep::new(step_key, order, JobType::Plan),
        }
    }

    /// An execute step.
    #[must_use]
    pub fn execute(step_key: &str, order: u32) -> Self {
        Self {
            step: RecipeStep::new(step_key, order, JobType::Execute),
        }
    }

    /// A render step.
    #[must_use]
    pub fn render(step_key: &str, order: u32) -> Self {
        Self {
            step: RecipeStep::new(step_key, order, JobType::Render),
        }
    }

    /// Requires the seed prompt.
    #[must_use]
    pub fn needs_seed_prompt(mut self) -> Self {
        self.step = self.step.with_input(InputRequirement::seed_prompt());
        self
    }

    /// Requires a header context of the current stage.
    #[must_use]
    pub fn needs_header_context(mut self, document_key: &str) -> Self {
        self.step = self.step.with_input(InputRequirement::header_context(document_key));
        self
    }

    /// Requires a document of another stage.
    #[must_use]
    pub fn needs_document(mut self, source_stage: &str, document_key: &str) -> Self {
        self.step = self.step.with_input(
            InputRequirement::document(document_key).with_slug(format!("{source_stage}.{document_key}")),
        );
        self
    }

    /// Requires feedback left on another stage.
    #[must_use]
    pub fn needs_feedback(mut self, source_stage: &str, feedback_type: &str) -> Self {
        self.step = self.step.with_input(
            InputRequirement::feedback(feedback_type).with_slug(format!("{source_stage}.{feedback_type}")),
        );
        self
    }

    /// Adds an arbitrary input.
    #[must_use]
    pub fn needs(mut self, requirement: InputRequirement) -> Self {
        self.step = self.step.with_input(requirement);
        self
    }

    /// Declares a markdown document output.
    #[must_use]
    pub fn produces_markdown(mut self, document_key: &str) -> Self {
        self.step = self.step.with_output(OutputRequirement::markdown(document_key));
        self
    }

    /// Declares a header-context output.
    #[must_use]
    pub fn produces_header_context(mut self, document_key: &str) -> Self {
        self.step = self.step.with_output(OutputRequirement::header_context(document_key));
        self
    }

    /// Returns the step.
    #[must_use]
    pub fn build(self) -> RecipeStep {
        self.step
    }
}

/// A stage recipe builder.
#[derive(Debug, Clone)]
pub struct RecipeFixture {
    stage_slug: String,
    steps: Vec<RecipeStep>,
}

impl RecipeFixture {
    /// Starts a recipe for a stage.
    #[must_use]
    pub fn new(stage_slug: impl Into<String>) -> Self {
        Self {
            stage_slug: stage_slug.into(),
            steps: Vec::new(),
        }
    }

    /// Adds a step.
    #[must_use]
    pub fn step(mut self, step: StepFixture) -> Self {
        self.steps.push(step.build());
        self
    }

    /// Validates and returns the recipe.
    ///
    /// # Errors
    ///
    /// Returns the validation error of [`StageRecipe::new`].
    pub fn build(self) -> Result<StageRecipe, RecipeValidationError> {
        let instance_id = format!("{}-instance", self.stage_slug);
        StageRecipe::new(self.stage_slug, instance_id, self.steps)
    }

    /// A plan step gated on the seed prompt that produces a header context,
    /// then an execute step that consumes it and produces `summary`.
    #[must_use]
    pub fn plan_then_execute(stage_slug: impl Into<String>) -> Self {
        Self::new(stage_slug)
            .step(
                StepFixture::plan("plan", 1)
                    .needs_seed_prompt()
                    .produces_header_context("header_context"),
            )
            .step(
                StepFixture::execute("draft", 2)
                    .needs_header_context("header_context")
                    .produces_markdown("summary"),
            )
    }
}

/// A project with one session and a linear template.
#[derive(Debug, Clone)]
pub struct ProjectFixture {
    project_id: String,
    session: DialecticSession,
    stages: Vec<DialecticStage>,
    resources: Vec<ProjectResource>,
}

impl ProjectFixture {
    /// Starts a project with one session.
    #[must_use]
    pub fn new(project_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            session: DialecticSession::new(session_id),
            stages: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// Adds stages in order; stage ids are `stage-<slug>`.
    #[must_use]
    pub fn stages(mut self, slugs: &[&str]) -> Self {
        self.stages
            .extend(slugs.iter().map(|slug| DialecticStage::new(format!("stage-{slug}"), *slug)));
        self
    }

    /// Sets the session's current stage.
    #[must_use]
    pub fn current_stage(mut self, slug: &str) -> Self {
        self.session = self.session.with_current_stage(format!("stage-{slug}"));
        self
    }

    /// Sets the session's iteration.
    #[must_use]
    pub fn iteration(mut self, iteration_count: u32) -> Self {
        self.session.iteration_count = iteration_count;
        self
    }

    /// Adds a contribution.
    #[must_use]
    pub fn contribution(mut self, stage_slug: &str, iteration: u32, document_key: &str) -> Self {
        let id = format!("contrib-{stage_slug}-{iteration}-{document_key}");
        self.session = self
            .session
            .with_contribution(Contribution::new(id, stage_slug, iteration, document_key));
        self
    }

    /// Adds a feedback entry.
    #[must_use]
    pub fn feedback(mut self, stage_slug: &str, iteration: u32, feedback_type: &str) -> Self {
        let id = format!("feedback-{stage_slug}-{iteration}-{feedback_type}");
        self.session = self
            .session
            .with_feedback(FeedbackEntry::new(id, stage_slug, iteration, feedback_type));
        self
    }

    /// Adds a header-context resource scoped to this session.
    #[must_use]
    pub fn header_context(mut self, stage_slug: &str, iteration: u32, document_key: &str) -> Self {
        self.resources.push(ProjectResource::new(
            format!("hc-{stage_slug}-{iteration}-{document_key}"),
            json!({
                "type": "header_context",
                "session_id": self.session.id,
                "stage_slug": stage_slug,
                "iteration": iteration,
                "document_key": document_key,
            }),
        ));
        self
    }

    /// Adds an arbitrary resource.
    #[must_use]
    pub fn resource(mut self, resource: ProjectResource) -> Self {
        self.resources.push(resource);
        self
    }

    /// Returns the project.
    #[must_use]
    pub fn build(self) -> DialecticProject {
        let mut project = DialecticProject::new(self.project_id).with_session(self.session);
        if !self.stages.is_empty() {
            project = project.with_template(ProcessTemplate::linear("template", self.stages));
        }
        for resource in self.resources {
            project = project.with_resource(resource);
        }
        project
    }
}

/// Builds lifecycle events for one stage run.
#[derive(Debug, Clone)]
pub struct EventFixture {
    key: ProgressKey,
}

impl EventFixture {
    /// Targets a run.
    #[must_use]
    pub fn new(session_id: &str, stage_slug: &str, iteration_number: u32) -> Self {
        Self {
            key: ProgressKey::new(session_id, stage_slug, iteration_number),
        }
    }

    /// Returns the targeted run.
    #[must_use]
    pub fn progress_key(&self) -> &ProgressKey {
        &self.key
    }

    /// A bare payload for the run.
    #[must_use]
    pub fn payload(&self) -> JobEvent {
        JobEvent::new(
            self.key.session_id.clone(),
            self.key.stage_slug.clone(),
            self.key.iteration_number,
        )
    }

    /// `planner_started`.
    #[must_use]
    pub fn planner_started(&self, step_key: &str, job_id: &str) -> LifecycleEvent {
        LifecycleEvent::PlannerStarted(self.payload().with_step(step_key).with_job(job_id))
    }

    /// `planner_completed`.
    #[must_use]
    pub fn planner_completed(&self, step_key: &str, job_id: &str) -> LifecycleEvent {
        LifecycleEvent::PlannerCompleted(self.payload().with_step(step_key).with_job(job_id))
    }

    /// `execute_started` for one model.
    #[must_use]
    pub fn execute_started(&self, step_key: &str, job_id: &str, model_id: &str) -> LifecycleEvent {
        LifecycleEvent::ExecuteStarted(
            self.payload()
                .with_step(step_key)
                .with_job(job_id)
                .with_model(model_id),
        )
    }

    /// `render_completed` for one model's document.
    #[must_use]
    pub fn render_completed(
        &self,
        step_key: &str,
        document_key: &str,
        model_id: &str,
        resource_id: &str,
    ) -> LifecycleEvent {
        LifecycleEvent::RenderCompleted(
            self.payload()
                .with_step(step_key)
                .with_job(format!("job-{step_key}-{model_id}"))
                .with_document(document_key)
                .with_model(model_id)
                .with_resource(resource_id),
        )
    }

    /// `job_failed` for one model's document.
    #[must_use]
    pub fn job_failed(&self, step_key: &str, document_key: &str, model_id: &str) -> LifecycleEvent {
        LifecycleEvent::JobFailed(
            self.payload()
                .with_step(step_key)
                .with_job(format!("job-{step_key}-{model_id}"))
                .with_document(document_key)
                .with_model(model_id)
                .with_error(JobError::new("MODEL_ERROR", "generation failed")),
        )
    }

    /// `contribution_generation_failed` for the run's session.
    #[must_use]
    pub fn session_failed(&self, code: &str) -> LifecycleEvent {
        LifecycleEvent::ContributionGenerationFailed(SessionFailure {
            session_id: self.key.session_id.clone(),
            job_id: None,
            error: Some(JobError::new(code, "session failed")),
        })
    }
}
