//! The in-memory snapshot every query reads.

use crate::core::{ProgressKey, SeedPrompt};
use crate::drafts::DraftRegistry;
use crate::progress::{RunProgressMap, StageRunProgress};
use crate::project::{DialecticProject, DialecticSession, SelectedModel};
use crate::recipe::RecipeRegistry;

/// Everything the readiness evaluator and progress aggregator read.
///
/// Project data, recipes, seed prompt, and model selection are replaced
/// wholesale by their owners. Run progress is mutated only by the lifecycle
/// reducer and the hydration loaders.
#[derive(Debug, Clone, Default)]
pub struct DialecticState {
    /// The loaded project, if any.
    pub project: Option<DialecticProject>,
    /// Recipes by stage slug.
    pub recipes: RecipeRegistry,
    /// Run progress by `(session, stage, iteration)`.
    pub run_progress: RunProgressMap,
    /// The seed prompt assembled for the active context.
    pub active_seed_prompt: Option<SeedPrompt>,
    /// Models taking part in fan-out steps.
    pub selected_models: Vec<SelectedModel>,
    /// Document drafts.
    pub drafts: DraftRegistry,
}

impl DialecticState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds a session of the loaded project.
    #[must_use]
    pub fn session(&self, session_id: &str) -> Option<&DialecticSession> {
        self.project.as_ref().and_then(|p| p.session(session_id))
    }

    /// Returns a run-progress bucket.
    #[must_use]
    pub fn run(&self, key: &ProgressKey) -> Option<&StageRunProgress> {
        self.run_progress.get(key)
    }

    /// Returns the selected model ids.
    pub fn selected_model_ids(&self) -> impl Iterator<Item = &str> {
        self.selected_models.iter().map(|m| m.id.as_str())
    }

    /// Clears every field.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
