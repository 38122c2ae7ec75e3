//! The single owner of progress state.
//!
//! [`DialecticStore`] serialises every mutation behind one write lock and
//! answers queries against a read-locked snapshot. Notifications produced by
//! a mutation are handed to the event sink after the lock is released.

use crate::config::ProgressConfig;
use crate::core::{DocumentStatus, ProgressKey, SeedPrompt, StageDocumentKey};
use crate::drafts::{DocumentVersion, DraftEntry, UnsavedChanges};
use crate::errors::ProgressError;
use crate::events::{EventSink, NoOpEventSink, ProgressNotification};
use crate::lifecycle::{self, DocumentSnapshot, LifecycleEvent, StageProgressSnapshot};
use crate::observability::run_span;
use crate::progress::{
    self, ChecklistEntry, StageDocumentSummary, StageProgressDetail, UnifiedProjectProgress,
};
use crate::project::{DialecticProject, SelectedModel};
use crate::readiness::{self, Readiness};
use crate::recipe::StageRecipe;
use crate::state::DialecticState;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, Span};

/// Thread-safe owner of a [`DialecticState`].
pub struct DialecticStore {
    state: RwLock<DialecticState>,
    config: ProgressConfig,
    sink: Arc<dyn EventSink>,
}

impl Default for DialecticStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DialecticStore {
    /// Creates an empty store with the default configuration and no sink.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ProgressConfig::default())
    }

    /// Creates an empty store with the given configuration.
    #[must_use]
    pub fn with_config(config: ProgressConfig) -> Self {
        Self {
            state: RwLock::new(DialecticState::new()),
            config,
            sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the sink that receives progress notifications.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ProgressConfig {
        &self.config
    }

    fn publish(&self, notifications: &[ProgressNotification]) {
        if !self.config.emit_events {
            return;
        }
        for notification in notifications {
            self.sink.notify(notification);
        }
    }

    // Mutations

    /// Applies one lifecycle event and returns what changed.
    pub fn dispatch(&self, event: &LifecycleEvent) -> Vec<ProgressNotification> {
        let span = event.progress_key().map_or_else(Span::none, |key| run_span(&key));
        let _entered = span.enter();

        let notifications = {
            let mut state = self.state.write();
            lifecycle::apply(&mut state, event)
        };
        debug!(
            event_type = event.type_name(),
            session_id = event.session_id().unwrap_or_default(),
            notifications = notifications.len(),
            "dispatched lifecycle event"
        );
        self.publish(&notifications);
        notifications
    }

    /// Decodes and applies one lifecycle event.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError::Serialization`] if the payload is malformed.
    pub fn dispatch_json(&self, json: &str) -> Result<Vec<ProgressNotification>, ProgressError> {
        let event = LifecycleEvent::from_json(json)?;
        Ok(self.dispatch(&event))
    }

    /// Registers a recipe, replacing any recipe for the same stage.
    pub fn load_recipe(&self, recipe: StageRecipe) -> Option<StageRecipe> {
        debug!(stage_slug = recipe.stage_slug(), steps = recipe.len(), "loading recipe");
        self.state.write().recipes.insert(recipe)
    }

    /// Decodes, validates, and registers a recipe.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the recipe is invalid.
    pub fn load_recipe_json(&self, json: &str) -> Result<(), ProgressError> {
        let recipe = StageRecipe::from_json(json)?;
        self.load_recipe(recipe);
        Ok(())
    }

    /// Replaces the project snapshot.
    pub fn set_project(&self, project: DialecticProject) {
        self.state.write().project = Some(project);
    }

    /// Removes the project snapshot.
    pub fn clear_project(&self) {
        self.state.write().project = None;
    }

    /// Replaces the active seed prompt.
    pub fn set_active_seed_prompt(&self, seed_prompt: Option<SeedPrompt>) {
        self.state.write().active_seed_prompt = seed_prompt;
    }

    /// Replaces the model selection.
    pub fn set_selected_models(&self, models: Vec<SelectedModel>) {
        self.state.write().selected_models = models;
    }

    /// Seeds one run's documents from a server snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError::Hydration`] if the snapshot is rejected; the
    /// state is unchanged in that case.
    pub fn hydrate_stage_progress(
        &self,
        session_id: &str,
        stage_slug: &str,
        iteration_number: u32,
        documents: &[DocumentSnapshot],
    ) -> Result<(), ProgressError> {
        let notifications = {
            let mut state = self.state.write();
            lifecycle::hydrate_stage_progress(&mut state, session_id, stage_slug, iteration_number, documents)?
        };
        self.publish(&notifications);
        Ok(())
    }

    /// Seeds every stage of a session iteration from a server snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError::Hydration`] if any stage is rejected; no stage
    /// is modified in that case.
    pub fn hydrate_all_stage_progress(
        &self,
        session_id: &str,
        iteration_number: u32,
        entries: &[StageProgressSnapshot],
    ) -> Result<(), ProgressError> {
        let notifications = {
            let mut state = self.state.write();
            lifecycle::hydrate_all_stage_progress(&mut state, session_id, iteration_number, entries)?
        };
        self.publish(&notifications);
        Ok(())
    }

    /// Clears every piece of state.
    pub fn reset(&self) {
        self.state.write().reset();
        info!("progress store reset");
    }

    // Drafts

    /// Starts editing a document.
    pub fn begin_edit(&self, key: &StageDocumentKey, initial_markdown: &str, version: Option<DocumentVersion>) {
        self.state.write().drafts.begin_edit(key, initial_markdown, version);
    }

    /// Records new draft text for a document.
    pub fn record_draft(&self, key: &StageDocumentKey, markdown: &str) {
        self.state.write().drafts.record_draft(key, markdown);
    }

    /// Discards a document's pending draft.
    pub fn flush_draft(&self, key: &StageDocumentKey) {
        self.state.write().drafts.flush_draft(key);
    }

    /// Records feedback text for a document.
    pub fn record_feedback(&self, key: &StageDocumentKey, markdown: &str) {
        self.state.write().drafts.record_feedback(key, markdown);
    }

    /// Discards a document's feedback text.
    pub fn flush_feedback(&self, key: &StageDocumentKey) {
        self.state.write().drafts.flush_feedback(key);
    }

    /// Moves a draft onto a newly rendered baseline.
    ///
    /// Returns false if the document has no draft.
    pub fn reapply_draft(
        &self,
        key: &StageDocumentKey,
        new_baseline: &str,
        version: DocumentVersion,
        source_contribution_id: Option<String>,
    ) -> bool {
        self.state
            .write()
            .drafts
            .reapply_to_new_baseline(key, new_baseline, version, source_contribution_id)
    }

    /// Removes a document's draft state.
    pub fn clear_draft(&self, key: &StageDocumentKey) -> Option<DraftEntry> {
        self.state.write().drafts.clear(key)
    }

    // Queries

    /// Runs a closure against the read-locked state.
    pub fn read<R>(&self, f: impl FnOnce(&DialecticState) -> R) -> R {
        f(&*self.state.read())
    }

    /// Returns a copy of the state.
    #[must_use]
    pub fn snapshot(&self) -> DialecticState {
        self.state.read().clone()
    }

    /// Returns true if the stage run may proceed.
    #[must_use]
    pub fn is_ready(&self, project_id: &str, session_id: &str, stage_slug: &str, iteration_number: u32) -> bool {
        readiness::is_ready(&self.state.read(), project_id, session_id, stage_slug, iteration_number)
    }

    /// Evaluates a stage run, reporting the gating step and what it lacks.
    #[must_use]
    pub fn readiness(&self, project_id: &str, session_id: &str, stage_slug: &str, iteration_number: u32) -> Readiness {
        readiness::evaluate(&self.state.read(), project_id, session_id, stage_slug, iteration_number)
    }

    /// Computes the roll-up of one stage run.
    #[must_use]
    pub fn stage_progress(&self, session_id: &str, stage_slug: &str, iteration_number: u32) -> StageProgressDetail {
        progress::stage_progress(
            &self.state.read(),
            session_id,
            stage_slug,
            iteration_number,
            self.config.rounding,
        )
    }

    /// Computes the roll-up of a session across every stage.
    #[must_use]
    pub fn project_progress(&self, session_id: &str) -> UnifiedProjectProgress {
        progress::project_progress(&self.state.read(), session_id, self.config.rounding)
    }

    /// Reports unsaved edits and feedback for one stage run.
    #[must_use]
    pub fn has_unsaved_changes(&self, session_id: &str, stage_slug: &str, iteration_number: u32) -> UnsavedChanges {
        self.state
            .read()
            .drafts
            .unsaved_changes(session_id, stage_slug, iteration_number)
    }

    /// Summarises the markdown documents of one stage run.
    #[must_use]
    pub fn stage_progress_summary(
        &self,
        session_id: &str,
        stage_slug: &str,
        iteration_number: u32,
        model_id: Option<&str>,
    ) -> StageDocumentSummary {
        progress::stage_progress_summary(&self.state.read(), session_id, stage_slug, iteration_number, model_id)
    }

    /// Lists one model's documents in a run.
    #[must_use]
    pub fn stage_document_checklist(&self, progress_key: &ProgressKey, model_id: &str) -> Vec<ChecklistEntry> {
        progress::stage_document_checklist(&self.state.read(), progress_key, model_id)
    }

    /// Returns every document status of a run keyed by composite document key.
    #[must_use]
    pub fn document_statuses(&self, progress_key: &ProgressKey) -> BTreeMap<String, DocumentStatus> {
        let state = self.state.read();
        state
            .run(progress_key)
            .map(|run| {
                run.documents
                    .iter()
                    .map(|(slot, descriptor)| (slot.composite(&self.config.document_key_separator), descriptor.status))
                    .collect()
            })
            .unwrap_or_default()
    }
}
