//! Stage recipes and the per-stage registry.

use super::RecipeStep;
use crate::errors::{ProgressError, RecipeValidationError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Deserialize)]
struct RawStageRecipe {
    #[serde(alias = "stageSlug")]
    stage_slug: String,
    #[serde(alias = "instanceId", default)]
    instance_id: String,
    #[serde(default)]
    steps: Vec<RecipeStep>,
}

/// The ordered steps one stage runs.
///
/// Immutable once built. Steps are held sorted by `execution_order`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRecipe {
    stage_slug: String,
    instance_id: String,
    steps: Vec<RecipeStep>,
}

impl StageRecipe {
    /// Builds a recipe, validating step keys and execution orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage slug is empty, a step key is empty or
    /// repeated, or two steps share an `execution_order`.
    pub fn new(
        stage_slug: impl Into<String>,
        instance_id: impl Into<String>,
        mut steps: Vec<RecipeStep>,
    ) -> Result<Self, RecipeValidationError> {
        let stage_slug = stage_slug.into();
        let instance_id = instance_id.into();
        if stage_slug.trim().is_empty() {
            return Err(RecipeValidationError::empty_stage(&instance_id));
        }

        steps.sort_by(|a, b| {
            a.execution_order
                .cmp(&b.execution_order)
                .then_with(|| a.step_key.cmp(&b.step_key))
        });

        let mut seen_keys = BTreeSet::new();
        for step in &steps {
            if step.step_key.trim().is_empty() {
                return Err(RecipeValidationError::empty_step_key(&stage_slug, &step.id));
            }
            if !seen_keys.insert(step.step_key.as_str()) {
                return Err(RecipeValidationError::duplicate_step_key(&stage_slug, &step.step_key));
            }
        }
        for pair in steps.windows(2) {
            if pair[0].execution_order == pair[1].execution_order {
                return Err(RecipeValidationError::duplicate_order(
                    &stage_slug,
                    pair[0].execution_order,
                    &pair[0].step_key,
                    &pair[1].step_key,
                ));
            }
        }

        Ok(Self {
            stage_slug,
            instance_id,
            steps,
        })
    }

    /// Decodes and validates a recipe from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the recipe is invalid.
    pub fn from_json(json: &str) -> Result<Self, ProgressError> {
        let raw: RawStageRecipe = serde_json::from_str(json)?;
        Ok(Self::new(raw.stage_slug, raw.instance_id, raw.steps)?)
    }

    /// Returns the stage slug.
    #[must_use]
    pub fn stage_slug(&self) -> &str {
        &self.stage_slug
    }

    /// Returns the template instance id.
    #[must_use]
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Returns the steps in gating order.
    #[must_use]
    pub fn steps(&self) -> &[RecipeStep] {
        &self.steps
    }

    /// Returns true if the recipe has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Looks up a step by key.
    #[must_use]
    pub fn step(&self, step_key: &str) -> Option<&RecipeStep> {
        self.steps.iter().find(|s| s.step_key == step_key)
    }

    /// Returns the first step declaring the given header-context output.
    #[must_use]
    pub fn header_context_producer(&self, document_key: Option<&str>) -> Option<&RecipeStep> {
        self.steps.iter().find(|s| s.produces_header_context(document_key))
    }

    /// Returns the first step declaring the given rendered document output.
    #[must_use]
    pub fn document_producer(&self, document_key: &str) -> Option<&RecipeStep> {
        self.steps.iter().find(|s| s.produces_document(document_key))
    }

    /// Returns the keys of every user-facing markdown document the stage produces.
    #[must_use]
    pub fn markdown_document_keys(&self) -> BTreeSet<&str> {
        self.steps
            .iter()
            .flat_map(RecipeStep::markdown_document_keys)
            .collect()
    }
}

/// Holds one recipe per stage slug.
#[derive(Debug, Clone, Default)]
pub struct RecipeRegistry {
    recipes: HashMap<String, StageRecipe>,
}

impl RecipeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a recipe, replacing any previous recipe for the stage.
    pub fn insert(&mut self, recipe: StageRecipe) -> Option<StageRecipe> {
        self.recipes.insert(recipe.stage_slug.clone(), recipe)
    }

    /// Gets the recipe for a stage.
    #[must_use]
    pub fn get(&self, stage_slug: &str) -> Option<&StageRecipe> {
        self.recipes.get(stage_slug)
    }

    /// Removes the recipe for a stage.
    pub fn remove(&mut self, stage_slug: &str) -> Option<StageRecipe> {
        self.recipes.remove(stage_slug)
    }

    /// Returns the steps for a stage, or an empty slice.
    #[must_use]
    pub fn steps(&self, stage_slug: &str) -> &[RecipeStep] {
        self.get(stage_slug).map_or(&[], StageRecipe::steps)
    }

    /// Returns the number of recipes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Returns true if no recipes are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Removes every recipe.
    pub fn clear(&mut self) {
        self.recipes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::JobType;
    use crate::recipe::{InputRequirement, OutputRequirement};

    fn plan_step() -> RecipeStep {
        RecipeStep::new("plan", 1, JobType::Plan)
            .with_input(InputRequirement::seed_prompt())
            .with_output(OutputRequirement::header_context("header_context"))
    }

    fn execute_step() -> RecipeStep {
        RecipeStep::new("draft", 2, JobType::Execute)
            .with_input(InputRequirement::header_context("header_context"))
            .with_output(OutputRequirement::markdown("business_case"))
    }

    #[test]
    fn test_recipe_sorts_steps() {
        let recipe = StageRecipe::new("thesis", "inst-1", vec![execute_step(), plan_step()]).unwrap();
        let keys: Vec<_> = recipe.steps().iter().map(|s| s.step_key.as_str()).collect();
        assert_eq!(keys, vec!["plan", "draft"]);
    }

    #[test]
    fn test_recipe_rejects_duplicate_order() {
        let other = RecipeStep::new("other", 1, JobType::Execute);
        let err = StageRecipe::new("thesis", "inst-1", vec![plan_step(), other]).unwrap_err();
        assert_eq!(err.code(), Some("RECIPE-001-DUPLICATE_ORDER"));
    }

    #[test]
    fn test_recipe_rejects_duplicate_step_key() {
        let again = RecipeStep::new("plan", 5, JobType::Plan);
        let err = StageRecipe::new("thesis", "inst-1", vec![plan_step(), again]).unwrap_err();
        assert_eq!(err.code(), Some("RECIPE-002-DUPLICATE_STEP_KEY"));
    }

    #[test]
    fn test_recipe_rejects_empty_stage() {
        let err = StageRecipe::new("  ", "inst-1", vec![]).unwrap_err();
        assert_eq!(err.code(), Some("RECIPE-004-EMPTY_STAGE"));
    }

    #[test]
    fn test_recipe_from_json() {
        let json = r#"{
            "stageSlug": "thesis",
            "instanceId": "inst-1",
            "steps": [{
                "id": "s1",
                "step_key": "plan",
                "execution_order": 1,
                "job_type": "PLAN",
                "inputs_required": [{"type": "seed_prompt"}],
                "outputs_required": [{"document_key": "hc", "artifact_class": "header_context", "file_type": "json"}]
            }]
        }"#;
        let recipe = StageRecipe::from_json(json).unwrap();
        assert_eq!(recipe.stage_slug(), "thesis");
        assert_eq!(recipe.len(), 1);
        assert!(recipe.header_context_producer(Some("hc")).is_some());
    }

    #[test]
    fn test_recipe_from_json_malformed() {
        assert!(matches!(
            StageRecipe::from_json("{"),
            Err(ProgressError::Serialization(_))
        ));
    }

    #[test]
    fn test_markdown_document_keys_exclude_header_context() {
        let recipe = StageRecipe::new("thesis", "inst-1", vec![plan_step(), execute_step()]).unwrap();
        let keys = recipe.markdown_document_keys();
        assert_eq!(keys.len(), 1);
        assert!(keys.contains("business_case"));
    }

    #[test]
    fn test_registry_replaces_wholesale() {
        let mut registry = RecipeRegistry::new();
        registry.insert(StageRecipe::new("thesis", "v1", vec![plan_step()]).unwrap());
        let previous = registry.insert(
            StageRecipe::new("thesis", "v2", vec![plan_step(), execute_step()]).unwrap(),
        );

        assert_eq!(previous.unwrap().instance_id(), "v1");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.steps("thesis").len(), 2);
        assert!(registry.steps("synthesis").is_empty());
    }
}
