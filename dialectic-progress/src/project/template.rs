//! Process templates and stage ordering.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One stage of a process template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialecticStage {
    /// Stage id.
    pub id: String,
    /// Stage slug; keys recipes and run progress.
    pub slug: String,
    /// Human-readable name.
    #[serde(default)]
    pub display_name: String,
}

impl DialecticStage {
    /// Creates a stage whose display name is its slug.
    #[must_use]
    pub fn new(id: impl Into<String>, slug: impl Into<String>) -> Self {
        let slug = slug.into();
        Self {
            id: id.into(),
            display_name: slug.clone(),
            slug,
        }
    }
}

/// A directed edge between two stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTransition {
    /// Source stage id.
    pub source_stage_id: String,
    /// Target stage id.
    pub target_stage_id: String,
}

impl StageTransition {
    /// Creates a transition.
    #[must_use]
    pub fn new(source_stage_id: impl Into<String>, target_stage_id: impl Into<String>) -> Self {
        Self {
            source_stage_id: source_stage_id.into(),
            target_stage_id: target_stage_id.into(),
        }
    }
}

/// The stages a project moves through and the transitions between them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessTemplate {
    /// Template id.
    pub id: String,
    /// Template name.
    #[serde(default)]
    pub name: String,
    /// Every stage of the template.
    #[serde(default)]
    pub stages: Vec<DialecticStage>,
    /// Transitions between stages.
    #[serde(default)]
    pub transitions: Vec<StageTransition>,
    /// The stage a new session starts in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_stage_id: Option<String>,
}

impl ProcessTemplate {
    /// Creates an empty template.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Builds a linear template: stages chained in the given order.
    #[must_use]
    pub fn linear(id: impl Into<String>, stages: Vec<DialecticStage>) -> Self {
        let transitions = stages
            .windows(2)
            .map(|pair| StageTransition::new(&pair[0].id, &pair[1].id))
            .collect();
        let starting_stage_id = stages.first().map(|s| s.id.clone());
        Self {
            id: id.into(),
            name: String::new(),
            stages,
            transitions,
            starting_stage_id,
        }
    }

    /// Finds a stage by id.
    #[must_use]
    pub fn stage_by_id(&self, stage_id: &str) -> Option<&DialecticStage> {
        self.stages.iter().find(|s| s.id == stage_id)
    }

    /// Returns the stages in transition order.
    ///
    /// Walks the transitions from `starting_stage_id`, taking the first
    /// outgoing edge at each stage. Stages the walk never reaches follow in
    /// template order. A cycle ends the walk.
    #[must_use]
    pub fn sorted_stages(&self) -> Vec<&DialecticStage> {
        let mut ordered = Vec::with_capacity(self.stages.len());
        let mut visited = HashSet::new();

        let mut cursor = self
            .starting_stage_id
            .as_deref()
            .or_else(|| self.stages.first().map(|s| s.id.as_str()));

        while let Some(stage_id) = cursor {
            if !visited.insert(stage_id) {
                break;
            }
            let Some(stage) = self.stage_by_id(stage_id) else {
                break;
            };
            ordered.push(stage);
            cursor = self
                .transitions
                .iter()
                .find(|t| t.source_stage_id == stage_id)
                .map(|t| t.target_stage_id.as_str());
        }

        for stage in &self.stages {
            if !visited.contains(stage.id.as_str()) {
                ordered.push(stage);
            }
        }
        ordered
    }
}
