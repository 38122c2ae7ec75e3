//! Project artifacts read by the artifact locator.
//!
//! Resources, contributions, and feedback are produced by the remote service
//! and reach this crate as read-only snapshots.

use serde::{Deserialize, Serialize};

/// Typed view of a resource's JSON `resource_description`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceDescription {
    /// An assembled seed prompt.
    SeedPrompt(ResourceScope),
    /// A control-plane header context produced by a planning step.
    HeaderContext(ResourceScope),
}

/// Scope fields shared by every resource description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceScope {
    /// The session the resource belongs to, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// The stage that produced the resource.
    pub stage_slug: String,
    /// The iteration that produced the resource.
    pub iteration: u32,
    /// The document key the resource carries, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_key: Option<String>,
}

impl ResourceDescription {
    /// Decodes a description from a raw JSON value.
    ///
    /// Accepts an object or a string holding JSON. Anything unparseable or
    /// schema-mismatched yields `None`.
    #[must_use]
    pub fn parse(raw: &serde_json::Value) -> Option<Self> {
        match raw {
            serde_json::Value::String(text) => serde_json::from_str(text).ok(),
            serde_json::Value::Object(_) => serde_json::from_value(raw.clone()).ok(),
            _ => None,
        }
    }

    /// Returns the scope of the description.
    #[must_use]
    pub fn scope(&self) -> &ResourceScope {
        match self {
            Self::SeedPrompt(scope) | Self::HeaderContext(scope) => scope,
        }
    }

    /// Returns true for header-context descriptions.
    #[must_use]
    pub fn is_header_context(&self) -> bool {
        matches!(self, Self::HeaderContext(_))
    }
}

/// A generic project resource record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectResource {
    /// Resource id.
    pub id: String,
    /// Raw description; a JSON object or a string holding JSON.
    #[serde(default)]
    pub resource_description: Option<serde_json::Value>,
    /// Storage path, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
    /// MIME type, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ProjectResource {
    /// Creates a resource with a description.
    #[must_use]
    pub fn new(id: impl Into<String>, description: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            resource_description: Some(description),
            storage_path: None,
            mime_type: None,
        }
    }

    /// Returns the parsed description, if it is well formed.
    #[must_use]
    pub fn description(&self) -> Option<ResourceDescription> {
        self.resource_description.as_ref().and_then(ResourceDescription::parse)
    }
}

/// A model-authored document tagged by stage, model, and iteration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Contribution {
    /// Contribution id.
    pub id: String,
    /// The stage slug the contribution belongs to.
    pub stage: String,
    /// The iteration the contribution belongs to.
    pub iteration_number: u32,
    /// The document key (contribution type).
    #[serde(default)]
    pub contribution_type: Option<String>,
    /// The authoring model.
    #[serde(default)]
    pub model_id: Option<String>,
}

impl Contribution {
    /// Creates a contribution.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        stage: impl Into<String>,
        iteration_number: u32,
        contribution_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            stage: stage.into(),
            iteration_number,
            contribution_type: Some(contribution_type.into()),
            model_id: None,
        }
    }

    /// Sets the authoring model.
    #[must_use]
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }
}

/// A feedback record tagged by stage and iteration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackEntry {
    /// Feedback id.
    pub id: String,
    /// The stage slug the feedback targets.
    pub stage_slug: String,
    /// The iteration the feedback targets.
    pub iteration_number: u32,
    /// The feedback type (matched against requirement document keys).
    #[serde(default)]
    pub feedback_type: Option<String>,
}

impl FeedbackEntry {
    /// Creates a feedback entry.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        stage_slug: impl Into<String>,
        iteration_number: u32,
        feedback_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            stage_slug: stage_slug.into(),
            iteration_number,
            feedback_type: Some(feedback_type.into()),
        }
    }
}

/// The seed prompt currently assembled for the active context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPrompt {
    /// The assembled prompt text.
    pub prompt_content: String,
    /// The resource the prompt was loaded from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    /// The session the prompt was assembled for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// The stage the prompt was assembled for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_slug: Option<String>,
    /// The iteration the prompt was assembled for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration_number: Option<u32>,
}

impl SeedPrompt {
    /// Creates a seed prompt without a recorded context.
    #[must_use]
    pub fn new(prompt_content: impl Into<String>) -> Self {
        Self {
            prompt_content: prompt_content.into(),
            ..Self::default()
        }
    }

    /// Records the context the prompt was assembled for.
    #[must_use]
    pub fn for_context(
        mut self,
        session_id: impl Into<String>,
        stage_slug: impl Into<String>,
        iteration_number: u32,
    ) -> Self {
        self.session_id = Some(session_id.into());
        self.stage_slug = Some(stage_slug.into());
        self.iteration_number = Some(iteration_number);
        self
    }

    /// Returns true unless a recorded context field contradicts the given one.
    #[must_use]
    pub fn applies_to(&self, session_id: &str, stage_slug: &str, iteration_number: u32) -> bool {
        self.session_id.as_deref().map_or(true, |s| s == session_id)
            && self.stage_slug.as_deref().map_or(true, |s| s == stage_slug)
            && self.iteration_number.map_or(true, |i| i == iteration_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_header_context_object() {
        let raw = json!({
            "type": "header_context",
            "session_id": "s1",
            "stage_slug": "thesis",
            "iteration": 1,
            "document_key": "header_context"
        });
        let description = ResourceDescription::parse(&raw).unwrap();
        assert!(description.is_header_context());
        assert_eq!(description.scope().stage_slug, "thesis");
        assert_eq!(description.scope().iteration, 1);
    }

    #[test]
    fn test_parse_description_from_string() {
        let raw = json!(r#"{"type":"seed_prompt","stage_slug":"thesis","iteration":1}"#);
        let description = ResourceDescription::parse(&raw).unwrap();
        assert!(matches!(description, ResourceDescription::SeedPrompt(_)));
        assert_eq!(description.scope().session_id, None);
    }

    #[test]
    fn test_parse_rejects_malformed_descriptions() {
        assert!(ResourceDescription::parse(&json!("{not json")).is_none());
        assert!(ResourceDescription::parse(&json!(42)).is_none());
        assert!(ResourceDescription::parse(&json!({"type": "rendered_document", "stage_slug": "x", "iteration": 1})).is_none());
        assert!(ResourceDescription::parse(&json!({"type": "header_context", "stage_slug": "x"})).is_none());
        assert!(ResourceDescription::parse(&json!({"type": "header_context", "stage_slug": "x", "iteration": "1"})).is_none());
    }

    #[test]
    fn test_resource_description_accessor() {
        let resource = ProjectResource {
            id: "r1".to_string(),
            resource_description: None,
            ..ProjectResource::default()
        };
        assert!(resource.description().is_none());
    }

    #[test]
    fn test_seed_prompt_context() {
        let unscoped = SeedPrompt::new("prompt");
        assert!(unscoped.applies_to("s1", "thesis", 1));

        let scoped = SeedPrompt::new("prompt").for_context("s1", "thesis", 1);
        assert!(scoped.applies_to("s1", "thesis", 1));
        assert!(!scoped.applies_to("s1", "thesis", 2));
        assert!(!scoped.applies_to("s2", "thesis", 1));
    }
}
