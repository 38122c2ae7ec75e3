//! Recipe steps and their declared input/output contracts.

use crate::core::JobType;
use serde::{Deserialize, Serialize};

/// The kind of artifact an input requirement refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// The assembled seed prompt.
    SeedPrompt,
    /// A model-authored document.
    Document,
    /// A user feedback record.
    Feedback,
    /// A header-context blob produced by a planning step.
    HeaderContext,
}

fn default_required() -> bool {
    true
}

/// An input a step needs before it can run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRequirement {
    /// The artifact kind.
    #[serde(rename = "type")]
    pub kind: InputKind,
    /// The document key (or feedback type) to match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_key: Option<String>,
    /// Optional inputs never block readiness.
    #[serde(default = "default_required")]
    pub required: bool,
    /// `<stageSlug>.<key>`; names the producing stage for cross-stage lookups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl InputRequirement {
    /// Creates a required input of the given kind.
    #[must_use]
    pub fn new(kind: InputKind) -> Self {
        Self {
            kind,
            document_key: None,
            required: true,
            slug: None,
        }
    }

    /// Creates a required seed-prompt input.
    #[must_use]
    pub fn seed_prompt() -> Self {
        Self::new(InputKind::SeedPrompt)
    }

    /// Creates a required document input.
    #[must_use]
    pub fn document(document_key: impl Into<String>) -> Self {
        Self::new(InputKind::Document).with_document_key(document_key)
    }

    /// Creates a required feedback input.
    #[must_use]
    pub fn feedback(feedback_type: impl Into<String>) -> Self {
        Self::new(InputKind::Feedback).with_document_key(feedback_type)
    }

    /// Creates a required header-context input.
    #[must_use]
    pub fn header_context(document_key: impl Into<String>) -> Self {
        Self::new(InputKind::HeaderContext).with_document_key(document_key)
    }

    /// Sets the document key.
    #[must_use]
    pub fn with_document_key(mut self, document_key: impl Into<String>) -> Self {
        self.document_key = Some(document_key.into());
        self
    }

    /// Sets the source slug (`<stageSlug>.<key>`).
    #[must_use]
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// Marks the input as optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Resolves the stage that produces this input.
    ///
    /// The stage is the part of `slug` before the first `.`; a slug without a
    /// dot names the stage directly. No slug means the current stage.
    #[must_use]
    pub fn source_stage<'a>(&'a self, current_stage: &'a str) -> &'a str {
        match self.slug.as_deref() {
            Some(slug) if !slug.is_empty() => match slug.find('.') {
                Some(index) if index > 0 => &slug[..index],
                _ => slug,
            },
            _ => current_stage,
        }
    }
}

/// The class of artifact a step produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactClass {
    /// A user-facing rendered document.
    RenderedDocument,
    /// Control-plane header context.
    HeaderContext,
    /// An assembled JSON document.
    AssembledDocumentJson,
    /// Any class this crate does not interpret.
    #[serde(other)]
    Other,
}

/// The file type of a produced artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    /// Markdown.
    Markdown,
    /// JSON.
    Json,
    /// Any file type this crate does not interpret.
    #[serde(other)]
    Other,
}

/// An output a step is declared to produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRequirement {
    /// The document key of the output.
    pub document_key: String,
    /// The artifact class.
    pub artifact_class: ArtifactClass,
    /// The file type, if declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<FileType>,
}

impl OutputRequirement {
    /// Creates a rendered markdown document output.
    #[must_use]
    pub fn markdown(document_key: impl Into<String>) -> Self {
        Self {
            document_key: document_key.into(),
            artifact_class: ArtifactClass::RenderedDocument,
            file_type: Some(FileType::Markdown),
        }
    }

    /// Creates a header-context JSON output.
    #[must_use]
    pub fn header_context(document_key: impl Into<String>) -> Self {
        Self {
            document_key: document_key.into(),
            artifact_class: ArtifactClass::HeaderContext,
            file_type: Some(FileType::Json),
        }
    }

    /// Returns true for user-facing documents that count toward completion.
    #[must_use]
    pub fn is_markdown_document(&self) -> bool {
        self.artifact_class == ArtifactClass::RenderedDocument
            && self.file_type == Some(FileType::Markdown)
    }

    /// Returns true for header-context outputs.
    #[must_use]
    pub fn is_header_context(&self) -> bool {
        self.artifact_class == ArtifactClass::HeaderContext
    }
}

/// One unit of recipe work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeStep {
    /// Step id.
    pub id: String,
    /// Key used by run progress.
    pub step_key: String,
    /// URL-safe slug.
    #[serde(default)]
    pub step_slug: String,
    /// Human-readable name.
    #[serde(default)]
    pub step_name: String,
    /// Gating order; unique within a recipe.
    pub execution_order: u32,
    /// Steps that may run together.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_group: Option<u32>,
    /// Branch this step belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_key: Option<String>,
    /// The job kind.
    pub job_type: JobType,
    /// Prompt type passed to the generator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_type: Option<String>,
    /// Output type produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_type: Option<String>,
    /// How the step fans out (e.g. `per_model`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity_strategy: Option<String>,
    /// Inputs the step needs.
    #[serde(default)]
    pub inputs_required: Vec<InputRequirement>,
    /// Relevance weights for inputs; opaque to this crate.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs_relevance: Vec<serde_json::Value>,
    /// Outputs the step declares.
    #[serde(default)]
    pub outputs_required: Vec<OutputRequirement>,
}

impl RecipeStep {
    /// Creates a step with the given key, order, and job type.
    #[must_use]
    pub fn new(step_key: impl Into<String>, execution_order: u32, job_type: JobType) -> Self {
        let step_key = step_key.into();
        Self {
            id: format!("step-{step_key}"),
            step_slug: step_key.replace('_', "-"),
            step_name: step_key.clone(),
            step_key,
            execution_order,
            parallel_group: None,
            branch_key: None,
            job_type,
            prompt_type: None,
            output_type: None,
            granularity_strategy: None,
            inputs_required: Vec::new(),
            inputs_relevance: Vec::new(),
            outputs_required: Vec::new(),
        }
    }

    /// Sets the step name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.step_name = name.into();
        self
    }

    /// Adds an input requirement.
    #[must_use]
    pub fn with_input(mut self, input: InputRequirement) -> Self {
        self.inputs_required.push(input);
        self
    }

    /// Adds an output requirement.
    #[must_use]
    pub fn with_output(mut self, output: OutputRequirement) -> Self {
        self.outputs_required.push(output);
        self
    }

    /// Returns the keys of the markdown documents this step produces.
    pub fn markdown_document_keys(&self) -> impl Iterator<Item = &str> {
        self.outputs_required
            .iter()
            .filter(|o| o.is_markdown_document())
            .map(|o| o.document_key.as_str())
    }

    /// Returns true if the step fans out per selected model.
    ///
    /// Render steps never do; other steps do when they declare at least one
    /// markdown document output.
    #[must_use]
    pub fn is_model_step(&self) -> bool {
        self.job_type != JobType::Render && self.markdown_document_keys().next().is_some()
    }

    /// Returns true if the step declares the given header-context output.
    #[must_use]
    pub fn produces_header_context(&self, document_key: Option<&str>) -> bool {
        self.outputs_required.iter().any(|o| {
            o.is_header_context() && document_key.map_or(true, |key| o.document_key == key)
        })
    }

    /// Returns true if the step declares the given rendered document output.
    #[must_use]
    pub fn produces_document(&self, document_key: &str) -> bool {
        self.outputs_required
            .iter()
            .any(|o| o.artifact_class == ArtifactClass::RenderedDocument && o.document_key == document_key)
    }
}
