//! Composite keys for run-progress buckets, document slots, and drafts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the logical document key and the model id.
pub const DOCUMENT_KEY_SEPARATOR: &str = ":";

/// Identifies one stage run: `sessionId:stageSlug:iterationNumber`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProgressKey {
    /// The session id.
    pub session_id: String,
    /// The stage slug.
    pub stage_slug: String,
    /// The iteration number.
    pub iteration_number: u32,
}

impl ProgressKey {
    /// Creates a new progress key.
    #[must_use]
    pub fn new(session_id: impl Into<String>, stage_slug: impl Into<String>, iteration_number: u32) -> Self {
        Self {
            session_id: session_id.into(),
            stage_slug: stage_slug.into(),
            iteration_number,
        }
    }

    /// Returns the key of the same session and iteration for another stage.
    #[must_use]
    pub fn for_stage(&self, stage_slug: &str) -> Self {
        Self::new(self.session_id.clone(), stage_slug, self.iteration_number)
    }

    /// Parses the `sessionId:stageSlug:iterationNumber` form.
    ///
    /// Splits from the right so session ids containing `:` survive.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.rsplitn(3, ':');
        let iteration_number = parts.next()?.parse().ok()?;
        let stage_slug = parts.next()?;
        let session_id = parts.next()?;
        if session_id.is_empty() || stage_slug.is_empty() {
            return None;
        }
        Some(Self::new(session_id, stage_slug, iteration_number))
    }
}

impl fmt::Display for ProgressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.session_id, self.stage_slug, self.iteration_number)
    }
}

/// Identifies one document descriptor within a run.
///
/// A slot without a model id represents a non-model or already-merged document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentSlot {
    /// The logical document key.
    pub document_key: String,
    /// The model that produced this instance of the document.
    pub model_id: Option<String>,
}

impl DocumentSlot {
    /// Creates a slot for a model-specific document.
    #[must_use]
    pub fn new(document_key: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            document_key: document_key.into(),
            model_id: Some(model_id.into()),
        }
    }

    /// Creates a slot for a document with no model.
    #[must_use]
    pub fn bare(document_key: impl Into<String>) -> Self {
        Self {
            document_key: document_key.into(),
            model_id: None,
        }
    }

    /// Creates a slot, treating an empty model id as absent.
    #[must_use]
    pub fn from_parts(document_key: impl Into<String>, model_id: Option<&str>) -> Self {
        Self {
            document_key: document_key.into(),
            model_id: model_id.filter(|m| !m.is_empty()).map(str::to_string),
        }
    }

    /// Renders the composite `documentKey[:modelId]` form.
    #[must_use]
    pub fn composite(&self, separator: &str) -> String {
        match &self.model_id {
            Some(model_id) => format!("{}{}{}", self.document_key, separator, model_id),
            None => self.document_key.clone(),
        }
    }

    /// Parses the composite form; the first separator splits key from model.
    #[must_use]
    pub fn parse_composite(value: &str, separator: &str) -> Self {
        match value.split_once(separator) {
            Some((key, model)) => Self::from_parts(key, Some(model)),
            None => Self::bare(value),
        }
    }
}

impl fmt::Display for DocumentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.composite(DOCUMENT_KEY_SEPARATOR))
    }
}

/// Identifies one editable document:
/// `sessionId:stageSlug:iterationNumber:modelId:documentKey`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StageDocumentKey {
    /// The session id.
    pub session_id: String,
    /// The stage slug.
    pub stage_slug: String,
    /// The iteration number.
    pub iteration_number: u32,
    /// The model id.
    pub model_id: String,
    /// The logical document key.
    pub document_key: String,
}

impl StageDocumentKey {
    /// Creates a new stage document key.
    #[must_use]
    pub fn new(
        session_id: impl Into<String>,
        stage_slug: impl Into<String>,
        iteration_number: u32,
        model_id: impl Into<String>,
        document_key: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            stage_slug: stage_slug.into(),
            iteration_number,
            model_id: model_id.into(),
            document_key: document_key.into(),
        }
    }

    /// Returns true if the document belongs to the given stage run.
    #[must_use]
    pub fn belongs_to(&self, session_id: &str, stage_slug: &str, iteration_number: u32) -> bool {
        self.session_id == session_id
            && self.stage_slug == stage_slug
            && self.iteration_number == iteration_number
    }
}

impl fmt::Display for StageDocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.session_id, self.stage_slug, self.iteration_number, self.model_id, self.document_key
        )
    }
}
