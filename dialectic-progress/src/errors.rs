//! Error types for the progress engine.
//!
//! Only the loading surfaces (recipes, hydration payloads, configuration)
//! are fallible. Readiness and progress queries are total functions and
//! report every failure as a status value instead.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for progress engine operations.
#[derive(Debug, Error)]
pub enum ProgressError {
    /// A recipe failed validation.
    #[error("{0}")]
    RecipeValidation(#[from] RecipeValidationError),

    /// A hydration payload was rejected.
    #[error("{0}")]
    Hydration(#[from] HydrationError),

    /// Configuration could not be decoded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Metadata about a contract error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "RECIPE-001-DUPLICATE_ORDER").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::Value::String(self.code.clone()));
        map.insert("summary".to_string(), serde_json::Value::String(self.summary.clone()));

        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::Value::String(hint.clone()));
        }
        if !self.context.is_empty() {
            let context_map: serde_json::Map<String, serde_json::Value> = self
                .context
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect();
            map.insert("context".to_string(), serde_json::Value::Object(context_map));
        }

        map
    }
}

/// Error raised when a stage recipe violates its structural invariants.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RecipeValidationError {
    /// The error message.
    pub message: String,
    /// The step keys involved in the error.
    pub step_keys: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl RecipeValidationError {
    /// Creates a new recipe validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            step_keys: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the step keys involved.
    #[must_use]
    pub fn with_step_keys(mut self, step_keys: Vec<String>) -> Self {
        self.step_keys = step_keys;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Two steps share an `execution_order` value.
    #[must_use]
    pub fn duplicate_order(stage_slug: &str, order: u32, first: &str, second: &str) -> Self {
        let info = ContractErrorInfo::new(
            "RECIPE-001-DUPLICATE_ORDER",
            format!("Steps '{first}' and '{second}' in stage '{stage_slug}' share execution_order {order}"),
        )
        .with_fix_hint(RecipeSuggestions::get("RECIPE-001-DUPLICATE_ORDER").unwrap_or_default())
        .with_context_entry("stage_slug", stage_slug)
        .with_context_entry("execution_order", order.to_string());

        Self::new(info.summary.clone())
            .with_step_keys(vec![first.to_string(), second.to_string()])
            .with_error_info(info)
    }

    /// Two steps share a `step_key`.
    #[must_use]
    pub fn duplicate_step_key(stage_slug: &str, step_key: &str) -> Self {
        let info = ContractErrorInfo::new(
            "RECIPE-002-DUPLICATE_STEP_KEY",
            format!("Step key '{step_key}' appears more than once in stage '{stage_slug}'"),
        )
        .with_fix_hint(RecipeSuggestions::get("RECIPE-002-DUPLICATE_STEP_KEY").unwrap_or_default())
        .with_context_entry("stage_slug", stage_slug);

        Self::new(info.summary.clone())
            .with_step_keys(vec![step_key.to_string()])
            .with_error_info(info)
    }

    /// A step has an empty `step_key`.
    #[must_use]
    pub fn empty_step_key(stage_slug: &str, step_id: &str) -> Self {
        let info = ContractErrorInfo::new(
            "RECIPE-003-EMPTY_STEP_KEY",
            format!("Step '{step_id}' in stage '{stage_slug}' has an empty step_key"),
        )
        .with_fix_hint(RecipeSuggestions::get("RECIPE-003-EMPTY_STEP_KEY").unwrap_or_default())
        .with_context_entry("stage_slug", stage_slug);

        Self::new(info.summary.clone()).with_error_info(info)
    }

    /// The recipe has no stage slug.
    #[must_use]
    pub fn empty_stage(instance_id: &str) -> Self {
        let info = ContractErrorInfo::new(
            "RECIPE-004-EMPTY_STAGE",
            format!("Recipe instance '{instance_id}' has an empty stage slug"),
        )
        .with_fix_hint(RecipeSuggestions::get("RECIPE-004-EMPTY_STAGE").unwrap_or_default());

        Self::new(info.summary.clone()).with_error_info(info)
    }

    /// Returns the contract error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

/// Error raised when a server progress snapshot cannot be hydrated.
#[derive(Debug, Clone, Error)]
#[error("Invalid progress snapshot for '{progress_key}': {reason}")]
pub struct HydrationError {
    /// The progress bucket the payload targeted.
    pub progress_key: String,
    /// Why the payload was rejected.
    pub reason: String,
}

impl HydrationError {
    /// Creates a new hydration error.
    #[must_use]
    pub fn new(progress_key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            progress_key: progress_key.into(),
            reason: reason.into(),
        }
    }
}

/// Provides default suggestions for recipe contract error codes.
pub struct RecipeSuggestions;

impl RecipeSuggestions {
    /// Gets a suggestion for a given error code.
    #[must_use]
    pub fn get(code: &str) -> Option<&'static str> {
        match code {
            "RECIPE-001-DUPLICATE_ORDER" => Some(
                "Every step needs its own execution_order. \
                 Steps that run together belong in the same parallel_group instead.",
            ),
            "RECIPE-002-DUPLICATE_STEP_KEY" => Some(
                "Step keys identify progress entries and must be unique within a recipe.",
            ),
            "RECIPE-003-EMPTY_STEP_KEY" => Some("Give the step a non-empty step_key."),
            "RECIPE-004-EMPTY_STAGE" => Some(
                "A recipe must name the stage it belongs to. Check the stage slug of the template instance.",
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_error_info_creation() {
        let info = ContractErrorInfo::new("TEST-001", "Test error")
            .with_fix_hint("Fix this by doing that")
            .with_context_entry("stage_slug", "thesis");

        assert_eq!(info.code, "TEST-001");
        assert_eq!(info.fix_hint, Some("Fix this by doing that".to_string()));
        assert_eq!(info.context.get("stage_slug"), Some(&"thesis".to_string()));
    }

    #[test]
    fn test_contract_error_info_to_dict() {
        let dict = ContractErrorInfo::new("TEST-001", "Test error").to_dict();
        assert_eq!(dict.get("code").unwrap(), "TEST-001");
        assert!(!dict.contains_key("context"));
    }

    #[test]
    fn test_duplicate_order_error() {
        let err = RecipeValidationError::duplicate_order("thesis", 2, "a", "b");

        assert_eq!(err.code(), Some("RECIPE-001-DUPLICATE_ORDER"));
        assert_eq!(err.step_keys, vec!["a".to_string(), "b".to_string()]);
        assert!(err.to_string().contains("execution_order 2"));
        assert!(err.error_info.unwrap().fix_hint.is_some());
    }

    #[test]
    fn test_progress_error_wraps_recipe_error() {
        let err: ProgressError = RecipeValidationError::duplicate_step_key("thesis", "plan").into();
        assert!(matches!(err, ProgressError::RecipeValidation(_)));
        assert!(err.to_string().contains("'plan'"));
    }

    #[test]
    fn test_hydration_error_message() {
        let err = HydrationError::new("s1:thesis:1", "documentKey is empty");
        assert_eq!(
            err.to_string(),
            "Invalid progress snapshot for 's1:thesis:1': documentKey is empty"
        );
    }

    #[test]
    fn test_recipe_suggestions() {
        assert!(RecipeSuggestions::get("RECIPE-002-DUPLICATE_STEP_KEY").is_some());
        assert!(RecipeSuggestions::get("UNKNOWN").is_none());
    }
}
