//! Engine configuration.

use crate::core::DOCUMENT_KEY_SEPARATOR;
use crate::errors::ProgressError;
use serde::{Deserialize, Serialize};

/// How stage and overall percentages are rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Round to two decimal places (`66.67`).
    Hundredths,
    /// Round to the nearest integer (`67`).
    Nearest,
    /// Truncate toward zero (`66`).
    Truncate,
}

impl Default for RoundingMode {
    fn default() -> Self {
        Self::Hundredths
    }
}

impl RoundingMode {
    /// Applies the rounding rule to a percentage.
    #[must_use]
    pub fn apply(self, value: f64) -> f64 {
        if !value.is_finite() {
            return 0.0;
        }
        match self {
            Self::Hundredths => (value * 100.0).round() / 100.0,
            Self::Nearest => value.round(),
            Self::Truncate => value.trunc(),
        }
    }

    /// Computes `numerator / denominator * 100`, rounded; zero when the
    /// denominator is zero.
    #[must_use]
    pub fn percentage(self, numerator: usize, denominator: usize) -> f64 {
        if denominator == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let raw = numerator as f64 / denominator as f64 * 100.0;
        self.apply(raw)
    }
}

/// Logging configuration used by [`crate::observability::init_tracing`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

/// Configuration for the progress engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Percentage rounding rule.
    #[serde(default)]
    pub rounding: RoundingMode,
    /// Separator between document key and model id in composite keys.
    #[serde(default = "default_separator")]
    pub document_key_separator: String,
    /// Whether the reducer emits outbound progress events.
    #[serde(default = "default_emit_events")]
    pub emit_events: bool,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_separator() -> String {
    DOCUMENT_KEY_SEPARATOR.to_string()
}

fn default_emit_events() -> bool {
    true
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            rounding: RoundingMode::default(),
            document_key_separator: default_separator(),
            emit_events: default_emit_events(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ProgressConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from JSON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Config` if the JSON is malformed or the
    /// separator is empty.
    pub fn from_json_str(json: &str) -> Result<Self, ProgressError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ProgressError::Config(e.to_string()))?;
        if config.document_key_separator.is_empty() {
            return Err(ProgressError::Config(
                "document_key_separator must not be empty".to_string(),
            ));
        }
        Ok(config)
    }

    /// Sets the rounding mode.
    #[must_use]
    pub fn with_rounding(mut self, rounding: RoundingMode) -> Self {
        self.rounding = rounding;
        self
    }

    /// Sets the document key separator.
    #[must_use]
    pub fn with_document_key_separator(mut self, separator: impl Into<String>) -> Self {
        self.document_key_separator = separator.into();
        self
    }

    /// Enables or disables outbound events.
    #[must_use]
    pub fn with_emit_events(mut self, emit: bool) -> Self {
        self.emit_events = emit;
        self
    }

    /// Sets the logging configuration.
    #[must_use]
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }
}
