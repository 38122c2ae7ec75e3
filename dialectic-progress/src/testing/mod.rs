//! Testing utilities for recipe readiness and progress.
//!
//! This module provides:
//! - Builders for recipes, projects, and lifecycle events
//! - Assertions over readiness, step, document, and stage status

mod assertions;
mod fixtures;

pub use assertions::{
    assert_document_status, assert_not_ready, assert_percentage_bounded, assert_percentage_close,
    assert_ready, assert_stage_status, assert_step_status,
};
pub use fixtures::{EventFixture, ProjectFixture, RecipeFixture, StepFixture};
