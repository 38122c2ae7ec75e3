//! Assertion helpers for progress tests.

use crate::core::{DocumentSlot, DocumentStatus, ProgressKey, ProgressStatus, StepStatus};
use crate::progress::StageProgressDetail;
use crate::readiness::evaluate;
use crate::state::DialecticState;

/// Asserts the rolled-up status of a stage.
pub fn assert_stage_status(detail: &StageProgressDetail, expected: ProgressStatus) {
    assert_eq!(
        detail.stage_status, expected,
        "Stage '{}' expected status {:?}, got {:?}",
        detail.stage_slug, expected, detail.stage_status
    );
}

/// Asserts that a percentage is within `0.005` of the expected value.
pub fn assert_percentage_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 0.005,
        "Expected percentage {expected}, got {actual}"
    );
}

/// Asserts that a percentage lies in `[0, 100]`.
pub fn assert_percentage_bounded(value: f64) {
    assert!(
        (0.0..=100.0).contains(&value),
        "Percentage {value} is outside [0, 100]"
    );
}

/// Asserts the status of a step in a run.
pub fn assert_step_status(state: &DialecticState, progress_key: &ProgressKey, step_key: &str, expected: StepStatus) {
    let actual = state
        .run(progress_key)
        .map_or(StepStatus::NotStarted, |run| run.step_status(step_key));
    assert_eq!(
        actual, expected,
        "Step '{step_key}' of {progress_key} expected {expected:?}, got {actual:?}"
    );
}

/// Asserts the status of one document slot in a run.
pub fn assert_document_status(
    state: &DialecticState,
    progress_key: &ProgressKey,
    slot: &DocumentSlot,
    expected: DocumentStatus,
) {
    let actual = state
        .run(progress_key)
        .and_then(|run| run.document(slot))
        .map(|descriptor| descriptor.status);
    assert_eq!(
        actual,
        Some(expected),
        "Document '{}' of {progress_key} expected {expected:?}, got {actual:?}",
        slot.composite(":")
    );
}

/// Asserts that a stage run is ready.
pub fn assert_ready(state: &DialecticState, project_id: &str, session_id: &str, stage_slug: &str, iteration: u32) {
    let readiness = evaluate(state, project_id, session_id, stage_slug, iteration);
    assert!(
        readiness.ready,
        "Stage '{stage_slug}' expected ready; gating step {:?} is missing {:?}",
        readiness.gating_step_key, readiness.missing
    );
}

/// Asserts that a stage run is not ready.
pub fn assert_not_ready(state: &DialecticState, project_id: &str, session_id: &str, stage_slug: &str, iteration: u32) {
    let readiness = evaluate(state, project_id, session_id, stage_slug, iteration);
    assert!(
        !readiness.ready,
        "Stage '{stage_slug}' expected not ready; gating step {:?}",
        readiness.gating_step_key
    );
}
