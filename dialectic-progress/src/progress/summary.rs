//! Markdown document completion summaries and checklists.
//!
//! Only rendered markdown outputs count as documents here. Header-context
//! and other control-plane artifacts gate readiness but never show up in
//! these totals.

use crate::core::{DocumentStatus, ProgressKey};
use crate::state::DialecticState;
use serde::Serialize;
use std::collections::BTreeSet;

/// Document completion for one stage run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDocumentSummary {
    /// True when at least one document exists and all are completed.
    pub is_complete: bool,
    /// Markdown documents tracked for the run.
    pub total_documents: usize,
    /// Documents completed with a rendered resource.
    pub completed_documents: usize,
    /// Keys of documents not yet completed or failed, sorted.
    pub outstanding_documents: Vec<String>,
    /// True when any document failed.
    pub has_failed: bool,
    /// Number of failed documents.
    pub failed_documents: usize,
    /// Keys of failed documents, sorted.
    pub failed_document_keys: Vec<String>,
}

/// Summarises the markdown documents of one stage run.
///
/// With `model_id`, only that model's documents are counted. A run with no
/// progress bucket summarises to zeros.
#[must_use]
pub fn stage_progress_summary(
    state: &DialecticState,
    session_id: &str,
    stage_slug: &str,
    iteration_number: u32,
    model_id: Option<&str>,
) -> StageDocumentSummary {
    let Some(run) = state.run(&ProgressKey::new(session_id, stage_slug, iteration_number)) else {
        return StageDocumentSummary::default();
    };
    let markdown_keys = state
        .recipes
        .get(stage_slug)
        .map(|recipe| recipe.markdown_document_keys())
        .unwrap_or_default();

    let mut summary = StageDocumentSummary::default();
    let mut outstanding = BTreeSet::new();
    let mut failed = BTreeSet::new();

    for (slot, descriptor) in &run.documents {
        if model_id.is_some_and(|m| descriptor.model_id.as_deref() != Some(m)) {
            continue;
        }
        if !markdown_keys.contains(slot.document_key.as_str()) {
            continue;
        }
        summary.total_documents += 1;
        if descriptor.is_completed() {
            summary.completed_documents += 1;
        } else if descriptor.status == DocumentStatus::Failed {
            summary.failed_documents += 1;
            failed.insert(slot.document_key.clone());
        } else {
            outstanding.insert(slot.document_key.clone());
        }
    }

    summary.is_complete =
        summary.total_documents > 0 && summary.completed_documents == summary.total_documents;
    summary.has_failed = summary.failed_documents > 0;
    summary.outstanding_documents = outstanding.into_iter().collect();
    summary.failed_document_keys = failed.into_iter().collect();
    summary
}

/// One row of a model's document checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistEntry {
    /// The logical document key.
    pub document_key: String,
    /// Current status.
    pub status: DocumentStatus,
    /// The job that last touched the document.
    pub job_id: String,
    /// The latest rendered resource, if any.
    pub latest_rendered_resource_id: Option<String>,
    /// The producing model.
    pub model_id: Option<String>,
    /// The producing step, if known.
    pub step_key: Option<String>,
}

/// Lists every document a model has in one run, in slot order.
#[must_use]
pub fn stage_document_checklist(
    state: &DialecticState,
    progress_key: &ProgressKey,
    model_id: &str,
) -> Vec<ChecklistEntry> {
    let Some(run) = state.run(progress_key) else {
        return Vec::new();
    };
    run.documents
        .iter()
        .filter(|(_, d)| d.model_id.as_deref() == Some(model_id))
        .map(|(slot, d)| ChecklistEntry {
            document_key: slot.document_key.clone(),
            status: d.status,
            job_id: d.job_id.clone(),
            latest_rendered_resource_id: d.latest_rendered_resource_id.clone(),
            model_id: d.model_id.clone(),
            step_key: d.step_key.clone(),
        })
        .collect()
}
