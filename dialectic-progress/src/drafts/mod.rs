//! Per-document edit and feedback drafts.
//!
//! Drafts are keyed by [`StageDocumentKey`]. They do not affect readiness or
//! percentages; they only answer whether a stage run has unsaved work.

mod diff;

pub use diff::{apply_diff_to_baseline, derive_diff};

use crate::core::StageDocumentKey;
use crate::utils::{iso_timestamp, version_hash};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A rendered version of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentVersion {
    /// The rendered resource id.
    pub resource_id: String,
    /// Hash of the resource id.
    pub version_hash: String,
    /// When the version was observed.
    pub updated_at: String,
}

impl DocumentVersion {
    /// Builds version info for a rendered resource.
    #[must_use]
    pub fn for_resource(resource_id: impl Into<String>) -> Self {
        let resource_id = resource_id.into();
        Self {
            version_hash: version_hash(&resource_id),
            resource_id,
            updated_at: iso_timestamp(),
        }
    }
}

/// Edit state of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftEntry {
    /// The last saved markdown.
    pub baseline_markdown: String,
    /// The markdown being edited.
    pub current_draft_markdown: String,
    /// True when the draft differs from the baseline.
    pub is_dirty: bool,
    /// Pending diff against the baseline.
    pub pending_diff: Option<String>,
    /// Version the baseline was loaded from.
    pub last_baseline_version: Option<DocumentVersion>,
    /// Version hash the draft was last reconciled with.
    pub last_applied_version_hash: Option<String>,
    /// Contribution the baseline came from.
    pub source_contribution_id: Option<String>,
    /// Unsent feedback text.
    pub feedback_draft_markdown: Option<String>,
    /// True when unsent feedback exists.
    pub feedback_is_dirty: bool,
}

impl DraftEntry {
    fn seeded(baseline: &str, version: Option<DocumentVersion>) -> Self {
        Self {
            baseline_markdown: baseline.to_string(),
            current_draft_markdown: baseline.to_string(),
            last_applied_version_hash: version.as_ref().map(|v| v.version_hash.clone()),
            last_baseline_version: version,
            ..Self::default()
        }
    }

    fn record_draft(&mut self, markdown: &str) {
        self.current_draft_markdown = markdown.to_string();
        self.pending_diff = derive_diff(&self.baseline_markdown, markdown);
        self.is_dirty = self.pending_diff.is_some();
    }
}

/// Unsaved work for one stage run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsavedChanges {
    /// Some document draft differs from its baseline.
    pub has_unsaved_edits: bool,
    /// Some document has unsent feedback.
    pub has_unsaved_feedback: bool,
}

/// Every document draft.
#[derive(Debug, Clone, Default)]
pub struct DraftRegistry {
    entries: BTreeMap<StageDocumentKey, DraftEntry>,
}

impl DraftRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a draft entry.
    #[must_use]
    pub fn entry(&self, key: &StageDocumentKey) -> Option<&DraftEntry> {
        self.entries.get(key)
    }

    fn ensure(&mut self, key: &StageDocumentKey) -> &mut DraftEntry {
        self.entries.entry(key.clone()).or_default()
    }

    /// Starts editing a document.
    ///
    /// A new entry takes `initial_markdown` as its baseline. An existing
    /// entry keeps its baseline and records `initial_markdown` as the draft.
    pub fn begin_edit(
        &mut self,
        key: &StageDocumentKey,
        initial_markdown: &str,
        version: Option<DocumentVersion>,
    ) {
        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| DraftEntry::seeded(initial_markdown, version));
        entry.record_draft(initial_markdown);
    }

    /// Records new draft text.
    pub fn record_draft(&mut self, key: &StageDocumentKey, markdown: &str) {
        self.ensure(key).record_draft(markdown);
    }

    /// Discards the pending draft, returning to the baseline.
    pub fn flush_draft(&mut self, key: &StageDocumentKey) {
        let entry = self.ensure(key);
        entry.current_draft_markdown = entry.baseline_markdown.clone();
        entry.is_dirty = false;
        entry.pending_diff = None;
        if let Some(version) = &entry.last_baseline_version {
            entry.last_applied_version_hash = Some(version.version_hash.clone());
        }
    }

    /// Removes a document's draft state entirely.
    pub fn clear(&mut self, key: &StageDocumentKey) -> Option<DraftEntry> {
        self.entries.remove(key)
    }

    /// Records feedback text; empty text is not dirty.
    pub fn record_feedback(&mut self, key: &StageDocumentKey, markdown: &str) {
        let entry = self.ensure(key);
        entry.feedback_is_dirty = !markdown.is_empty();
        entry.feedback_draft_markdown = Some(markdown.to_string());
    }

    /// Discards feedback text.
    pub fn flush_feedback(&mut self, key: &StageDocumentKey) {
        let entry = self.ensure(key);
        entry.feedback_draft_markdown = None;
        entry.feedback_is_dirty = false;
    }

    /// Moves a draft onto a newly rendered baseline, reapplying its pending diff.
    ///
    /// Returns false if the document has no draft entry.
    pub fn reapply_to_new_baseline(
        &mut self,
        key: &StageDocumentKey,
        new_baseline: &str,
        version: DocumentVersion,
        source_contribution_id: Option<String>,
    ) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };
        entry.baseline_markdown = new_baseline.to_string();
        entry.last_applied_version_hash = Some(version.version_hash.clone());
        entry.last_baseline_version = Some(version);
        entry.source_contribution_id = source_contribution_id;

        match entry.pending_diff.as_deref().filter(|d| !d.is_empty()) {
            Some(diff) => {
                entry.current_draft_markdown = apply_diff_to_baseline(new_baseline, Some(diff));
                entry.is_dirty = true;
            }
            None => {
                entry.current_draft_markdown = new_baseline.to_string();
                entry.is_dirty = false;
            }
        }
        true
    }

    /// Reports unsaved edits and feedback for one stage run.
    #[must_use]
    pub fn unsaved_changes(
        &self,
        session_id: &str,
        stage_slug: &str,
        iteration_number: u32,
    ) -> UnsavedChanges {
        self.entries
            .iter()
            .filter(|(key, _)| key.belongs_to(session_id, stage_slug, iteration_number))
            .fold(UnsavedChanges::default(), |acc, (_, entry)| UnsavedChanges {
                has_unsaved_edits: acc.has_unsaved_edits || entry.is_dirty,
                has_unsaved_feedback: acc.has_unsaved_feedback || entry.feedback_is_dirty,
            })
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry.
    pub fn clear_all(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(model: &str) -> StageDocumentKey {
        StageDocumentKey::new("s1", "thesis", 1, model, "summary")
    }

    #[test]
    fn test_begin_edit_seeds_baseline() {
        let mut drafts = DraftRegistry::new();
        drafts.begin_edit(&key("m"), "# Summary", Some(DocumentVersion::for_resource("res-1")));

        let entry = drafts.entry(&key("m")).unwrap();
        assert_eq!(entry.baseline_markdown, "# Summary");
        assert!(!entry.is_dirty);
        assert_eq!(entry.last_applied_version_hash, Some(version_hash("res-1")));
    }

    #[test]
    fn test_record_and_flush_draft() {
        let mut drafts = DraftRegistry::new();
        drafts.begin_edit(&key("m"), "# Summary", None);
        drafts.record_draft(&key("m"), "# Summary\nAdded");

        let entry = drafts.entry(&key("m")).unwrap();
        assert!(entry.is_dirty);
        assert_eq!(entry.pending_diff.as_deref(), Some("Added"));
        assert!(drafts.unsaved_changes("s1", "thesis", 1).has_unsaved_edits);

        drafts.flush_draft(&key("m"));
        let entry = drafts.entry(&key("m")).unwrap();
        assert_eq!(entry.current_draft_markdown, "# Summary");
        assert!(!drafts.unsaved_changes("s1", "thesis", 1).has_unsaved_edits);
    }

    #[test]
    fn test_feedback_drafts() {
        let mut drafts = DraftRegistry::new();
        drafts.record_feedback(&key("m"), "");
        assert!(!drafts.unsaved_changes("s1", "thesis", 1).has_unsaved_feedback);

        drafts.record_feedback(&key("m"), "Needs sources");
        assert_eq!(
            drafts.unsaved_changes("s1", "thesis", 1),
            UnsavedChanges {
                has_unsaved_edits: false,
                has_unsaved_feedback: true,
            }
        );

        drafts.flush_feedback(&key("m"));
        assert!(!drafts.unsaved_changes("s1", "thesis", 1).has_unsaved_feedback);
    }

    #[test]
    fn test_unsaved_changes_scoped_to_run() {
        let mut drafts = DraftRegistry::new();
        drafts.begin_edit(&key("m"), "A", None);
        drafts.record_draft(&key("m"), "B");
        assert!(!drafts.unsaved_changes("s1", "thesis", 2).has_unsaved_edits);
        assert!(!drafts.unsaved_changes("s2", "thesis", 1).has_unsaved_edits);
    }

    #[test]
    fn test_reapply_to_new_baseline() {
        let mut drafts = DraftRegistry::new();
        drafts.begin_edit(&key("m"), "v1", None);
        drafts.record_draft(&key("m"), "v1\nnote");

        let reapplied = drafts.reapply_to_new_baseline(
            &key("m"),
            "v2",
            DocumentVersion::for_resource("res-2"),
            Some("contrib-2".to_string()),
        );
        assert!(reapplied);

        let entry = drafts.entry(&key("m")).unwrap();
        assert_eq!(entry.current_draft_markdown, "v2\nnote");
        assert!(entry.is_dirty);
        assert_eq!(entry.source_contribution_id.as_deref(), Some("contrib-2"));
    }

    #[test]
    fn test_reapply_without_entry() {
        let mut drafts = DraftRegistry::new();
        assert!(!drafts.reapply_to_new_baseline(
            &key("m"),
            "v2",
            DocumentVersion::for_resource("res-2"),
            None
        ));
    }

    #[test]
    fn test_clear_entry() {
        let mut drafts = DraftRegistry::new();
        drafts.begin_edit(&key("m"), "A", None);
        assert!(drafts.clear(&key("m")).is_some());
        assert!(drafts.is_empty());
    }
}
