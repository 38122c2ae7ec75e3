//! Append-style diffs between a baseline document and a draft.

/// Derives the pending diff of a draft against its baseline.
///
/// A draft that extends the baseline yields only the appended text (with a
/// single leading newline dropped). Any other edit yields the whole draft.
/// An unchanged draft yields `None`.
#[must_use]
pub fn derive_diff(baseline: &str, draft: &str) -> Option<String> {
    if baseline == draft {
        return None;
    }
    match draft.strip_prefix(baseline) {
        Some(remainder) => {
            let remainder = remainder.strip_prefix('\n').unwrap_or(remainder);
            (!remainder.is_empty()).then(|| remainder.to_string())
        }
        None => Some(draft.to_string()),
    }
}

/// Appends a pending diff to a baseline, inserting a newline between them
/// when neither side supplies one.
#[must_use]
pub fn apply_diff_to_baseline(baseline: &str, diff: Option<&str>) -> String {
    match diff {
        Some(diff) if !diff.is_empty() => {
            let separator = if baseline.ends_with('\n') || diff.starts_with('\n') {
                ""
            } else {
                "\n"
            };
            format!("{baseline}{separator}{diff}")
        }
        _ => baseline.to_string(),
    }
}
