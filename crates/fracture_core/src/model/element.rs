//! Element and tag model.
//!
//! # Invariants
//! - `identifier` is unique across all elements.
//! - Stored tags are trimmed and lowercase when written through services.

use serde::{Deserialize, Serialize};

/// Engine-assigned surrogate id of an `elements` row.
pub type ElementId = i64;

/// One tracked element, e.g. a file path or a URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Element {
    /// Surrogate id, immutable once created.
    pub id: ElementId,
    /// Natural key used by every query.
    pub identifier: String,
}

/// Normalizes one tag value: trims surrounding whitespace and lowercases.
///
/// Returns `None` for blank input.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Conforms a location or identifier to forward-slash separators.
pub fn conform_path(value: &str) -> String {
    value.replace('\\', "/")
}
