//! Tip model and the reserved category labels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserved category value meaning "select uniformly from all tips"
/// instead of filtering. Never stored as a real tip category.
pub const RANDOM_CATEGORY: &str = "random";

/// Pseudo-category presented first in the category listing; routes to the
/// most-recent selection rather than a category filter.
pub const MOST_RECENT_LABEL: &str = "most recent";

/// A short piece of content with text, a reference URL, and a category
/// label. Immutable once created; `created_at` is the sole recency key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tip {
    pub id: Uuid,
    pub text: String,
    pub url: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for a tip about to be created (id and timestamp are assigned by
/// the store at insert time).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTip {
    pub text: String,
    pub url: String,
    pub category: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_labels_are_distinct() {
        assert_ne!(RANDOM_CATEGORY, MOST_RECENT_LABEL);
    }
}
