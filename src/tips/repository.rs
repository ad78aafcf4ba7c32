//! TipRepository — read-only selection queries over the tip collection.
//!
//! Three policies: uniform-random within a category (or across all tips
//! when asked for the reserved random sentinel), most recent by
//! `created_at`, and the ordered category listing consumed by the welcome
//! turn.

use std::sync::Arc;

use rand::Rng;
use tracing::debug;

use crate::error::TipError;
use crate::store::Store;
use crate::tips::model::{Tip, MOST_RECENT_LABEL, RANDOM_CATEGORY};

/// Read-only tip queries. No mutation goes through this type.
pub struct TipRepository {
    store: Arc<dyn Store>,
}

impl TipRepository {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Pick a tip uniformly at random from the given category, or from the
    /// whole collection when `category` is the random sentinel.
    ///
    /// An empty result set fails fast with `TipError::NotFound`; the caller
    /// substitutes a user-visible fallback.
    pub async fn pick_by_category(&self, category: &str) -> Result<Tip, TipError> {
        let mut candidates = if category == RANDOM_CATEGORY {
            self.store.all_tips().await?
        } else {
            self.store.tips_by_category(category).await?
        };

        if candidates.is_empty() {
            return Err(TipError::NotFound {
                category: (category != RANDOM_CATEGORY).then(|| category.to_string()),
            });
        }

        let index = rand::thread_rng().gen_range(0..candidates.len());
        let tip = candidates.swap_remove(index);
        debug!(tip_id = %tip.id, category, "Picked tip");
        Ok(tip)
    }

    /// The tip with the maximum `created_at`, or `NotFound` when the
    /// collection is empty. Stable across calls on unchanged data.
    pub async fn most_recent(&self) -> Result<Tip, TipError> {
        self.store
            .most_recent_tip()
            .await?
            .ok_or(TipError::NotFound { category: None })
    }

    /// All categories in first-seen order, deduplicated, with the
    /// "most recent" pseudo-category prepended and the random sentinel
    /// appended. Consumed by the welcome-turn presentation.
    pub async fn list_categories(&self) -> Result<Vec<String>, TipError> {
        let tips = self.store.all_tips().await?;

        let mut categories = vec![MOST_RECENT_LABEL.to_string()];
        for tip in &tips {
            if !categories.contains(&tip.category) {
                categories.push(tip.category.clone());
            }
        }
        categories.push(RANDOM_CATEGORY.to_string());
        Ok(categories)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
