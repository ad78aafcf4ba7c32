//! Backend-agnostic `Store` trait — single async interface for persistence.
//!
//! Two logical collections: tips (written only by the content-authoring
//! path and the seeder) and subscriptions (written only by the opt-in
//! flow). Reads are not required to be transactionally consistent with
//! concurrent writes; both collections change rarely relative to reads.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::subscriptions::model::Subscription;
use crate::tips::model::{NewTip, Tip};

/// Async persistence interface over the tips and subscriptions collections.
#[async_trait]
pub trait Store: Send + Sync {
    // ── Tips ────────────────────────────────────────────────────────

    /// Insert a new tip. Rejects the reserved random-category sentinel
    /// with a constraint error.
    async fn insert_tip(&self, tip: &NewTip) -> Result<Tip, DatabaseError>;

    /// All tips in deterministic order (created_at ASC, id ASC).
    async fn all_tips(&self) -> Result<Vec<Tip>, DatabaseError>;

    /// Tips whose category equals `category`, in deterministic order.
    async fn tips_by_category(&self, category: &str) -> Result<Vec<Tip>, DatabaseError>;

    /// The most recently created tip, or `None` when the collection is
    /// empty. Ties on created_at break by id ASC, stable across calls.
    async fn most_recent_tip(&self) -> Result<Option<Tip>, DatabaseError>;

    /// Number of tips in the collection.
    async fn count_tips(&self) -> Result<u64, DatabaseError>;

    // ── Subscriptions ───────────────────────────────────────────────

    /// Append a subscription record. Plain append — no existence check,
    /// no upsert; repeat calls create duplicates.
    async fn add_subscription(
        &self,
        user_id: &str,
        intent: &str,
        args: Option<&str>,
    ) -> Result<Subscription, DatabaseError>;

    /// Every subscription whose intent matches, in no guaranteed order.
    async fn subscriptions_by_intent(
        &self,
        intent: &str,
    ) -> Result<Vec<Subscription>, DatabaseError>;
}
