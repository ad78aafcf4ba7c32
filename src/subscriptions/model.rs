//! Subscription model and the intent names it binds to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Intent delivering the most recently added tip. Push subscriptions are
/// stored against this name, and the dispatcher fans out to it.
pub const TELL_LATEST_TIP_INTENT: &str = "tell_latest_tip";

/// Intent delivering a tip from a chosen category. Daily update
/// registrations are parameterized with it.
pub const TELL_TIP_INTENT: &str = "tell_tip";

/// A standing consent: `user_id` wants to be notified via the named
/// `intent`, optionally parameterized (e.g. a fixed category). Created
/// only through the opt-in flow; never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: String,
    pub intent: String,
    pub args: Option<String>,
    pub created_at: DateTime<Utc>,
}
