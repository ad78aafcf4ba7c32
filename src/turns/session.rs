//! Ephemeral per-session state.
//!
//! The webhook is stateless, so these flags travel with each turn: in on
//! `TurnRequest`, out (possibly updated) on `TurnResponse`. The host
//! platform is the carrier; nothing here is written to the store.

use serde::{Deserialize, Serialize};

/// Progress of one opt-in flow within a session. Terminal either way —
/// neither state machine is resumable across sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptInState {
    #[default]
    Idle,
    Prompted,
    Granted,
    Denied,
}

/// Session-scoped flags, owned exclusively by one user's dialogue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFlags {
    /// The "Send daily" suggestion was already shown this session.
    #[serde(default)]
    pub daily_notification_asked: bool,
    /// The "Alert me of new tips" suggestion was already shown this session.
    #[serde(default)]
    pub push_notification_asked: bool,
    #[serde(default)]
    pub push_opt_in: OptInState,
    #[serde(default)]
    pub daily_opt_in: OptInState,
}
