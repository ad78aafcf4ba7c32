//! Opt-in flow controller — two-step consent state machines.
//!
//! One machine per opt-in type (push-alert and daily-update), each
//! independent: `Prompted → {Granted, Denied}`, terminal either way with
//! no retry on decline. The platform-level consent UI is an external
//! collaborator; this component only issues the request objects and
//! consumes the results.
//!
//! Only the push path persists a `Subscription`. The daily path registers
//! with the host platform's own recurring-delivery scheduler and writes
//! nothing locally — an intentional asymmetry, do not unify.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::Store;
use crate::subscriptions::model::{TELL_LATEST_TIP_INTENT, TELL_TIP_INTENT};
use crate::turns::session::{OptInState, SessionFlags};

/// Permission request emitted to the platform consent UI, naming the
/// intent to invoke once granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionPrompt {
    pub intent: String,
}

/// Recurring-registration request emitted to the platform scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRegistration {
    pub intent: String,
    pub category: String,
    pub frequency: UpdateFrequency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateFrequency {
    Daily,
}

/// Result the platform reports back for a registration request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    Ok,
    Cancelled,
}

/// Outcome of a completed opt-in step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptInOutcome {
    Accepted,
    Declined,
}

/// Drives both opt-in flows and writes push consents to the store.
pub struct OptInFlow {
    store: Arc<dyn Store>,
}

impl OptInFlow {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Step one of the push flow: emit a permission request naming the
    /// latest-tip intent.
    pub fn request_push_permission(&self, session: &mut SessionFlags) -> PermissionPrompt {
        session.push_opt_in = OptInState::Prompted;
        debug!("Push permission requested");
        PermissionPrompt {
            intent: TELL_LATEST_TIP_INTENT.to_string(),
        }
    }

    /// Step two of the push flow: persist the subscription on an
    /// affirmative grant. A store failure is surfaced to the caller, not
    /// retried here.
    pub async fn complete_push_setup(
        &self,
        session: &mut SessionFlags,
        granted: bool,
        user_id: &str,
    ) -> Result<OptInOutcome, DatabaseError> {
        if !granted {
            session.push_opt_in = OptInState::Denied;
            debug!(user_id, "Push permission declined");
            return Ok(OptInOutcome::Declined);
        }

        let subscription = self
            .store
            .add_subscription(user_id, TELL_LATEST_TIP_INTENT, None)
            .await?;
        session.push_opt_in = OptInState::Granted;
        info!(subscription_id = %subscription.id, user_id, "Push subscription created");
        Ok(OptInOutcome::Accepted)
    }

    /// Step one of the daily flow: emit a recurring-registration request
    /// parameterized by category, fixed daily frequency.
    pub fn request_daily_update(
        &self,
        session: &mut SessionFlags,
        category: &str,
    ) -> UpdateRegistration {
        session.daily_opt_in = OptInState::Prompted;
        debug!(category, "Daily update registration requested");
        UpdateRegistration {
            intent: TELL_TIP_INTENT.to_string(),
            category: category.to_string(),
            frequency: UpdateFrequency::Daily,
        }
    }

    /// Step two of the daily flow. Registration bookkeeping is owned by
    /// the platform scheduler; nothing is persisted locally.
    pub fn complete_daily_update_setup(
        &self,
        session: &mut SessionFlags,
        status: RegistrationStatus,
    ) -> OptInOutcome {
        match status {
            RegistrationStatus::Ok => {
                session.daily_opt_in = OptInState::Granted;
                info!("Daily update registration confirmed");
                OptInOutcome::Accepted
            }
            RegistrationStatus::Cancelled => {
                session.daily_opt_in = OptInState::Denied;
                debug!("Daily update registration declined");
                OptInOutcome::Declined
            }
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LibSqlBackend;

    async fn test_flow() -> (OptInFlow, Arc<LibSqlBackend>) {
        let store = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        (OptInFlow::new(Arc::clone(&store) as Arc<dyn Store>), store)
    }

    #[tokio::test]
    async fn granted_push_setup_persists_subscription() {
        let (flow, store) = test_flow().await;
        let mut session = SessionFlags::default();

        let prompt = flow.request_push_permission(&mut session);
        assert_eq!(prompt.intent, TELL_LATEST_TIP_INTENT);
        assert_eq!(session.push_opt_in, OptInState::Prompted);

        let outcome = flow
            .complete_push_setup(&mut session, true, "user-1")
            .await
            .unwrap();
        assert_eq!(outcome, OptInOutcome::Accepted);
        assert_eq!(session.push_opt_in, OptInState::Granted);

        let subs = store
            .subscriptions_by_intent(TELL_LATEST_TIP_INTENT)
            .await
            .unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].user_id, "user-1");
        assert!(subs[0].args.is_none());
    }

    #[tokio::test]
    async fn denied_push_setup_writes_nothing() {
        let (flow, store) = test_flow().await;
        let mut session = SessionFlags::default();

        flow.request_push_permission(&mut session);
        let outcome = flow
            .complete_push_setup(&mut session, false, "user-1")
            .await
            .unwrap();
        assert_eq!(outcome, OptInOutcome::Declined);
        assert_eq!(session.push_opt_in, OptInState::Denied);

        let subs = store
            .subscriptions_by_intent(TELL_LATEST_TIP_INTENT)
            .await
            .unwrap();
        assert!(subs.is_empty());
    }

    #[tokio::test]
    async fn repeated_grants_create_duplicate_records() {
        // Current behavior: no dedup on repeat opt-ins. This test locks it
        // in so any future dedup is a deliberate change.
        let (flow, store) = test_flow().await;
        let mut session = SessionFlags::default();

        flow.complete_push_setup(&mut session, true, "user-1")
            .await
            .unwrap();
        flow.complete_push_setup(&mut session, true, "user-1")
            .await
            .unwrap();

        let subs = store
            .subscriptions_by_intent(TELL_LATEST_TIP_INTENT)
            .await
            .unwrap();
        assert_eq!(subs.len(), 2);
    }

    #[tokio::test]
    async fn daily_flow_never_touches_the_store() {
        let (flow, store) = test_flow().await;
        let mut session = SessionFlags::default();

        let registration = flow.request_daily_update(&mut session, "design");
        assert_eq!(registration.intent, TELL_TIP_INTENT);
        assert_eq!(registration.category, "design");
        assert_eq!(registration.frequency, UpdateFrequency::Daily);
        assert_eq!(session.daily_opt_in, OptInState::Prompted);

        let outcome =
            flow.complete_daily_update_setup(&mut session, RegistrationStatus::Ok);
        assert_eq!(outcome, OptInOutcome::Accepted);
        assert_eq!(session.daily_opt_in, OptInState::Granted);

        // Registration lives in the platform scheduler, not our store.
        let latest = store
            .subscriptions_by_intent(TELL_LATEST_TIP_INTENT)
            .await
            .unwrap();
        let daily = store.subscriptions_by_intent(TELL_TIP_INTENT).await.unwrap();
        assert!(latest.is_empty());
        assert!(daily.is_empty());
    }

    #[tokio::test]
    async fn cancelled_daily_registration_is_declined() {
        let (flow, _store) = test_flow().await;
        let mut session = SessionFlags::default();

        flow.request_daily_update(&mut session, "design");
        let outcome =
            flow.complete_daily_update_setup(&mut session, RegistrationStatus::Cancelled);
        assert_eq!(outcome, OptInOutcome::Declined);
        assert_eq!(session.daily_opt_in, OptInState::Denied);
    }
}
