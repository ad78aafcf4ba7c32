//! Turn handler — maps an inbound conversational turn to the tip
//! repository or the opt-in flow by intent name.
//!
//! Thin by design: NLU happened upstream (the intent arrives resolved,
//! parameters extracted), and the transport/session layer downstream
//! round-trips the session flags. One turn in, one response out.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{TipError, TurnError};
use crate::store::Store;
use crate::subscriptions::model::{TELL_LATEST_TIP_INTENT, TELL_TIP_INTENT};
use crate::subscriptions::optin::{
    OptInFlow, OptInOutcome, PermissionPrompt, RegistrationStatus, UpdateRegistration,
};
use crate::tips::model::Tip;
use crate::tips::repository::TipRepository;
use crate::turns::session::SessionFlags;

/// Intent names routed by the handler.
pub mod intent {
    pub const WELCOME: &str = "welcome";
    pub const TELL_TIP: &str = super::TELL_TIP_INTENT;
    pub const TELL_LATEST_TIP: &str = super::TELL_LATEST_TIP_INTENT;
    pub const SETUP_PUSH: &str = "setup_push";
    pub const FINISH_PUSH_SETUP: &str = "finish_push_setup";
    pub const SETUP_UPDATE: &str = "setup_update";
    pub const FINISH_UPDATE_SETUP: &str = "finish_update_setup";
}

/// One inbound turn, intent already resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    pub intent: String,
    pub user_id: String,
    /// Category parameter (`tell_tip`, `setup_update`).
    #[serde(default)]
    pub category: Option<String>,
    /// Consent result carried by `finish_push_setup`. Absent means denied.
    #[serde(default)]
    pub permission_granted: Option<bool>,
    /// Registration result carried by `finish_update_setup`. Absent means
    /// cancelled.
    #[serde(default)]
    pub registration: Option<RegistrationStatus>,
    #[serde(default)]
    pub session: SessionFlags,
}

/// A link attached to a tip response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub title: String,
    pub url: String,
}

/// Platform-level request the host must carry out between turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Directive {
    RequestPermission(PermissionPrompt),
    RegisterUpdate(UpdateRegistration),
}

/// The synchronous response to one turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    pub messages: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directive: Option<Directive>,
    /// False ends the conversation after this turn.
    pub expect_user_response: bool,
    /// Updated session flags for the host to round-trip.
    pub session: SessionFlags,
}

impl TurnResponse {
    fn closing(message: impl Into<String>, session: SessionFlags) -> Self {
        Self {
            messages: vec![message.into()],
            suggestions: Vec::new(),
            link: None,
            directive: None,
            expect_user_response: false,
            session,
        }
    }
}

const LEARN_MORE_TITLE: &str = "Learn More!";
const NO_TIPS_FALLBACK: &str = "Sorry, I don't have any tips for that right now.";
const SETUP_FAILED_FALLBACK: &str =
    "Something went wrong setting that up. Please try again later.";

/// Routes turns to the tip repository and the opt-in flow.
pub struct TurnHandler {
    tips: TipRepository,
    optin: OptInFlow,
}

impl TurnHandler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            tips: TipRepository::new(Arc::clone(&store)),
            optin: OptInFlow::new(store),
        }
    }

    /// Handle one turn. Tip-path store failures abort the turn; an opt-in
    /// store failure ends the turn with a generic failure acknowledgment
    /// instead.
    pub async fn handle(&self, request: TurnRequest) -> Result<TurnResponse, TurnError> {
        let mut session = request.session.clone();

        match request.intent.as_str() {
            intent::WELCOME => {
                let categories = self.tips.list_categories().await.map_err(store_error)?;
                // Prose skips the trailing random sentinel; the chips keep it.
                let spoken = categories[..categories.len() - 1].join(", ");
                let message = format!(
                    "Hi! Welcome to Tipcast! I can offer you tips. You can choose to \
                     hear the most recently added tip, you can pick a category from \
                     {spoken}, or I can tell you a tip from a randomly selected category."
                );
                Ok(TurnResponse {
                    messages: vec![message],
                    suggestions: categories,
                    link: None,
                    directive: None,
                    expect_user_response: true,
                    session,
                })
            }

            intent::TELL_TIP => {
                let category = request
                    .category
                    .as_deref()
                    .ok_or(TurnError::MissingParameter("category"))?;
                match self.tips.pick_by_category(category).await {
                    Ok(tip) => {
                        // Suggest the daily opt-in at most once per session.
                        let mut suggestions = Vec::new();
                        if !session.daily_notification_asked {
                            suggestions.push("Send daily".to_string());
                            session.daily_notification_asked = true;
                        }
                        Ok(tip_response(tip, suggestions, session))
                    }
                    Err(TipError::NotFound { .. }) => {
                        Ok(TurnResponse::closing(NO_TIPS_FALLBACK, session))
                    }
                    Err(TipError::Store(e)) => Err(TurnError::Store(e)),
                }
            }

            intent::TELL_LATEST_TIP => match self.tips.most_recent().await {
                Ok(tip) => {
                    let mut suggestions = Vec::new();
                    if !session.push_notification_asked {
                        suggestions.push("Alert me of new tips".to_string());
                        session.push_notification_asked = true;
                    }
                    Ok(tip_response(tip, suggestions, session))
                }
                Err(TipError::NotFound { .. }) => {
                    Ok(TurnResponse::closing(NO_TIPS_FALLBACK, session))
                }
                Err(TipError::Store(e)) => Err(TurnError::Store(e)),
            },

            intent::SETUP_PUSH => {
                let prompt = self.optin.request_push_permission(&mut session);
                Ok(TurnResponse {
                    messages: Vec::new(),
                    suggestions: Vec::new(),
                    link: None,
                    directive: Some(Directive::RequestPermission(prompt)),
                    expect_user_response: true,
                    session,
                })
            }

            intent::FINISH_PUSH_SETUP => {
                let granted = request.permission_granted.unwrap_or(false);
                match self
                    .optin
                    .complete_push_setup(&mut session, granted, &request.user_id)
                    .await
                {
                    Ok(OptInOutcome::Accepted) => {
                        Ok(TurnResponse::closing("Ok, I'll start alerting you.", session))
                    }
                    Ok(OptInOutcome::Declined) => {
                        Ok(TurnResponse::closing("Ok, I won't alert you.", session))
                    }
                    Err(e) => {
                        error!(error = %e, user_id = %request.user_id, "Push setup failed");
                        Ok(TurnResponse::closing(SETUP_FAILED_FALLBACK, session))
                    }
                }
            }

            intent::SETUP_UPDATE => {
                let category = request
                    .category
                    .as_deref()
                    .ok_or(TurnError::MissingParameter("category"))?;
                let registration = self.optin.request_daily_update(&mut session, category);
                Ok(TurnResponse {
                    messages: Vec::new(),
                    suggestions: Vec::new(),
                    link: None,
                    directive: Some(Directive::RegisterUpdate(registration)),
                    expect_user_response: true,
                    session,
                })
            }

            intent::FINISH_UPDATE_SETUP => {
                let status = request
                    .registration
                    .unwrap_or(RegistrationStatus::Cancelled);
                let outcome = self.optin.complete_daily_update_setup(&mut session, status);
                let message = match outcome {
                    OptInOutcome::Accepted => "Ok, I'll start giving you daily updates.",
                    OptInOutcome::Declined => "Ok, I won't give you daily updates.",
                };
                Ok(TurnResponse::closing(message, session))
            }

            other => Err(TurnError::UnknownIntent(other.to_string())),
        }
    }
}

fn store_error(e: TipError) -> TurnError {
    match e {
        TipError::Store(e) => TurnError::Store(e),
        // list_categories has no empty-set failure mode.
        TipError::NotFound { .. } => TurnError::Store(crate::error::DatabaseError::Query(
            "unexpected empty result".to_string(),
        )),
    }
}

fn tip_response(tip: Tip, suggestions: Vec<String>, session: SessionFlags) -> TurnResponse {
    TurnResponse {
        messages: vec![tip.text],
        suggestions,
        link: Some(Link {
            title: LEARN_MORE_TITLE.to_string(),
            url: tip.url,
        }),
        directive: None,
        expect_user_response: true,
        session,
    }
}

// ── Tests ───────────────────────────────────────────────────────────
