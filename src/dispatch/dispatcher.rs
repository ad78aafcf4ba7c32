//! Notification dispatcher — fan-out to every push subscriber.
//!
//! Triggered by a tip-creation event. Authenticates once, reads the
//! subscriber set, then issues every delivery as its own spawned task:
//! no delivery waits on, orders against, or cancels another. The join at
//! the end exists for telemetry only. At-most-once, best-effort, no
//! retry — a failed delivery is lost for this invocation.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dispatch::credentials::{AccessToken, TokenSource};
use crate::error::DispatchError;
use crate::store::Store;
use crate::subscriptions::model::{Subscription, TELL_LATEST_TIP_INTENT};
use crate::tips::model::Tip;

/// Default production push-delivery endpoint.
pub const DEFAULT_PUSH_ENDPOINT: &str = "https://actions.googleapis.com/v2/conversations:send";

/// Dispatcher settings.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Push-delivery endpoint URL.
    pub push_endpoint: String,
    /// Fixed notification title.
    pub title: String,
    /// Whether deliveries are flagged as sandbox traffic.
    pub sandbox: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            push_endpoint: DEFAULT_PUSH_ENDPOINT.to_string(),
            title: "Tipcast latest tip".to_string(),
            sandbox: true,
        }
    }
}

/// Per-invocation delivery tally. `failed` deliveries are logged, never
/// raised to the invocation's result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

// Wire shape of the push-delivery request body.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PushRequest {
    custom_push_message: CustomPushMessage,
    is_in_sandbox: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CustomPushMessage {
    user_notification: UserNotification,
    target: PushTarget,
}

#[derive(Debug, Serialize)]
struct UserNotification {
    title: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PushTarget {
    user_id: String,
    intent: String,
}

/// Fans out a notification to every latest-tip subscriber.
pub struct NotificationDispatcher {
    store: Arc<dyn Store>,
    tokens: Arc<dyn TokenSource>,
    client: reqwest::Client,
    config: DispatchConfig,
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<dyn Store>,
        tokens: Arc<dyn TokenSource>,
        client: reqwest::Client,
        config: DispatchConfig,
    ) -> Self {
        Self {
            store,
            tokens,
            client,
            config,
        }
    }

    /// Run one dispatch invocation for a newly created tip.
    ///
    /// The credential exchange is the only hard prerequisite: if it fails,
    /// the invocation aborts with zero deliveries attempted. Store
    /// failures reading the subscriber set likewise abort. Individual
    /// delivery failures only show up in the summary.
    pub async fn dispatch(&self, tip: &Tip) -> Result<DispatchSummary, DispatchError> {
        // Shared by every delivery task; the exchange happens exactly once.
        let token = Arc::new(self.tokens.fetch_token().await?);

        let subscriptions = self
            .store
            .subscriptions_by_intent(TELL_LATEST_TIP_INTENT)
            .await?;

        info!(
            tip_id = %tip.id,
            subscribers = subscriptions.len(),
            "Dispatching new-tip notification"
        );

        let mut handles = Vec::with_capacity(subscriptions.len());
        for subscription in subscriptions {
            let client = self.client.clone();
            let token = Arc::clone(&token);
            let endpoint = self.config.push_endpoint.clone();
            let title = self.config.title.clone();
            let sandbox = self.config.sandbox;
            handles.push(tokio::spawn(async move {
                send_push(&client, &endpoint, &token, title, sandbox, subscription).await
            }));
        }

        let mut summary = DispatchSummary {
            attempted: handles.len(),
            ..Default::default()
        };
        for joined in join_all(handles).await {
            match joined {
                Ok(Ok(())) => summary.delivered += 1,
                Ok(Err(e)) => {
                    warn!(error = %e, "Push delivery failed");
                    summary.failed += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Push delivery task panicked");
                    summary.failed += 1;
                }
            }
        }

        info!(
            attempted = summary.attempted,
            delivered = summary.delivered,
            failed = summary.failed,
            "Dispatch complete"
        );
        Ok(summary)
    }
}

/// Issue one push request for one subscriber.
async fn send_push(
    client: &reqwest::Client,
    endpoint: &str,
    token: &AccessToken,
    title: String,
    sandbox: bool,
    subscription: Subscription,
) -> Result<(), DispatchError> {
    let user_id = subscription.user_id;
    let body = PushRequest {
        custom_push_message: CustomPushMessage {
            user_notification: UserNotification { title },
            target: PushTarget {
                user_id: user_id.clone(),
                intent: subscription.intent,
            },
        },
        is_in_sandbox: sandbox,
    };

    let response = client
        .post(endpoint)
        .bearer_auth(token.bearer())
        .json(&body)
        .send()
        .await
        .map_err(|e| DispatchError::Delivery {
            user_id: user_id.clone(),
            reason: e.to_string(),
        })?;

    let status = response.status();
    let response_body = response.text().await.unwrap_or_default();
    if status.is_success() {
        debug!(user_id, %status, body = %response_body, "Push delivered");
        Ok(())
    } else {
        Err(DispatchError::Delivery {
            user_id,
            reason: format!("{status}: {response_body}"),
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::store::LibSqlBackend;

    struct StubTokens {
        fail: bool,
    }

    #[async_trait]
    impl TokenSource for StubTokens {
        async fn fetch_token(&self) -> Result<AccessToken, DispatchError> {
            if self.fail {
                Err(DispatchError::CredentialExchange("stub outage".into()))
            } else {
                Ok(AccessToken::new("stub-token"))
            }
        }
    }

    fn sample_tip() -> Tip {
        Tip {
            id: Uuid::new_v4(),
            text: "tip".into(),
            url: "https://example.com".into(),
            category: "design".into(),
            created_at: Utc::now(),
        }
    }

    async fn dispatcher(fail_tokens: bool, subscribers: usize) -> NotificationDispatcher {
        let store = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        for i in 0..subscribers {
            store
                .add_subscription(&format!("user-{i}"), TELL_LATEST_TIP_INTENT, None)
                .await
                .unwrap();
        }
        NotificationDispatcher::new(
            store,
            Arc::new(StubTokens { fail: fail_tokens }),
            reqwest::Client::new(),
            DispatchConfig {
                // Unroutable: any attempted delivery would fail loudly,
                // and these tests must not reach it at all.
                push_endpoint: "http://127.0.0.1:1/send".to_string(),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn credential_failure_aborts_before_any_delivery() {
        let dispatcher = dispatcher(true, 3).await;
        let err = dispatcher.dispatch(&sample_tip()).await.unwrap_err();
        assert!(matches!(err, DispatchError::CredentialExchange(_)));
    }

    #[tokio::test]
    async fn empty_subscriber_set_dispatches_nothing() {
        let dispatcher = dispatcher(false, 0).await;
        let summary = dispatcher.dispatch(&sample_tip()).await.unwrap();
        assert_eq!(summary, DispatchSummary::default());
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_per_subscriber_not_fatally() {
        let dispatcher = dispatcher(false, 2).await;
        let summary = dispatcher.dispatch(&sample_tip()).await.unwrap();
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.delivered, 0);
        assert_eq!(summary.failed, 2);
    }
}
