//! HTTP surface — fulfillment webhook and the tip-creation event hook.
//!
//! Thin: no session management here. The fulfillment route is one
//! request/response turn; the event route runs one dispatch invocation to
//! completion and reports the delivery tally.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::dispatch::{DispatchSummary, NotificationDispatcher};
use crate::error::{DispatchError, TurnError};
use crate::tips::model::Tip;
use crate::turns::{TurnHandler, TurnRequest, TurnResponse};

/// Shared handles, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub turns: Arc<TurnHandler>,
    pub dispatcher: Arc<NotificationDispatcher>,
}

/// Build the service router.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/fulfillment", post(fulfillment))
        .route("/events/tip-created", post(tip_created))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn fulfillment(
    State(state): State<AppState>,
    Json(request): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, (StatusCode, String)> {
    match state.turns.handle(request).await {
        Ok(response) => Ok(Json(response)),
        Err(e @ (TurnError::UnknownIntent(_) | TurnError::MissingParameter(_))) => {
            Err((StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(e) => {
            error!(error = %e, "Turn aborted");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

async fn tip_created(
    State(state): State<AppState>,
    Json(tip): Json<Tip>,
) -> Result<Json<DispatchSummary>, (StatusCode, String)> {
    match state.dispatcher.dispatch(&tip).await {
        Ok(summary) => Ok(Json(summary)),
        Err(e @ DispatchError::CredentialExchange(_)) => {
            error!(error = %e, tip_id = %tip.id, "Dispatch aborted");
            Err((StatusCode::BAD_GATEWAY, e.to_string()))
        }
        Err(e) => {
            error!(error = %e, tip_id = %tip.id, "Dispatch aborted");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::dispatch::{AccessToken, DispatchConfig, TokenSource};
    use crate::store::{LibSqlBackend, Store};
    use crate::tips::model::NewTip;

    struct FailingTokens;

    #[async_trait]
    impl TokenSource for FailingTokens {
        async fn fetch_token(&self) -> Result<AccessToken, DispatchError> {
            Err(DispatchError::CredentialExchange("stub outage".into()))
        }
    }

    async fn test_app() -> Router {
        let store = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        store
            .insert_tip(&NewTip {
                text: "use traits at the seams".into(),
                url: "https://example.com/design".into(),
                category: "design".into(),
            })
            .await
            .unwrap();

        let state = AppState {
            turns: Arc::new(TurnHandler::new(Arc::clone(&store) as Arc<dyn Store>)),
            dispatcher: Arc::new(NotificationDispatcher::new(
                store,
                Arc::new(FailingTokens),
                reqwest::Client::new(),
                DispatchConfig::default(),
            )),
        };
        app_router(state)
    }

    fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_responds() {
        let app = test_app().await;
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn fulfillment_serves_a_turn() {
        let app = test_app().await;
        let response = app
            .oneshot(json_request(
                "/fulfillment",
                serde_json::json!({
                    "intent": "tell_tip",
                    "user_id": "user-1",
                    "category": "design",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["messages"][0], "use traits at the seams");
        assert_eq!(body["link"]["url"], "https://example.com/design");
    }

    #[tokio::test]
    async fn unknown_intent_is_bad_request() {
        let app = test_app().await;
        let response = app
            .oneshot(json_request(
                "/fulfillment",
                serde_json::json!({"intent": "order_pizza", "user_id": "user-1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn credential_failure_maps_to_bad_gateway() {
        let app = test_app().await;
        let response = app
            .oneshot(json_request(
                "/events/tip-created",
                serde_json::json!({
                    "id": uuid::Uuid::new_v4(),
                    "text": "tip",
                    "url": "https://example.com",
                    "category": "design",
                    "created_at": chrono::Utc::now(),
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
