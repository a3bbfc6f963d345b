//! Axum endpoints for the storykit webhook.
//!
//! - `POST /sms` — inbound message webhook. Answers with a TwiML reply
//!   document (`text/xml`) carrying either the updated story or the
//!   rejection text. Always 200: validation failures and store outages are
//!   domain outcomes, and the provider must always receive a well-formed
//!   reply document.
//! - `GET /sms` — status JSON with the day's story and remaining quota.
//!   Degrades to a fixed "working" body when the store is unreachable.
//! - Any other method on `/sms` — 405 with a JSON error body.
//! - `GET /health` — store connectivity probe.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use story_core::{twiml, StoryService, SubmitOutcome, GENERIC_FAILURE_REPLY};
use time::OffsetDateTime;

#[derive(Clone)]
pub struct AppState {
    pub service: StoryService,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/sms",
            get(story_status)
                .post(receive_sms)
                .fallback(method_not_allowed),
        )
        .route("/health", get(health))
}

/// Webhook form fields as the provider sends them. Both default to empty:
/// a missing `Body` is just an invalid submission, not a parse failure.
#[derive(Debug, Deserialize)]
pub struct InboundSms {
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "Body", default)]
    pub body: String,
}

async fn receive_sms(
    State(state): State<AppState>,
    Form(inbound): Form<InboundSms>,
) -> Response {
    let now = OffsetDateTime::now_utc();

    let reply = match state.service.submit(&inbound.from, &inbound.body, now).await {
        Ok(SubmitOutcome::Accepted { story }) => story,
        Ok(SubmitOutcome::Rejected(rejection)) => rejection.reply_text(),
        Err(err) => {
            tracing::error!(error = %err, sender = %inbound.from, "store failure during submission");
            GENERIC_FAILURE_REPLY.to_string()
        }
    };

    twiml_reply(&reply)
}

fn twiml_reply(text: &str) -> Response {
    (
        [(header::CONTENT_TYPE, twiml::CONTENT_TYPE)],
        twiml::MessagingResponse::with_message(text).to_xml(),
    )
        .into_response()
}

async fn story_status(State(state): State<AppState>) -> Response {
    match state.service.status(OffsetDateTime::now_utc()).await {
        Ok(status) => Json(status).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "store failure during status read");
            // Degraded read path: a fixed "working" body, never a hard 500.
            Json(json!({
                "message": "SMS endpoint working",
                "error": "story temporarily unavailable",
            }))
            .into_response()
        }
    }
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
        .into_response()
}

async fn health(State(state): State<AppState>) -> Response {
    match state.service.ping().await {
        Ok(()) => Json(json!({ "status": "ok" })).into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded" })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use story_core::{MemoryStore, StoreError, StoryStore};
    use time::{Date, Duration};
    use tower::ServiceExt;

    use super::*;

    fn app(store: Arc<dyn StoryStore>) -> Router {
        router().with_state(AppState {
            service: StoryService::with_defaults(store),
        })
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn sms_post(form: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/sms")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap()
    }

    /// Store double whose every call fails, for the degraded paths.
    struct BrokenStore;

    #[async_trait]
    impl StoryStore for BrokenStore {
        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Connection("refused".into()))
        }
        async fn get_story(&self, _: Date) -> Result<Option<String>, StoreError> {
            Err(StoreError::Connection("refused".into()))
        }
        async fn append_story(
            &self,
            _: Date,
            _: &str,
            _: Duration,
        ) -> Result<String, StoreError> {
            Err(StoreError::Connection("refused".into()))
        }
        async fn get_count(&self, _: Date) -> Result<i64, StoreError> {
            Err(StoreError::Connection("refused".into()))
        }
        async fn increment_count(&self, _: Date, _: Duration) -> Result<i64, StoreError> {
            Err(StoreError::Connection("refused".into()))
        }
        async fn get_last_submission(
            &self,
            _: &str,
        ) -> Result<Option<OffsetDateTime>, StoreError> {
            Err(StoreError::Connection("refused".into()))
        }
        async fn set_last_submission(
            &self,
            _: &str,
            _: OffsetDateTime,
            _: Duration,
        ) -> Result<(), StoreError> {
            Err(StoreError::Connection("refused".into()))
        }
    }

    #[tokio::test]
    async fn post_appends_and_replies_with_the_story() {
        let app = app(Arc::new(MemoryStore::new()));

        let response = app
            .oneshot(sms_post("From=%2B15550001111&Body=Once+upon+a+time"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/xml"
        );
        let body = body_string(response).await;
        assert!(body.contains("<Message>Once upon a time</Message>"));
    }

    #[tokio::test]
    async fn post_without_body_field_gets_the_empty_rejection() {
        let app = app(Arc::new(MemoryStore::new()));

        let response = app.oneshot(sms_post("From=%2B15550001111")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("empty"));
    }

    #[tokio::test]
    async fn second_post_from_same_sender_is_rate_limited() {
        let store = Arc::new(MemoryStore::new());

        let first = app(store.clone())
            .oneshot(sms_post("From=%2B1555&Body=Hello"))
            .await
            .unwrap();
        assert!(body_string(first).await.contains("<Message>Hello</Message>"));

        let second = app(store)
            .oneshot(sms_post("From=%2B1555&Body=world"))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        assert!(body_string(second).await.contains("Easy there"));
    }

    #[tokio::test]
    async fn status_reports_defaults_on_a_fresh_day() {
        let app = app(Arc::new(MemoryStore::new()));

        let response = app
            .oneshot(Request::builder().uri("/sms").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["messageCount"], 0);
        assert_eq!(body["messagesRemaining"], 50);
        assert!(body["story"].as_str().unwrap().contains("No story yet"));
        assert!(body["date"].as_str().unwrap().len() == 10);
    }

    #[tokio::test]
    async fn status_degrades_to_working_body_on_store_failure() {
        let app = app(Arc::new(BrokenStore));

        let response = app
            .oneshot(Request::builder().uri("/sms").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["message"], "SMS endpoint working");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn submit_degrades_to_generic_reply_on_store_failure() {
        let app = app(Arc::new(BrokenStore));

        let response = app
            .oneshot(sms_post("From=%2B1555&Body=Hello"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.starts_with("<?xml"));
        assert!(body.contains("Something went wrong"));
    }

    #[tokio::test]
    async fn other_methods_get_405_with_json_error() {
        let app = app(Arc::new(MemoryStore::new()));

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/sms")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["error"], "Method not allowed");
    }

    #[tokio::test]
    async fn health_reflects_store_connectivity() {
        let ok = app(Arc::new(MemoryStore::new()))
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);

        let degraded = app(Arc::new(BrokenStore))
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(degraded.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn reply_body_is_escaped_for_xml() {
        let app = app(Arc::new(MemoryStore::new()));

        let response = app
            .oneshot(sms_post("From=%2B1555&Body=fish+%26+chips"))
            .await
            .unwrap();

        let body = body_string(response).await;
        assert!(body.contains("fish &amp; chips"));
    }
}
