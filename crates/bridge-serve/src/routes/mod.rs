pub mod calls;
pub mod error;
pub mod events;
pub mod profiles;
pub mod requests;
pub mod safety;

use crate::middleware::correlation::correlation_middleware;
use crate::middleware::identity::identity_middleware;
use crate::{AppState, openapi};
use axum::Router;
use axum::middleware;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(requests::router(state.clone()))
        .merge(calls::router(state.clone()))
        .merge(profiles::router(state.clone()))
        .merge(safety::router(state.clone()))
        .merge(events::router(state))
        .merge(openapi::router())
        .route_layer(middleware::from_fn(identity_middleware))
        .route_layer(middleware::from_fn(correlation_middleware));

    Router::new()
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        user: Option<(&str, &str)>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-correlation-id", "corr-test");
        if let Some((id, role)) = user {
            builder = builder.header("x-user-id", id).header("x-user-role", role);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        assert_eq!(
            response.headers().get("x-correlation-id").unwrap(),
            "corr-test"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn anonymous_create_is_unauthenticated() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _sender) = test_state(&dir);
        let app = router(state);

        let (status, body) = call(
            &app,
            "POST",
            "/api/requests",
            None,
            Some(json!({ "kind": "sos" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "unauthenticated");
        assert_eq!(body["correlation_id"], "corr-test");
        assert_eq!(body["retryable"], false);
    }

    #[tokio::test]
    async fn only_one_buddy_gets_the_call() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _sender) = test_state(&dir);
        let app = router(state);

        let (status, created) = call(
            &app,
            "POST",
            "/api/requests",
            Some(("senior-1", "senior")),
            Some(json!({ "kind": "call" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["status"], "pending");
        let id = created["id"].as_str().unwrap().to_string();

        let (status, pending) =
            call(&app, "GET", "/api/requests/pending", Some(("buddy-1", "buddy")), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pending.as_array().unwrap().len(), 1);

        let (status, session) = call(
            &app,
            "POST",
            &format!("/api/requests/{id}/call"),
            Some(("buddy-1", "buddy")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session["request"]["status"], "in_call");
        assert_eq!(session["request"]["assignee_id"], "buddy-1");
        assert!(session["room"]["join_url"].as_str().unwrap().starts_with("https://"));

        let (status, body) = call(
            &app,
            "POST",
            &format!("/api/requests/{id}/accept"),
            Some(("buddy-2", "buddy")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "already_taken");

        let (status, body) = call(
            &app,
            "POST",
            &format!("/api/requests/{id}/room"),
            Some(("buddy-2", "buddy")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "not_participant");

        let (status, rooms) = call(
            &app,
            "GET",
            &format!("/api/requests/{id}/rooms"),
            Some(("senior-1", "senior")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(rooms.as_array().unwrap().len(), 1);

        let (status, ended) = call(
            &app,
            "POST",
            &format!("/api/requests/{id}/end"),
            Some(("buddy-1", "buddy")),
            Some(json!({ "outcome": "resolved" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ended["status"], "resolved");
        assert!(ended["room"].is_null());
    }

    #[tokio::test]
    async fn hanging_up_needs_no_body() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _sender) = test_state(&dir);
        let app = router(state);

        let (_, created) = call(
            &app,
            "POST",
            "/api/requests",
            Some(("senior-1", "senior")),
            Some(json!({ "kind": "call" })),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();
        let (_, session) = call(
            &app,
            "POST",
            &format!("/api/requests/{id}/call"),
            Some(("buddy-1", "buddy")),
            None,
        )
        .await;
        let room = session["room"]["name"].as_str().unwrap().to_string();

        let (status, ended) = call(
            &app,
            "POST",
            &format!("/api/rooms/{room}/end"),
            Some(("senior-1", "senior")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ended["status"], "ended");
    }

    #[tokio::test]
    async fn requester_resolve_only_ends_the_call() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _sender) = test_state(&dir);
        let app = router(state);

        let (_, created) = call(
            &app,
            "POST",
            "/api/requests",
            Some(("senior-1", "senior")),
            Some(json!({ "kind": "call" })),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();
        call(
            &app,
            "POST",
            &format!("/api/requests/{id}/call"),
            Some(("buddy-1", "buddy")),
            None,
        )
        .await;

        let (status, ended) = call(
            &app,
            "POST",
            &format!("/api/requests/{id}/end"),
            Some(("senior-1", "senior")),
            Some(json!({ "outcome": "resolved" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ended["status"], "ended");
    }

    #[tokio::test]
    async fn change_feed_requires_a_caller() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _sender) = test_state(&dir);
        let app = router(state);

        call(
            &app,
            "POST",
            "/api/requests",
            Some(("senior-1", "senior")),
            Some(json!({ "kind": "sos" })),
        )
        .await;

        for uri in ["/api/events", "/api/events/subscribe"] {
            let (status, body) = call(&app, "GET", uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(body["code"], "unauthenticated");
            assert!(!body.to_string().contains("senior-1"));
        }

        let (status, events) =
            call(&app, "GET", "/api/events", Some(("buddy-1", "buddy")), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(events.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn malformed_ids_are_bad_requests() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _sender) = test_state(&dir);
        let app = router(state);

        let (status, body) =
            call(&app, "GET", "/api/requests/not-a-ulid", Some(("buddy-1", "buddy")), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_input");
    }

    #[tokio::test]
    async fn scam_check_falls_back_instead_of_failing() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _sender) = test_state(&dir);
        let app = router(state);

        let (status, verdict) = call(
            &app,
            "POST",
            "/api/safety/scam-check",
            None,
            Some(json!({ "text": "Share your OTP to claim the prize" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(verdict["is_danger"], true);
        assert_eq!(verdict["analyzed"], true);

        let (status, verdict) = call(
            &app,
            "POST",
            "/api/safety/scam-check",
            None,
            Some(json!({ "text": "the classifier is offline" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(verdict["analyzed"], false);

        let (status, body) = call(
            &app,
            "POST",
            "/api/safety/scam-check",
            None,
            Some(json!({ "text": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_input");
    }

    #[tokio::test]
    async fn availability_is_for_buddies() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _sender) = test_state(&dir);
        let app = router(state);

        let (status, profile) = call(
            &app,
            "POST",
            "/api/profiles/me/availability",
            Some(("buddy-1", "buddy")),
            Some(json!({ "available": false })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["is_available"], false);
        assert_eq!(profile["role"], "buddy");

        let (status, _) = call(
            &app,
            "POST",
            "/api/profiles/me/availability",
            Some(("senior-1", "senior")),
            Some(json!({ "available": true })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, profile) = call(
            &app,
            "POST",
            "/api/profiles/me/verify",
            Some(("buddy-1", "buddy")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["is_verified"], true);
    }
}
