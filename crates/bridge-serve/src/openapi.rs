use crate::notifier::PendingSnapshot;
use crate::routes::error::ErrorEnvelope;
use crate::routes::events::EventsQuery;
use crate::routes::safety::ScamCheckInput;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use bridge_core::safety::Verdict;
use bridge_core::types::{
    AvailabilityInput, CallRoom, CallRoomStatus, CallSession, CreateHelpRequestInput, EndCallInput,
    EndOutcome, HelpRequest, HelpRequestId, Profile, RecentQuery, RequestKind, RequestPriority,
    RequestStatus, Role, RoomName, RoomRef, UserId,
};
use bridge_events::types::{EventRecord, EventSource};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(title = "Bridge API", description = "Help requests and video calls between seniors and buddies"),
    paths(
        crate::routes::requests::create_request,
        crate::routes::requests::list_pending,
        crate::routes::requests::pending_stream,
        crate::routes::requests::list_recent,
        crate::routes::requests::get_request,
        crate::routes::requests::accept_request,
        crate::routes::calls::accept_and_call,
        crate::routes::calls::get_or_create_room,
        crate::routes::calls::room_history,
        crate::routes::calls::end_request_call,
        crate::routes::calls::end_room_call,
        crate::routes::profiles::me,
        crate::routes::profiles::set_availability,
        crate::routes::profiles::verify,
        crate::routes::safety::scam_check,
        crate::routes::events::list_events,
        crate::routes::events::subscribe,
        crate::routes::events::stream
    ),
    components(schemas(
        HelpRequest,
        CreateHelpRequestInput,
        RecentQuery,
        RoomRef,
        CallRoom,
        CallSession,
        EndCallInput,
        Profile,
        AvailabilityInput,
        Verdict,
        ScamCheckInput,
        PendingSnapshot,
        ErrorEnvelope,
        EventRecord,
        EventsQuery,
        HelpRequestId,
        UserId,
        RoomName,
        RequestKind,
        RequestStatus,
        RequestPriority,
        Role,
        EndOutcome,
        CallRoomStatus,
        EventSource
    ))
)]
struct ApiDoc;

pub fn generate_spec() -> String {
    ApiDoc::openapi()
        .to_pretty_json()
        .unwrap_or_else(|_| "{}".to_string())
}

pub fn router() -> Router {
    Router::new()
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(swagger_ui))
}

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

async fn swagger_ui() -> impl IntoResponse {
    Html(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>Bridge API Docs</title>
    <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
  </head>
  <body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script>
      window.ui = SwaggerUIBundle({ url: '/api/openapi.json', dom_id: '#swagger-ui' });
    </script>
  </body>
</html>
"#,
    )
}
