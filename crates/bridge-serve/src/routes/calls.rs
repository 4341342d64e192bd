use crate::middleware::correlation::CorrelationId;
use crate::middleware::identity::Identity;
use crate::routes::error::{ErrorEnvelope, parse_request_id, parse_room_name, respond};
use crate::{AppState, request_context, run_blocking};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use bridge_core::types::{
    CallRoom, CallSession, CallTarget, EndCallInput, EndOutcome, HelpRequest,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/requests/{id}/call", post(accept_and_call))
        .route("/requests/{id}/room", post(get_or_create_room))
        .route("/requests/{id}/rooms", get(room_history))
        .route("/requests/{id}/end", post(end_request_call))
        .route("/rooms/{name}/end", post(end_room_call))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/requests/{id}/call",
    params(("id" = String, Path, description = "Help request ID")),
    responses(
        (status = 200, body = CallSession),
        (status = 409, body = ErrorEnvelope, description = "Someone else accepted first"),
        (status = 502, body = ErrorEnvelope, description = "Accepted, but no room; retry /room")
    )
)]
pub(crate) async fn accept_and_call(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Response {
    let ctx = request_context(&correlation, &identity);
    let result = run_blocking(&state, move |bridge| {
        let id = parse_request_id(id)?;
        bridge.calls().accept_and_create_call(&ctx, &id)
    })
    .await;
    respond(result, &correlation)
}

#[utoipa::path(
    post,
    path = "/api/requests/{id}/room",
    params(("id" = String, Path, description = "Help request ID")),
    responses(
        (status = 200, body = CallSession),
        (status = 403, body = ErrorEnvelope),
        (status = 422, body = ErrorEnvelope, description = "Call expired or ended")
    )
)]
pub(crate) async fn get_or_create_room(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Response {
    let ctx = request_context(&correlation, &identity);
    let result = run_blocking(&state, move |bridge| {
        let id = parse_request_id(id)?;
        bridge.calls().get_or_create_room(&ctx, &id)
    })
    .await;
    respond(result, &correlation)
}

#[utoipa::path(
    get,
    path = "/api/requests/{id}/rooms",
    params(("id" = String, Path, description = "Help request ID")),
    responses((status = 200, body = Vec<CallRoom>))
)]
pub(crate) async fn room_history(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Response {
    let ctx = request_context(&correlation, &identity);
    let result = run_blocking(&state, move |bridge| {
        let id = parse_request_id(id)?;
        bridge.calls().history(&ctx, &id)
    })
    .await;
    respond(result, &correlation)
}

/// A bodyless hang-up ends the call without resolving it.
fn outcome(input: Option<Json<EndCallInput>>) -> EndOutcome {
    input.map(|Json(input)| input.outcome).unwrap_or_default()
}

#[utoipa::path(
    post,
    path = "/api/requests/{id}/end",
    params(("id" = String, Path, description = "Help request ID")),
    request_body(content = EndCallInput, description = "Optional; omit to just hang up"),
    responses((status = 200, body = HelpRequest))
)]
pub(crate) async fn end_request_call(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    input: Option<Json<EndCallInput>>,
) -> Response {
    let ctx = request_context(&correlation, &identity);
    let result = run_blocking(&state, move |bridge| {
        let target = CallTarget::Request(parse_request_id(id)?);
        bridge.calls().end_call(&ctx, &target, outcome(input))
    })
    .await;
    respond(result, &correlation)
}

#[utoipa::path(
    post,
    path = "/api/rooms/{name}/end",
    params(("name" = String, Path, description = "Room name")),
    request_body(content = EndCallInput, description = "Optional; omit to just hang up"),
    responses((status = 200, body = HelpRequest))
)]
pub(crate) async fn end_room_call(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(identity): Extension<Identity>,
    Path(name): Path<String>,
    input: Option<Json<EndCallInput>>,
) -> Response {
    let ctx = request_context(&correlation, &identity);
    let result = run_blocking(&state, move |bridge| {
        let target = CallTarget::Room(parse_room_name(name)?);
        bridge.calls().end_call(&ctx, &target, outcome(input))
    })
    .await;
    respond(result, &correlation)
}
