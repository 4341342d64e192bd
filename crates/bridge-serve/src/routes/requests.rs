use crate::middleware::correlation::CorrelationId;
use crate::middleware::identity::Identity;
use crate::routes::error::{ErrorEnvelope, parse_request_id, respond};
use crate::{AppState, request_context, run_blocking};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use bridge_core::error::HelpError;
use bridge_core::types::{CreateHelpRequestInput, HelpRequest, RecentQuery};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/requests", post(create_request))
        .route("/requests/pending", get(list_pending))
        .route("/requests/pending/stream", get(pending_stream))
        .route("/requests/recent", get(list_recent))
        .route("/requests/{id}", get(get_request))
        .route("/requests/{id}/accept", post(accept_request))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/requests",
    request_body = CreateHelpRequestInput,
    responses(
        (status = 200, body = HelpRequest),
        (status = 401, body = ErrorEnvelope)
    )
)]
pub(crate) async fn create_request(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(identity): Extension<Identity>,
    Json(input): Json<CreateHelpRequestInput>,
) -> Response {
    let ctx = request_context(&correlation, &identity);
    let result = run_blocking(&state, move |bridge| bridge.requests().create(&ctx, input)).await;
    respond(result, &correlation)
}

#[utoipa::path(
    get,
    path = "/api/requests/pending",
    responses((status = 200, body = Vec<HelpRequest>))
)]
pub(crate) async fn list_pending(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(identity): Extension<Identity>,
) -> Response {
    let ctx = request_context(&correlation, &identity);
    let result = run_blocking(&state, move |bridge| bridge.requests().list_pending(&ctx)).await;
    respond(result, &correlation)
}

#[utoipa::path(
    get,
    path = "/api/requests/pending/stream",
    responses((status = 200, description = "SSE stream of pending snapshots"))
)]
pub(crate) async fn pending_stream(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(identity): Extension<Identity>,
) -> Response {
    let ctx = request_context(&correlation, &identity);
    crate::sse::pending(state, ctx, correlation)
}

#[utoipa::path(
    get,
    path = "/api/requests/recent",
    params(RecentQuery),
    responses((status = 200, body = Vec<HelpRequest>))
)]
pub(crate) async fn list_recent(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<RecentQuery>,
) -> Response {
    let ctx = request_context(&correlation, &identity);
    let result = run_blocking(&state, move |bridge| {
        bridge.requests().list_recent(&ctx, query.limit)
    })
    .await;
    respond(result, &correlation)
}

#[utoipa::path(
    get,
    path = "/api/requests/{id}",
    params(("id" = String, Path, description = "Help request ID")),
    responses(
        (status = 200, body = HelpRequest),
        (status = 404, body = ErrorEnvelope)
    )
)]
pub(crate) async fn get_request(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Response {
    let ctx = request_context(&correlation, &identity);
    let result = run_blocking(&state, move |bridge| {
        let id = parse_request_id(id)?;
        bridge
            .requests()
            .get(&ctx, &id)?
            .ok_or_else(|| HelpError::NotFound.into())
    })
    .await;
    respond(result, &correlation)
}

#[utoipa::path(
    post,
    path = "/api/requests/{id}/accept",
    params(("id" = String, Path, description = "Help request ID")),
    responses(
        (status = 200, body = HelpRequest),
        (status = 409, body = ErrorEnvelope, description = "Someone else accepted first")
    )
)]
pub(crate) async fn accept_request(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Response {
    let ctx = request_context(&correlation, &identity);
    let result = run_blocking(&state, move |bridge| {
        let id = parse_request_id(id)?;
        bridge.requests().accept(&ctx, &id)
    })
    .await;
    respond(result, &correlation)
}
