use crate::middleware::correlation::CorrelationId;
use crate::middleware::identity::Identity;
use crate::routes::error::{ErrorEnvelope, respond};
use crate::{AppState, request_context, run_blocking};
use axum::extract::State;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use bridge_core::types::{AvailabilityInput, Profile};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/profiles/me", get(me))
        .route("/profiles/me/availability", post(set_availability))
        .route("/profiles/me/verify", post(verify))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/profiles/me",
    responses((status = 200, body = Profile))
)]
pub(crate) async fn me(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(identity): Extension<Identity>,
) -> Response {
    let ctx = request_context(&correlation, &identity);
    let result = run_blocking(&state, move |bridge| bridge.profiles().me(&ctx)).await;
    respond(result, &correlation)
}

#[utoipa::path(
    post,
    path = "/api/profiles/me/availability",
    request_body = AvailabilityInput,
    responses((status = 200, body = Profile))
)]
pub(crate) async fn set_availability(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(identity): Extension<Identity>,
    Json(input): Json<AvailabilityInput>,
) -> Response {
    let ctx = request_context(&correlation, &identity);
    let result = run_blocking(&state, move |bridge| {
        bridge.profiles().set_availability(&ctx, input.available)
    })
    .await;
    respond(result, &correlation)
}

#[utoipa::path(
    post,
    path = "/api/profiles/me/verify",
    responses(
        (status = 200, body = Profile),
        (status = 400, body = ErrorEnvelope, description = "Caller is not a buddy")
    )
)]
pub(crate) async fn verify(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(identity): Extension<Identity>,
) -> Response {
    let ctx = request_context(&correlation, &identity);
    let result = run_blocking(&state, move |bridge| bridge.profiles().verify(&ctx)).await;
    respond(result, &correlation)
}
