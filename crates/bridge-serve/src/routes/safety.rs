use crate::AppState;
use crate::middleware::correlation::CorrelationId;
use crate::routes::error::{ErrorEnvelope, invalid_input, map_error};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json, Router};
use bridge_core::BridgeError;
use bridge_core::safety::{SafetyError, Verdict, analyze_or_fallback};
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ScamCheckInput {
    pub text: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/safety/scam-check", post(scam_check))
        .with_state(state)
}

/// Never fails on classifier trouble; the verdict says whether it was
/// actually analyzed.
#[utoipa::path(
    post,
    path = "/api/safety/scam-check",
    request_body = ScamCheckInput,
    responses(
        (status = 200, body = Verdict),
        (status = 400, body = ErrorEnvelope)
    )
)]
pub(crate) async fn scam_check(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Json(input): Json<ScamCheckInput>,
) -> Response {
    let classifier = state.classifier.clone();
    let result = tokio::task::spawn_blocking(move || {
        analyze_or_fallback(classifier.as_ref(), &input.text).map_err(|err| match err {
            SafetyError::InvalidInput { message } => invalid_input(message),
        })
    })
    .await
    .map_err(|err| BridgeError::Internal {
        message: err.to_string(),
    })
    .and_then(|result| result);
    match result {
        Ok(verdict) => Json(verdict).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}
