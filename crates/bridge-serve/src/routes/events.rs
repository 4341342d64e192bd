use crate::middleware::correlation::CorrelationId;
use crate::middleware::identity::Identity;
use crate::routes::error::{ErrorEnvelope, map_error, respond};
use crate::{AppState, request_context, run_blocking};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Router};
use bridge_events::types::EventRecord;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, serde::Deserialize, ToSchema, IntoParams)]
pub struct EventsQuery {
    after: Option<i64>,
    limit: Option<u32>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/events", get(list_events))
        .route("/events/subscribe", get(subscribe))
        .route("/events/stream", get(stream))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/events",
    params(EventsQuery),
    responses(
        (status = 200, body = Vec<EventRecord>),
        (status = 401, body = ErrorEnvelope)
    )
)]
pub(crate) async fn list_events(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<EventsQuery>,
) -> Response {
    let ctx = request_context(&correlation, &identity);
    let result = run_blocking(&state, move |bridge| {
        bridge.events().list(&ctx, query.after, query.limit)
    })
    .await;
    respond(result, &correlation)
}

#[utoipa::path(
    get,
    path = "/api/events/subscribe",
    params(EventsQuery),
    responses(
        (status = 200, description = "SSE stream of change-feed records"),
        (status = 401, body = ErrorEnvelope)
    )
)]
pub(crate) async fn subscribe(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<EventsQuery>,
) -> Response {
    let ctx = request_context(&correlation, &identity);
    crate::sse::subscribe(state, ctx, query.after, correlation).await
}

#[utoipa::path(
    get,
    path = "/api/events/stream",
    responses(
        (status = 101, description = "WebSocket of live change-feed records"),
        (status = 401, body = ErrorEnvelope)
    )
)]
pub(crate) async fn stream(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(identity): Extension<Identity>,
) -> Response {
    let ctx = request_context(&correlation, &identity);
    if let Err(err) = ctx.require_authenticated() {
        return map_error(&err, Some(correlation.0)).into_response();
    }
    ws.on_upgrade(move |socket| handle_stream(socket, state))
}

async fn handle_stream(mut socket: WebSocket, state: AppState) {
    let mut receiver = state.event_bus.subscribe();
    loop {
        let event = match receiver.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "websocket subscriber lagged");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        let Ok(json) = serde_json::to_string(&event) else {
            continue;
        };
        if socket.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }
}
