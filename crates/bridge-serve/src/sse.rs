use crate::middleware::correlation::CorrelationId;
use crate::routes::error::map_error;
use crate::{AppState, run_blocking};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use bridge_core::RequestContext;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};

fn json_event<T: Serialize>(value: &T) -> Event {
    let json = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
    Event::default().data(json)
}

/// Stored history after `after`, then live records. Lagged records are
/// dropped; clients recover by reconnecting with their last seq.
pub async fn subscribe(
    state: AppState,
    ctx: RequestContext,
    after: Option<i64>,
    correlation: CorrelationId,
) -> Response {
    if let Err(err) = ctx.require_authenticated() {
        return map_error(&err, Some(correlation.0)).into_response();
    }
    // Subscribe before reading history so nothing falls in the gap.
    let live = BroadcastStream::new(state.event_bus.subscribe());
    let listed = run_blocking(&state, move |bridge| bridge.events().list(&ctx, after, None)).await;
    let history = match listed {
        Ok(events) => events,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    let last_seq = history.last().map(|event| event.seq).or(after).unwrap_or(0);

    let history_stream =
        stream::iter(history.into_iter().map(|event| Ok::<Event, Infallible>(json_event(&event))));
    let live_stream = live.filter_map(move |item| async move {
        match item {
            Ok(event) if event.seq > last_seq => Some(Ok(json_event(&event))),
            _ => None,
        }
    });

    Sse::new(history_stream.chain(live_stream))
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// The current pending snapshot immediately, then every replacement the
/// notifier publishes. Intermediate snapshots may be skipped.
pub fn pending(state: AppState, ctx: RequestContext, correlation: CorrelationId) -> Response {
    if let Err(err) = ctx.require_authenticated() {
        return map_error(&err, Some(correlation.0)).into_response();
    }
    let snapshots = WatchStream::new(state.pending.clone())
        .map(|snapshot| Ok::<Event, Infallible>(json_event(&snapshot).event("pending")));
    Sse::new(snapshots)
        .keep_alive(KeepAlive::default())
        .into_response()
}
