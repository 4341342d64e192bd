use crate::{AppState, run_blocking};
use bridge_core::RequestContext;
use bridge_core::types::{EventBody, HelpRequest};
use bridge_events::types::{EventRecord, EventSource};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

/// The pending queue as buddies should currently see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PendingSnapshot {
    pub requests: Vec<HelpRequest>,
    pub at: DateTime<Utc>,
}

impl PendingSnapshot {
    pub fn empty() -> Self {
        Self {
            requests: Vec::new(),
            at: Utc::now(),
        }
    }
}

pub fn channel() -> (watch::Sender<PendingSnapshot>, watch::Receiver<PendingSnapshot>) {
    watch::channel(PendingSnapshot::empty())
}

fn touches_requests(record: &EventRecord) -> bool {
    serde_json::from_value::<EventBody>(record.body.clone())
        .map(|body| body.touches_requests())
        .unwrap_or(false)
}

/// Re-queries the pending list whenever the change feed reports a request or
/// call change. Missed events are harmless: a lagged receiver just refreshes.
pub async fn run(state: AppState, sender: watch::Sender<PendingSnapshot>) {
    let mut events = state.event_bus.subscribe();
    refresh(&state, &sender).await;
    info!("notifier started");
    loop {
        match events.recv().await {
            Ok(record) if touches_requests(&record) => refresh(&state, &sender).await,
            Ok(record) => debug!(kind = ?record.kind(), "notifier ignoring event"),
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "notifier lagged, refreshing");
                refresh(&state, &sender).await;
            }
            Err(RecvError::Closed) => break,
        }
    }
    info!("notifier stopped");
}

async fn refresh(state: &AppState, sender: &watch::Sender<PendingSnapshot>) {
    let result = run_blocking(state, |bridge| {
        bridge
            .requests()
            .list_pending(&RequestContext::internal(EventSource::Notifier))
    })
    .await;
    match result {
        Ok(requests) => {
            debug!(count = requests.len(), "pending snapshot refreshed");
            sender.send_replace(PendingSnapshot {
                requests,
                at: Utc::now(),
            });
        }
        Err(err) => warn!(error = %err, "pending snapshot refresh failed"),
    }
}
