pub mod classifier;
pub mod config;
pub mod middleware;
pub mod notifier;
pub mod openapi;
pub mod routes;
pub mod sse;
#[cfg(test)]
pub(crate) mod test_support;

use bridge_core::safety::Classifier;
use bridge_core::{Bridge, BridgeError, CallSettings, RequestContext};
use bridge_db::schema;
use bridge_db::store::DbStore;
use bridge_events::bus::EventBus;
use bridge_events::types::EventSource;
use bridge_video::backend::RoomProvider;
use bridge_video::daily::DailyProvider;
use classifier::GeminiClassifier;
use config::Config;
use middleware::correlation::CorrelationId;
use middleware::identity::Identity;
use notifier::PendingSnapshot;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to build video provider: {0}")]
    Video(#[from] bridge_video::backend::RoomError),
    #[error("failed to build classifier: {0}")]
    Classifier(#[from] bridge_core::safety::ClassifierError),
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub event_bus: EventBus,
    pub rooms: Arc<dyn RoomProvider>,
    pub classifier: Arc<dyn Classifier>,
    pub pending: watch::Receiver<PendingSnapshot>,
}

impl AppState {
    /// State plus the sending half of the pending-snapshot channel, which
    /// belongs to the notifier task.
    pub fn new(
        config: Config,
        event_bus: EventBus,
        rooms: Arc<dyn RoomProvider>,
        classifier: Arc<dyn Classifier>,
    ) -> (Self, watch::Sender<PendingSnapshot>) {
        let (sender, pending) = notifier::channel();
        let state = Self {
            config: Arc::new(config),
            event_bus,
            rooms,
            classifier,
            pending,
        };
        (state, sender)
    }
}

/// The external collaborators named by the configuration. Both clients are
/// blocking; build them off the async runtime.
pub fn build_providers(
    config: &Config,
) -> Result<(Arc<dyn RoomProvider>, Arc<dyn Classifier>), ServeError> {
    let rooms = DailyProvider::new(config.daily_api_url.clone(), config.daily_api_key.clone())?;
    if !rooms.is_configured() {
        info!("DAILY_API_KEY not set, video calls will be rejected");
    }
    let classifier =
        GeminiClassifier::new(config.gemini_api_key.clone(), config.gemini_model.clone())?;
    Ok((Arc::new(rooms), Arc::new(classifier)))
}

pub fn build_bridge(state: &AppState) -> Result<Bridge<DbStore>, BridgeError> {
    let conn = schema::open_and_migrate(&state.config.db_path).map_err(|err| {
        BridgeError::Storage {
            message: err.to_string(),
        }
    })?;
    let settings = CallSettings {
        room_ttl_secs: state.config.room_ttl_secs,
    };
    Ok(Bridge::new(DbStore::new(conn), state.event_bus.clone(), state.rooms.clone())
        .with_settings(settings))
}

/// Runs `f` against a fresh bridge on the blocking pool. The core is
/// synchronous and the providers use blocking HTTP.
pub async fn run_blocking<T, F>(state: &AppState, f: F) -> Result<T, BridgeError>
where
    F: FnOnce(&Bridge<DbStore>) -> Result<T, BridgeError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || {
        let bridge = build_bridge(&state)?;
        f(&bridge)
    })
    .await
    .map_err(|err| BridgeError::Internal {
        message: err.to_string(),
    })?
}

pub fn request_context(correlation: &CorrelationId, identity: &Identity) -> RequestContext {
    let ctx = RequestContext::new(EventSource::Ui, Some(correlation.0.clone()));
    match &identity.0 {
        Some(caller) => ctx.with_caller(caller.clone()),
        None => ctx,
    }
}

pub fn app(state: AppState) -> axum::Router {
    routes::router(state)
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "bridge api listening");
    axum::serve(listener, app(state)).await
}
