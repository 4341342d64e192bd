use crate::AppState;
use crate::config::Config;
use crate::notifier::PendingSnapshot;
use bridge_core::RequestContext;
use bridge_core::safety::{Classifier, ClassifierError, Verdict};
use bridge_core::types::{Caller, Role, UserId};
use bridge_events::bus::EventBus;
use bridge_events::types::EventSource;
use bridge_video::backend::{DeleteOutcome, ProvisionedRoom, RoomConfig, RoomError, RoomProvider};
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tokio::sync::watch;

#[derive(Default)]
pub struct StaticRooms {
    counter: AtomicUsize,
}

impl RoomProvider for StaticRooms {
    fn create_room(&self, config: &RoomConfig) -> Result<ProvisionedRoom, RoomError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(ProvisionedRoom {
            id: format!("room-{n}"),
            name: config.name.clone(),
            join_url: format!("https://bridge.daily.co/{}", config.name),
            expires_at: config.expires_at(Utc::now())?,
        })
    }

    fn delete_room(&self, _name: &str) -> Result<DeleteOutcome, RoomError> {
        Ok(DeleteOutcome::Deleted)
    }
}

/// Flags anything mentioning an OTP; fails on "offline" to exercise the
/// fallback.
pub struct KeywordClassifier;

impl Classifier for KeywordClassifier {
    fn analyze(&self, text: &str) -> Result<Verdict, ClassifierError> {
        if text.contains("offline") {
            return Err(ClassifierError::Unavailable {
                reason: "test".to_string(),
            });
        }
        Ok(Verdict {
            is_danger: text.contains("OTP"),
            reason_english: "checked".to_string(),
            reason_local: "சரிபார்க்கப்பட்டது".to_string(),
            analyzed: true,
        })
    }
}

pub fn test_state(dir: &TempDir) -> (AppState, watch::Sender<PendingSnapshot>) {
    let config = Config {
        db_path: dir.path().join("bridge.db").to_string_lossy().into_owned(),
        ..Config::default()
    };
    AppState::new(
        config,
        EventBus::new(64),
        Arc::new(StaticRooms::default()),
        Arc::new(KeywordClassifier),
    )
}

pub fn senior_ctx(id: &str) -> RequestContext {
    RequestContext::new(EventSource::Ui, None).with_caller(
        Caller::new(UserId::new(id.to_string()).unwrap()).with_role(Role::Senior),
    )
}
