#![allow(dead_code)]

use bridge_core::types::{Caller, Role, UserId};
use bridge_core::{Bridge, RequestContext};
use bridge_db::schema;
use bridge_db::store::DbStore;
use bridge_events::bus::EventBus;
use bridge_events::types::EventSource;
use bridge_video::backend::{DeleteOutcome, ProvisionedRoom, RoomConfig, RoomError, RoomProvider};
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory stand-in for the video provider.
#[derive(Default)]
pub struct FakeRooms {
    fail_create: AtomicBool,
    fail_delete: AtomicBool,
    already_expired: AtomicBool,
    counter: AtomicUsize,
    pub created: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
}

impl FakeRooms {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Rooms handed out from now on expire in the past.
    pub fn hand_out_expired(&self, expired: bool) {
        self.already_expired.store(expired, Ordering::SeqCst);
    }

    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

impl RoomProvider for FakeRooms {
    fn create_room(&self, config: &RoomConfig) -> Result<ProvisionedRoom, RoomError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(RoomError::Transport {
                reason: "connection reset".to_string(),
            });
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        self.created.lock().unwrap().push(config.name.clone());
        let expires_at = if self.already_expired.load(Ordering::SeqCst) {
            Utc::now() - Duration::seconds(5)
        } else {
            config.expires_at(Utc::now())?
        };
        Ok(ProvisionedRoom {
            id: format!("room-{n}"),
            name: config.name.clone(),
            join_url: format!("https://bridge.daily.co/{}", config.name),
            expires_at,
        })
    }

    fn delete_room(&self, name: &str) -> Result<DeleteOutcome, RoomError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(RoomError::Rejected {
                status: 500,
                reason: "internal".to_string(),
            });
        }
        self.deleted.lock().unwrap().push(name.to_string());
        Ok(DeleteOutcome::Deleted)
    }
}

pub fn memory_bridge(rooms: Arc<FakeRooms>) -> Bridge<DbStore> {
    memory_bridge_on(rooms, EventBus::new(64))
}

pub fn memory_bridge_on(rooms: Arc<FakeRooms>, bus: EventBus) -> Bridge<DbStore> {
    let conn = schema::with_test_db().unwrap();
    Bridge::new(DbStore::new(conn), bus, rooms)
}

pub fn file_bridge(path: &str, rooms: Arc<FakeRooms>, bus: EventBus) -> Bridge<DbStore> {
    let conn = schema::open_and_migrate(path).unwrap();
    Bridge::new(DbStore::new(conn), bus, rooms)
}

pub fn senior(id: &str) -> RequestContext {
    as_user(id, Role::Senior)
}

pub fn buddy(id: &str) -> RequestContext {
    as_user(id, Role::Buddy)
}

fn as_user(id: &str, role: Role) -> RequestContext {
    let caller = Caller::new(UserId::new(id.to_string()).unwrap())
        .with_role(role)
        .with_email(format!("{id}@example.com"));
    RequestContext::new(EventSource::Ui, Some(format!("corr-{id}"))).with_caller(caller)
}

pub fn anonymous() -> RequestContext {
    RequestContext::new(EventSource::Ui, None)
}
