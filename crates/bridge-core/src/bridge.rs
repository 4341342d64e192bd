use crate::error::{BridgeError, ErrorKind, ProfileError};
use crate::events::EventRepository;
use crate::lifecycle::RequestsApi;
use crate::orchestrator::CallsApi;
use crate::profiles::ProfileRepository;
use crate::store::Store;
use crate::types::{Caller, EventBody, Profile, Role};
use bridge_events::bus::EventBus;
use bridge_events::types::{EventRecord, EventSource};
use bridge_video::backend::RoomProvider;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error};

pub const DEFAULT_ROOM_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub source: EventSource,
    pub correlation_id: Option<String>,
    pub caller: Option<Caller>,
    internal: bool,
}

impl RequestContext {
    pub fn new(source: EventSource, correlation_id: Option<String>) -> Self {
        Self {
            source,
            correlation_id,
            caller: None,
            internal: false,
        }
    }

    /// Context for in-process observers (the notifier). Allowed to read,
    /// never to act on behalf of a user.
    pub fn internal(source: EventSource) -> Self {
        Self {
            internal: true,
            ..Self::new(source, None)
        }
    }

    pub fn with_caller(mut self, caller: Caller) -> Self {
        self.caller = Some(caller);
        self
    }

    pub fn require_caller(&self) -> Result<&Caller, BridgeError> {
        self.caller.as_ref().ok_or(BridgeError::Unauthenticated)
    }

    pub fn require_authenticated(&self) -> Result<(), BridgeError> {
        if self.internal || self.caller.is_some() {
            Ok(())
        } else {
            Err(BridgeError::Unauthenticated)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSettings {
    pub room_ttl_secs: u64,
}

impl Default for CallSettings {
    fn default() -> Self {
        Self {
            room_ttl_secs: DEFAULT_ROOM_TTL_SECS,
        }
    }
}

pub struct Bridge<S: Store> {
    pub(crate) store: S,
    event_bus: EventBus,
    pub(crate) rooms: Arc<dyn RoomProvider>,
    pub(crate) settings: CallSettings,
}

impl<S: Store> Bridge<S> {
    pub fn new(store: S, event_bus: EventBus, rooms: Arc<dyn RoomProvider>) -> Self {
        Self {
            store,
            event_bus,
            rooms,
            settings: CallSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: CallSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn requests(&self) -> RequestsApi<'_, S> {
        RequestsApi { core: self }
    }

    pub fn calls(&self) -> CallsApi<'_, S> {
        CallsApi { core: self }
    }

    pub fn profiles(&self) -> ProfilesApi<'_, S> {
        ProfilesApi { core: self }
    }

    pub fn events(&self) -> EventsApi<'_, S> {
        EventsApi { core: self }
    }

    /// Runs `f` in one transaction, appends the events it returns in the
    /// same transaction and publishes them only after commit.
    pub(crate) fn with_events<T, F>(&self, ctx: &RequestContext, f: F) -> Result<T, BridgeError>
    where
        F: FnOnce(&S) -> Result<(T, Vec<EventBody>), BridgeError>,
    {
        let (value, records) = self.store.with_tx(|store| {
            let (value, bodies) = f(store)?;
            let mut records = Vec::new();
            for body in bodies {
                let record = build_event_record(ctx, body)?;
                let record = store.events().append(record)?;
                records.push(record);
            }
            Ok((value, records))
        })?;
        for record in records {
            let delivered = self.event_bus.publish(record);
            debug!(delivered, "change feed published");
        }
        Ok(value)
    }
}

/// Dependency failures are logged with full detail here; callers only ever
/// see the generic message.
pub(crate) fn log_failure(operation: &'static str, err: &BridgeError) {
    if err.kind() == ErrorKind::Dependency {
        error!(operation, error = %err, "dependency failure");
    } else {
        debug!(operation, error = %err, "operation rejected");
    }
}

pub struct ProfilesApi<'a, S: Store> {
    core: &'a Bridge<S>,
}

impl<'a, S: Store> ProfilesApi<'a, S> {
    /// The caller's profile, created on first sight.
    pub fn me(&self, ctx: &RequestContext) -> Result<Profile, BridgeError> {
        let caller = ctx.require_caller()?;
        self.core
            .with_events(ctx, |store| {
                let (profile, created) = store.profiles().ensure(caller, Role::Senior)?;
                let events = if created {
                    vec![EventBody::ProfileCreated {
                        profile: profile.clone(),
                    }]
                } else {
                    Vec::new()
                };
                Ok((profile, events))
            })
            .inspect_err(|err| log_failure("profile_me", err))
    }

    pub fn set_availability(
        &self,
        ctx: &RequestContext,
        available: bool,
    ) -> Result<Profile, BridgeError> {
        let caller = ctx.require_caller()?;
        self.core
            .with_events(ctx, |store| {
                let (profile, _) = store.profiles().ensure(caller, Role::Buddy)?;
                if profile.role != Role::Buddy {
                    return Err(ProfileError::InvalidInput {
                        message: "only buddies can change availability".to_string(),
                    }
                    .into());
                }
                let updated = store
                    .profiles()
                    .set_availability(&profile.id, available)?;
                Ok((
                    updated.clone(),
                    vec![EventBody::AvailabilityChanged { profile: updated }],
                ))
            })
            .inspect_err(|err| log_failure("set_availability", err))
    }

    /// Marks the calling buddy verified. Verifying twice is a no-op.
    pub fn verify(&self, ctx: &RequestContext) -> Result<Profile, BridgeError> {
        let caller = ctx.require_caller()?;
        self.core
            .with_events(ctx, |store| {
                let (profile, _) = store.profiles().ensure(caller, Role::Buddy)?;
                if profile.role != Role::Buddy {
                    return Err(ProfileError::InvalidInput {
                        message: "only buddies can be verified".to_string(),
                    }
                    .into());
                }
                match store.profiles().mark_verified(&profile.id)? {
                    Some(updated) => Ok((
                        updated.clone(),
                        vec![EventBody::BuddyVerified { profile: updated }],
                    )),
                    None => Ok((profile, Vec::new())),
                }
            })
            .inspect_err(|err| log_failure("verify_buddy", err))
    }
}

pub struct EventsApi<'a, S: Store> {
    core: &'a Bridge<S>,
}

impl<'a, S: Store> EventsApi<'a, S> {
    /// Change-feed records after `after`, oldest first. Bodies carry
    /// profile and request rows, so a caller or internal context is needed.
    pub fn list(
        &self,
        ctx: &RequestContext,
        after: Option<i64>,
        limit: Option<u32>,
    ) -> Result<Vec<EventRecord>, BridgeError> {
        ctx.require_authenticated()?;
        self.core.store.events().list(after, limit)
    }
}

fn build_event_record(ctx: &RequestContext, body: EventBody) -> Result<EventRecord, BridgeError> {
    let value = serde_json::to_value(body).map_err(|err| BridgeError::Internal {
        message: err.to_string(),
    })?;
    Ok(EventRecord {
        id: String::new(),
        seq: 0,
        at: Utc::now(),
        correlation_id: ctx.correlation_id.clone(),
        source: ctx.source,
        body: value,
    })
}
