use crate::bridge::{Bridge, RequestContext, log_failure};
use crate::calls::CallRoomRepository;
use crate::error::{BridgeError, CallError, HelpError, RoomError};
use crate::requests::HelpRequestRepository;
use crate::store::Store;
use crate::types::{
    CallRoom, CallRoomStatus, CallSession, CallTarget, EndOutcome, EventBody, HelpRequest,
    HelpRequestId, RequestStatus, RoomName, UserId,
};
use crate::validation::validate_status_transition;
use bridge_video::backend::{DeleteOutcome, RoomConfig};
use chrono::Utc;
use tracing::{debug, error, info, warn};

/// Couples an accepted request to the lifetime of its video room.
pub struct CallsApi<'a, S: Store> {
    pub(crate) core: &'a Bridge<S>,
}

impl<'a, S: Store> CallsApi<'a, S> {
    /// Accepts the request for the caller and opens its room.
    ///
    /// A caller who already holds the request (an earlier attempt accepted
    /// but failed to provision) goes straight to room creation; accept is
    /// never run twice for the same assignee.
    pub fn accept_and_create_call(
        &self,
        ctx: &RequestContext,
        id: &HelpRequestId,
    ) -> Result<CallSession, BridgeError> {
        let caller = ctx.require_caller()?;
        if let Err(err) = self.core.requests().accept(ctx, id) {
            let BridgeError::Help(help_err) = err else {
                return Err(err);
            };
            let resumable = matches!(help_err, HelpError::AlreadyTaken)
                && self.is_held_by(id, &caller.user_id)?;
            if !resumable {
                return Err(CallError::Accept(help_err).into());
            }
            debug!(request_id = %id, "request already held by caller, resuming room setup");
        }
        self.get_or_create_room(ctx, id)
    }

    /// Returns the live room for the request, provisioning one if the
    /// request is accepted but has none. Safe to call repeatedly (page
    /// reloads, retries after a provider failure).
    pub fn get_or_create_room(
        &self,
        ctx: &RequestContext,
        id: &HelpRequestId,
    ) -> Result<CallSession, BridgeError> {
        let caller = ctx.require_caller()?;
        let request = self.load(id)?;
        if !request.is_participant(&caller.user_id) {
            return Err(CallError::NotParticipant.into());
        }
        match request.status {
            RequestStatus::InCall => existing_session(request),
            RequestStatus::Accepted => self
                .provision(ctx, request)
                .inspect_err(|err| log_failure("create_room", err)),
            RequestStatus::Pending => Err(CallError::Request(HelpError::InvalidTransition {
                from: RequestStatus::Pending,
                to: RequestStatus::InCall,
            })
            .into()),
            RequestStatus::Resolved | RequestStatus::Ended => Err(CallError::CallEnded.into()),
        }
    }

    /// Tears the room down and closes the request. Ending an already closed
    /// request returns it unchanged, since both parties hanging up is the
    /// normal case.
    pub fn end_call(
        &self,
        ctx: &RequestContext,
        target: &CallTarget,
        outcome: EndOutcome,
    ) -> Result<HelpRequest, BridgeError> {
        let caller = ctx.require_caller()?;
        let request = match target {
            CallTarget::Request(id) => self.load(id)?,
            CallTarget::Room(name) => {
                let room = self
                    .core
                    .store
                    .calls()
                    .get(name)?
                    .ok_or(CallError::RoomNotFound)?;
                self.load(&room.request_id)?
            }
        };
        if !request.is_participant(&caller.user_id) {
            return Err(CallError::NotParticipant.into());
        }
        if request.status.is_terminal() {
            debug!(request_id = %request.id, status = ?request.status, "call already closed");
            return Ok(request);
        }
        // Only the helper can mark the problem solved; the requester hangs up.
        let outcome = match outcome {
            EndOutcome::Resolved if request.assignee_id.as_ref() != Some(&caller.user_id) => {
                debug!(request_id = %request.id, "requester cannot resolve, ending instead");
                EndOutcome::Ended
            }
            outcome => outcome,
        };
        validate_status_transition(request.status, outcome.status())?;

        if let Some(room) = &request.room {
            self.discard_room(&room.name);
        }

        let now = Utc::now();
        let at = request.accepted_at.map_or(now, |accepted| accepted.max(now));
        let closed = self
            .core
            .with_events(ctx, |store| {
                let Some(updated) = store.requests().close(&request.id, outcome, at)? else {
                    return Ok((None, Vec::new()));
                };
                if let Some(room) = &request.room {
                    store.calls().mark_ended(&room.name, at)?;
                }
                Ok((
                    Some(updated.clone()),
                    vec![EventBody::CallEnded {
                        request: updated,
                        outcome,
                    }],
                ))
            })
            .inspect_err(|err| log_failure("end_call", err))?;

        match closed {
            Some(updated) => {
                info!(request_id = %updated.id, status = ?updated.status, "call ended");
                Ok(updated)
            }
            None => {
                let current = self.load(&request.id)?;
                if current.status.is_terminal() {
                    Ok(current)
                } else {
                    Err(HelpError::InvalidTransition {
                        from: current.status,
                        to: outcome.status(),
                    }
                    .into())
                }
            }
        }
    }

    /// Rooms opened for the request, newest first. Participants only.
    pub fn history(
        &self,
        ctx: &RequestContext,
        id: &HelpRequestId,
    ) -> Result<Vec<CallRoom>, BridgeError> {
        let caller = ctx.require_caller()?;
        let request = self.load(id)?;
        if !request.is_participant(&caller.user_id) {
            return Err(CallError::NotParticipant.into());
        }
        Ok(self.core.store.calls().list_for_request(id)?)
    }

    fn load(&self, id: &HelpRequestId) -> Result<HelpRequest, BridgeError> {
        self.core
            .store
            .requests()
            .get(id)?
            .ok_or_else(|| CallError::Request(HelpError::NotFound).into())
    }

    fn is_held_by(&self, id: &HelpRequestId, user: &UserId) -> Result<bool, BridgeError> {
        let Some(request) = self.core.store.requests().get(id)? else {
            return Ok(false);
        };
        Ok(request.assignee_id.as_ref() == Some(user)
            && matches!(
                request.status,
                RequestStatus::Accepted | RequestStatus::InCall
            ))
    }

    fn provision(
        &self,
        ctx: &RequestContext,
        request: HelpRequest,
    ) -> Result<CallSession, BridgeError> {
        let assignee_id = request
            .assignee_id
            .clone()
            .ok_or_else(|| BridgeError::Internal {
                message: format!("accepted request {} has no assignee", request.id),
            })?;
        let provisioning_failed = |source: RoomError| CallError::RoomProvisioning {
            request_id: request.id.clone(),
            source,
        };

        let name = RoomName::generate(Utc::now());
        let config = RoomConfig::two_party(name.as_str(), self.core.settings.room_ttl_secs);
        let provisioned = self
            .core
            .rooms
            .create_room(&config)
            .map_err(|err| provisioning_failed(err.into()))?;
        let room_name = match RoomName::new(provisioned.name.clone()) {
            Ok(room_name) => room_name,
            Err(err) => {
                warn!(room = %provisioned.name, "provider returned unusable room name");
                return Err(provisioning_failed(RoomError::Unavailable {
                    reason: err.to_string(),
                })
                .into());
            }
        };

        let room = CallRoom {
            name: room_name,
            provider_id: provisioned.id,
            join_url: provisioned.join_url,
            request_id: request.id.clone(),
            requester_id: request.requester_id.clone(),
            assignee_id,
            status: CallRoomStatus::Active,
            started_at: Utc::now(),
            expires_at: provisioned.expires_at,
            ended_at: None,
        };
        let room_ref = room.room_ref();

        let attached = self.core.with_events(ctx, |store| {
            let Some(updated) = store.requests().attach_room(&request.id, &room_ref)? else {
                return Ok((None, Vec::new()));
            };
            store.calls().open(&room)?;
            Ok((
                Some(updated.clone()),
                vec![EventBody::CallStarted {
                    request: updated,
                    room: room.clone(),
                }],
            ))
        });

        match attached {
            Ok(Some(updated)) => {
                info!(request_id = %updated.id, room = %room.name, "call room linked");
                Ok(CallSession {
                    room: room_ref,
                    request: updated,
                })
            }
            Ok(None) => {
                // Someone else linked a room (or closed the request) between
                // our read and our write. Their state wins; ours is discarded.
                self.discard_room(&room.name);
                let current = self.load(&request.id)?;
                match current.status {
                    RequestStatus::InCall => existing_session(current),
                    status if status.is_terminal() => Err(CallError::CallEnded.into()),
                    from => Err(HelpError::InvalidTransition {
                        from,
                        to: RequestStatus::InCall,
                    }
                    .into()),
                }
            }
            Err(err) => {
                self.discard_room(&room.name);
                Err(err)
            }
        }
    }

    /// Best effort: a room that cannot be deleted still expires on its own.
    fn discard_room(&self, name: &RoomName) {
        match self.core.rooms.delete_room(name.as_str()) {
            Ok(DeleteOutcome::Deleted) => debug!(room = %name, "room deleted"),
            Ok(DeleteOutcome::NotFound) => debug!(room = %name, "room already gone"),
            Err(err) => warn!(room = %name, error = %err, "room deletion failed, leaving it to expire"),
        }
    }
}

fn existing_session(request: HelpRequest) -> Result<CallSession, BridgeError> {
    let Some(room) = request.room.clone() else {
        error!(request_id = %request.id, "in-call request without a room");
        return Err(BridgeError::Internal {
            message: format!("request {} is in call without a room", request.id),
        });
    };
    if request.has_expired_room(Utc::now()) {
        return Err(CallError::CallExpired.into());
    }
    Ok(CallSession { room, request })
}
