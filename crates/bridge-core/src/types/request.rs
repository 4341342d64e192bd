use crate::types::enums::{CallRoomStatus, RequestKind, RequestPriority, RequestStatus};
use crate::types::ids::{HelpRequestId, RoomName, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HelpRequest {
    pub id: HelpRequestId,
    pub requester_id: UserId,
    pub assignee_id: Option<UserId>,
    pub kind: RequestKind,
    pub status: RequestStatus,
    pub priority: Option<RequestPriority>,
    pub room: Option<RoomRef>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Link from a request to the video room currently serving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoomRef {
    pub name: RoomName,
    pub join_url: String,
    pub expires_at: DateTime<Utc>,
}

impl RoomRef {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl HelpRequest {
    pub fn is_participant(&self, user: &UserId) -> bool {
        &self.requester_id == user || self.assignee_id.as_ref() == Some(user)
    }

    /// True when the row still says `in_call` but the provider has already
    /// torn the room down.
    pub fn has_expired_room(&self, now: DateTime<Utc>) -> bool {
        self.status == RequestStatus::InCall
            && self.room.as_ref().is_some_and(|room| room.is_expired(now))
    }

    /// The request as callers should see it at `now`. An in-call request
    /// whose room has passed its expiry reads as ended, with the expiry as
    /// its resolution time.
    pub fn effective(mut self, now: DateTime<Utc>) -> Self {
        if !self.has_expired_room(now) {
            return self;
        }
        let expired_at = self.room.take().map(|room| room.expires_at);
        self.status = RequestStatus::Ended;
        self.resolved_at = match (expired_at, self.accepted_at) {
            (Some(expired), Some(accepted)) => Some(expired.max(accepted)),
            (expired, accepted) => expired.or(accepted),
        };
        self
    }
}

/// Provider-side room tracked for linkage and history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CallRoom {
    pub name: RoomName,
    pub provider_id: String,
    pub join_url: String,
    pub request_id: HelpRequestId,
    pub requester_id: UserId,
    pub assignee_id: UserId,
    pub status: CallRoomStatus,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl CallRoom {
    pub fn room_ref(&self) -> RoomRef {
        RoomRef {
            name: self.name.clone(),
            join_url: self.join_url.clone(),
            expires_at: self.expires_at,
        }
    }
}

/// What both parties need to join: the room and the request it serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CallSession {
    pub room: RoomRef,
    pub request: HelpRequest,
}
