use crate::types::enums::{EndOutcome, RequestKind, RequestPriority};
use crate::types::ids::{HelpRequestId, RoomName};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_RECENT_LIMIT: u32 = 20;
pub const MAX_RECENT_LIMIT: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreateHelpRequestInput {
    pub kind: RequestKind,
    pub priority: Option<RequestPriority>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema, IntoParams)]
pub struct RecentQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub struct EndCallInput {
    #[serde(default)]
    pub outcome: EndOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityInput {
    pub available: bool,
}

/// A call can be ended from either side of the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget {
    Request(HelpRequestId),
    Room(RoomName),
}
