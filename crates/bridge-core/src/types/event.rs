use crate::types::enums::EndOutcome;
use crate::types::profile::Profile;
use crate::types::request::{CallRoom, HelpRequest};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", content = "payload")]
pub enum EventBody {
    HelpRequestCreated {
        request: HelpRequest,
    },
    HelpRequestAccepted {
        request: HelpRequest,
    },
    CallStarted {
        request: HelpRequest,
        room: CallRoom,
    },
    CallEnded {
        request: HelpRequest,
        outcome: EndOutcome,
    },

    ProfileCreated {
        profile: Profile,
    },
    AvailabilityChanged {
        profile: Profile,
    },
    BuddyVerified {
        profile: Profile,
    },
}

impl EventBody {
    /// Whether observers of the pending queue need to refresh.
    pub fn touches_requests(&self) -> bool {
        !matches!(
            self,
            Self::ProfileCreated { .. }
                | Self::AvailabilityChanged { .. }
                | Self::BuddyVerified { .. }
        )
    }
}
