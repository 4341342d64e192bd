use crate::error::HelpError;
use crate::types::{
    CreateHelpRequestInput, EndOutcome, HelpRequest, HelpRequestId, RoomRef, UserId,
};
use chrono::{DateTime, Utc};

/// Persistence for help requests. Every state-changing method is a single
/// conditional write; `Ok(None)` means the guard did not match and nothing
/// was written.
pub trait HelpRequestRepository {
    fn create(
        &self,
        requester_id: &UserId,
        input: CreateHelpRequestInput,
    ) -> Result<HelpRequest, HelpError>;
    fn get(&self, id: &HelpRequestId) -> Result<Option<HelpRequest>, HelpError>;
    fn list_pending(&self) -> Result<Vec<HelpRequest>, HelpError>;
    fn list_recent(&self, limit: u32) -> Result<Vec<HelpRequest>, HelpError>;
    /// `pending` and unassigned, and not the requester's own request.
    fn accept(
        &self,
        id: &HelpRequestId,
        assignee_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<HelpRequest>, HelpError>;
    /// `accepted` with no room yet.
    fn attach_room(
        &self,
        id: &HelpRequestId,
        room: &RoomRef,
    ) -> Result<Option<HelpRequest>, HelpError>;
    /// `accepted` or `in_call`.
    fn close(
        &self,
        id: &HelpRequestId,
        outcome: EndOutcome,
        at: DateTime<Utc>,
    ) -> Result<Option<HelpRequest>, HelpError>;
}
