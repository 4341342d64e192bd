use crate::error::CallError;
use crate::types::{CallRoom, HelpRequestId, RoomName};
use chrono::{DateTime, Utc};

pub trait CallRoomRepository {
    fn open(&self, room: &CallRoom) -> Result<(), CallError>;
    fn get(&self, name: &RoomName) -> Result<Option<CallRoom>, CallError>;
    /// Every room ever opened for the request, newest first.
    fn list_for_request(&self, id: &HelpRequestId) -> Result<Vec<CallRoom>, CallError>;
    fn mark_ended(&self, name: &RoomName, at: DateTime<Utc>) -> Result<(), CallError>;
}
