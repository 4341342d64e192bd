use crate::error::BridgeError;
use bridge_events::types::EventRecord;

pub trait EventRepository {
    fn append(&self, event: EventRecord) -> Result<EventRecord, BridgeError>;
    fn list(&self, after: Option<i64>, limit: Option<u32>) -> Result<Vec<EventRecord>, BridgeError>;
}
