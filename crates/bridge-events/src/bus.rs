use crate::types::EventRecord;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventRecord>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.sender.subscribe()
    }

    /// Publishing with no subscribers is not an error for the change feed;
    /// the record is already durable in the events table.
    pub fn publish(&self, event: EventRecord) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}
