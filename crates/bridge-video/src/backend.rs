use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Settings for a two-party help call. Both parties join straight into the
/// room: no lobby, no knocking, no screen sharing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    pub name: String,
    pub private: bool,
    pub max_participants: u32,
    pub enable_chat: bool,
    pub enable_screenshare: bool,
    pub enable_knocking: bool,
    pub enable_prejoin_ui: bool,
    pub expires_in_secs: u64,
}

impl RoomConfig {
    pub fn two_party(name: impl Into<String>, expires_in_secs: u64) -> Self {
        Self {
            name: name.into(),
            private: true,
            max_participants: 2,
            enable_chat: true,
            enable_screenshare: false,
            enable_knocking: false,
            enable_prejoin_ui: false,
            expires_in_secs,
        }
    }

    /// When a room created at `now` lapses. A TTL too large to represent is
    /// an error rather than a wrapped or clamped time.
    pub fn expires_at(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, RoomError> {
        i64::try_from(self.expires_in_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| RoomError::InvalidConfig {
                reason: format!("room ttl of {}s is out of range", self.expires_in_secs),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedRoom {
    pub id: String,
    pub name: String,
    pub join_url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("video provider not configured")]
    NotConfigured,
    #[error("video provider rejected request ({status}): {reason}")]
    Rejected { status: u16, reason: String },
    #[error("video provider unreachable: {reason}")]
    Transport { reason: String },
    #[error("invalid provider response: {reason}")]
    InvalidResponse { reason: String },
    #[error("invalid room settings: {reason}")]
    InvalidConfig { reason: String },
}

pub trait RoomProvider: Send + Sync {
    fn create_room(&self, config: &RoomConfig) -> Result<ProvisionedRoom, RoomError>;
    /// A room the provider no longer knows about reports `NotFound`, not an
    /// error.
    fn delete_room(&self, name: &str) -> Result<DeleteOutcome, RoomError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn expiry_follows_ttl() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let config = RoomConfig::two_party("bridge-1-abcdefghij", 3600);
        assert_eq!(config.expires_at(now).unwrap(), now + Duration::hours(1));
    }

    #[test]
    fn oversized_ttl_is_rejected_not_wrapped() {
        let now = Utc::now();
        for ttl in [u64::MAX, i64::MAX as u64, 10_000_000_000_000_000] {
            let config = RoomConfig::two_party("bridge-1-abcdefghij", ttl);
            assert!(matches!(
                config.expires_at(now),
                Err(RoomError::InvalidConfig { .. })
            ));
        }
    }
}
