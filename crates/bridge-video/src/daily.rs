use crate::backend::{DeleteOutcome, ProvisionedRoom, RoomConfig, RoomError, RoomProvider};
use chrono::{DateTime, TimeZone, Utc};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration as StdDuration;
use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str = "https://api.daily.co/v1";

const REQUEST_TIMEOUT_SECS: u64 = 15;
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Daily.co REST backend.
pub struct DailyProvider {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailyRoom {
    id: String,
    name: String,
    url: String,
    #[serde(default)]
    config: DailyRoomConfig,
}

#[derive(Debug, Default, Deserialize)]
struct DailyRoomConfig {
    exp: Option<i64>,
}

impl DailyProvider {
    pub fn new(api_url: impl Into<String>, api_key: Option<String>) -> Result<Self, RoomError> {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(StdDuration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|err| RoomError::Transport {
                reason: err.to_string(),
            })?;
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, RoomError> {
        self.api_key.as_deref().ok_or(RoomError::NotConfigured)
    }
}

impl RoomProvider for DailyProvider {
    fn create_room(&self, config: &RoomConfig) -> Result<ProvisionedRoom, RoomError> {
        let key = self.api_key()?;
        let requested_exp = config.expires_at(Utc::now())?;
        let response = self
            .client
            .post(format!("{}/rooms", self.api_url))
            .bearer_auth(key)
            .json(&create_body(config, requested_exp))
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let reason = response.text().unwrap_or_default();
            warn!(room = %config.name, status = status.as_u16(), "daily room creation rejected");
            return Err(RoomError::Rejected {
                status: status.as_u16(),
                reason,
            });
        }

        let room: DailyRoom = response.json().map_err(|err| RoomError::InvalidResponse {
            reason: err.to_string(),
        })?;
        debug!(room = %room.name, "daily room created");
        Ok(into_provisioned(room, requested_exp))
    }

    fn delete_room(&self, name: &str) -> Result<DeleteOutcome, RoomError> {
        let key = self.api_key()?;
        let response = self
            .client
            .delete(format!("{}/rooms/{}", self.api_url, name))
            .bearer_auth(key)
            .send()
            .map_err(transport_error)?;
        classify_delete(response.status(), || response.text().unwrap_or_default())
    }
}

fn create_body(config: &RoomConfig, exp: DateTime<Utc>) -> Value {
    json!({
        "name": config.name,
        "privacy": if config.private { "private" } else { "public" },
        "properties": {
            "exp": exp.timestamp(),
            "max_participants": config.max_participants,
            "enable_chat": config.enable_chat,
            "enable_screenshare": config.enable_screenshare,
            "enable_knocking": config.enable_knocking,
            "enable_prejoin_ui": config.enable_prejoin_ui,
            "start_video_off": false,
            "start_audio_off": false,
        }
    })
}

fn into_provisioned(room: DailyRoom, requested_exp: DateTime<Utc>) -> ProvisionedRoom {
    let expires_at = room
        .config
        .exp
        .and_then(|exp| Utc.timestamp_opt(exp, 0).single())
        .unwrap_or(requested_exp);
    ProvisionedRoom {
        id: room.id,
        name: room.name,
        join_url: room.url,
        expires_at,
    }
}

fn classify_delete(
    status: StatusCode,
    body: impl FnOnce() -> String,
) -> Result<DeleteOutcome, RoomError> {
    if status == StatusCode::NOT_FOUND {
        return Ok(DeleteOutcome::NotFound);
    }
    if status.is_success() {
        return Ok(DeleteOutcome::Deleted);
    }
    Err(RoomError::Rejected {
        status: status.as_u16(),
        reason: body(),
    })
}

fn transport_error(err: reqwest::Error) -> RoomError {
    RoomError::Transport {
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_body_disables_lobby_and_screenshare() {
        let config = RoomConfig::two_party("bridge-1-abc", 3600);
        let exp = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
        let body = create_body(&config, exp);

        assert_eq!(body["name"], "bridge-1-abc");
        assert_eq!(body["privacy"], "private");
        let props = &body["properties"];
        assert_eq!(props["exp"], 1_700_000_000);
        assert_eq!(props["max_participants"], 2);
        assert_eq!(props["enable_screenshare"], false);
        assert_eq!(props["enable_knocking"], false);
        assert_eq!(props["enable_prejoin_ui"], false);
    }

    #[test]
    fn provisioned_room_prefers_provider_expiry() {
        let room: DailyRoom = serde_json::from_value(json!({
            "id": "r1",
            "name": "bridge-1-abc",
            "url": "https://example.daily.co/bridge-1-abc",
            "created_at": "2024-01-01T00:00:00.000Z",
            "config": { "exp": 1_700_000_500 }
        }))
        .unwrap();
        let requested = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
        let provisioned = into_provisioned(room, requested);
        assert_eq!(provisioned.expires_at.timestamp(), 1_700_000_500);
        assert_eq!(provisioned.join_url, "https://example.daily.co/bridge-1-abc");
    }

    #[test]
    fn provisioned_room_falls_back_to_requested_expiry() {
        let room: DailyRoom = serde_json::from_value(json!({
            "id": "r1",
            "name": "bridge-1-abc",
            "url": "https://example.daily.co/bridge-1-abc"
        }))
        .unwrap();
        let requested = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
        assert_eq!(into_provisioned(room, requested).expires_at, requested);
    }

    #[test]
    fn delete_treats_missing_room_as_gone() {
        let outcome = classify_delete(StatusCode::NOT_FOUND, String::new).unwrap();
        assert_eq!(outcome, DeleteOutcome::NotFound);
        let outcome = classify_delete(StatusCode::OK, String::new).unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
    }

    #[test]
    fn delete_surfaces_server_errors() {
        let err = classify_delete(StatusCode::BAD_GATEWAY, || "upstream".to_string()).unwrap_err();
        assert!(matches!(err, RoomError::Rejected { status: 502, .. }));
    }

    #[test]
    fn unconfigured_provider_fails_without_network() {
        let provider = DailyProvider::new(DEFAULT_API_URL, Some("  ".to_string())).unwrap();
        assert!(!provider.is_configured());
        let err = provider
            .create_room(&RoomConfig::two_party("bridge-1-abc", 60))
            .unwrap_err();
        assert!(matches!(err, RoomError::NotConfigured));
        let err = provider.delete_room("bridge-1-abc").unwrap_err();
        assert!(matches!(err, RoomError::NotConfigured));
    }
}
