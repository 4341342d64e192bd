use crate::middleware::correlation::CorrelationId;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bridge_core::error::{CallError, HelpError, RoomError};
use bridge_core::types::{HelpRequestId, RoomName};
use bridge_core::{BridgeError, ErrorKind};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorEnvelope {
    pub code: &'static str,
    pub message: String,
    pub correlation_id: Option<String>,
    pub retryable: bool,
}

pub fn map_error(
    err: &BridgeError,
    correlation_id: Option<String>,
) -> (StatusCode, Json<ErrorEnvelope>) {
    let (status, code) = match err.kind() {
        ErrorKind::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
        ErrorKind::Forbidden => (StatusCode::FORBIDDEN, "not_participant"),
        ErrorKind::Validation => (StatusCode::BAD_REQUEST, "invalid_input"),
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "not_found"),
        ErrorKind::AlreadyTaken => (StatusCode::CONFLICT, "already_taken"),
        ErrorKind::Conflict => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_state"),
        ErrorKind::Dependency => dependency_status(err),
    };

    (
        status,
        Json(ErrorEnvelope {
            code,
            message: err.user_message().to_string(),
            correlation_id,
            retryable: err.is_retryable(),
        }),
    )
}

fn dependency_status(err: &BridgeError) -> (StatusCode, &'static str) {
    match err {
        BridgeError::Room(RoomError::NotConfigured)
        | BridgeError::Call(CallError::RoomProvisioning {
            source: RoomError::NotConfigured,
            ..
        }) => (StatusCode::SERVICE_UNAVAILABLE, "provider_unavailable"),
        BridgeError::Room(_) | BridgeError::Call(CallError::RoomProvisioning { .. }) => {
            (StatusCode::BAD_GATEWAY, "provider_error")
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    }
}

pub fn respond<T: Serialize>(result: Result<T, BridgeError>, correlation: &CorrelationId) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(err) => map_error(&err, Some(correlation.0.clone())).into_response(),
    }
}

pub fn invalid_input(message: impl Into<String>) -> BridgeError {
    BridgeError::Help(HelpError::InvalidInput {
        message: message.into(),
    })
}

pub fn parse_request_id(raw: String) -> Result<HelpRequestId, BridgeError> {
    HelpRequestId::new(raw).map_err(|err| invalid_input(err.to_string()))
}

pub fn parse_room_name(raw: String) -> Result<RoomName, BridgeError> {
    RoomName::new(raw).map_err(|err| invalid_input(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: BridgeError) -> (StatusCode, &'static str, bool) {
        let (status, Json(envelope)) = map_error(&err, Some("corr_1".to_string()));
        assert_eq!(envelope.correlation_id.as_deref(), Some("corr_1"));
        (status, envelope.code, envelope.retryable)
    }

    #[test]
    fn caller_errors_map_to_4xx() {
        assert_eq!(status_of(BridgeError::Unauthenticated).0, StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(CallError::NotParticipant.into()).0,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(HelpError::NotFound.into()).0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(CallError::Accept(HelpError::AlreadyTaken).into()),
            (StatusCode::CONFLICT, "already_taken", false)
        );
        assert_eq!(
            status_of(CallError::CallExpired.into()).0,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(invalid_input("bad id")).0,
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn provider_failures_map_to_gateway_errors() {
        let failed = CallError::RoomProvisioning {
            request_id: HelpRequestId::generate(),
            source: RoomError::Unavailable {
                reason: "timeout".to_string(),
            },
        };
        assert_eq!(
            status_of(failed.into()),
            (StatusCode::BAD_GATEWAY, "provider_error", true)
        );

        let unconfigured = CallError::RoomProvisioning {
            request_id: HelpRequestId::generate(),
            source: RoomError::NotConfigured,
        };
        assert_eq!(
            status_of(unconfigured.into()).0,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn storage_detail_is_not_leaked() {
        let err = BridgeError::Storage {
            message: "disk I/O error at /var/lib/bridge.db".to_string(),
        };
        let (status, Json(envelope)) = map_error(&err, None);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!envelope.message.contains("disk"));
    }
}
