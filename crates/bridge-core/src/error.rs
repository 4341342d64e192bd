use crate::types::enums::RequestStatus;
use crate::types::ids::HelpRequestId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HelpError {
    #[error("help request not found")]
    NotFound,
    #[error("help request already taken")]
    AlreadyTaken,
    #[error("invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("storage error: {message}")]
    Storage { message: String },
}

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("video calls are not configured")]
    NotConfigured,
    #[error("video provider rejected request ({status}): {reason}")]
    Rejected { status: u16, reason: String },
    #[error("video provider unavailable: {reason}")]
    Unavailable { reason: String },
}

#[derive(Debug, Error)]
pub enum CallError {
    /// The accept half failed; the request must be re-read, never re-accepted.
    #[error("accept failed: {0}")]
    Accept(#[source] HelpError),
    /// Accept succeeded but no room could be provisioned. The request stays
    /// `accepted`; retry room creation only.
    #[error("room provisioning failed for {request_id}: {source}")]
    RoomProvisioning {
        request_id: HelpRequestId,
        #[source]
        source: RoomError,
    },
    #[error("caller is not a participant of this call")]
    NotParticipant,
    #[error("call room expired")]
    CallExpired,
    #[error("call already ended")]
    CallEnded,
    #[error("call room not found")]
    RoomNotFound,
    #[error(transparent)]
    Request(#[from] HelpError),
    #[error("storage error: {message}")]
    Storage { message: String },
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl From<bridge_video::backend::RoomError> for RoomError {
    fn from(value: bridge_video::backend::RoomError) -> Self {
        match value {
            bridge_video::backend::RoomError::NotConfigured => Self::NotConfigured,
            bridge_video::backend::RoomError::Rejected { status, reason } => {
                Self::Rejected { status, reason }
            }
            bridge_video::backend::RoomError::Transport { reason }
            | bridge_video::backend::RoomError::InvalidResponse { reason }
            | bridge_video::backend::RoomError::InvalidConfig { reason } => {
                Self::Unavailable { reason }
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("authentication required")]
    Unauthenticated,
    #[error(transparent)]
    Help(#[from] HelpError),
    #[error(transparent)]
    Call(#[from] CallError),
    #[error(transparent)]
    Room(#[from] RoomError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error("storage error: {message}")]
    Storage { message: String },
    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Coarse classification every caller-facing layer maps from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    Forbidden,
    Validation,
    NotFound,
    AlreadyTaken,
    Conflict,
    Dependency,
}

impl ErrorKind {
    pub fn user_message(self) -> &'static str {
        match self {
            Self::Unauthenticated => "Please sign in to continue.",
            Self::Forbidden => "This call belongs to someone else.",
            Self::Validation => "Some of the details are missing or not valid.",
            Self::NotFound => "This request is no longer available.",
            Self::AlreadyTaken => "Someone else is already helping.",
            Self::Conflict => "This request has already moved on.",
            Self::Dependency => "Something went wrong on our side. Please try again later.",
        }
    }
}

fn help_kind(err: &HelpError) -> ErrorKind {
    match err {
        HelpError::NotFound => ErrorKind::NotFound,
        HelpError::AlreadyTaken => ErrorKind::AlreadyTaken,
        HelpError::InvalidTransition { .. } => ErrorKind::Conflict,
        HelpError::InvalidInput { .. } => ErrorKind::Validation,
        HelpError::Storage { .. } => ErrorKind::Dependency,
    }
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Help(err) => help_kind(err),
            Self::Call(err) => match err {
                CallError::Accept(inner) | CallError::Request(inner) => help_kind(inner),
                CallError::RoomProvisioning { .. } | CallError::Storage { .. } => {
                    ErrorKind::Dependency
                }
                CallError::NotParticipant => ErrorKind::Forbidden,
                CallError::CallExpired | CallError::CallEnded => ErrorKind::Conflict,
                CallError::RoomNotFound => ErrorKind::NotFound,
            },
            Self::Room(_) | Self::Storage { .. } | Self::Internal { .. } => ErrorKind::Dependency,
            Self::Profile(err) => match err {
                ProfileError::NotFound => ErrorKind::NotFound,
                ProfileError::InvalidInput { .. } => ErrorKind::Validation,
                ProfileError::Storage { .. } => ErrorKind::Dependency,
            },
        }
    }

    /// Only a failed room provisioning after a successful accept is worth
    /// retrying as-is; everything else needs fresh state or a fix upstream.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Call(CallError::RoomProvisioning { .. }))
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Call(CallError::RoomProvisioning {
                source: RoomError::NotConfigured,
                ..
            })
            | Self::Room(RoomError::NotConfigured) => {
                "Video calls are not configured. Please contact support."
            }
            Self::Call(CallError::RoomProvisioning { .. }) => {
                "Failed to create video room. Please try again."
            }
            Self::Call(CallError::CallExpired) => "This call has ended.",
            _ => self.kind().user_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_taken_is_not_an_error_dialog() {
        let err = BridgeError::from(CallError::Accept(HelpError::AlreadyTaken));
        assert_eq!(err.kind(), ErrorKind::AlreadyTaken);
        assert_eq!(err.user_message(), "Someone else is already helping.");
        assert!(!err.is_retryable());
    }

    #[test]
    fn provisioning_failure_is_retryable_dependency() {
        let err = BridgeError::from(CallError::RoomProvisioning {
            request_id: HelpRequestId::generate(),
            source: RoomError::Unavailable {
                reason: "timeout".to_string(),
            },
        });
        assert_eq!(err.kind(), ErrorKind::Dependency);
        assert!(err.is_retryable());
    }

    #[test]
    fn storage_failures_are_dependency_errors() {
        let err = BridgeError::from(HelpError::Storage {
            message: "disk I/O error".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::Dependency);
        assert!(!err.user_message().contains("disk"));
    }

    #[test]
    fn provider_errors_collapse_transport_detail() {
        let err = RoomError::from(bridge_video::backend::RoomError::Transport {
            reason: "connection refused".to_string(),
        });
        assert!(matches!(err, RoomError::Unavailable { .. }));
    }
}
