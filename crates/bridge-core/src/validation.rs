use crate::error::HelpError;
use crate::types::io::{DEFAULT_RECENT_LIMIT, MAX_RECENT_LIMIT};
use crate::types::{CreateHelpRequestInput, RequestKind, RequestPriority, RequestStatus};

pub fn validate_status_transition(from: RequestStatus, to: RequestStatus) -> Result<(), HelpError> {
    use RequestStatus::{Accepted, Ended, InCall, Pending, Resolved};

    let valid = matches!(
        (from, to),
        (Pending, Accepted)
            | (Accepted, InCall)
            | (Accepted, Resolved)
            | (Accepted, Ended)
            | (InCall, Resolved)
            | (InCall, Ended)
    );

    if valid {
        Ok(())
    } else {
        Err(HelpError::InvalidTransition { from, to })
    }
}

/// SOS requests are urgent unless the requester says otherwise.
pub fn normalize_create_input(input: CreateHelpRequestInput) -> CreateHelpRequestInput {
    let priority = match (input.kind, input.priority) {
        (_, Some(priority)) => Some(priority),
        (RequestKind::Sos, None) => Some(RequestPriority::Urgent),
        (RequestKind::Call, None) => None,
    };
    CreateHelpRequestInput { priority, ..input }
}

pub fn clamp_recent_limit(limit: Option<u32>) -> u32 {
    limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .clamp(1, MAX_RECENT_LIMIT)
}
