use axum::body::Body;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use bridge_core::types::{Caller, Role, UserId};
use tracing::debug;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_NAME_HEADER: &str = "x-user-name";

/// The caller asserted by the upstream auth proxy, if any.
#[derive(Clone, Debug, Default)]
pub struct Identity(pub Option<Caller>);

pub async fn identity_middleware(mut request: Request<Body>, next: Next) -> Response {
    let identity = Identity(caller_from_headers(request.headers()));
    request.extensions_mut().insert(identity);
    next.run(request).await
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub fn caller_from_headers(headers: &HeaderMap) -> Option<Caller> {
    let raw_id = header(headers, USER_ID_HEADER)?;
    let user_id = match UserId::new(raw_id.to_string()) {
        Ok(user_id) => user_id,
        Err(err) => {
            debug!(error = %err, "ignoring malformed user id header");
            return None;
        }
    };
    let mut caller = Caller::new(user_id);
    match header(headers, USER_ROLE_HEADER).map(str::to_ascii_lowercase).as_deref() {
        Some("senior") => caller = caller.with_role(Role::Senior),
        Some("buddy") => caller = caller.with_role(Role::Buddy),
        Some(other) => debug!(role = other, "ignoring unknown role header"),
        None => {}
    }
    if let Some(email) = header(headers, USER_EMAIL_HEADER) {
        caller = caller.with_email(email);
    }
    if let Some(name) = header(headers, USER_NAME_HEADER) {
        caller = caller.with_display_name(name);
    }
    Some(caller)
}
