use crate::bridge::{Bridge, RequestContext, log_failure};
use crate::error::{BridgeError, HelpError};
use crate::profiles::ProfileRepository;
use crate::requests::HelpRequestRepository;
use crate::store::Store;
use crate::types::{CreateHelpRequestInput, EventBody, HelpRequest, HelpRequestId, Role, UserId};
use crate::validation::{clamp_recent_limit, normalize_create_input};
use chrono::Utc;
use tracing::{error, info};

/// Request lifecycle: creation, the pending queue and the accept race.
pub struct RequestsApi<'a, S: Store> {
    pub(crate) core: &'a Bridge<S>,
}

impl<'a, S: Store> RequestsApi<'a, S> {
    /// Opens a `pending` request on behalf of the caller. The caller's
    /// profile is created first if the identity service provisioned the
    /// account but no profile row exists yet.
    pub fn create(
        &self,
        ctx: &RequestContext,
        input: CreateHelpRequestInput,
    ) -> Result<HelpRequest, BridgeError> {
        let caller = ctx.require_caller()?;
        let input = normalize_create_input(input);
        let request = self
            .core
            .with_events(ctx, |store| {
                let (profile, created) = store.profiles().ensure(caller, Role::Senior)?;
                let request = store.requests().create(&caller.user_id, input)?;
                let mut events = Vec::new();
                if created {
                    events.push(EventBody::ProfileCreated { profile });
                }
                events.push(EventBody::HelpRequestCreated {
                    request: request.clone(),
                });
                Ok((request, events))
            })
            .inspect_err(|err| log_failure("create_request", err))?;
        info!(request_id = %request.id, kind = ?request.kind, "help request created");
        Ok(request)
    }

    /// Pending requests, newest first. Storage failures degrade to an empty
    /// list.
    pub fn list_pending(&self, ctx: &RequestContext) -> Result<Vec<HelpRequest>, BridgeError> {
        ctx.require_authenticated()?;
        match self.core.store.requests().list_pending() {
            Ok(requests) => Ok(requests),
            Err(err) => {
                error!(error = %err, "listing pending requests failed");
                Ok(Vec::new())
            }
        }
    }

    /// Most recent requests in any status, newest first, with lapsed rooms
    /// read as ended.
    pub fn list_recent(
        &self,
        ctx: &RequestContext,
        limit: Option<u32>,
    ) -> Result<Vec<HelpRequest>, BridgeError> {
        ctx.require_authenticated()?;
        let limit = clamp_recent_limit(limit);
        match self.core.store.requests().list_recent(limit) {
            Ok(requests) => {
                let now = Utc::now();
                Ok(requests
                    .into_iter()
                    .map(|request| request.effective(now))
                    .collect())
            }
            Err(err) => {
                error!(error = %err, limit, "listing recent requests failed");
                Ok(Vec::new())
            }
        }
    }

    pub fn get(
        &self,
        ctx: &RequestContext,
        id: &HelpRequestId,
    ) -> Result<Option<HelpRequest>, BridgeError> {
        ctx.require_authenticated()?;
        let request = self.core.store.requests().get(id)?;
        Ok(request.map(|request| request.effective(Utc::now())))
    }

    /// Claims a pending request for the caller. The claim is one conditional
    /// write; of any number of concurrent callers exactly one gets the row,
    /// the rest get `AlreadyTaken`.
    pub fn accept(
        &self,
        ctx: &RequestContext,
        id: &HelpRequestId,
    ) -> Result<HelpRequest, BridgeError> {
        let caller = ctx.require_caller()?;
        let request = self
            .core
            .with_events(ctx, |store| accept_in(store, id, &caller.user_id))
            .inspect_err(|err| log_failure("accept", err))?;
        info!(request_id = %request.id, assignee = %caller.user_id, "help request accepted");
        Ok(request)
    }
}

fn accept_in<S: Store>(
    store: &S,
    id: &HelpRequestId,
    assignee_id: &UserId,
) -> Result<(HelpRequest, Vec<EventBody>), BridgeError> {
    if let Some(request) = store.requests().accept(id, assignee_id, Utc::now())? {
        return Ok((
            request.clone(),
            vec![EventBody::HelpRequestAccepted { request }],
        ));
    }
    // Guard rejected the write; the follow-up read only picks the error.
    let err = match store.requests().get(id)? {
        None => HelpError::NotFound,
        Some(current) if &current.requester_id == assignee_id => HelpError::InvalidInput {
            message: "cannot accept your own help request".to_string(),
        },
        Some(_) => HelpError::AlreadyTaken,
    };
    Err(err.into())
}
