use crate::util::{decode_enum, encode_enum, from_rfc3339, to_rfc3339};
use bridge_core::error::HelpError;
use bridge_core::requests::HelpRequestRepository;
use bridge_core::types::{
    CreateHelpRequestInput, EndOutcome, HelpRequest, HelpRequestId, RequestStatus, RoomName,
    RoomRef, UserId,
};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::fmt::Display;

const COLUMNS: &str = "id, requester_id, assignee_id, kind, status, priority, room_name, room_url, room_expires_at, created_at, accepted_at, resolved_at";

pub struct HelpRequestRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> HelpRequestRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn query(&self, clause: &str, params: impl rusqlite::Params) -> Result<Vec<HelpRequest>, HelpError> {
        let sql = format!("SELECT {COLUMNS} FROM help_requests {clause}");
        let mut stmt = self.conn.prepare(&sql).map_err(storage)?;
        let mut rows = stmt.query(params).map_err(storage)?;
        let mut requests = Vec::new();
        while let Some(row) = rows.next().map_err(storage)? {
            requests.push(map_help_request_row(row)?);
        }
        Ok(requests)
    }

    /// Re-reads the row after a guarded write; zero changed rows means the
    /// guard rejected it.
    fn reload_if_changed(
        &self,
        id: &HelpRequestId,
        changed: usize,
    ) -> Result<Option<HelpRequest>, HelpError> {
        if changed == 0 {
            return Ok(None);
        }
        self.get(id)
    }
}

impl<'a> HelpRequestRepository for HelpRequestRepo<'a> {
    fn create(
        &self,
        requester_id: &UserId,
        input: CreateHelpRequestInput,
    ) -> Result<HelpRequest, HelpError> {
        let request = HelpRequest {
            id: HelpRequestId::generate(),
            requester_id: requester_id.clone(),
            assignee_id: None,
            kind: input.kind,
            status: RequestStatus::Pending,
            priority: input.priority,
            room: None,
            created_at: Utc::now(),
            accepted_at: None,
            resolved_at: None,
        };
        let priority = request
            .priority
            .as_ref()
            .map(encode_enum)
            .transpose()
            .map_err(invalid)?;
        self.conn
            .execute(
                "INSERT INTO help_requests (id, requester_id, kind, status, priority, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    request.id.as_str(),
                    request.requester_id.as_str(),
                    encode_enum(&request.kind).map_err(invalid)?,
                    encode_enum(&request.status).map_err(invalid)?,
                    priority,
                    to_rfc3339(&request.created_at),
                ],
            )
            .map_err(storage)?;
        Ok(request)
    }

    fn get(&self, id: &HelpRequestId) -> Result<Option<HelpRequest>, HelpError> {
        let sql = format!("SELECT {COLUMNS} FROM help_requests WHERE id = ?1");
        self.conn
            .query_row(&sql, [id.as_str()], |row| Ok(map_help_request_row(row)))
            .optional()
            .map_err(storage)?
            .transpose()
    }

    fn list_pending(&self) -> Result<Vec<HelpRequest>, HelpError> {
        self.query(
            "WHERE status = 'pending' ORDER BY created_at DESC, id DESC",
            [],
        )
    }

    fn list_recent(&self, limit: u32) -> Result<Vec<HelpRequest>, HelpError> {
        self.query("ORDER BY created_at DESC, id DESC LIMIT ?1", [limit])
    }

    fn accept(
        &self,
        id: &HelpRequestId,
        assignee_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<HelpRequest>, HelpError> {
        let changed = self
            .conn
            .execute(
                "UPDATE help_requests SET status = 'accepted', assignee_id = ?1, accepted_at = ?2 \
                 WHERE id = ?3 AND status = 'pending' AND assignee_id IS NULL AND requester_id <> ?1",
                params![assignee_id.as_str(), to_rfc3339(&at), id.as_str()],
            )
            .map_err(storage)?;
        self.reload_if_changed(id, changed)
    }

    fn attach_room(
        &self,
        id: &HelpRequestId,
        room: &RoomRef,
    ) -> Result<Option<HelpRequest>, HelpError> {
        let changed = self
            .conn
            .execute(
                "UPDATE help_requests SET status = 'in_call', room_name = ?1, room_url = ?2, room_expires_at = ?3 \
                 WHERE id = ?4 AND status = 'accepted' AND room_name IS NULL",
                params![
                    room.name.as_str(),
                    room.join_url,
                    to_rfc3339(&room.expires_at),
                    id.as_str(),
                ],
            )
            .map_err(storage)?;
        self.reload_if_changed(id, changed)
    }

    fn close(
        &self,
        id: &HelpRequestId,
        outcome: EndOutcome,
        at: DateTime<Utc>,
    ) -> Result<Option<HelpRequest>, HelpError> {
        let changed = self
            .conn
            .execute(
                "UPDATE help_requests SET status = ?1, resolved_at = ?2, room_name = NULL, room_url = NULL, room_expires_at = NULL \
                 WHERE id = ?3 AND status IN ('accepted', 'in_call')",
                params![
                    encode_enum(&outcome.status()).map_err(invalid)?,
                    to_rfc3339(&at),
                    id.as_str(),
                ],
            )
            .map_err(storage)?;
        self.reload_if_changed(id, changed)
    }
}

fn storage(err: impl Display) -> HelpError {
    HelpError::Storage {
        message: err.to_string(),
    }
}

fn invalid(err: impl Display) -> HelpError {
    HelpError::InvalidInput {
        message: err.to_string(),
    }
}

fn map_help_request_row(row: &rusqlite::Row<'_>) -> Result<HelpRequest, HelpError> {
    let id: String = row.get(0).map_err(storage)?;
    let requester_id: String = row.get(1).map_err(storage)?;
    let assignee_id: Option<String> = row.get(2).map_err(storage)?;
    let kind: String = row.get(3).map_err(storage)?;
    let status: String = row.get(4).map_err(storage)?;
    let priority: Option<String> = row.get(5).map_err(storage)?;
    let room_name: Option<String> = row.get(6).map_err(storage)?;
    let room_url: Option<String> = row.get(7).map_err(storage)?;
    let room_expires_at: Option<String> = row.get(8).map_err(storage)?;
    let created_at: String = row.get(9).map_err(storage)?;
    let accepted_at: Option<String> = row.get(10).map_err(storage)?;
    let resolved_at: Option<String> = row.get(11).map_err(storage)?;

    let room = match (room_name, room_url, room_expires_at) {
        (Some(name), Some(join_url), Some(expires_at)) => Some(RoomRef {
            name: RoomName::new(name).map_err(storage)?,
            join_url,
            expires_at: from_rfc3339(&expires_at).map_err(storage)?,
        }),
        (None, None, None) => None,
        _ => {
            return Err(storage(format!("help request {id} has a partial room link")));
        }
    };

    Ok(HelpRequest {
        id: HelpRequestId::new(id).map_err(storage)?,
        requester_id: UserId::new(requester_id).map_err(storage)?,
        assignee_id: assignee_id.map(UserId::new).transpose().map_err(storage)?,
        kind: decode_enum(&kind).map_err(storage)?,
        status: decode_enum(&status).map_err(storage)?,
        priority: priority
            .map(|value| decode_enum(&value))
            .transpose()
            .map_err(storage)?,
        room,
        created_at: from_rfc3339(&created_at).map_err(storage)?,
        accepted_at: accepted_at
            .map(|value| from_rfc3339(&value))
            .transpose()
            .map_err(storage)?,
        resolved_at: resolved_at
            .map(|value| from_rfc3339(&value))
            .transpose()
            .map_err(storage)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::with_test_db;
    use bridge_core::types::{RequestKind, RequestPriority};
    use chrono::Duration;

    fn seed_profile(conn: &Connection, id: &str) -> UserId {
        conn.execute(
            "INSERT INTO profiles (id, full_name, role, is_available, created_at) VALUES (?1, ?1, 'senior', 0, ?2)",
            params![id, to_rfc3339(&Utc::now())],
        )
        .unwrap();
        UserId::new(id.to_string()).unwrap()
    }

    fn call_input() -> CreateHelpRequestInput {
        CreateHelpRequestInput {
            kind: RequestKind::Call,
            priority: None,
        }
    }

    fn room_ref(expires_in: Duration) -> RoomRef {
        RoomRef {
            name: RoomName::generate(Utc::now()),
            join_url: "https://bridge.daily.co/room".to_string(),
            expires_at: Utc::now() + expires_in,
        }
    }

    #[test]
    fn create_and_get() {
        let conn = with_test_db().unwrap();
        let repo = HelpRequestRepo::new(&conn);
        let senior = seed_profile(&conn, "senior-1");
        let created = repo
            .create(
                &senior,
                CreateHelpRequestInput {
                    kind: RequestKind::Sos,
                    priority: Some(RequestPriority::Urgent),
                },
            )
            .unwrap();
        let loaded = repo.get(&created.id).unwrap().unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.status, RequestStatus::Pending);
        assert!(repo.get(&HelpRequestId::generate()).unwrap().is_none());
    }

    #[test]
    fn accept_is_guarded() {
        let conn = with_test_db().unwrap();
        let repo = HelpRequestRepo::new(&conn);
        let senior = seed_profile(&conn, "senior-1");
        let buddy = UserId::new("buddy-1".to_string()).unwrap();
        let other = UserId::new("buddy-2".to_string()).unwrap();
        let request = repo.create(&senior, call_input()).unwrap();

        assert!(repo.accept(&request.id, &senior, Utc::now()).unwrap().is_none());
        let accepted = repo.accept(&request.id, &buddy, Utc::now()).unwrap().unwrap();
        assert_eq!(accepted.status, RequestStatus::Accepted);
        assert_eq!(accepted.assignee_id, Some(buddy));
        assert!(accepted.accepted_at.unwrap() >= accepted.created_at);
        assert!(repo.accept(&request.id, &other, Utc::now()).unwrap().is_none());
    }

    #[test]
    fn attach_room_only_once_and_only_when_accepted() {
        let conn = with_test_db().unwrap();
        let repo = HelpRequestRepo::new(&conn);
        let senior = seed_profile(&conn, "senior-1");
        let buddy = UserId::new("buddy-1".to_string()).unwrap();
        let request = repo.create(&senior, call_input()).unwrap();

        assert!(repo
            .attach_room(&request.id, &room_ref(Duration::hours(1)))
            .unwrap()
            .is_none());
        repo.accept(&request.id, &buddy, Utc::now()).unwrap();
        let room = room_ref(Duration::hours(1));
        let in_call = repo.attach_room(&request.id, &room).unwrap().unwrap();
        assert_eq!(in_call.status, RequestStatus::InCall);
        assert_eq!(in_call.room, Some(room));
        assert!(repo
            .attach_room(&request.id, &room_ref(Duration::hours(1)))
            .unwrap()
            .is_none());
    }

    #[test]
    fn close_clears_room_and_is_single_shot() {
        let conn = with_test_db().unwrap();
        let repo = HelpRequestRepo::new(&conn);
        let senior = seed_profile(&conn, "senior-1");
        let buddy = UserId::new("buddy-1".to_string()).unwrap();
        let request = repo.create(&senior, call_input()).unwrap();

        assert!(repo
            .close(&request.id, EndOutcome::Ended, Utc::now())
            .unwrap()
            .is_none());
        repo.accept(&request.id, &buddy, Utc::now()).unwrap();
        repo.attach_room(&request.id, &room_ref(Duration::hours(1)))
            .unwrap();
        let closed = repo
            .close(&request.id, EndOutcome::Resolved, Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(closed.status, RequestStatus::Resolved);
        assert!(closed.room.is_none());
        assert!(closed.resolved_at.is_some());
        assert!(repo
            .close(&request.id, EndOutcome::Ended, Utc::now())
            .unwrap()
            .is_none());
    }

    #[test]
    fn lists_are_newest_first() {
        let conn = with_test_db().unwrap();
        let repo = HelpRequestRepo::new(&conn);
        let senior = seed_profile(&conn, "senior-1");
        let buddy = UserId::new("buddy-1".to_string()).unwrap();
        let tick = || std::thread::sleep(std::time::Duration::from_millis(2));
        let first = repo.create(&senior, call_input()).unwrap();
        tick();
        let second = repo.create(&senior, call_input()).unwrap();
        tick();
        let third = repo.create(&senior, call_input()).unwrap();
        repo.accept(&second.id, &buddy, Utc::now()).unwrap();

        let pending: Vec<_> = repo
            .list_pending()
            .unwrap()
            .into_iter()
            .map(|request| request.id)
            .collect();
        assert_eq!(pending, vec![third.id.clone(), first.id.clone()]);

        let recent: Vec<_> = repo
            .list_recent(2)
            .unwrap()
            .into_iter()
            .map(|request| request.id)
            .collect();
        assert_eq!(recent, vec![third.id, second.id]);
    }
}
