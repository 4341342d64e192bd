use crate::util::{decode_enum, encode_enum, from_rfc3339, to_rfc3339};
use bridge_core::calls::CallRoomRepository;
use bridge_core::error::CallError;
use bridge_core::types::{CallRoom, CallRoomStatus, HelpRequestId, RoomName, UserId};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::fmt::Display;

const COLUMNS: &str = "name, provider_id, join_url, request_id, requester_id, assignee_id, status, started_at, expires_at, ended_at";

pub struct CallRoomRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> CallRoomRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl<'a> CallRoomRepository for CallRoomRepo<'a> {
    fn open(&self, room: &CallRoom) -> Result<(), CallError> {
        self.conn
            .execute(
                &format!("INSERT INTO call_rooms ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
                params![
                    room.name.as_str(),
                    room.provider_id,
                    room.join_url,
                    room.request_id.as_str(),
                    room.requester_id.as_str(),
                    room.assignee_id.as_str(),
                    encode_enum(&room.status).map_err(storage)?,
                    to_rfc3339(&room.started_at),
                    to_rfc3339(&room.expires_at),
                    room.ended_at.map(|value| to_rfc3339(&value)),
                ],
            )
            .map_err(storage)?;
        Ok(())
    }

    fn get(&self, name: &RoomName) -> Result<Option<CallRoom>, CallError> {
        self.conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM call_rooms WHERE name = ?1"),
                [name.as_str()],
                |row| Ok(map_call_room_row(row)),
            )
            .optional()
            .map_err(storage)?
            .transpose()
    }

    fn list_for_request(&self, id: &HelpRequestId) -> Result<Vec<CallRoom>, CallError> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {COLUMNS} FROM call_rooms WHERE request_id = ?1 ORDER BY started_at DESC"
            ))
            .map_err(storage)?;
        let mut rows = stmt.query([id.as_str()]).map_err(storage)?;
        let mut rooms = Vec::new();
        while let Some(row) = rows.next().map_err(storage)? {
            rooms.push(map_call_room_row(row)?);
        }
        Ok(rooms)
    }

    fn mark_ended(&self, name: &RoomName, at: DateTime<Utc>) -> Result<(), CallError> {
        self.conn
            .execute(
                "UPDATE call_rooms SET status = ?1, ended_at = ?2 WHERE name = ?3 AND status = ?4",
                params![
                    encode_enum(&CallRoomStatus::Ended).map_err(storage)?,
                    to_rfc3339(&at),
                    name.as_str(),
                    encode_enum(&CallRoomStatus::Active).map_err(storage)?,
                ],
            )
            .map_err(storage)?;
        Ok(())
    }
}

fn storage(err: impl Display) -> CallError {
    CallError::Storage {
        message: err.to_string(),
    }
}

fn map_call_room_row(row: &rusqlite::Row<'_>) -> Result<CallRoom, CallError> {
    let name: String = row.get(0).map_err(storage)?;
    let provider_id: String = row.get(1).map_err(storage)?;
    let join_url: String = row.get(2).map_err(storage)?;
    let request_id: String = row.get(3).map_err(storage)?;
    let requester_id: String = row.get(4).map_err(storage)?;
    let assignee_id: String = row.get(5).map_err(storage)?;
    let status: String = row.get(6).map_err(storage)?;
    let started_at: String = row.get(7).map_err(storage)?;
    let expires_at: String = row.get(8).map_err(storage)?;
    let ended_at: Option<String> = row.get(9).map_err(storage)?;

    Ok(CallRoom {
        name: RoomName::new(name).map_err(storage)?,
        provider_id,
        join_url,
        request_id: HelpRequestId::new(request_id).map_err(storage)?,
        requester_id: UserId::new(requester_id).map_err(storage)?,
        assignee_id: UserId::new(assignee_id).map_err(storage)?,
        status: decode_enum(&status).map_err(storage)?,
        started_at: from_rfc3339(&started_at).map_err(storage)?,
        expires_at: from_rfc3339(&expires_at).map_err(storage)?,
        ended_at: ended_at
            .map(|value| from_rfc3339(&value))
            .transpose()
            .map_err(storage)?,
    })
}
