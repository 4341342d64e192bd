use crate::util::{decode_enum, decode_json, encode_enum, encode_json, from_rfc3339, to_rfc3339};
use bridge_core::error::BridgeError;
use bridge_core::events::EventRepository;
use bridge_events::types::EventRecord;
use rusqlite::{Connection, params};
use std::fmt::Display;
use ulid::Ulid;

pub struct EventRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> EventRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl<'a> EventRepository for EventRepo<'a> {
    fn append(&self, mut event: EventRecord) -> Result<EventRecord, BridgeError> {
        event.seq = next_seq(self.conn)?;
        event.id = format!("evt_{}", Ulid::new());
        let sql = "INSERT INTO events (id, seq, at, correlation_id, source, body_json) VALUES (?1, ?2, ?3, ?4, ?5, ?6)";
        self.conn
            .execute(
                sql,
                params![
                    event.id,
                    event.seq,
                    to_rfc3339(&event.at),
                    event.correlation_id,
                    encode_enum(&event.source).map_err(internal)?,
                    encode_json(&event.body).map_err(internal)?,
                ],
            )
            .map_err(storage)?;
        Ok(event)
    }

    fn list(&self, after: Option<i64>, limit: Option<u32>) -> Result<Vec<EventRecord>, BridgeError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, seq, at, correlation_id, source, body_json FROM events \
                 WHERE seq > ?1 ORDER BY seq ASC LIMIT ?2",
            )
            .map_err(storage)?;
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map_or(-1, i64::from);
        let mut rows = stmt
            .query(params![after.unwrap_or(0), limit])
            .map_err(storage)?;
        let mut events = Vec::new();
        while let Some(row) = rows.next().map_err(storage)? {
            events.push(map_event_row(row)?);
        }
        Ok(events)
    }
}

fn storage(err: impl Display) -> BridgeError {
    BridgeError::Storage {
        message: err.to_string(),
    }
}

fn internal(err: impl Display) -> BridgeError {
    BridgeError::Internal {
        message: err.to_string(),
    }
}

fn map_event_row(row: &rusqlite::Row<'_>) -> Result<EventRecord, BridgeError> {
    let id: String = row.get(0).map_err(storage)?;
    let seq: i64 = row.get(1).map_err(storage)?;
    let at: String = row.get(2).map_err(storage)?;
    let correlation_id: Option<String> = row.get(3).map_err(storage)?;
    let source: String = row.get(4).map_err(storage)?;
    let body_json: String = row.get(5).map_err(storage)?;

    Ok(EventRecord {
        id,
        seq,
        at: from_rfc3339(&at).map_err(storage)?,
        correlation_id,
        source: decode_enum(&source).map_err(storage)?,
        body: decode_json(&body_json).map_err(storage)?,
    })
}

fn next_seq(conn: &Connection) -> Result<i64, BridgeError> {
    let seq: i64 = conn
        .query_row("SELECT COALESCE(MAX(seq), 0) FROM events", [], |row| row.get(0))
        .map_err(storage)?;
    Ok(seq + 1)
}
