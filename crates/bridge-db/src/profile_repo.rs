use crate::util::{decode_enum, encode_enum, from_rfc3339, to_rfc3339};
use bridge_core::error::ProfileError;
use bridge_core::profiles::ProfileRepository;
use bridge_core::types::{Caller, Profile, Role, UserId};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::fmt::Display;

pub struct ProfileRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> ProfileRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl<'a> ProfileRepository for ProfileRepo<'a> {
    fn ensure(&self, caller: &Caller, default_role: Role) -> Result<(Profile, bool), ProfileError> {
        let role = caller.role.unwrap_or(default_role);
        let inserted = self
            .conn
            .execute(
                "INSERT INTO profiles (id, email, full_name, role, is_available, created_at) VALUES (?1, ?2, ?3, ?4, 0, ?5) \
                 ON CONFLICT(id) DO NOTHING",
                params![
                    caller.user_id.as_str(),
                    caller.email,
                    caller.fallback_name(role),
                    encode_enum(&role).map_err(storage)?,
                    to_rfc3339(&Utc::now()),
                ],
            )
            .map_err(storage)?;
        let profile = self.get(&caller.user_id)?.ok_or(ProfileError::NotFound)?;
        Ok((profile, inserted > 0))
    }

    fn get(&self, id: &UserId) -> Result<Option<Profile>, ProfileError> {
        self.conn
            .query_row(
                "SELECT id, email, full_name, role, is_available, is_verified, created_at FROM profiles WHERE id = ?1",
                [id.as_str()],
                |row| Ok(map_profile_row(row)),
            )
            .optional()
            .map_err(storage)?
            .transpose()
    }

    fn set_availability(&self, id: &UserId, available: bool) -> Result<Profile, ProfileError> {
        let changed = self
            .conn
            .execute(
                "UPDATE profiles SET is_available = ?1 WHERE id = ?2",
                params![available, id.as_str()],
            )
            .map_err(storage)?;
        if changed == 0 {
            return Err(ProfileError::NotFound);
        }
        self.get(id)?.ok_or(ProfileError::NotFound)
    }

    fn mark_verified(&self, id: &UserId) -> Result<Option<Profile>, ProfileError> {
        let changed = self
            .conn
            .execute(
                "UPDATE profiles SET is_verified = 1 WHERE id = ?1 AND is_verified = 0",
                [id.as_str()],
            )
            .map_err(storage)?;
        if changed == 0 {
            return Ok(None);
        }
        self.get(id)?.ok_or(ProfileError::NotFound).map(Some)
    }
}

fn storage(err: impl Display) -> ProfileError {
    ProfileError::Storage {
        message: err.to_string(),
    }
}

fn map_profile_row(row: &rusqlite::Row<'_>) -> Result<Profile, ProfileError> {
    let id: String = row.get(0).map_err(storage)?;
    let email: Option<String> = row.get(1).map_err(storage)?;
    let full_name: String = row.get(2).map_err(storage)?;
    let role: String = row.get(3).map_err(storage)?;
    let is_available: bool = row.get(4).map_err(storage)?;
    let is_verified: bool = row.get(5).map_err(storage)?;
    let created_at: String = row.get(6).map_err(storage)?;

    Ok(Profile {
        id: UserId::new(id).map_err(storage)?,
        email,
        full_name,
        role: decode_enum(&role).map_err(storage)?,
        is_available,
        is_verified,
        created_at: from_rfc3339(&created_at).map_err(storage)?,
    })
}
