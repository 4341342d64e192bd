use crate::error::ProfileError;
use crate::types::{Caller, Profile, Role, UserId};

pub trait ProfileRepository {
    /// Idempotent upsert. The flag is true only when this call created the
    /// row.
    fn ensure(&self, caller: &Caller, default_role: Role) -> Result<(Profile, bool), ProfileError>;
    fn get(&self, id: &UserId) -> Result<Option<Profile>, ProfileError>;
    fn set_availability(&self, id: &UserId, available: bool) -> Result<Profile, ProfileError>;
    /// `None` when the profile was already verified.
    fn mark_verified(&self, id: &UserId) -> Result<Option<Profile>, ProfileError>;
}
