use crate::types::enums::Role;
use crate::types::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    pub id: UserId,
    pub email: Option<String>,
    pub full_name: String,
    pub role: Role,
    pub is_available: bool,
    /// Buddies self-certify before taking calls; seniors stay unverified.
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// The authenticated identity behind a request, as asserted by the identity
/// service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Option<Role>,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl Caller {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            role: None,
            email: None,
            display_name: None,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Display name, else the local part of the email, else the role.
    pub fn fallback_name(&self, role: Role) -> String {
        if let Some(name) = self.display_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        if let Some(local) = self
            .email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
        {
            return local.to_string();
        }
        match role {
            Role::Senior => "Senior".to_string(),
            Role::Buddy => "Buddy".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller() -> Caller {
        Caller::new(UserId::new("u-1".to_string()).unwrap())
    }

    #[test]
    fn fallback_name_prefers_display_name() {
        let caller = caller().with_display_name("Meena").with_email("meena@example.com");
        assert_eq!(caller.fallback_name(Role::Senior), "Meena");
    }

    #[test]
    fn fallback_name_uses_email_local_part() {
        let caller = caller().with_display_name("  ").with_email("ravi@example.com");
        assert_eq!(caller.fallback_name(Role::Senior), "ravi");
    }

    #[test]
    fn fallback_name_uses_role_last() {
        assert_eq!(caller().fallback_name(Role::Buddy), "Buddy");
    }
}
