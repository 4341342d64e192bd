use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;
use utoipa::ToSchema;

const MAX_EXTERNAL_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(transparent)]
#[schema(as = String)]
pub struct HelpRequestId(String);

/// Identifier handed to us by the identity service. Opaque; we only check it
/// is present and sane.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(transparent)]
#[schema(as = String)]
pub struct UserId(String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(transparent)]
#[schema(as = String)]
pub struct RoomName(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    InvalidPrefix { expected: &'static str, got: String },
    InvalidUlid { value: String },
    InvalidFormat { value: String },
    Empty,
}

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPrefix { expected, got } => {
                write!(f, "invalid prefix: expected {expected}, got {got}")
            }
            Self::InvalidUlid { value } => write!(f, "invalid ulid: {value}"),
            Self::InvalidFormat { value } => write!(f, "invalid id format: {value}"),
            Self::Empty => write!(f, "id must not be empty"),
        }
    }
}

impl std::error::Error for IdError {}

fn validate_prefixed(value: &str, prefix: &'static str) -> Result<(), IdError> {
    let Some(rest) = value.strip_prefix(prefix) else {
        let got = value.split('_').next().unwrap_or("").to_string();
        return Err(IdError::InvalidPrefix {
            expected: prefix,
            got,
        });
    };
    if rest.len() != 26 {
        return Err(IdError::InvalidFormat {
            value: value.to_string(),
        });
    }
    Ulid::from_str(rest).map_err(|_| IdError::InvalidUlid {
        value: value.to_string(),
    })?;
    Ok(())
}

fn validate_external(value: &str) -> Result<(), IdError> {
    if value.trim().is_empty() {
        return Err(IdError::Empty);
    }
    if value.len() > MAX_EXTERNAL_ID_LEN || value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(IdError::InvalidFormat {
            value: value.to_string(),
        });
    }
    Ok(())
}

fn validate_room_name(value: &str) -> Result<(), IdError> {
    if value.is_empty() {
        return Err(IdError::Empty);
    }
    let valid = value.len() <= MAX_EXTERNAL_ID_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(IdError::InvalidFormat {
            value: value.to_string(),
        });
    }
    Ok(())
}

macro_rules! id_type {
    ($name:ident, $validate:expr) => {
        impl $name {
            pub fn new(value: String) -> Result<Self, IdError> {
                $validate(&value)?;
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let value = String::deserialize(deserializer)?;
                Self::new(value).map_err(serde::de::Error::custom)
            }
        }
    };
}

id_type!(HelpRequestId, |value: &str| validate_prefixed(
    value,
    HelpRequestId::PREFIX
));
id_type!(UserId, validate_external);
id_type!(RoomName, validate_room_name);

impl HelpRequestId {
    pub const PREFIX: &'static str = "help_";

    pub fn generate() -> Self {
        Self(format!("{}{}", Self::PREFIX, Ulid::new()))
    }
}

impl RoomName {
    pub const PREFIX: &'static str = "bridge-";

    /// `bridge-<unix millis>-<10 random chars>`; the millisecond stamp keeps
    /// names readable in the provider dashboard, the suffix makes collisions
    /// between simultaneous calls negligible.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let random = Ulid::new().to_string().to_lowercase();
        let suffix = &random[random.len() - 10..];
        Self(format!("{}{}-{}", Self::PREFIX, now.timestamp_millis(), suffix))
    }
}
