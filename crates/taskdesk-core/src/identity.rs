//! Who is logged in: the opaque bearer credential and the identity resolved from it.
//!
//! A [`Credential`] is authored only by the authentication collaborator; an [`Identity`]
//! is only ever derived by resolving a credential. Neither is constructed by the UI.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Opaque bearer token. A blank token is "no credential" and cannot be constructed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a token; returns `None` for empty or whitespace-only input.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    /// Raw token for the `Authorization` header and durable storage. Never log this.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Response body of a successful credential submission.
#[derive(Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl AccessToken {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            access_token: token.into(),
            token_type: default_token_type(),
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Declared roles. Unknown role strings from the server are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Employee,
    Admin,
    Other(String),
}

impl Role {
    /// Case-insensitive for the declared roles; anything else becomes [`Role::Other`].
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "employee" => Self::Employee,
            "admin" => Self::Admin,
            _ => Self::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Employee => "employee",
            Self::Admin => "admin",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

fn default_true() -> bool {
    true
}

/// Resolved user profile, as returned by `GET /users/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Server-side user id; absent when the resolver does not report one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub username: String,
    pub role: Role,
    #[serde(default)]
    pub display_name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Identity {
    pub fn new(username: impl Into<String>, role: Role, display_name: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            role,
            display_name: display_name.into(),
            is_active: true,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
