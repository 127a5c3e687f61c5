//! User model for SMD.
//!
//! This module defines the User struct and the closed Role enumeration.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User role. Each role maps to one default privilege set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including user administration.
    Admin,
    /// Full access except user administration.
    Owner,
    /// Read-only access.
    #[default]
    Regular,
    /// Read, write and directory creation.
    Developer,
}

impl Role {
    /// All roles, in declaration order.
    pub const ALL: [Role; 4] = [Role::Admin, Role::Owner, Role::Regular, Role::Developer];

    /// Convert role to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Owner => "owner",
            Role::Regular => "regular",
            Role::Developer => "developer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            "regular" => Ok(Role::Regular),
            "developer" => Ok(Role::Developer),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A registered user.
#[derive(Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID).
    pub id: String,
    /// Login username (unique).
    pub username: String,
    /// Password hash (Argon2). Never logged or returned.
    pub password: String,
    /// Email address.
    pub email: String,
    /// Role for default privileges.
    #[sqlx(try_from = "String")]
    pub role: Role,
    /// Account creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user record with a fresh ID.
    ///
    /// `password_hash` must already be hashed.
    pub fn new(
        username: impl Into<String>,
        password_hash: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
            password: password_hash.into(),
            email: email.into(),
            role,
            created_at: Utc::now(),
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .finish()
    }
}
