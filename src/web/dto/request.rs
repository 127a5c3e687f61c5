//! Request DTOs for the Web API.

use serde::Deserialize;

use crate::db::Role;

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// User creation request.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: String,
    /// Defaults to `regular`.
    #[serde(default)]
    pub role: Role,
}

/// Directory creation request.
#[derive(Debug, Deserialize)]
pub struct CreateDirectoryRequest {
    pub name: String,
    #[serde(default)]
    pub parent_directory_id: Option<String>,
}

/// Directory move request. `None` makes the directory a root.
#[derive(Debug, Deserialize)]
pub struct MoveDirectoryRequest {
    pub parent_directory_id: Option<String>,
}
