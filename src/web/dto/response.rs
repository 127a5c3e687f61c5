//! Response DTOs for the Web API.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::Privileges;
use crate::db::{Role, User};
use crate::file::{Directory, File};

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserInfo,
}

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// File metadata as returned to clients.
#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub id: String,
    pub name: String,
    pub size: i64,
    pub content_type: String,
    pub upload_date: DateTime<Utc>,
    pub owner_id: String,
}

impl From<File> for FileResponse {
    fn from(file: File) -> Self {
        Self {
            id: file.id,
            name: file.name,
            size: file.size,
            content_type: file.content_type,
            upload_date: file.upload_date,
            owner_id: file.owner_id,
        }
    }
}

/// Directory as returned to clients.
pub type DirectoryResponse = Directory;

/// Effective and stored privileges of a resource.
#[derive(Debug, Serialize)]
pub struct PrivilegesResponse {
    /// Stored override, if one was ever set.
    pub override_privileges: Option<Privileges>,
    /// Whether the override currently supersedes role defaults.
    pub active: bool,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
