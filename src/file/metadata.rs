//! File metadata record.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A registered file.
///
/// `location` and the stored bytes never change after registration; only
/// `name` and `owner_id` may be edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct File {
    /// Unique file ID (UUID).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Size in bytes.
    pub size: i64,
    /// Declared MIME type, stored as given.
    pub content_type: String,
    /// Content-derived blob path.
    pub location: String,
    /// Registration timestamp.
    pub upload_date: DateTime<Utc>,
    /// Owning user ID.
    pub owner_id: String,
}

impl File {
    /// Build a new record with a fresh ID, stamped now.
    pub fn new(
        name: impl Into<String>,
        size: u64,
        content_type: impl Into<String>,
        location: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            size: i64::try_from(size).unwrap_or(i64::MAX),
            content_type: content_type.into(),
            location: location.into(),
            upload_date: Utc::now(),
            owner_id: owner_id.into(),
        }
    }
}
