//! Metadata catalog for SMD.
//!
//! The catalog stores file, directory and user records plus per-resource
//! access lists and privilege overrides. Each call is a single round-trip
//! with no implicit retry; callers never assume multi-call transactions.

mod memory;
mod sqlite;

pub use memory::{InsertGate, MemoryCatalog};
pub use sqlite::SqliteCatalog;

use async_trait::async_trait;

use crate::auth::{AccessControlList, PrivilegeOverride};
use crate::db::User;
use crate::file::{Directory, File};
use crate::Result;

/// Catalog capability.
///
/// `get_*` return `None` for unknown IDs. `update_*` and `delete_*` return
/// whether a record matched.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn insert_file(&self, file: &File) -> Result<()>;
    async fn get_file(&self, id: &str) -> Result<Option<File>>;
    async fn update_file(&self, file: &File) -> Result<bool>;
    async fn delete_file(&self, id: &str) -> Result<bool>;
    async fn get_all_files(&self) -> Result<Vec<File>>;
    /// Number of file records sharing a blob location.
    async fn count_files_at_location(&self, location: &str) -> Result<u64>;

    async fn insert_user(&self, user: &User) -> Result<()>;
    async fn get_user(&self, id: &str) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn update_user(&self, user: &User) -> Result<bool>;
    async fn delete_user(&self, id: &str) -> Result<bool>;
    async fn get_all_users(&self) -> Result<Vec<User>>;

    async fn insert_directory(&self, directory: &Directory) -> Result<()>;
    async fn get_directory(&self, id: &str) -> Result<Option<Directory>>;
    async fn update_directory(&self, directory: &Directory) -> Result<bool>;
    async fn delete_directory(&self, id: &str) -> Result<bool>;
    async fn get_all_directories(&self) -> Result<Vec<Directory>>;

    /// Access list for a resource; empty if none was saved.
    async fn get_acl(&self, resource_id: &str) -> Result<AccessControlList>;
    /// Replace the stored access list for a resource.
    async fn save_acl(&self, resource_id: &str, acl: &AccessControlList) -> Result<()>;

    /// Override for a resource; unset if none was saved.
    async fn get_privilege_override(&self, resource_id: &str) -> Result<PrivilegeOverride>;
    async fn save_privilege_override(
        &self,
        resource_id: &str,
        over: &PrivilegeOverride,
    ) -> Result<()>;
}
