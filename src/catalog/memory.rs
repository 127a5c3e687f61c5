//! In-process catalog used as a test double.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;

use super::Catalog;
use crate::auth::{AccessControlList, PrivilegeOverride};
use crate::db::User;
use crate::file::{Directory, File};
use crate::{Result, SmdError};

#[derive(Debug, Default)]
struct Tables {
    files: HashMap<String, File>,
    users: HashMap<String, User>,
    directories: HashMap<String, Directory>,
    acls: HashMap<String, AccessControlList>,
    overrides: HashMap<String, PrivilegeOverride>,
}

/// Holds one `insert_file` call until released.
#[derive(Debug, Default)]
pub struct InsertGate {
    entered: Notify,
    released: Notify,
}

impl InsertGate {
    /// Wait until the gated insert has started.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the gated insert proceed.
    pub fn release(&self) {
        self.released.notify_one();
    }
}

/// Catalog held entirely in memory.
///
/// `fail_file_inserts` makes every subsequent `insert_file` fail, which
/// lets callers exercise the path where a blob is stored but never
/// registered. `gate_next_file_insert` parks the next insert so callers
/// can interleave other operations with an upload in flight.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    tables: RwLock<Tables>,
    fail_file_inserts: AtomicBool,
    insert_gate: Mutex<Option<Arc<InsertGate>>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_file_inserts(&self, fail: bool) {
        self.fail_file_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn gate_next_file_insert(&self) -> Arc<InsertGate> {
        let gate = Arc::new(InsertGate::default());
        *self.insert_gate.lock() = Some(Arc::clone(&gate));
        gate
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn insert_file(&self, file: &File) -> Result<()> {
        let gate = self.insert_gate.lock().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.released.notified().await;
        }
        if self.fail_file_inserts.load(Ordering::SeqCst) {
            return Err(SmdError::Database("file insert rejected".to_string()));
        }
        let mut tables = self.tables.write();
        if tables.files.contains_key(&file.id) {
            return Err(SmdError::Conflict(format!("file {}", file.id)));
        }
        tables.files.insert(file.id.clone(), file.clone());
        Ok(())
    }

    async fn get_file(&self, id: &str) -> Result<Option<File>> {
        Ok(self.tables.read().files.get(id).cloned())
    }

    async fn update_file(&self, file: &File) -> Result<bool> {
        let mut tables = self.tables.write();
        match tables.files.get_mut(&file.id) {
            Some(existing) => {
                existing.name = file.name.clone();
                existing.owner_id = file.owner_id.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_file(&self, id: &str) -> Result<bool> {
        let mut tables = self.tables.write();
        for dir in tables.directories.values_mut() {
            dir.remove_file(id);
        }
        tables.acls.remove(id);
        tables.overrides.remove(id);
        Ok(tables.files.remove(id).is_some())
    }

    async fn get_all_files(&self) -> Result<Vec<File>> {
        let mut files: Vec<_> = self.tables.read().files.values().cloned().collect();
        files.sort_by(|a, b| a.upload_date.cmp(&b.upload_date).then(a.id.cmp(&b.id)));
        Ok(files)
    }

    async fn count_files_at_location(&self, location: &str) -> Result<u64> {
        let tables = self.tables.read();
        Ok(tables.files.values().filter(|f| f.location == location).count() as u64)
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.users.contains_key(&user.id)
            || tables.users.values().any(|u| u.username == user.username)
        {
            return Err(SmdError::Conflict(format!("user {}", user.username)));
        }
        tables.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.tables.read().users.get(id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read();
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn update_user(&self, user: &User) -> Result<bool> {
        let mut tables = self.tables.write();
        if tables
            .users
            .values()
            .any(|u| u.username == user.username && u.id != user.id)
        {
            return Err(SmdError::Conflict(format!("user {}", user.username)));
        }
        match tables.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, id: &str) -> Result<bool> {
        let mut tables = self.tables.write();
        for acl in tables.acls.values_mut() {
            let _ = acl.remove_user_with_id(id);
        }
        Ok(tables.users.remove(id).is_some())
    }

    async fn get_all_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<_> = self.tables.read().users.values().cloned().collect();
        users.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.username.cmp(&b.username))
        });
        Ok(users)
    }

    async fn insert_directory(&self, directory: &Directory) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.directories.contains_key(&directory.id) {
            return Err(SmdError::Conflict(format!("directory {}", directory.id)));
        }
        tables
            .directories
            .insert(directory.id.clone(), directory.clone());
        Ok(())
    }

    async fn get_directory(&self, id: &str) -> Result<Option<Directory>> {
        Ok(self.tables.read().directories.get(id).cloned())
    }

    async fn update_directory(&self, directory: &Directory) -> Result<bool> {
        let mut tables = self.tables.write();
        match tables.directories.get_mut(&directory.id) {
            Some(existing) => {
                *existing = directory.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_directory(&self, id: &str) -> Result<bool> {
        let mut tables = self.tables.write();
        for dir in tables.directories.values_mut() {
            dir.remove_subdirectory(id);
        }
        tables.acls.remove(id);
        tables.overrides.remove(id);
        Ok(tables.directories.remove(id).is_some())
    }

    async fn get_all_directories(&self) -> Result<Vec<Directory>> {
        let mut dirs: Vec<_> = self.tables.read().directories.values().cloned().collect();
        dirs.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(dirs)
    }

    async fn get_acl(&self, resource_id: &str) -> Result<AccessControlList> {
        Ok(self
            .tables
            .read()
            .acls
            .get(resource_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_acl(&self, resource_id: &str, acl: &AccessControlList) -> Result<()> {
        self.tables
            .write()
            .acls
            .insert(resource_id.to_string(), acl.clone());
        Ok(())
    }

    async fn get_privilege_override(&self, resource_id: &str) -> Result<PrivilegeOverride> {
        Ok(self
            .tables
            .read()
            .overrides
            .get(resource_id)
            .copied()
            .unwrap_or_default())
    }

    async fn save_privilege_override(
        &self,
        resource_id: &str,
        over: &PrivilegeOverride,
    ) -> Result<()> {
        self.tables
            .write()
            .overrides
            .insert(resource_id.to_string(), *over);
        Ok(())
    }
}
