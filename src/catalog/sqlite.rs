//! SQLite-backed catalog.

use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};

use super::Catalog;
use crate::auth::{AccessControlList, PrivilegeOverride, Privileges};
use crate::db::{Database, User};
use crate::file::{Directory, File};
use crate::{Result, SmdError};

const FILE_COLUMNS: &str = "id, name, size, content_type, location, upload_date, owner_id";
const USER_COLUMNS: &str = "id, username, password, email, role, created_at";

#[derive(sqlx::FromRow)]
struct DirectoryRow {
    id: String,
    name: String,
    owner_id: String,
    parent_directory_id: Option<String>,
}

/// Catalog over the SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    async fn load_entries(&self, directory_id: &str, kind: &str) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT entry_id FROM directory_entries
             WHERE directory_id = ? AND kind = ? ORDER BY position",
        )
        .bind(directory_id)
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn hydrate(&self, row: DirectoryRow) -> Result<Directory> {
        let file_ids = self.load_entries(&row.id, "file").await?;
        let subdirectory_ids = self.load_entries(&row.id, "directory").await?;
        Ok(Directory {
            id: row.id,
            name: row.name,
            owner_id: row.owner_id,
            parent_directory_id: row.parent_directory_id,
            file_ids,
            subdirectory_ids,
        })
    }
}

async fn write_entries(
    tx: &mut Transaction<'_, Sqlite>,
    directory: &Directory,
) -> Result<()> {
    sqlx::query("DELETE FROM directory_entries WHERE directory_id = ?")
        .bind(&directory.id)
        .execute(&mut **tx)
        .await?;

    let lists = [
        ("file", &directory.file_ids),
        ("directory", &directory.subdirectory_ids),
    ];
    for (kind, ids) in lists {
        for (position, entry_id) in ids.iter().enumerate() {
            sqlx::query(
                "INSERT INTO directory_entries (directory_id, kind, entry_id, position)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&directory.id)
            .bind(kind)
            .bind(entry_id)
            .bind(position as i64)
            .execute(&mut **tx)
            .await?;
        }
    }
    Ok(())
}

fn unique_violation(e: sqlx::Error, what: impl Into<String>) -> SmdError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => SmdError::Conflict(what.into()),
        _ => e.into(),
    }
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn insert_file(&self, file: &File) -> Result<()> {
        sqlx::query(
            "INSERT INTO files (id, name, size, content_type, location, upload_date, owner_id)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&file.id)
        .bind(&file.name)
        .bind(file.size)
        .bind(&file.content_type)
        .bind(&file.location)
        .bind(file.upload_date)
        .bind(&file.owner_id)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, format!("file {}", file.id)))?;
        Ok(())
    }

    async fn get_file(&self, id: &str) -> Result<Option<File>> {
        let file = sqlx::query_as::<_, File>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(file)
    }

    async fn update_file(&self, file: &File) -> Result<bool> {
        // Location, size and content type are fixed at registration.
        let result = sqlx::query("UPDATE files SET name = ?, owner_id = ? WHERE id = ?")
            .bind(&file.name)
            .bind(&file.owner_id)
            .bind(&file.id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_file(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM directory_entries WHERE kind = 'file' AND entry_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM acl_entries WHERE resource_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM privilege_overrides WHERE resource_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_all_files(&self) -> Result<Vec<File>> {
        let files = sqlx::query_as::<_, File>(&format!(
            "SELECT {FILE_COLUMNS} FROM files ORDER BY rowid"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(files)
    }

    async fn count_files_at_location(&self, location: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE location = ?")
            .bind(location)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, username, password, email, role, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.password)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, format!("user {}", user.username)))?;
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET username = ?, password = ?, email = ?, role = ? WHERE id = ?",
        )
        .bind(&user.username)
        .bind(&user.password)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.id)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, format!("user {}", user.username)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_all_users(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY rowid"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn insert_directory(&self, directory: &Directory) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO directories (id, name, owner_id, parent_directory_id)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&directory.id)
        .bind(&directory.name)
        .bind(&directory.owner_id)
        .bind(&directory.parent_directory_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, format!("directory {}", directory.id)))?;
        write_entries(&mut tx, directory).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_directory(&self, id: &str) -> Result<Option<Directory>> {
        let row = sqlx::query_as::<_, DirectoryRow>(
            "SELECT id, name, owner_id, parent_directory_id FROM directories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn update_directory(&self, directory: &Directory) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "UPDATE directories SET name = ?, owner_id = ?, parent_directory_id = ? WHERE id = ?",
        )
        .bind(&directory.name)
        .bind(&directory.owner_id)
        .bind(&directory.parent_directory_id)
        .bind(&directory.id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }
        write_entries(&mut tx, directory).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn delete_directory(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM directory_entries WHERE kind = 'directory' AND entry_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM acl_entries WHERE resource_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM privilege_overrides WHERE resource_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM directories WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_all_directories(&self) -> Result<Vec<Directory>> {
        let rows = sqlx::query_as::<_, DirectoryRow>(
            "SELECT id, name, owner_id, parent_directory_id FROM directories ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut directories = Vec::with_capacity(rows.len());
        for row in rows {
            directories.push(self.hydrate(row).await?);
        }
        Ok(directories)
    }

    async fn get_acl(&self, resource_id: &str) -> Result<AccessControlList> {
        let users = sqlx::query_as::<_, User>(
            "SELECT u.id, u.username, u.password, u.email, u.role, u.created_at
             FROM acl_entries a JOIN users u ON u.id = a.user_id
             WHERE a.resource_id = ? ORDER BY a.position",
        )
        .bind(resource_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(AccessControlList::from_users(users))
    }

    async fn save_acl(&self, resource_id: &str, acl: &AccessControlList) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM acl_entries WHERE resource_id = ?")
            .bind(resource_id)
            .execute(&mut *tx)
            .await?;
        for (position, user) in acl.iter().enumerate() {
            sqlx::query("INSERT INTO acl_entries (resource_id, user_id, position) VALUES (?, ?, ?)")
                .bind(resource_id)
                .bind(&user.id)
                .bind(position as i64)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_privilege_override(&self, resource_id: &str) -> Result<PrivilegeOverride> {
        let row = sqlx::query_as::<_, (bool, bool, bool, bool, bool)>(
            "SELECT can_read, can_write, can_delete, create_directories, add_users
             FROM privilege_overrides WHERE resource_id = ?",
        )
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some((read, write, delete, create_directories, add_users)) => {
                PrivilegeOverride::from_privileges(Privileges {
                    read,
                    write,
                    delete,
                    create_directories,
                    add_users,
                })
            }
            None => PrivilegeOverride::new(),
        })
    }

    async fn save_privilege_override(
        &self,
        resource_id: &str,
        over: &PrivilegeOverride,
    ) -> Result<()> {
        let Some(p) = over.privileges() else {
            sqlx::query("DELETE FROM privilege_overrides WHERE resource_id = ?")
                .bind(resource_id)
                .execute(&self.pool)
                .await?;
            return Ok(());
        };

        sqlx::query(
            "INSERT INTO privilege_overrides
                (resource_id, can_read, can_write, can_delete, create_directories, add_users)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(resource_id) DO UPDATE SET
                can_read = excluded.can_read,
                can_write = excluded.can_write,
                can_delete = excluded.can_delete,
                create_directories = excluded.create_directories,
                add_users = excluded.add_users",
        )
        .bind(resource_id)
        .bind(p.read)
        .bind(p.write)
        .bind(p.delete)
        .bind(p.create_directories)
        .bind(p.add_users)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
