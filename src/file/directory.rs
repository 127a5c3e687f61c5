//! Directory tree records.

use serde::Serialize;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::{Result, SmdError};

/// Maximum directory nesting depth.
pub const MAX_DIRECTORY_DEPTH: usize = 64;

/// A directory in the tree.
///
/// The directory owns its membership lists but not the files or
/// subdirectories they reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directory {
    /// Unique directory ID (UUID).
    pub id: String,
    pub name: String,
    pub owner_id: String,
    /// Parent directory ID (None for roots).
    pub parent_directory_id: Option<String>,
    /// Member file IDs, in order.
    pub file_ids: Vec<String>,
    /// Child directory IDs, in order.
    pub subdirectory_ids: Vec<String>,
}

impl Directory {
    /// Create an empty directory with a fresh ID.
    pub fn new(
        name: impl Into<String>,
        owner_id: impl Into<String>,
        parent_directory_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            owner_id: owner_id.into(),
            parent_directory_id,
            file_ids: Vec::new(),
            subdirectory_ids: Vec::new(),
        }
    }

    /// Append a file ID. Returns false if already present.
    pub fn add_file(&mut self, file_id: impl Into<String>) -> bool {
        push_unique(&mut self.file_ids, file_id.into())
    }

    /// Remove a file ID. Returns false if absent.
    pub fn remove_file(&mut self, file_id: &str) -> bool {
        remove_one(&mut self.file_ids, file_id)
    }

    /// Append a subdirectory ID. Returns false if already present.
    pub fn add_subdirectory(&mut self, directory_id: impl Into<String>) -> bool {
        push_unique(&mut self.subdirectory_ids, directory_id.into())
    }

    /// Remove a subdirectory ID. Returns false if absent.
    pub fn remove_subdirectory(&mut self, directory_id: &str) -> bool {
        remove_one(&mut self.subdirectory_ids, directory_id)
    }
}

fn push_unique(list: &mut Vec<String>, id: String) -> bool {
    if list.contains(&id) {
        return false;
    }
    list.push(id);
    true
}

fn remove_one(list: &mut Vec<String>, id: &str) -> bool {
    match list.iter().position(|x| x == id) {
        Some(pos) => {
            list.remove(pos);
            true
        }
        None => false,
    }
}

/// Verify that giving `directory_id` the parent `parent_id` keeps the tree
/// acyclic.
///
/// Walks the ancestor chain through the catalog. The parent must exist.
pub async fn ensure_acyclic(
    catalog: &dyn Catalog,
    directory_id: &str,
    parent_id: Option<&str>,
) -> Result<()> {
    let mut current = parent_id.map(str::to_string);
    let mut depth = 0;

    while let Some(id) = current {
        if id == directory_id {
            return Err(SmdError::Validation(format!(
                "directory {directory_id} cannot be its own ancestor"
            )));
        }
        depth += 1;
        if depth > MAX_DIRECTORY_DEPTH {
            return Err(SmdError::Validation(format!(
                "directory nesting exceeds {MAX_DIRECTORY_DEPTH} levels"
            )));
        }
        let dir = catalog
            .get_directory(&id)
            .await?
            .ok_or_else(|| SmdError::NotFound(format!("directory {id}")))?;
        current = dir.parent_directory_id;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;

    #[test]
    fn test_membership_lists_are_unique_and_ordered() {
        let mut dir = Directory::new("docs", "owner", None);
        assert!(dir.add_file("f2"));
        assert!(dir.add_file("f1"));
        assert!(!dir.add_file("f2"));
        assert_eq!(dir.file_ids, ["f2", "f1"]);

        assert!(dir.remove_file("f2"));
        assert!(!dir.remove_file("f2"));
        assert_eq!(dir.file_ids, ["f1"]);
    }

    #[test]
    fn test_subdirectories() {
        let mut dir = Directory::new("root", "owner", None);
        assert!(dir.add_subdirectory("d1"));
        assert!(!dir.add_subdirectory("d1"));
        assert!(dir.remove_subdirectory("d1"));
        assert!(dir.subdirectory_ids.is_empty());
    }

    #[tokio::test]
    async fn test_ensure_acyclic_accepts_chain() {
        let catalog = MemoryCatalog::new();
        let root = Directory::new("root", "o", None);
        let child = Directory::new("child", "o", Some(root.id.clone()));
        catalog.insert_directory(&root).await.unwrap();
        catalog.insert_directory(&child).await.unwrap();

        assert!(ensure_acyclic(&catalog, "new-dir", Some(&child.id)).await.is_ok());
        assert!(ensure_acyclic(&catalog, "new-dir", None).await.is_ok());
    }

    #[tokio::test]
    async fn test_ensure_acyclic_rejects_cycle() {
        let catalog = MemoryCatalog::new();
        let root = Directory::new("root", "o", None);
        let child = Directory::new("child", "o", Some(root.id.clone()));
        catalog.insert_directory(&root).await.unwrap();
        catalog.insert_directory(&child).await.unwrap();

        // Re-parenting root under its own child would form a loop.
        let result = ensure_acyclic(&catalog, &root.id, Some(&child.id)).await;
        assert!(matches!(result, Err(SmdError::Validation(_))));

        let result = ensure_acyclic(&catalog, &root.id, Some(&root.id)).await;
        assert!(matches!(result, Err(SmdError::Validation(_))));
    }

    #[tokio::test]
    async fn test_ensure_acyclic_missing_parent() {
        let catalog = MemoryCatalog::new();
        let result = ensure_acyclic(&catalog, "d", Some("ghost")).await;
        assert!(matches!(result, Err(SmdError::NotFound(_))));
    }
}
