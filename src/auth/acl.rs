//! Per-resource access control lists.

use thiserror::Error;

use crate::db::User;

/// ACL membership errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AclError {
    /// The user is already a member.
    #[error("user {0} already in access list")]
    AlreadyExists(String),

    /// The user is not a member.
    #[error("user {0} not in access list")]
    NotFound(String),
}

/// Ordered set of users granted access to one file or directory.
///
/// Membership is keyed by user ID. Iteration follows insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessControlList {
    users: Vec<User>,
}

impl AccessControlList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from stored members, dropping repeated IDs.
    pub fn from_users(users: impl IntoIterator<Item = User>) -> Self {
        let mut acl = Self::new();
        for user in users {
            let _ = acl.add_user(user);
        }
        acl
    }

    /// Add a user. Fails if a user with the same ID is already present.
    pub fn add_user(&mut self, user: User) -> Result<(), AclError> {
        if self.has_user_with_id(&user.id) {
            return Err(AclError::AlreadyExists(user.id));
        }
        self.users.push(user);
        Ok(())
    }

    /// Remove a user. Fails if the user is absent.
    pub fn remove_user(&mut self, user: &User) -> Result<(), AclError> {
        self.remove_user_with_id(&user.id)
    }

    /// Remove a user by ID. Fails if the ID is absent.
    pub fn remove_user_with_id(&mut self, user_id: &str) -> Result<(), AclError> {
        let pos = self
            .users
            .iter()
            .position(|u| u.id == user_id)
            .ok_or_else(|| AclError::NotFound(user_id.to_string()))?;
        self.users.remove(pos);
        Ok(())
    }

    pub fn has_user(&self, user: &User) -> bool {
        self.has_user_with_id(&user.id)
    }

    pub fn has_user_with_id(&self, user_id: &str) -> bool {
        self.users.iter().any(|u| u.id == user_id)
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.iter()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
