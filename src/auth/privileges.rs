//! Role default privileges and per-resource privilege overrides.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{Role, User};

/// Privilege-related errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrivilegeError {
    /// The acting user lacks the privilege the operation needs.
    #[error("forbidden: {0}")]
    Forbidden(String),
}

/// An operation gated by privileges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Read file contents and metadata.
    Read,
    /// Upload or modify files.
    Write,
    /// Delete files.
    Delete,
    /// Create directories.
    CreateDirectories,
    /// Administer users, privileges and access lists.
    AddUsers,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::Delete => "delete",
            Action::CreateDirectories => "create-directories",
            Action::AddUsers => "add-users",
        })
    }
}

/// A full privilege set. Updates always replace every flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Privileges {
    pub read: bool,
    pub write: bool,
    pub delete: bool,
    pub create_directories: bool,
    pub add_users: bool,
}

impl Privileges {
    /// Every flag set.
    pub const FULL: Privileges = Privileges {
        read: true,
        write: true,
        delete: true,
        create_directories: true,
        add_users: true,
    };

    /// Default privileges for a role.
    ///
    /// This is the process-wide role table; it is a pure function of the
    /// role and never changes at runtime.
    pub const fn for_role(role: Role) -> Privileges {
        match role {
            Role::Admin => Self::FULL,
            Role::Owner => Privileges {
                read: true,
                write: true,
                delete: true,
                create_directories: true,
                add_users: false,
            },
            Role::Regular => Privileges {
                read: true,
                write: false,
                delete: false,
                create_directories: false,
                add_users: false,
            },
            Role::Developer => Privileges {
                read: true,
                write: true,
                delete: false,
                create_directories: true,
                add_users: false,
            },
        }
    }

    /// Whether this set permits `action`.
    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::Read => self.read,
            Action::Write => self.write,
            Action::Delete => self.delete,
            Action::CreateDirectories => self.create_directories,
            Action::AddUsers => self.add_users,
        }
    }
}

/// Per-resource privilege override.
///
/// An override only supersedes the role default while it is set and its
/// `add_users` flag is true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrivilegeOverride {
    privileges: Option<Privileges>,
}

impl PrivilegeOverride {
    /// An override that has never been set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate a stored override.
    pub fn from_privileges(privileges: Privileges) -> Self {
        Self {
            privileges: Some(privileges),
        }
    }

    /// The stored privileges, if any were ever set.
    pub fn privileges(&self) -> Option<Privileges> {
        self.privileges
    }

    /// Whether the override currently supersedes role defaults.
    pub fn is_active(&self) -> bool {
        matches!(self.privileges, Some(p) if p.add_users)
    }

    /// Resolve the effective privileges of `user` against this override.
    pub fn resolve(&self, user: &User) -> Privileges {
        match self.privileges {
            Some(p) if p.add_users => p,
            _ => Privileges::for_role(user.role),
        }
    }

    /// Overwrite every flag. `actor` must currently resolve to AddUsers.
    pub fn set_privileges(
        &mut self,
        read: bool,
        write: bool,
        delete: bool,
        create_directories: bool,
        add_users: bool,
        actor: &User,
    ) -> Result<(), PrivilegeError> {
        self.edit_privileges(
            actor,
            &Privileges {
                read,
                write,
                delete,
                create_directories,
                add_users,
            },
        )
    }

    /// Replace the stored privileges with `new`. `actor` must currently
    /// resolve to AddUsers; on failure the override is left untouched.
    pub fn edit_privileges(&mut self, actor: &User, new: &Privileges) -> Result<(), PrivilegeError> {
        if !self.resolve(actor).add_users {
            return Err(PrivilegeError::Forbidden(format!(
                "user {} may not edit privileges",
                actor.username
            )));
        }
        self.privileges = Some(*new);
        Ok(())
    }
}

/// Resolve a user's privileges, optionally against a resource override.
pub fn resolve_privileges(user: &User, over: Option<&PrivilegeOverride>) -> Privileges {
    match over {
        Some(o) => o.resolve(user),
        None => Privileges::for_role(user.role),
    }
}
