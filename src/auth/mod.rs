//! Authentication and authorization module for SMD.
//!
//! This module provides password hashing, role default privileges,
//! per-resource overrides and access lists, and the active session registry.

pub mod access;
mod acl;
mod password;
mod privileges;
mod session;

pub use access::authorize;
pub use acl::{AccessControlList, AclError};
pub use password::{
    hash_password, validate_password, verify_password, PasswordError, MAX_PASSWORD_LENGTH,
    MIN_PASSWORD_LENGTH,
};
pub use privileges::{resolve_privileges, Action, PrivilegeError, PrivilegeOverride, Privileges};
pub use session::{
    AuthToken, Session, SessionError, SessionRegistry, DEFAULT_SESSION_DURATION_SECS,
    MAX_SESSION_DURATION_SECS,
};
