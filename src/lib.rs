//! SMD - Simple Media Depot
//!
//! A content-addressed file store with deduplicating ingestion, a metadata
//! catalog, role and access-list authorization, and an HTTP upload edge.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use auth::{
    authorize, hash_password, resolve_privileges, validate_password, verify_password,
    AccessControlList, AclError, Action, AuthToken, PasswordError, PrivilegeError,
    PrivilegeOverride, Privileges, Session, SessionError, SessionRegistry,
};
pub use catalog::{Catalog, MemoryCatalog, SqliteCatalog};
pub use config::Config;
pub use db::{Database, Role, User};
pub use error::{Result, SmdError};
pub use file::{
    BlobStore, ContentDigest, Directory, File, FileStorage, IngestRequest, Ingestor, PutOutcome,
    UploadSource,
};
pub use web::{create_router, AppState, WebServer};
