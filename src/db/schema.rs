//! Database schema and migrations for the metadata catalog.
//!
//! Migrations are applied in order; the schema_version table records
//! which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: users and files
    r#"
CREATE TABLE users (
    id          TEXT PRIMARY KEY,
    username    TEXT NOT NULL UNIQUE,
    password    TEXT NOT NULL,           -- Argon2 hash
    email       TEXT NOT NULL DEFAULT '',
    role        TEXT NOT NULL DEFAULT 'regular',  -- 'admin', 'owner', 'regular', 'developer'
    created_at  TEXT NOT NULL
);

CREATE TABLE files (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    size          INTEGER NOT NULL CHECK (size >= 0),
    content_type  TEXT NOT NULL DEFAULT '',
    location      TEXT NOT NULL,         -- content-derived blob path
    upload_date   TEXT NOT NULL,
    owner_id      TEXT NOT NULL
);

CREATE INDEX idx_files_location ON files(location);
CREATE INDEX idx_files_owner_id ON files(owner_id);
"#,
    // v2: directory tree and ordered membership
    r#"
CREATE TABLE directories (
    id                   TEXT PRIMARY KEY,
    name                 TEXT NOT NULL,
    owner_id             TEXT NOT NULL,
    parent_directory_id  TEXT REFERENCES directories(id)
);

CREATE TABLE directory_entries (
    directory_id  TEXT NOT NULL REFERENCES directories(id) ON DELETE CASCADE,
    kind          TEXT NOT NULL,         -- 'file' or 'directory'
    entry_id      TEXT NOT NULL,
    position      INTEGER NOT NULL,
    PRIMARY KEY (directory_id, kind, entry_id)
);

CREATE INDEX idx_directories_parent ON directories(parent_directory_id);
"#,
    // v3: per-resource access control
    r#"
CREATE TABLE acl_entries (
    resource_id  TEXT NOT NULL,
    user_id      TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    position     INTEGER NOT NULL,
    PRIMARY KEY (resource_id, user_id)
);

CREATE TABLE privilege_overrides (
    resource_id         TEXT PRIMARY KEY,
    can_read            INTEGER NOT NULL,
    can_write           INTEGER NOT NULL,
    can_delete          INTEGER NOT NULL,
    create_directories  INTEGER NOT NULL,
    add_users           INTEGER NOT NULL
);
"#,
];
