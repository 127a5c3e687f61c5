//! File management module for SMD.
//!
//! This module provides:
//! - File and directory records
//! - Content hashing (SHA-256)
//! - Content-addressed blob storage with deduplication
//! - The upload ingestion pipeline

mod directory;
pub mod hash;
mod ingest;
mod metadata;
mod storage;

pub use directory::{ensure_acyclic, Directory, MAX_DIRECTORY_DEPTH};
pub use hash::{hash_source, ByteSource, ContentDigest};
pub use ingest::{IngestRequest, Ingestor, UploadSource};
pub use metadata::File;
pub use storage::{validate_hint, BlobStore, FileStorage, PutOutcome};

/// Maximum length for a display name (in characters).
pub const MAX_FILENAME_LENGTH: usize = 255;
