//! Upload ingestion: validate, hash, store, register.

use std::collections::HashMap;
use std::fmt;
use std::io::Seek;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};

use super::hash::{hash_source, ByteSource};
use super::metadata::File;
use super::storage::{validate_hint, BlobStore, PutOutcome};
use super::MAX_FILENAME_LENGTH;
use crate::catalog::Catalog;
use crate::{Result, SmdError};

/// Presence of the uploaded bytes in a request.
pub enum UploadSource {
    /// The request carried no body at all.
    NoBody,
    /// The body was present but had no file field.
    NoFileField,
    File(Box<dyn ByteSource>),
}

impl fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadSource::NoBody => f.write_str("NoBody"),
            UploadSource::NoFileField => f.write_str("NoFileField"),
            UploadSource::File(_) => f.write_str("File(..)"),
        }
    }
}

/// One upload to ingest.
#[derive(Debug)]
pub struct IngestRequest {
    pub source: UploadSource,
    /// Size claimed by the caller, if known.
    pub declared_size: Option<u64>,
    pub content_type: String,
    pub name: String,
    /// Optional destination hint prefixed to the blob name.
    pub hint: Option<String>,
    /// Resolved identity of the uploader.
    pub owner_id: String,
}

/// Per-location async locks.
///
/// A blob write plus its catalog insert, and a record delete plus the
/// reference count and blob unlink, run under the lock of their location.
#[derive(Default)]
struct LocationLocks {
    locks: parking_lot::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl LocationLocks {
    async fn acquire(&self, location: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(location.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}

/// Runs uploads through validation, hashing, storage and registration.
#[derive(Clone)]
pub struct Ingestor {
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn BlobStore>,
    max_upload_size: u64,
    locks: Arc<LocationLocks>,
}

impl Ingestor {
    pub fn new(catalog: Arc<dyn Catalog>, store: Arc<dyn BlobStore>, max_upload_size: u64) -> Self {
        Self {
            catalog,
            store,
            max_upload_size,
            locks: Arc::new(LocationLocks::default()),
        }
    }

    pub fn max_upload_size(&self) -> u64 {
        self.max_upload_size
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    /// Ingest one upload and return its registered record.
    ///
    /// Nothing is stored unless validation passes. The catalog insert only
    /// happens after the blob is durable; if that insert fails the blob
    /// stays on disk unreferenced and `Metadata` is returned.
    pub async fn ingest(&self, request: IngestRequest) -> Result<File> {
        let max = self.max_upload_size;
        if let Some(size) = request.declared_size {
            if size > max {
                return Err(SmdError::PayloadTooLarge { size, max });
            }
        }

        let mut source = match request.source {
            UploadSource::NoBody => return Err(SmdError::EmptyBody),
            UploadSource::NoFileField => return Err(SmdError::MissingFile),
            UploadSource::File(source) => source,
        };

        if request.name.trim().is_empty() {
            return Err(SmdError::Validation("file name is required".to_string()));
        }
        if request.name.chars().count() > MAX_FILENAME_LENGTH {
            return Err(SmdError::Validation(format!(
                "file name exceeds {MAX_FILENAME_LENGTH} characters"
            )));
        }
        let hint = validate_hint(request.hint.as_deref())?.map(str::to_string);

        let store = Arc::clone(&self.store);
        let (digest, path, source) = tokio::task::spawn_blocking(move || {
            let digest = hash_source(&mut *source, max)?;
            let path = store.location(hint.as_deref(), &digest.hex)?;
            Ok::<_, SmdError>((digest, path, source))
        })
        .await
        .map_err(|e| SmdError::Storage(std::io::Error::other(e)))??;

        let location = path.to_string_lossy().into_owned();
        let _guard = self.locks.acquire(&location).await;

        let store = Arc::clone(&self.store);
        let outcome = tokio::task::spawn_blocking(move || {
            let mut source = source;
            source.rewind().map_err(SmdError::Storage)?;
            store.put(&path, &mut *source)
        })
        .await
        .map_err(|e| SmdError::Storage(std::io::Error::other(e)))??;

        let file = File::new(
            request.name,
            digest.size,
            request.content_type,
            location,
            request.owner_id,
        );

        if let Err(e) = self.catalog.insert_file(&file).await {
            warn!(
                location = %file.location,
                digest = %digest.hex,
                error = %e,
                "Catalog insert failed, blob left unreferenced"
            );
            return Err(SmdError::Metadata(e.to_string()));
        }

        info!(
            file_id = %file.id,
            digest = %digest.hex,
            size = digest.size,
            deduplicated = outcome == PutOutcome::Deduplicated,
            "File ingested"
        );
        Ok(file)
    }

    /// Delete a file record, removing its blob once nothing else uses it.
    pub async fn remove(&self, file_id: &str) -> Result<File> {
        let file = self
            .catalog
            .get_file(file_id)
            .await?
            .ok_or_else(|| SmdError::NotFound(format!("file {file_id}")))?;

        let _guard = self.locks.acquire(&file.location).await;
        if !self.catalog.delete_file(file_id).await? {
            return Err(SmdError::NotFound(format!("file {file_id}")));
        }

        if self.catalog.count_files_at_location(&file.location).await? == 0 {
            let store = Arc::clone(&self.store);
            let location = file.location.clone();
            let removed = tokio::task::spawn_blocking(move || store.delete(Path::new(&location)))
                .await
                .map_err(|e| SmdError::Storage(std::io::Error::other(e)))??;
            info!(file_id, location = %file.location, removed, "Blob released");
        }

        Ok(file)
    }

    /// Read the stored bytes of a file.
    pub async fn read(&self, file: &File) -> Result<Vec<u8>> {
        let store = Arc::clone(&self.store);
        let location = file.location.clone();
        tokio::task::spawn_blocking(move || store.get(Path::new(&location)))
            .await
            .map_err(|e| SmdError::Storage(std::io::Error::other(e)))?
    }
}

impl fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ingestor")
            .field("max_upload_size", &self.max_upload_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::file::FileStorage;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn setup(max: u64) -> (Ingestor, Arc<MemoryCatalog>, FileStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().join("store")).unwrap();
        let catalog = Arc::new(MemoryCatalog::new());
        let ingestor = Ingestor::new(catalog.clone(), Arc::new(storage.clone()), max);
        (ingestor, catalog, storage, temp_dir)
    }

    fn request(data: &[u8], hint: Option<&str>) -> IngestRequest {
        IngestRequest {
            source: UploadSource::File(Box::new(Cursor::new(data.to_vec()))),
            declared_size: Some(data.len() as u64),
            content_type: "text/plain".to_string(),
            name: "notes.txt".to_string(),
            hint: hint.map(str::to_string),
            owner_id: "owner-1".to_string(),
        }
    }

    fn blob_count(storage: &FileStorage) -> usize {
        std::fs::read_dir(storage.root()).unwrap().count()
    }

    #[tokio::test]
    async fn test_ingest_registers_file() {
        let (ingestor, catalog, storage, _temp) = setup(1024);

        let file = ingestor.ingest(request(b"test data", None)).await.unwrap();

        assert_eq!(file.size, 9);
        assert_eq!(file.name, "notes.txt");
        assert_eq!(file.content_type, "text/plain");
        assert_eq!(file.owner_id, "owner-1");
        assert!(file.location.ends_with(crate::file::hash::hash_bytes(b"test data").as_str()));
        assert_eq!(catalog.get_file(&file.id).await.unwrap(), Some(file.clone()));
        assert_eq!(ingestor.read(&file).await.unwrap(), b"test data");
        assert_eq!(blob_count(&storage), 1);
    }

    #[tokio::test]
    async fn test_declared_size_over_limit_stores_nothing() {
        let (ingestor, catalog, storage, _temp) = setup(4);

        let result = ingestor.ingest(request(b"test data", None)).await;

        assert!(matches!(result, Err(SmdError::PayloadTooLarge { size: 9, max: 4 })));
        assert_eq!(blob_count(&storage), 0);
        assert!(catalog.get_all_files().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_under_declared_size_is_caught() {
        let (ingestor, _catalog, storage, _temp) = setup(4);
        let mut req = request(b"test data", None);
        req.declared_size = Some(2);

        let result = ingestor.ingest(req).await;

        assert!(matches!(result, Err(SmdError::PayloadTooLarge { max: 4, .. })));
        assert_eq!(blob_count(&storage), 0);
    }

    #[tokio::test]
    async fn test_presence_errors() {
        let (ingestor, _catalog, _storage, _temp) = setup(1024);

        let mut req = request(b"", None);
        req.source = UploadSource::NoBody;
        assert!(matches!(ingestor.ingest(req).await, Err(SmdError::EmptyBody)));

        let mut req = request(b"", None);
        req.source = UploadSource::NoFileField;
        assert!(matches!(ingestor.ingest(req).await, Err(SmdError::MissingFile)));
    }

    #[tokio::test]
    async fn test_bad_hint_rejected_before_storage() {
        let (ingestor, _catalog, storage, _temp) = setup(1024);
        let result = ingestor.ingest(request(b"test data", Some("../up"))).await;
        assert!(matches!(result, Err(SmdError::Validation(_))));
        assert_eq!(blob_count(&storage), 0);
    }

    #[tokio::test]
    async fn test_metadata_failure_orphans_blob() {
        let (ingestor, catalog, storage, _temp) = setup(1024);
        catalog.fail_file_inserts(true);

        let result = ingestor.ingest(request(b"test data", None)).await;

        assert!(matches!(result, Err(SmdError::Metadata(_))));
        assert_eq!(blob_count(&storage), 1);
    }

    #[tokio::test]
    async fn test_remove_keeps_shared_blob() {
        let (ingestor, catalog, storage, _temp) = setup(1024);
        let first = ingestor.ingest(request(b"test data", None)).await.unwrap();
        let second = ingestor.ingest(request(b"test data", None)).await.unwrap();
        assert_eq!(first.location, second.location);

        ingestor.remove(&first.id).await.unwrap();
        assert_eq!(blob_count(&storage), 1);

        ingestor.remove(&second.id).await.unwrap();
        assert_eq!(blob_count(&storage), 0);
        assert!(catalog.get_all_files().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_unknown() {
        let (ingestor, _catalog, _storage, _temp) = setup(1024);
        assert!(matches!(
            ingestor.remove("missing").await,
            Err(SmdError::NotFound(_))
        ));
    }
}
