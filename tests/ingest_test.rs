//! Ingestion integration tests.
//!
//! Drive the full validate, hash, store and register pipeline against a
//! real directory and both catalog backends.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use smd::{
    Catalog, Database, FileStorage, IngestRequest, Ingestor, MemoryCatalog, SmdError,
    SqliteCatalog, UploadSource,
};
use tempfile::TempDir;

/// SHA-256 of the nine bytes `test data`.
const TEST_DATA_SHA256: &str = "916f0027a575074ce72a331777c3478d6513f786a591bd892da1a577bf2335f9";

fn request(bytes: &[u8], hint: Option<&str>) -> IngestRequest {
    IngestRequest {
        source: UploadSource::File(Box::new(Cursor::new(bytes.to_vec()))),
        declared_size: Some(bytes.len() as u64),
        content_type: "text/plain".to_string(),
        name: "test.txt".to_string(),
        hint: hint.map(str::to_string),
        owner_id: "owner-1".to_string(),
    }
}

fn blob_count(root: &Path) -> usize {
    std::fs::read_dir(root).unwrap().count()
}

fn setup_memory(max: u64) -> (TempDir, Arc<MemoryCatalog>, Ingestor) {
    let temp = TempDir::new().unwrap();
    let catalog = Arc::new(MemoryCatalog::new());
    let storage = FileStorage::new(temp.path().join("store")).unwrap();
    let ingestor = Ingestor::new(catalog.clone(), Arc::new(storage), max);
    (temp, catalog, ingestor)
}

#[tokio::test]
async fn test_ingest_without_hint_uses_bare_digest() {
    let (temp, _catalog, ingestor) = setup_memory(1024);

    let file = ingestor.ingest(request(b"test data", Some(""))).await.unwrap();

    let expected = temp.path().join("store").join(TEST_DATA_SHA256);
    assert_eq!(Path::new(&file.location), expected);
    assert_eq!(std::fs::read(&expected).unwrap(), b"test data");
    assert_eq!(file.size, 9);
}

#[tokio::test]
async fn test_ingest_with_hint_prefixes_digest() {
    let (temp, _catalog, ingestor) = setup_memory(1024);

    let file = ingestor
        .ingest(request(b"test data", Some("taco")))
        .await
        .unwrap();

    let expected = temp
        .path()
        .join("store")
        .join(format!("taco_{TEST_DATA_SHA256}"));
    assert_eq!(Path::new(&file.location), expected);
    assert!(expected.exists());
}

#[tokio::test]
async fn test_identical_uploads_share_one_blob() {
    let (temp, catalog, ingestor) = setup_memory(1024);

    let first = ingestor.ingest(request(b"test data", None)).await.unwrap();
    let second = ingestor.ingest(request(b"test data", None)).await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(first.location, second.location);
    assert_eq!(blob_count(&temp.path().join("store")), 1);
    assert_eq!(
        catalog.count_files_at_location(&first.location).await.unwrap(),
        2
    );
}

#[tokio::test]
async fn test_identical_hinted_uploads_share_one_blob() {
    let (temp, _catalog, ingestor) = setup_memory(1024);

    let first = ingestor
        .ingest(request(b"test data", Some("taco")))
        .await
        .unwrap();
    let second = ingestor
        .ingest(request(b"test data", Some("taco")))
        .await
        .unwrap();

    let expected = temp
        .path()
        .join("store")
        .join(format!("taco_{TEST_DATA_SHA256}"));
    assert_eq!(Path::new(&first.location), expected);
    assert_eq!(Path::new(&second.location), expected);
    assert_ne!(first.id, second.id);
    assert_eq!(blob_count(&temp.path().join("store")), 1);
}

#[tokio::test]
async fn test_same_bytes_different_hints_are_separate_blobs() {
    let (temp, _catalog, ingestor) = setup_memory(1024);

    ingestor.ingest(request(b"test data", None)).await.unwrap();
    ingestor
        .ingest(request(b"test data", Some("taco")))
        .await
        .unwrap();

    assert_eq!(blob_count(&temp.path().join("store")), 2);
}

#[tokio::test]
async fn test_oversized_upload_writes_nothing() {
    let (temp, catalog, ingestor) = setup_memory(8);

    let result = ingestor.ingest(request(b"test data", None)).await;

    assert!(matches!(
        result,
        Err(SmdError::PayloadTooLarge { size: 9, max: 8 })
    ));
    assert_eq!(blob_count(&temp.path().join("store")), 0);
    assert!(catalog.get_all_files().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_undeclared_oversized_upload_is_counted() {
    let (temp, _catalog, ingestor) = setup_memory(8);
    let mut req = request(b"test data", None);
    req.declared_size = None;

    let result = ingestor.ingest(req).await;

    assert!(matches!(result, Err(SmdError::PayloadTooLarge { .. })));
    assert_eq!(blob_count(&temp.path().join("store")), 0);
}

#[tokio::test]
async fn test_metadata_failure_leaves_orphan_blob() {
    let (temp, catalog, ingestor) = setup_memory(1024);
    catalog.fail_file_inserts(true);

    let result = ingestor.ingest(request(b"test data", None)).await;

    assert!(matches!(result, Err(SmdError::Metadata(_))));
    assert!(temp.path().join("store").join(TEST_DATA_SHA256).exists());
    assert!(catalog.get_all_files().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_escaping_hint_is_rejected() {
    let (temp, _catalog, ingestor) = setup_memory(1024);

    let result = ingestor.ingest(request(b"test data", Some("../up"))).await;

    assert!(matches!(result, Err(SmdError::Validation(_))));
    assert_eq!(blob_count(&temp.path().join("store")), 0);
}

#[tokio::test]
async fn test_sqlite_catalog_end_to_end() {
    let temp = TempDir::new().unwrap();
    let db = Database::open_in_memory().await.unwrap();
    let catalog: Arc<dyn Catalog> = Arc::new(SqliteCatalog::new(&db));
    let storage = FileStorage::new(temp.path().join("store")).unwrap();
    let ingestor = Ingestor::new(Arc::clone(&catalog), Arc::new(storage), 1024);

    let first = ingestor.ingest(request(b"test data", None)).await.unwrap();
    let second = ingestor.ingest(request(b"test data", None)).await.unwrap();

    let stored = catalog.get_file(&first.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "test.txt");
    assert_eq!(stored.size, 9);
    assert_eq!(stored.owner_id, "owner-1");
    assert_eq!(ingestor.read(&stored).await.unwrap(), b"test data");

    ingestor.remove(&first.id).await.unwrap();
    assert!(Path::new(&second.location).exists());

    ingestor.remove(&second.id).await.unwrap();
    assert!(!Path::new(&second.location).exists());
    assert!(catalog.get_all_files().await.unwrap().is_empty());
}
