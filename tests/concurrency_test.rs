//! Concurrency tests for SMD.
//!
//! Identical uploads racing each other must converge on one blob while
//! every upload still gets its own catalog record, and a delete never
//! unlinks a blob that an upload in flight is about to register.

use std::io::Cursor;
use std::sync::Arc;

use smd::{Catalog, FileStorage, IngestRequest, Ingestor, MemoryCatalog, UploadSource};
use tempfile::TempDir;

const UPLOADS: usize = 16;

fn request(bytes: &[u8], owner: usize) -> IngestRequest {
    IngestRequest {
        source: UploadSource::File(Box::new(Cursor::new(bytes.to_vec()))),
        declared_size: None,
        content_type: "application/octet-stream".to_string(),
        name: format!("copy-{owner}.bin"),
        hint: Some("race".to_string()),
        owner_id: format!("owner-{owner}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_identical_uploads() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("store");
    let catalog = Arc::new(MemoryCatalog::new());
    let storage = FileStorage::new(&root).unwrap();
    let ingestor = Ingestor::new(catalog.clone(), Arc::new(storage), 1024 * 1024);

    let payload: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();

    let mut handles = Vec::new();
    for i in 0..UPLOADS {
        let ingestor = ingestor.clone();
        let payload = payload.clone();
        handles.push(tokio::spawn(async move {
            ingestor.ingest(request(&payload, i)).await
        }));
    }

    let mut locations = Vec::new();
    for handle in handles {
        let file = handle.await.unwrap().unwrap();
        locations.push(file.location);
    }

    locations.dedup();
    assert_eq!(locations.len(), 1);

    let entries: Vec<_> = std::fs::read_dir(&root)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(entries.len(), 1, "stray files: {entries:?}");
    assert_eq!(std::fs::read(&entries[0]).unwrap(), payload);

    assert_eq!(catalog.get_all_files().await.unwrap().len(), UPLOADS);
    assert_eq!(
        catalog.count_files_at_location(&locations[0]).await.unwrap(),
        UPLOADS as u64
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_distinct_uploads() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("store");
    let catalog = Arc::new(MemoryCatalog::new());
    let ingestor = Ingestor::new(
        catalog.clone(),
        Arc::new(FileStorage::new(&root).unwrap()),
        1024,
    );

    let mut handles = Vec::new();
    for i in 0..UPLOADS {
        let ingestor = ingestor.clone();
        handles.push(tokio::spawn(async move {
            let bytes = format!("payload number {i}");
            ingestor.ingest(request(bytes.as_bytes(), i)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(std::fs::read_dir(&root).unwrap().count(), UPLOADS);
    assert_eq!(catalog.get_all_files().await.unwrap().len(), UPLOADS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_remove_waits_for_deduplicated_upload() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("store");
    let catalog = Arc::new(MemoryCatalog::new());
    let ingestor = Ingestor::new(
        catalog.clone(),
        Arc::new(FileStorage::new(&root).unwrap()),
        1024,
    );

    let alice = ingestor.ingest(request(b"test data", 1)).await.unwrap();

    // Bob's upload finds alice's blob and parks before registering.
    let gate = catalog.gate_next_file_insert();
    let bob = tokio::spawn({
        let ingestor = ingestor.clone();
        async move { ingestor.ingest(request(b"test data", 2)).await }
    });
    gate.entered().await;

    let remove = tokio::spawn({
        let ingestor = ingestor.clone();
        let id = alice.id.clone();
        async move { ingestor.remove(&id).await }
    });
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(!remove.is_finished());

    gate.release();
    let bob = bob.await.unwrap().unwrap();
    remove.await.unwrap().unwrap();

    assert_eq!(bob.location, alice.location);
    assert!(catalog.get_file(&alice.id).await.unwrap().is_none());
    assert_eq!(ingestor.read(&bob).await.unwrap(), b"test data");
    assert_eq!(std::fs::read_dir(&root).unwrap().count(), 1);
}
