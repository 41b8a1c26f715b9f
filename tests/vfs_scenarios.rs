//! End-to-end behaviour of the object-storage filesystem against the
//! in-memory store.

use std::sync::Arc;

use bucketfs::drivers::memory::{MemoryFileProvider, MemoryObjectStore};
use bucketfs::drivers::s3::{classify, resolve, resolve_opt, ProbePolicy, S3FileSystem, SpoolSettings, ROOT_KEY};
use bucketfs::storage::{EntryKind, FileSystem, FileSystemManager};
use bucketfs::VfsError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

struct Harness {
    store: Arc<MemoryObjectStore>,
    fs: Arc<S3FileSystem>,
    spool_dir: tempfile::TempDir,
}

impl Harness {
    fn new() -> Self {
        let spool_dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryObjectStore::new());
        let spool = SpoolSettings {
            dir: spool_dir.path().to_path_buf(),
            ..Default::default()
        };
        let fs = Arc::new(S3FileSystem::new(store.clone(), spool, ProbePolicy::FailOpen));
        Self { store, fs, spool_dir }
    }

    fn spool_files(&self) -> usize {
        std::fs::read_dir(self.spool_dir.path()).unwrap().count()
    }

    async fn write(&self, path: &str, data: &[u8]) {
        let file = self.fs.clone().file(path);
        let mut out = file.output_stream(false).await.unwrap();
        out.write_all(data).await.unwrap();
        out.shutdown().await.unwrap();
    }

    async fn read(&self, path: &str) -> Vec<u8> {
        let mut file = self.fs.clone().file(path);
        file.attach().await.unwrap();
        let mut input = file.input_stream().await.unwrap();
        let mut out = Vec::new();
        input.read_to_end(&mut out).await.unwrap();
        out
    }
}

#[test]
fn resolver_cases() {
    for name in ["bucket", "my-container", "x"] {
        let resolved = resolve(name).unwrap();
        assert_eq!(resolved.container, name);
        assert_eq!(resolved.key, ROOT_KEY);
    }

    let resolved = resolve("c/a/b").unwrap();
    assert_eq!((resolved.container.as_str(), resolved.key.as_str()), ("c", "a/b"));

    assert!(matches!(resolve(""), Err(VfsError::InvalidPath(_))));
    assert!(matches!(resolve("/"), Err(VfsError::InvalidPath(_))));
    assert!(matches!(resolve_opt(None), Err(VfsError::InvalidPath(_))));
}

#[tokio::test]
async fn hello_round_trip() {
    let h = Harness::new();
    h.write("bucket/a/b.txt", b"hello").await;

    assert_eq!(h.read("bucket/a/b.txt").await, b"hello");
    assert_eq!(h.spool_files(), 0);
    assert_eq!(h.store.put_count(), 1);
}

#[tokio::test]
async fn round_trip_preserves_binary_content() {
    let h = Harness::new();
    let payload: Vec<u8> = (0..200_000u32).map(|i| (i * 31 % 251) as u8).collect();
    h.write("bucket/blob.bin", &payload).await;

    assert_eq!(h.read("bucket/blob.bin").await, payload);
    let file = h.fs.clone().file("bucket/blob.bin");
    assert_eq!(file.content_size().await.unwrap(), payload.len() as u64);
}

#[tokio::test]
async fn container_root_with_objects_is_folder() {
    let h = Harness::new();
    h.store.insert("bucket", "x", b"1".to_vec());
    h.store.insert("bucket", "y", b"2".to_vec());

    let kind = classify(h.store.as_ref(), "bucket", ROOT_KEY, ProbePolicy::FailOpen).await.unwrap();
    assert_eq!(kind, EntryKind::Folder);

    let root = h.fs.clone().file("bucket");
    assert_eq!(root.file_type().await.unwrap(), EntryKind::Folder);
}

#[tokio::test]
async fn deleted_path_is_never_a_file() {
    let h = Harness::new();
    h.write("bucket/docs", b"object at the prefix").await;
    h.write("bucket/docs/inner.txt", b"descendant").await;
    h.write("bucket/lonely.txt", b"alone").await;

    let mut docs = h.fs.clone().file("bucket/docs");
    docs.attach().await.unwrap();
    assert_eq!(docs.file_type().await.unwrap(), EntryKind::File);
    docs.delete().await.unwrap();
    assert_eq!(docs.file_type().await.unwrap(), EntryKind::Folder);

    let mut lonely = h.fs.clone().file("bucket/lonely.txt");
    lonely.attach().await.unwrap();
    lonely.delete().await.unwrap();
    assert_eq!(lonely.file_type().await.unwrap(), EntryKind::NonExistent);
}

#[tokio::test]
async fn concurrent_writers_do_not_interfere() {
    let h = Harness::new();

    let left = {
        let fs = h.fs.clone();
        tokio::spawn(async move {
            let file = fs.file("bucket/left.txt");
            let mut out = file.output_stream(false).await.unwrap();
            for _ in 0..500 {
                out.write_all(b"L").await.unwrap();
                tokio::task::yield_now().await;
            }
            out.shutdown().await.unwrap();
        })
    };
    let right = {
        let fs = h.fs.clone();
        tokio::spawn(async move {
            let file = fs.file("bucket/right.txt");
            let mut out = file.output_stream(false).await.unwrap();
            for _ in 0..500 {
                out.write_all(b"R").await.unwrap();
                tokio::task::yield_now().await;
            }
            out.shutdown().await.unwrap();
        })
    };
    left.await.unwrap();
    right.await.unwrap();

    assert_eq!(h.read("bucket/left.txt").await, vec![b'L'; 500]);
    assert_eq!(h.read("bucket/right.txt").await, vec![b'R'; 500]);
    assert_eq!(h.spool_files(), 0);
}

#[tokio::test]
async fn writes_are_invisible_until_close() {
    let h = Harness::new();
    h.write("bucket/doc.txt", b"v1").await;

    let file = h.fs.clone().file("bucket/doc.txt");
    let mut out = file.output_stream(false).await.unwrap();
    out.write_all(b"v2, not yet uploaded").await.unwrap();
    out.flush().await.unwrap();

    assert_eq!(h.read("bucket/doc.txt").await, b"v1");
    out.shutdown().await.unwrap();
    assert_eq!(h.read("bucket/doc.txt").await, b"v2, not yet uploaded");
}

#[tokio::test]
async fn listing_collapses_one_level() {
    let h = Harness::new();
    for path in [
        "bucket/photos/2023/jan/a.jpg",
        "bucket/photos/2023/feb/b.jpg",
        "bucket/photos/2024/c.jpg",
        "bucket/photos/cover.jpg",
        "bucket/readme.md",
    ] {
        h.write(path, b"data").await;
    }

    let photos = h.fs.clone().file("bucket/photos");
    let children = photos.list_children().await.unwrap();
    let names: Vec<(&str, EntryKind)> = children.iter().map(|c| (c.name.as_str(), c.kind)).collect();
    assert_eq!(
        names,
        vec![
            ("2023", EntryKind::Folder),
            ("2024", EntryKind::Folder),
            ("cover.jpg", EntryKind::File),
        ]
    );

    // Every listed child classifies the way it was listed
    for child in &children {
        let file = h.fs.clone().file(&child.path);
        assert_eq!(file.file_type().await.unwrap(), child.kind);
    }
}

#[tokio::test]
async fn manager_resolves_memory_uris() {
    let store = Arc::new(MemoryObjectStore::new());
    let spool_dir = tempfile::tempdir().unwrap();
    let spool = SpoolSettings {
        dir: spool_dir.path().to_path_buf(),
        ..Default::default()
    };

    let manager = FileSystemManager::new();
    manager
        .add_provider(Box::new(MemoryFileProvider::new(store.clone(), spool)))
        .await
        .unwrap();

    let file = manager.resolve_file("mem://local/bucket/notes/todo.txt").await.unwrap();
    assert_eq!(file.file_type().await.unwrap(), EntryKind::NonExistent);
    let mut out = file.output_stream(false).await.unwrap();
    out.write_all(b"- buy milk").await.unwrap();
    out.shutdown().await.unwrap();

    let mut again = manager.resolve_file("mem://local/bucket/notes/todo.txt").await.unwrap();
    let mut content = String::new();
    again.input_stream().await.unwrap().read_to_string(&mut content).await.unwrap();
    assert_eq!(content, "- buy milk");

    let notes = manager.resolve_file("mem://local/bucket/notes").await.unwrap();
    assert_eq!(notes.file_type().await.unwrap(), EntryKind::Folder);
    assert_eq!(std::fs::read_dir(spool_dir.path()).unwrap().count(), 0);
}
