//! 缓冲上传写入器
//! 写入内容先落到本地临时文件，关闭时一次性上传，之后无论成败都删除临时文件

use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tempfile::TempPath;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use crate::error::VfsError;
use crate::storage::ObjectStore;

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Where and how spool files are created / 临时文件设置
#[derive(Debug, Clone)]
pub struct SpoolSettings {
    pub dir: PathBuf,
    pub prefix: String,
    pub buffer_size: usize,
}

impl Default for SpoolSettings {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir(),
            prefix: "bucketfs-".to_string(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

enum WriterState {
    Writing(BufWriter<tokio::fs::File>),
    Uploading(BoxFuture<'static, Result<(), VfsError>>),
    Closed,
}

/// Writer that spools to a private temp file and uploads once on shutdown
/// 缓冲上传写入器
pub struct UploadWriter {
    store: Arc<dyn ObjectStore>,
    container: String,
    key: String,
    /// Removed on drop as well, so an abandoned writer leaves nothing behind
    spool: Option<TempPath>,
    spool_path: PathBuf,
    state: WriterState,
    bytes_written: u64,
}

impl UploadWriter {
    /// Create the spool file and open a buffered writer onto it / 创建临时文件
    pub fn new(
        store: Arc<dyn ObjectStore>,
        container: &str,
        key: &str,
        settings: &SpoolSettings,
    ) -> Result<Self, VfsError> {
        let spool = tempfile::Builder::new()
            .prefix(&settings.prefix)
            .suffix(".spool")
            .tempfile_in(&settings.dir)?;
        let (file, spool) = spool.into_parts();
        let spool_path = spool.to_path_buf();

        let writer = BufWriter::with_capacity(
            settings.buffer_size.max(1),
            tokio::fs::File::from_std(file),
        );

        tracing::debug!("Spool created for {}/{}: {:?}", container, key, spool_path);

        Ok(Self {
            store,
            container: container.to_string(),
            key: key.to_string(),
            spool: Some(spool),
            spool_path,
            state: WriterState::Writing(writer),
            bytes_written: 0,
        })
    }

    /// Local spool file path / 临时文件路径
    pub fn spool_path(&self) -> &Path {
        &self.spool_path
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush the spool, upload it and remove it / 关闭并上传
    ///
    /// The spool is deleted whether or not the upload succeeds.
    pub async fn close(mut self) -> Result<(), VfsError> {
        self.shutdown().await.map_err(VfsError::from_io)
    }

    fn start_upload(&mut self) -> BoxFuture<'static, Result<(), VfsError>> {
        let store = self.store.clone();
        let container = self.container.clone();
        let key = self.key.clone();
        let spool = self.spool.take();
        let bytes = self.bytes_written;

        Box::pin(async move {
            let Some(spool) = spool else {
                return Err(VfsError::Io(std::io::Error::other("spool already released")));
            };

            tracing::debug!("Uploading {} bytes to {}/{}", bytes, container, key);
            let result = store.put_object_from_file(&container, &key, &spool).await;
            remove_spool(spool);

            match result {
                Ok(()) => {
                    tracing::info!("Upload finished: {}/{} ({} bytes)", container, key, bytes);
                    Ok(())
                }
                Err(source) => {
                    tracing::error!("Upload failed: {}/{}: {}", container, key, source);
                    Err(VfsError::Upload { container, key, source })
                }
            }
        })
    }
}

/// Delete the spool, logging instead of failing / 删除临时文件
fn remove_spool(spool: TempPath) {
    let path = spool.to_path_buf();
    if let Err(e) = spool.close() {
        tracing::warn!("Failed to remove spool {:?}: {}", path, e);
    }
}

fn closed_error() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::BrokenPipe, "upload writer already closed")
}

impl AsyncWrite for UploadWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        let this = self.get_mut();
        match &mut this.state {
            WriterState::Writing(w) => {
                let n = ready!(Pin::new(w).poll_write(cx, buf))?;
                this.bytes_written += n as u64;
                Poll::Ready(Ok(n))
            }
            _ => Poll::Ready(Err(closed_error())),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        match &mut this.state {
            WriterState::Writing(w) => Pin::new(w).poll_flush(cx),
            _ => Poll::Ready(Ok(())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                WriterState::Writing(w) => {
                    if let Err(e) = ready!(Pin::new(w).poll_shutdown(cx)) {
                        // Nothing will be uploaded, but the spool still goes
                        tracing::error!("Failed to flush spool for {}/{}: {}", this.container, this.key, e);
                        if let Some(spool) = this.spool.take() {
                            remove_spool(spool);
                        }
                        this.state = WriterState::Closed;
                        return Poll::Ready(Err(e));
                    }
                    let upload = this.start_upload();
                    this.state = WriterState::Uploading(upload);
                }
                WriterState::Uploading(upload) => {
                    let result = ready!(upload.as_mut().poll(cx));
                    this.state = WriterState::Closed;
                    return Poll::Ready(result.map_err(std::io::Error::from));
                }
                WriterState::Closed => return Poll::Ready(Ok(())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::memory::MemoryObjectStore;
    use crate::error::StoreError;
    use crate::storage::{ListPage, ListRequest, ObjectMeta, ObjectStream};
    use async_trait::async_trait;
    use std::ops::Range;

    fn settings(dir: &Path) -> SpoolSettings {
        SpoolSettings {
            dir: dir.to_path_buf(),
            prefix: "test-".to_string(),
            buffer_size: 8,
        }
    }

    fn spool_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_write_then_close_uploads_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryObjectStore::new());

        let mut writer = UploadWriter::new(store.clone(), "bucket", "a/b.txt", &settings(dir.path())).unwrap();
        let spool = writer.spool_path().to_path_buf();
        assert!(spool.exists());

        writer.write_all(b"hello, ").await.unwrap();
        writer.write_all(b"spooled world").await.unwrap();
        // Nothing reaches the store before close
        assert!(!store.contains("bucket", "a/b.txt"));
        assert_eq!(writer.bytes_written(), 20);

        writer.close().await.unwrap();
        assert_eq!(store.get("bucket", "a/b.txt").unwrap().as_ref(), b"hello, spooled world");
        assert_eq!(store.put_count(), 1);
        assert!(!spool.exists());
        assert_eq!(spool_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_empty_writer_uploads_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryObjectStore::new());

        let writer = UploadWriter::new(store.clone(), "bucket", "empty", &settings(dir.path())).unwrap();
        writer.close().await.unwrap();

        assert_eq!(store.get("bucket", "empty").unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_twice_and_write_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryObjectStore::new());

        let mut writer = UploadWriter::new(store.clone(), "bucket", "k", &settings(dir.path())).unwrap();
        writer.write_all(b"data").await.unwrap();
        writer.shutdown().await.unwrap();
        writer.shutdown().await.unwrap();
        assert_eq!(store.put_count(), 1);

        let err = writer.write_all(b"more").await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_dropped_writer_removes_spool() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryObjectStore::new());

        let mut writer = UploadWriter::new(store.clone(), "bucket", "k", &settings(dir.path())).unwrap();
        writer.write_all(b"abandoned").await.unwrap();
        drop(writer);

        assert_eq!(spool_files(dir.path()), 0);
        assert!(!store.contains("bucket", "k"));
    }

    /// Store that rejects every upload
    struct RejectingStore;

    #[async_trait]
    impl ObjectStore for RejectingStore {
        async fn object_exists(&self, _: &str, _: &str) -> Result<bool, StoreError> {
            Ok(false)
        }
        async fn stat_object(&self, c: &str, k: &str) -> Result<ObjectMeta, StoreError> {
            Err(StoreError::not_found(c, k))
        }
        async fn get_object_stream(&self, c: &str, k: &str) -> Result<ObjectStream, StoreError> {
            Err(StoreError::not_found(c, k))
        }
        async fn get_object_range(&self, c: &str, k: &str, _: Range<u64>) -> Result<ObjectStream, StoreError> {
            Err(StoreError::not_found(c, k))
        }
        async fn put_object_from_file(&self, _: &str, _: &str, p: &Path) -> Result<(), StoreError> {
            // The spool must still be there while the upload runs
            assert!(p.exists());
            Err(StoreError::Transport("503 Service Unavailable".to_string()))
        }
        async fn remove_object(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Ok(())
        }
        async fn list_objects(&self, _: &str, _: &ListRequest) -> Result<ListPage, StoreError> {
            Ok(ListPage::default())
        }
    }

    #[tokio::test]
    async fn test_failed_upload_reports_error_and_removes_spool() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = UploadWriter::new(Arc::new(RejectingStore), "bucket", "k", &settings(dir.path())).unwrap();
        let spool = writer.spool_path().to_path_buf();
        writer.write_all(b"never lands").await.unwrap();

        match writer.close().await {
            Err(VfsError::Upload { container, key, source }) => {
                assert_eq!(container, "bucket");
                assert_eq!(key, "k");
                assert!(matches!(source, StoreError::Transport(_)));
            }
            other => panic!("expected upload failure, got {:?}", other),
        }
        assert!(!spool.exists());
        assert_eq!(spool_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_concurrent_writers_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryObjectStore::new());

        let mut handles = Vec::new();
        for i in 0..4 {
            let store = store.clone();
            let settings = settings(dir.path());
            handles.push(tokio::spawn(async move {
                let key = format!("k{}", i);
                let mut writer = UploadWriter::new(store, "bucket", &key, &settings).unwrap();
                for _ in 0..100 {
                    writer.write_all(key.as_bytes()).await.unwrap();
                }
                writer.close().await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for i in 0..4 {
            let key = format!("k{}", i);
            let expected = key.repeat(100);
            assert_eq!(store.get("bucket", &key).unwrap().as_ref(), expected.as_bytes());
        }
        assert_eq!(spool_files(dir.path()), 0);
    }
}
