//! 文件对象绑定：把路径映射到对象存储操作
//!
//! State machine `Detached -> Attached -> Detached`. Attaching probes the
//! exact key and, when the object exists, holds a read handle for it.
//! Everything else is recomputed from the path on every call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::ops::Range;
use std::sync::Arc;

use crate::error::VfsError;
use crate::storage::{ChildEntry, EntryKind, FileObject, ListRequest, ObjectStream, OutputStream};
use crate::utils::key_name;
use super::classify::{classify, listing_prefix};
use super::filesystem::S3FileSystem;
use super::path::{resolve, ResolvedPath};
use super::reader::{self, ObjectReader};
use super::writer::UploadWriter;

/// Binding of one path to object storage / 对象存储文件对象
pub struct S3FileObject {
    fs: Arc<S3FileSystem>,
    path: String,
    attached: bool,
    /// Held since attach, at most one / 绑定时打开的读取流
    reader: Mutex<Option<ObjectReader>>,
}

impl S3FileObject {
    pub fn new(fs: Arc<S3FileSystem>, path: &str) -> Self {
        Self {
            fs,
            path: path.to_string(),
            attached: false,
            reader: Mutex::new(None),
        }
    }

    fn resolved(&self) -> Result<ResolvedPath, VfsError> {
        resolve(&self.path)
    }

    /// Whether a read handle is currently held / 是否持有读取流
    pub fn has_reader(&self) -> bool {
        self.reader.lock().is_some()
    }

    /// Typed writer for this path / 创建写入器
    ///
    /// Object storage cannot append, so `append = true` is rejected rather
    /// than silently turned into an overwrite.
    pub fn writer(&self, append: bool) -> Result<UploadWriter, VfsError> {
        if append {
            return Err(VfsError::AppendUnsupported(self.path.clone()));
        }
        let resolved = self.resolved()?;
        if resolved.is_root() {
            return Err(VfsError::InvalidPath(self.path.clone()));
        }
        UploadWriter::new(
            self.fs.store().clone(),
            &resolved.container,
            &resolved.key,
            self.fs.spool(),
        )
    }

    async fn stat(&self) -> Result<Option<crate::storage::ObjectMeta>, VfsError> {
        let resolved = self.resolved()?;
        if resolved.is_root() {
            return Ok(None);
        }
        match self.fs.store().stat_object(&resolved.container, &resolved.key).await {
            Ok(meta) => Ok(Some(meta)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl FileObject for S3FileObject {
    fn path(&self) -> &str {
        &self.path
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    async fn attach(&mut self) -> Result<(), VfsError> {
        let resolved = self.resolved()?;
        let store = self.fs.store().clone();

        match reader::open(store.as_ref(), &resolved.container, &resolved.key).await {
            Ok(opened) => {
                tracing::debug!(
                    "Attached {} ({})",
                    resolved,
                    if opened.is_some() { "object found" } else { "no object" }
                );
                *self.reader.get_mut() = opened;
                self.attached = true;
                Ok(())
            }
            Err(source) => {
                tracing::error!("Attach failed for {}: {}", resolved, source);
                *self.reader.get_mut() = None;
                self.attached = false;
                Err(VfsError::Attach {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    fn detach(&mut self) {
        *self.reader.get_mut() = None;
        self.attached = false;
    }

    async fn file_type(&self) -> Result<EntryKind, VfsError> {
        let resolved = self.resolved()?;
        classify(
            self.fs.store().as_ref(),
            &resolved.container,
            &resolved.key,
            self.fs.policy(),
        )
        .await
    }

    async fn content_size(&self) -> Result<u64, VfsError> {
        Ok(self.stat().await?.map(|meta| meta.size).unwrap_or(0))
    }

    async fn last_modified(&self) -> Result<Option<DateTime<Utc>>, VfsError> {
        Ok(self.stat().await?.and_then(|meta| meta.last_modified))
    }

    async fn input_stream(&mut self) -> Result<ObjectStream, VfsError> {
        if !self.attached {
            self.attach().await?;
        }
        if let Some(held) = self.reader.get_mut().take() {
            return Ok(Box::new(held));
        }

        // The handle from attach was already handed out, or there was none
        let resolved = self.resolved()?;
        let store = self.fs.store().clone();
        match reader::open(store.as_ref(), &resolved.container, &resolved.key).await? {
            Some(opened) => Ok(Box::new(opened)),
            None => Err(VfsError::NotAFile(self.path.clone())),
        }
    }

    async fn read_range(&self, range: Range<u64>) -> Result<ObjectStream, VfsError> {
        let resolved = self.resolved()?;
        if resolved.is_root() {
            return Err(VfsError::NotAFile(self.path.clone()));
        }
        match self
            .fs
            .store()
            .get_object_range(&resolved.container, &resolved.key, range)
            .await
        {
            Ok(stream) => Ok(Box::new(ObjectReader::new(&resolved.container, &resolved.key, stream))),
            Err(e) if e.is_not_found() => Err(VfsError::NotAFile(self.path.clone())),
            Err(e) => Err(e.into()),
        }
    }

    async fn output_stream(&self, append: bool) -> Result<OutputStream, VfsError> {
        Ok(Box::new(self.writer(append)?))
    }

    async fn delete(&mut self) -> Result<(), VfsError> {
        let resolved = self.resolved()?;
        if resolved.is_root() {
            return Err(VfsError::InvalidPath(self.path.clone()));
        }

        self.fs
            .store()
            .remove_object(&resolved.container, &resolved.key)
            .await?;
        // The held handle refers to content that is gone
        *self.reader.get_mut() = None;

        tracing::info!("Deleted {}", resolved);
        Ok(())
    }

    async fn create_folder(&self) -> Result<(), VfsError> {
        // Folders only exist as key prefixes, there is nothing to create
        tracing::info!("create_folder called for {}, nothing to do", self.path);
        Ok(())
    }

    async fn list_children(&self) -> Result<Vec<ChildEntry>, VfsError> {
        let resolved = self.resolved()?;
        if !resolved.is_root() {
            let kind = self.file_type().await?;
            if kind != EntryKind::Folder {
                return Err(VfsError::NotAFolder(self.path.clone()));
            }
        }

        let container = &resolved.container;
        let prefix = listing_prefix(&resolved.key);
        let store = self.fs.store();

        // Folders before files, each in key order, independent of page size
        let mut folders = Vec::new();
        let mut files = Vec::new();
        let mut token = None;
        loop {
            let request = ListRequest::prefix(prefix.clone())
                .delimiter("/")
                .continuation(token);
            let page = store.list_objects(container, &request).await?;

            // 处理目录（公共前缀），只去掉一个结尾分隔符
            for common in &page.common_prefixes {
                let child_key = common.strip_suffix('/').unwrap_or(common);
                let name = key_name(common);
                // `a//` under `a/` would resolve back to the listed folder
                if name.is_empty() {
                    tracing::debug!("Skipping empty-named prefix {}/{}", container, common);
                    continue;
                }
                folders.push(ChildEntry {
                    name: name.to_string(),
                    path: format!("{}/{}", container, child_key),
                    kind: EntryKind::Folder,
                    size: 0,
                    modified: None,
                });
            }

            // 处理文件，跳过目录占位对象
            for object in &page.objects {
                if object.key == prefix || object.key.ends_with('/') {
                    continue;
                }
                files.push(ChildEntry {
                    name: key_name(&object.key).to_string(),
                    path: format!("{}/{}", container, object.key),
                    kind: EntryKind::File,
                    size: object.size,
                    modified: object.last_modified,
                });
            }

            token = page.next_continuation_token;
            if token.is_none() {
                break;
            }
        }

        let mut children = folders;
        children.extend(files);
        tracing::debug!("Listed {} children under {}", children.len(), resolved);
        Ok(children)
    }
}
