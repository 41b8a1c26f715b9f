use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::Arc;

use crate::error::VfsError;

pub mod client;
pub mod manager;

pub use client::{ListPage, ListRequest, ObjectEntry, ObjectMeta, ObjectStore, ObjectStream};
pub use manager::FileSystemManager;

/// What a path denotes / 路径类型
///
/// Always derived on demand, never stored. Folders are inferred from key
/// prefixes and have no backing object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Folder,
    NonExistent,
}

impl EntryKind {
    pub fn exists(&self) -> bool {
        !matches!(self, EntryKind::NonExistent)
    }
}

/// Filesystem capability / 文件系统能力
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    GetType,
    ReadContent,
    AppendContent,
    RandomAccessRead,
    DirectoryReadContent,
    ListChildren,
    LastModified,
    Create,
    Delete,
}

/// One child of a folder listing / 子条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildEntry {
    /// Name relative to the listed folder, without trailing slash / 名称
    pub name: String,
    /// Full path in `container/key` form / 完整路径
    pub path: String,
    pub kind: EntryKind,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Output stream returned by [`FileObject::output_stream`] / 写入流
pub type OutputStream = Box<dyn tokio::io::AsyncWrite + Unpin + Send>;

/// Virtual filesystem entry interface / 虚拟文件对象接口
///
/// One instance represents one path. Implementations are single-owner:
/// state-changing calls take `&mut self`.
#[async_trait]
pub trait FileObject: Send + Sync {
    /// Path this object is bound to / 绑定路径
    fn path(&self) -> &str;

    /// Whether `attach` has completed / 是否已绑定
    fn is_attached(&self) -> bool;

    /// Connect to the backing store, fail fast on anything but absence / 绑定
    async fn attach(&mut self) -> Result<(), VfsError>;

    /// Release any held read handle / 解除绑定
    fn detach(&mut self);

    /// Recompute the entry kind / 获取类型
    async fn file_type(&self) -> Result<EntryKind, VfsError>;

    /// Content length in bytes, 0 for anything that is not a file / 内容大小
    async fn content_size(&self) -> Result<u64, VfsError>;

    /// Best-effort modification time / 最后修改时间
    async fn last_modified(&self) -> Result<Option<DateTime<Utc>>, VfsError>;

    /// Take the read handle opened at attach / 获取读取流
    async fn input_stream(&mut self) -> Result<ObjectStream, VfsError>;

    /// Open a ranged read / 范围读取
    async fn read_range(&self, range: Range<u64>) -> Result<ObjectStream, VfsError>;

    /// Create a writer; the content replaces the object on shutdown / 创建写入流
    async fn output_stream(&self, append: bool) -> Result<OutputStream, VfsError>;

    /// Delete the exact object / 删除
    async fn delete(&mut self) -> Result<(), VfsError>;

    /// Create a folder / 创建目录
    async fn create_folder(&self) -> Result<(), VfsError>;

    /// List immediate children of a folder / 列出子条目
    async fn list_children(&self) -> Result<Vec<ChildEntry>, VfsError>;
}

/// Filesystem root created by a provider / 文件系统根
pub trait FileSystem: Send + Sync {
    /// Create an unattached file object for `path` (`container/key`) / 创建文件对象
    fn file(self: Arc<Self>, path: &str) -> Box<dyn FileObject>;

    fn capabilities(&self) -> &'static [Capability];
}

/// Provider factory keyed by URI scheme / 文件系统提供者
pub trait FileProvider: Send + Sync {
    /// URI scheme handled by this provider / 协议名
    fn scheme(&self) -> &'static str;

    /// Create the filesystem for one endpoint host / 为主机创建文件系统
    fn create_file_system(&self, host: &str) -> anyhow::Result<Arc<dyn FileSystem>>;

    fn capabilities(&self) -> &'static [Capability];
}
