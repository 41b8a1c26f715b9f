//! Object storage client capability set / 对象存储客户端能力集
//!
//! The virtual filesystem only ever talks to object storage through
//! [`ObjectStore`]. Implementations must be safe to share between bindings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::Path;
use tokio::io::AsyncRead;

use crate::error::StoreError;

/// Readable object content / 对象内容读取流
pub type ObjectStream = Box<dyn AsyncRead + Unpin + Send>;

/// One object returned by a listing / 列表中的对象
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Metadata of an exact key / 对象元数据
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectMeta {
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Listing request / 列表请求
#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    /// Key prefix, empty for the whole container / 前缀
    pub prefix: String,
    /// Collapse keys past the first delimiter into common prefixes / 分隔符
    pub delimiter: Option<String>,
    pub max_keys: Option<usize>,
    pub continuation_token: Option<String>,
}

impl ListRequest {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Default::default()
        }
    }

    pub fn delimiter(mut self, delimiter: &str) -> Self {
        self.delimiter = Some(delimiter.to_string());
        self
    }

    pub fn max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = Some(max_keys);
        self
    }

    pub fn continuation(mut self, token: Option<String>) -> Self {
        self.continuation_token = token;
        self
    }
}

/// One page of a listing / 列表分页结果
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub objects: Vec<ObjectEntry>,
    /// Prefixes ending in the delimiter, only filled when a delimiter was given
    pub common_prefixes: Vec<String>,
    /// Set when more pages follow / 存在下一页时设置
    pub next_continuation_token: Option<String>,
}

impl ListPage {
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.common_prefixes.is_empty()
    }
}

/// Storage client interface (primitive operations only) / 存储客户端接口
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Exact-key probe. Absence is `Ok(false)`, never an error.
    /// 精确键探测
    async fn object_exists(&self, container: &str, key: &str) -> Result<bool, StoreError>;

    /// Size and modification time of an exact key / 获取对象元数据
    async fn stat_object(&self, container: &str, key: &str) -> Result<ObjectMeta, StoreError>;

    /// Open a stream over the current content of an object / 打开对象读取流
    async fn get_object_stream(&self, container: &str, key: &str)
        -> Result<ObjectStream, StoreError>;

    /// Open a stream over a byte range of an object / 范围读取
    async fn get_object_range(
        &self,
        container: &str,
        key: &str,
        range: Range<u64>,
    ) -> Result<ObjectStream, StoreError>;

    /// Upload a complete local file as the object's new content / 上传本地文件
    async fn put_object_from_file(
        &self,
        container: &str,
        key: &str,
        local_path: &Path,
    ) -> Result<(), StoreError>;

    /// Remove a single object / 删除对象
    async fn remove_object(&self, container: &str, key: &str) -> Result<(), StoreError>;

    /// List one page of objects / 列出对象（单页）
    async fn list_objects(&self, container: &str, request: &ListRequest)
        -> Result<ListPage, StoreError>;
}
