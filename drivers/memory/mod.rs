//! In-memory object store / 内存对象存储
//!
//! Behaves like a flat S3 bucket: keys are opaque strings, listings support
//! prefix, delimiter, max-keys and continuation tokens. Used for tests and for
//! running the filesystem without a network.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::StoreError;
use crate::storage::{
    Capability, FileProvider, FileSystem, ListPage, ListRequest, ObjectEntry, ObjectMeta,
    ObjectStore, ObjectStream,
};
use super::s3::{ProbePolicy, S3FileSystem, SpoolSettings, CAPABILITIES};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    modified: DateTime<Utc>,
}

/// Container name -> key -> object
type Containers = BTreeMap<String, BTreeMap<String, StoredObject>>;

enum ListItem {
    Object(ObjectEntry),
    Prefix(String),
}

impl ListItem {
    fn marker(&self) -> &str {
        match self {
            ListItem::Object(o) => &o.key,
            ListItem::Prefix(p) => p,
        }
    }
}

/// 内存对象存储
#[derive(Default)]
pub struct MemoryObjectStore {
    containers: RwLock<Containers>,
    puts: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object directly / 直接写入对象
    pub fn insert(&self, container: &str, key: &str, data: impl Into<Bytes>) {
        let mut containers = self.containers.write();
        containers.entry(container.to_string()).or_default().insert(
            key.to_string(),
            StoredObject {
                data: data.into(),
                modified: Utc::now(),
            },
        );
    }

    /// Read an object directly / 直接读取对象
    pub fn get(&self, container: &str, key: &str) -> Option<Bytes> {
        let containers = self.containers.read();
        containers
            .get(container)
            .and_then(|objects| objects.get(key))
            .map(|o| o.data.clone())
    }

    pub fn contains(&self, container: &str, key: &str) -> bool {
        self.get(container, key).is_some()
    }

    /// Number of completed uploads / 已完成上传次数
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    fn object(&self, container: &str, key: &str) -> Result<StoredObject, StoreError> {
        let containers = self.containers.read();
        containers
            .get(container)
            .and_then(|objects| objects.get(key))
            .cloned()
            .ok_or_else(|| StoreError::not_found(container, key))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn object_exists(&self, container: &str, key: &str) -> Result<bool, StoreError> {
        Ok(self.contains(container, key))
    }

    async fn stat_object(&self, container: &str, key: &str) -> Result<ObjectMeta, StoreError> {
        let object = self.object(container, key)?;
        Ok(ObjectMeta {
            size: object.data.len() as u64,
            last_modified: Some(object.modified),
        })
    }

    async fn get_object_stream(&self, container: &str, key: &str) -> Result<ObjectStream, StoreError> {
        let object = self.object(container, key)?;
        Ok(Box::new(std::io::Cursor::new(object.data)))
    }

    async fn get_object_range(
        &self,
        container: &str,
        key: &str,
        range: Range<u64>,
    ) -> Result<ObjectStream, StoreError> {
        let object = self.object(container, key)?;
        let len = object.data.len();
        let start = (range.start as usize).min(len);
        let end = (range.end as usize).clamp(start, len);
        Ok(Box::new(std::io::Cursor::new(object.data.slice(start..end))))
    }

    async fn put_object_from_file(
        &self,
        container: &str,
        key: &str,
        local_path: &Path,
    ) -> Result<(), StoreError> {
        let data = tokio::fs::read(local_path).await?;
        self.insert(container, key, data);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove_object(&self, container: &str, key: &str) -> Result<(), StoreError> {
        let mut containers = self.containers.write();
        if let Some(objects) = containers.get_mut(container) {
            objects.remove(key);
        }
        Ok(())
    }

    async fn list_objects(&self, container: &str, request: &ListRequest) -> Result<ListPage, StoreError> {
        let containers = self.containers.read();
        let Some(objects) = containers.get(container) else {
            return Ok(ListPage::default());
        };

        let token = request.continuation_token.as_deref();
        let delimiter = request.delimiter.as_deref().filter(|d| !d.is_empty());

        let mut items: Vec<ListItem> = Vec::new();
        for (key, object) in objects.range(request.prefix.clone()..) {
            if !key.starts_with(&request.prefix) {
                break;
            }
            if let Some(token) = token {
                // Resume strictly after the last returned key or common prefix.
                // A marker object equal to the prefix is not a collapsed prefix.
                let collapsed = token.len() > request.prefix.len()
                    && delimiter.is_some_and(|d| token.ends_with(d));
                if key.as_str() <= token || (collapsed && key.starts_with(token)) {
                    continue;
                }
            }

            let rest = &key[request.prefix.len()..];
            if let Some(d) = delimiter {
                if let Some(idx) = rest.find(d) {
                    let common = format!("{}{}", request.prefix, &rest[..idx + d.len()]);
                    let seen = matches!(items.last(), Some(ListItem::Prefix(p)) if *p == common);
                    if !seen {
                        items.push(ListItem::Prefix(common));
                    }
                    continue;
                }
            }
            items.push(ListItem::Object(ObjectEntry {
                key: key.clone(),
                size: object.data.len() as u64,
                last_modified: Some(object.modified),
            }));
        }

        let mut next_continuation_token = None;
        if let Some(max) = request.max_keys {
            if items.len() > max {
                items.truncate(max);
                next_continuation_token = items.last().map(|i| i.marker().to_string());
            }
        }

        let mut page = ListPage {
            next_continuation_token,
            ..Default::default()
        };
        for item in items {
            match item {
                ListItem::Object(o) => page.objects.push(o),
                ListItem::Prefix(p) => page.common_prefixes.push(p),
            }
        }
        Ok(page)
    }
}

/// Provider serving one shared in-memory store under the `mem` scheme / 内存文件系统提供者
pub struct MemoryFileProvider {
    store: Arc<MemoryObjectStore>,
    spool: SpoolSettings,
    policy: ProbePolicy,
}

impl MemoryFileProvider {
    pub fn new(store: Arc<MemoryObjectStore>, spool: SpoolSettings) -> Self {
        Self {
            store,
            spool,
            policy: ProbePolicy::default(),
        }
    }
}

impl FileProvider for MemoryFileProvider {
    fn scheme(&self) -> &'static str {
        "mem"
    }

    fn create_file_system(&self, host: &str) -> anyhow::Result<Arc<dyn FileSystem>> {
        tracing::debug!("Memory file system created for host {}", host);
        let fs = S3FileSystem::new(self.store.clone(), self.spool.clone(), self.policy);
        Ok(Arc::new(fs))
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }
}
