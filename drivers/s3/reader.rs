//! 对象读取适配器：仅在对象存在时绑定读取流

use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

use crate::error::StoreError;
use crate::storage::{ObjectStore, ObjectStream};
use super::classify::probe_exact;

/// Read handle bound to one object's content / 对象读取句柄
///
/// A thin wrapper over the store's stream: no buffering of its own, and end
/// of content reads as end of stream.
pub struct ObjectReader {
    container: String,
    key: String,
    inner: ObjectStream,
}

impl ObjectReader {
    pub fn new(container: &str, key: &str, inner: ObjectStream) -> Self {
        Self {
            container: container.to_string(),
            key: key.to_string(),
            inner,
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Debug for ObjectReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectReader")
            .field("container", &self.container)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl AsyncRead for ObjectReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

/// Bind a reader to `(container, key)` if the object exists / 打开读取流
///
/// Returns `Ok(None)` when the exact key is absent. Any other probe or open
/// failure is returned to the caller.
pub async fn open(
    store: &dyn ObjectStore,
    container: &str,
    key: &str,
) -> Result<Option<ObjectReader>, StoreError> {
    if !probe_exact(store, container, key).await? {
        tracing::debug!("No object at {}/{}, nothing to read", container, key);
        return Ok(None);
    }

    match store.get_object_stream(container, key).await {
        Ok(stream) => Ok(Some(ObjectReader::new(container, key, stream))),
        // Removed between the probe and the open
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
