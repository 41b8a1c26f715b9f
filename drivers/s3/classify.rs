//! 类型判定：文件 / 模拟目录 / 不存在
//!
//! Object storage has no directories. A key that exists is a file; a key that
//! does not exist but has at least one descendant under `key/` behaves as a
//! folder; anything else does not exist.

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, VfsError};
use crate::storage::{EntryKind, ListRequest, ObjectStore};
use super::path::ROOT_KEY;

/// How the exact-key probe treats failures other than "not found" / 探测策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbePolicy {
    /// Log and treat as absent / 记录日志并视为不存在
    #[default]
    FailOpen,
    /// Propagate the error / 向上返回错误
    Strict,
}

/// Exact-key probe. Absence is never an error; other failures propagate.
/// 精确键探测（严格）
pub async fn probe_exact(
    store: &dyn ObjectStore,
    container: &str,
    key: &str,
) -> Result<bool, StoreError> {
    if key == ROOT_KEY {
        return Ok(false);
    }
    match store.object_exists(container, key).await {
        Ok(found) => Ok(found),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Folder prefix listed for a key, the root sentinel lists the whole container
pub fn listing_prefix(key: &str) -> String {
    if key == ROOT_KEY {
        return String::new();
    }
    crate::utils::folder_prefix(key)
}

/// Determine what `(container, key)` denotes / 判定条目类型
pub async fn classify(
    store: &dyn ObjectStore,
    container: &str,
    key: &str,
    policy: ProbePolicy,
) -> Result<EntryKind, VfsError> {
    let exists = match probe_exact(store, container, key).await {
        Ok(found) => found,
        Err(e) if policy == ProbePolicy::FailOpen => {
            tracing::warn!(
                "Exact-key probe failed for {}/{}, treating as absent: {}",
                container, key, e
            );
            false
        }
        Err(e) => return Err(e.into()),
    };

    if exists {
        tracing::debug!("classify {}/{}: file", container, key);
        return Ok(EntryKind::File);
    }

    // 不存在时按目录前缀列出，只要有任意后代即视为目录
    let prefix = listing_prefix(key);
    let page = store
        .list_objects(container, &ListRequest::prefix(prefix.clone()).max_keys(1))
        .await?;

    let kind = if page.is_empty() {
        EntryKind::NonExistent
    } else {
        EntryKind::Folder
    };
    tracing::debug!("classify {}/{} (prefix '{}'): {:?}", container, key, prefix, kind);
    Ok(kind)
}
