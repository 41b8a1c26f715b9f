//! 路径解析：`container/key` -> (容器, 对象键)

use std::fmt;

use crate::error::VfsError;

/// Key sentinel meaning "container root, no object" / 容器根哨兵键
pub const ROOT_KEY: &str = "/";

/// A filesystem path split into container and object key / 解析后的路径
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedPath {
    pub container: String,
    pub key: String,
}

impl ResolvedPath {
    pub fn is_root(&self) -> bool {
        self.key == ROOT_KEY
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "{}", self.container)
        } else {
            write!(f, "{}/{}", self.container, self.key)
        }
    }
}

/// Split a path into (container, key).
///
/// One leading `/` is stripped. A path without any further `/` names a
/// container root and gets the [`ROOT_KEY`] sentinel; otherwise the path is
/// split on the first `/` only and the key is kept verbatim.
pub fn resolve(path: &str) -> Result<ResolvedPath, VfsError> {
    let rest = path.strip_prefix('/').unwrap_or(path);
    if rest.trim().is_empty() {
        return Err(VfsError::InvalidPath(path.to_string()));
    }

    let (container, key) = match rest.split_once('/') {
        None => (rest, ROOT_KEY),
        Some((container, key)) => (container, key),
    };
    if container.trim().is_empty() {
        return Err(VfsError::InvalidPath(path.to_string()));
    }

    // "bucket/" still names the container root
    let key = if key.is_empty() { ROOT_KEY } else { key };

    Ok(ResolvedPath {
        container: container.to_string(),
        key: key.to_string(),
    })
}

/// Like [`resolve`] for callers holding an optional path; `None` is invalid
pub fn resolve_opt(path: Option<&str>) -> Result<ResolvedPath, VfsError> {
    match path {
        Some(p) => resolve(p),
        None => Err(VfsError::InvalidPath(String::new())),
    }
}
