//! Error types / 错误类型

use thiserror::Error;

/// Errors reported by an object-storage client / 对象存储客户端错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// The exact key does not exist / 对象不存在
    #[error("object not found: {container}/{key}")]
    NotFound { container: String, key: String },

    /// Any other failure from the storage service / 其他存储服务错误
    #[error("transport error: {0}")]
    Transport(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn not_found(container: &str, key: &str) -> Self {
        StoreError::NotFound {
            container: container.to_string(),
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Virtual filesystem errors / 虚拟文件系统错误
#[derive(Debug, Error)]
pub enum VfsError {
    #[error("invalid path: '{0}'")]
    InvalidPath(String),

    /// Attaching a binding failed for a reason other than absence / 绑定失败
    #[error("failed to attach '{path}'")]
    Attach {
        path: String,
        #[source]
        source: StoreError,
    },

    /// The close-time upload failed; the spool has already been removed / 上传失败
    #[error("failed to upload {container}/{key}")]
    Upload {
        container: String,
        key: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Transport(#[from] StoreError),

    #[error("not a file: '{0}'")]
    NotAFile(String),

    #[error("not a folder: '{0}'")]
    NotAFolder(String),

    /// Object storage has no partial-append primitive / 对象存储不支持追加写入
    #[error("append is not supported for '{0}', objects can only be overwritten")]
    AppendUnsupported(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl VfsError {
    /// Recover a `VfsError` that was tunnelled through `std::io::Error`
    /// 从 io::Error 中还原 VfsError
    pub fn from_io(err: std::io::Error) -> Self {
        if err.get_ref().is_some_and(|inner| inner.is::<VfsError>()) {
            if let Some(inner) = err.into_inner() {
                return match inner.downcast::<VfsError>() {
                    Ok(vfs) => *vfs,
                    Err(other) => VfsError::Io(std::io::Error::other(other)),
                };
            }
            return VfsError::Io(std::io::Error::other("empty io error"));
        }
        VfsError::Io(err)
    }
}

impl From<VfsError> for std::io::Error {
    fn from(err: VfsError) -> std::io::Error {
        match err {
            VfsError::Io(e) => e,
            VfsError::InvalidPath(_) => std::io::Error::new(std::io::ErrorKind::InvalidInput, err),
            VfsError::NotAFile(_) | VfsError::NotAFolder(_) => {
                std::io::Error::new(std::io::ErrorKind::NotFound, err)
            }
            VfsError::AppendUnsupported(_) => {
                std::io::Error::new(std::io::ErrorKind::Unsupported, err)
            }
            other => std::io::Error::other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_error_survives_io_roundtrip() {
        let err = VfsError::Upload {
            container: "bucket".to_string(),
            key: "a.txt".to_string(),
            source: StoreError::Transport("503".to_string()),
        };
        let io: std::io::Error = err.into();
        match VfsError::from_io(io) {
            VfsError::Upload { container, key, .. } => {
                assert_eq!(container, "bucket");
                assert_eq!(key, "a.txt");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_plain_io_error_stays_io() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        assert!(matches!(VfsError::from_io(io), VfsError::Io(_)));
    }
}
