/// URI and key utility functions / URI 与对象键工具函数

use url::Url;

use crate::error::VfsError;

/// Parsed `scheme://host[:port]/container/key` URI / 解析后的文件 URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUri {
    pub scheme: String,
    /// Endpoint host including port / 主机（含端口）
    pub host: String,
    /// Percent-decoded path, always starting with `/` / 解码后的路径
    pub path: String,
}

impl FileUri {
    /// Parse a filesystem URI / 解析 URI
    pub fn parse(uri: &str) -> Result<Self, VfsError> {
        let url = Url::parse(uri).map_err(|e| VfsError::InvalidPath(format!("{}: {}", uri, e)))?;

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| VfsError::InvalidPath(format!("{}: missing host", uri)))?;
        let host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let path = urlencoding::decode(url.path())
            .map_err(|e| VfsError::InvalidPath(format!("{}: {}", uri, e)))?
            .into_owned();

        Ok(Self {
            scheme: url.scheme().to_string(),
            host,
            path,
        })
    }

    /// Filesystem root key (`scheme://host`) / 文件系统根标识
    pub fn root(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }
}

/// Ensure a non-empty prefix ends with exactly one `/` / 规范化目录前缀
pub fn folder_prefix(key: &str) -> String {
    if key.is_empty() || key.ends_with('/') {
        key.to_string()
    } else {
        format!("{}/", key)
    }
}

/// Last segment of a key, ignoring one trailing slash / 获取键的最后一段
///
/// Only a single delimiter is dropped, so `a//` ends in an empty segment.
pub fn key_name(key: &str) -> &str {
    let trimmed = key.strip_suffix('/').unwrap_or(key);
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uri() {
        let uri = FileUri::parse("s3://127.0.0.1:9000/bucket/a/b.txt").unwrap();
        assert_eq!(uri.scheme, "s3");
        assert_eq!(uri.host, "127.0.0.1:9000");
        assert_eq!(uri.path, "/bucket/a/b.txt");
        assert_eq!(uri.root(), "s3://127.0.0.1:9000");
    }

    #[test]
    fn test_parse_uri_decodes_path() {
        let uri = FileUri::parse("s3://minio.local/bucket/my%20file.txt").unwrap();
        assert_eq!(uri.path, "/bucket/my file.txt");
    }

    #[test]
    fn test_parse_uri_rejects_garbage() {
        assert!(matches!(FileUri::parse("not a uri"), Err(VfsError::InvalidPath(_))));
    }

    #[test]
    fn test_folder_prefix() {
        assert_eq!(folder_prefix(""), "");
        assert_eq!(folder_prefix("a"), "a/");
        assert_eq!(folder_prefix("a/b/"), "a/b/");
    }

    #[test]
    fn test_key_name() {
        assert_eq!(key_name("a/b/c.txt"), "c.txt");
        assert_eq!(key_name("a/b/"), "b");
        assert_eq!(key_name("top"), "top");
        assert_eq!(key_name("a//"), "");
        assert_eq!(key_name("a//b/"), "b");
    }
}
