//! S3驱动配置

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::VfsError;

/// S3 client configuration / S3配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// S3端点地址，为空时由 URI 主机推导
    /// AWS: https://s3.{region}.amazonaws.com
    /// MinIO: http://localhost:9000
    #[serde(default)]
    pub endpoint: String,
    /// 区域
    #[serde(default = "default_region")]
    pub region: String,
    /// Access Key ID
    #[serde(default)]
    pub access_key_id: String,
    /// Secret Access Key
    #[serde(default)]
    pub secret_access_key: String,
    /// Session Token（用于临时凭证）
    #[serde(default)]
    pub session_token: String,
    /// 强制使用路径风格（而非虚拟主机风格）
    /// MinIO等需要设置为true
    #[serde(default)]
    pub force_path_style: bool,
    /// Use plain http when the endpoint is derived from a URI host / 推导端点时使用 http
    #[serde(default)]
    pub insecure: bool,
    /// 请求超时（秒），为空表示不限制
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            region: default_region(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            session_token: String::new(),
            force_path_style: false,
            insecure: false,
            request_timeout_seconds: None,
        }
    }
}

impl S3Config {
    /// Check the configuration before any client is built / 校验配置
    pub fn validate(&self) -> Result<(), VfsError> {
        if self.region.trim().is_empty() {
            return Err(VfsError::Config("region must be non-empty".to_string()));
        }
        let has_access_key = !self.access_key_id.trim().is_empty();
        let has_secret_key = !self.secret_access_key.trim().is_empty();
        if has_access_key ^ has_secret_key {
            return Err(VfsError::Config(
                "access_key_id and secret_access_key must be provided together".to_string(),
            ));
        }
        if !self.session_token.trim().is_empty() && !has_access_key {
            return Err(VfsError::Config(
                "session_token requires access_key_id and secret_access_key".to_string(),
            ));
        }
        if self.request_timeout_seconds == Some(0) {
            return Err(VfsError::Config(
                "request_timeout_seconds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Endpoint for a URI host, explicit `endpoint` wins / 获取端点地址
    pub fn endpoint_for(&self, host: &str) -> String {
        if !self.endpoint.is_empty() {
            return self.endpoint.trim_end_matches('/').to_string();
        }
        let scheme = if self.insecure { "http" } else { "https" };
        format!("{}://{}", scheme, host)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }
}
