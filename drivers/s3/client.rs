//! rust-s3 客户端
//!
//! One `BucketClient` per endpoint. Buckets are built lazily per container
//! and cached; all of them share the same credentials and region.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use parking_lot::RwLock;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::Region;
use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;
use tokio_util::io::StreamReader;

use crate::error::{StoreError, VfsError};
use crate::storage::{ListPage, ListRequest, ObjectEntry, ObjectMeta, ObjectStore, ObjectStream};
use super::config::S3Config;

/// S3 object store client / S3客户端
pub struct BucketClient {
    config: S3Config,
    endpoint: String,
    credentials: Credentials,
    buckets: RwLock<HashMap<String, Box<Bucket>>>,
}

impl BucketClient {
    /// Create a client for one endpoint host / 创建客户端
    pub fn new(config: S3Config, host: &str) -> Result<Self, VfsError> {
        config.validate()?;

        let credentials = if config.access_key_id.is_empty() {
            Credentials::anonymous()
        } else {
            Credentials::new(
                Some(&config.access_key_id),
                Some(&config.secret_access_key),
                if config.session_token.is_empty() { None } else { Some(&config.session_token) },
                None,
                None,
            )
        };
        let credentials = credentials
            .map_err(|e| VfsError::Config(format!("failed to create S3 credentials: {}", e)))?;

        let endpoint = config.endpoint_for(host);
        tracing::info!("S3 client for {} (region {})", endpoint, config.region);

        Ok(Self {
            config,
            endpoint,
            credentials,
            buckets: RwLock::new(HashMap::new()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Bucket handle for a container, created on first use / 获取 Bucket
    fn bucket(&self, container: &str) -> Result<Box<Bucket>, StoreError> {
        if let Some(bucket) = self.buckets.read().get(container) {
            return Ok(bucket.clone());
        }

        let region = Region::Custom {
            region: self.config.region.clone(),
            endpoint: self.endpoint.clone(),
        };
        let mut bucket = Bucket::new(container, region, self.credentials.clone()).map_err(transport)?;
        if self.config.force_path_style {
            bucket = bucket.with_path_style();
        }
        if let Some(timeout) = self.config.request_timeout() {
            bucket = bucket.with_request_timeout(timeout).map_err(transport)?;
        }

        self.buckets.write().insert(container.to_string(), bucket.clone());
        Ok(bucket)
    }
}

fn transport(e: S3Error) -> StoreError {
    StoreError::Transport(e.to_string())
}

/// Map a failed call, folding 404 into `NotFound` / 错误映射
fn map_s3_error(e: S3Error, container: &str, key: &str) -> StoreError {
    match e {
        S3Error::HttpFailWithBody(404, _) => StoreError::not_found(container, key),
        other => transport(other),
    }
}

/// Check a response status / 校验响应状态码
fn check_status(code: u16, container: &str, key: &str, op: &str) -> Result<(), StoreError> {
    match code {
        200..=299 => Ok(()),
        404 => Err(StoreError::not_found(container, key)),
        _ => Err(StoreError::Transport(format!(
            "{} {}/{} returned HTTP {}",
            op, container, key, code
        ))),
    }
}

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl ObjectStore for BucketClient {
    async fn object_exists(&self, container: &str, key: &str) -> Result<bool, StoreError> {
        match self.stat_object(container, key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn stat_object(&self, container: &str, key: &str) -> Result<ObjectMeta, StoreError> {
        let bucket = self.bucket(container)?;
        let (head, code) = bucket
            .head_object(key)
            .await
            .map_err(|e| map_s3_error(e, container, key))?;
        check_status(code, container, key, "HEAD")?;

        Ok(ObjectMeta {
            size: head.content_length.unwrap_or(0).max(0) as u64,
            last_modified: head.last_modified.as_deref().and_then(parse_http_date),
        })
    }

    async fn get_object_stream(&self, container: &str, key: &str) -> Result<ObjectStream, StoreError> {
        let bucket = self.bucket(container)?;
        let response = bucket
            .get_object_stream(key)
            .await
            .map_err(|e| map_s3_error(e, container, key))?;
        check_status(response.status_code, container, key, "GET")?;

        let stream = response
            .bytes
            .map_err(|e| std::io::Error::other(e.to_string()));
        Ok(Box::new(StreamReader::new(stream)))
    }

    async fn get_object_range(
        &self,
        container: &str,
        key: &str,
        range: Range<u64>,
    ) -> Result<ObjectStream, StoreError> {
        if range.is_empty() {
            return Ok(Box::new(std::io::Cursor::new(Vec::new())));
        }

        let bucket = self.bucket(container)?;
        // S3 ranges are inclusive at the end
        let response = bucket
            .get_object_range(key, range.start, Some(range.end - 1))
            .await
            .map_err(|e| map_s3_error(e, container, key))?;
        check_status(response.status_code(), container, key, "GET range")?;

        Ok(Box::new(std::io::Cursor::new(response.bytes().clone())))
    }

    async fn put_object_from_file(
        &self,
        container: &str,
        key: &str,
        local_path: &Path,
    ) -> Result<(), StoreError> {
        let bucket = self.bucket(container)?;
        let mut file = tokio::fs::File::open(local_path).await?;
        let response = bucket
            .put_object_stream(&mut file, key)
            .await
            .map_err(transport)?;
        check_status(response.status_code(), container, key, "PUT")
    }

    async fn remove_object(&self, container: &str, key: &str) -> Result<(), StoreError> {
        let bucket = self.bucket(container)?;
        let response = bucket.delete_object(key).await.map_err(transport)?;
        match response.status_code() {
            // Deleting a missing key is not an error in S3 either
            404 => Ok(()),
            code => check_status(code, container, key, "DELETE"),
        }
    }

    async fn list_objects(&self, container: &str, request: &ListRequest) -> Result<ListPage, StoreError> {
        let bucket = self.bucket(container)?;
        let (result, code) = bucket
            .list_page(
                request.prefix.clone(),
                request.delimiter.clone(),
                request.continuation_token.clone(),
                None,
                request.max_keys,
            )
            .await
            .map_err(transport)?;
        if !(200..300).contains(&code) {
            return Err(StoreError::Transport(format!(
                "LIST {}/{} returned HTTP {}",
                container, request.prefix, code
            )));
        }

        let objects = result
            .contents
            .into_iter()
            .map(|object| ObjectEntry {
                last_modified: parse_http_date(&object.last_modified),
                key: object.key,
                size: object.size,
            })
            .collect();
        let common_prefixes = result
            .common_prefixes
            .unwrap_or_default()
            .into_iter()
            .map(|cp| cp.prefix)
            .collect();

        Ok(ListPage {
            objects,
            common_prefixes,
            next_continuation_token: result.next_continuation_token,
        })
    }
}
