//! S3文件系统提供者

use anyhow::Result;
use std::sync::Arc;

use crate::storage::{Capability, FileProvider, FileSystem};
use super::classify::ProbePolicy;
use super::client::BucketClient;
use super::config::S3Config;
use super::filesystem::{S3FileSystem, CAPABILITIES};
use super::writer::SpoolSettings;

/// Provider for `s3://host/container/key` URIs / S3提供者
pub struct S3FileProvider {
    config: S3Config,
    spool: SpoolSettings,
    policy: ProbePolicy,
}

impl S3FileProvider {
    pub fn new(config: S3Config, spool: SpoolSettings, policy: ProbePolicy) -> Self {
        Self { config, spool, policy }
    }
}

impl FileProvider for S3FileProvider {
    fn scheme(&self) -> &'static str {
        "s3"
    }

    fn create_file_system(&self, host: &str) -> Result<Arc<dyn FileSystem>> {
        // One client per endpoint host, shared by every binding under it
        let client = BucketClient::new(self.config.clone(), host)?;
        let fs = S3FileSystem::new(Arc::new(client), self.spool.clone(), self.policy);
        Ok(Arc::new(fs))
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_builds_file_system_per_host() {
        let config = S3Config {
            region: "eu-west-1".to_string(),
            force_path_style: true,
            ..Default::default()
        };
        let provider = S3FileProvider::new(config, SpoolSettings::default(), ProbePolicy::Strict);
        assert_eq!(provider.scheme(), "s3");
        assert!(provider.create_file_system("localhost:9000").is_ok());
        assert_eq!(provider.capabilities().len(), 9);
    }

    #[test]
    fn test_provider_rejects_half_credentials() {
        let config = S3Config {
            access_key_id: "only-half".to_string(),
            ..Default::default()
        };
        let provider = S3FileProvider::new(config, SpoolSettings::default(), ProbePolicy::FailOpen);
        assert!(provider.create_file_system("localhost:9000").is_err());
    }
}
