// Driver package / 驱动包
pub mod memory;
pub mod s3;

use crate::config::AppConfig;
use crate::storage::FileSystemManager;

/// Register all network-backed providers to FileSystemManager / 注册所有提供者
pub async fn register_all(manager: &FileSystemManager, config: &AppConfig) -> anyhow::Result<()> {
    // Register S3 provider / 注册S3对象存储提供者
    config.s3.validate()?;
    let provider = s3::S3FileProvider::new(
        config.s3.clone(),
        config.spool_settings(),
        config.probe_policy(),
    );
    manager.add_provider(Box::new(provider)).await?;
    Ok(())
}
