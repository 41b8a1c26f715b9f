pub mod config;
pub mod error;
pub mod utils;
pub mod storage;

// Driver modules (point to project root drivers via path attribute) / 驱动模块
#[path = "../drivers/mod.rs"]
pub mod drivers;

pub use error::{StoreError, VfsError};

// Register all file providers (call unified registration function from drivers module) / 注册所有提供者
pub async fn register_file_providers(
    manager: &storage::FileSystemManager,
    config: &config::AppConfig,
) -> anyhow::Result<()> {
    drivers::register_all(manager, config).await
}
