use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use anyhow::{anyhow, Result};

use super::{Capability, FileObject, FileProvider, FileSystem};
use crate::utils::FileUri;

pub type ProviderBox = Arc<Box<dyn FileProvider>>;

/// Filesystem manager (maps URI schemes to providers, caches one filesystem per root)
/// 文件系统管理器
#[derive(Clone)]
pub struct FileSystemManager {
    providers: Arc<RwLock<HashMap<String, ProviderBox>>>,
    /// Root (`scheme://host`) -> filesystem / 根 -> 文件系统
    file_systems: Arc<RwLock<HashMap<String, Arc<dyn FileSystem>>>>,
}

impl Default for FileSystemManager {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystemManager {
    pub fn new() -> Self {
        Self {
            providers: Arc::new(RwLock::new(HashMap::new())),
            file_systems: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register provider / 注册提供者
    pub async fn add_provider(&self, provider: Box<dyn FileProvider>) -> Result<()> {
        let scheme = provider.scheme().to_string();
        let mut providers = self.providers.write().await;
        if providers.contains_key(&scheme) {
            return Err(anyhow!("Provider already registered for scheme: {}", scheme));
        }
        providers.insert(scheme.clone(), Arc::new(provider));

        tracing::info!("File provider registered: {}", scheme);
        Ok(())
    }

    /// List registered schemes / 列出已注册的协议
    pub async fn schemes(&self) -> Vec<String> {
        let providers = self.providers.read().await;
        providers.keys().cloned().collect()
    }

    /// Capabilities advertised for a scheme / 获取协议能力
    pub async fn capabilities(&self, scheme: &str) -> Option<&'static [Capability]> {
        let providers = self.providers.read().await;
        providers.get(scheme).map(|p| p.capabilities())
    }

    /// Get or create the filesystem for a URI root / 获取或创建文件系统
    pub async fn file_system(&self, uri: &FileUri) -> Result<Arc<dyn FileSystem>> {
        let root = uri.root();
        {
            let file_systems = self.file_systems.read().await;
            if let Some(fs) = file_systems.get(&root) {
                return Ok(fs.clone());
            }
        }

        let provider = {
            let providers = self.providers.read().await;
            providers
                .get(&uri.scheme)
                .cloned()
                .ok_or_else(|| anyhow!("No provider registered for scheme: {}", uri.scheme))?
        };

        let mut file_systems = self.file_systems.write().await;
        // Another task may have created it while we waited for the write lock
        if let Some(fs) = file_systems.get(&root) {
            return Ok(fs.clone());
        }
        let fs = provider.create_file_system(&uri.host)?;
        file_systems.insert(root.clone(), fs.clone());

        tracing::info!("File system created: {}", root);
        Ok(fs)
    }

    /// Resolve a URI into an attached file object / 解析 URI 为已绑定的文件对象
    pub async fn resolve_file(&self, uri: &str) -> Result<Box<dyn FileObject>> {
        let parsed = FileUri::parse(uri)?;
        let fs = self.file_system(&parsed).await?;

        // Bindings use the `container/key` form that listings return
        let path = parsed.path.strip_prefix('/').unwrap_or(parsed.path.as_str());
        let mut file = fs.file(path);
        file.attach().await?;
        Ok(file)
    }

    /// Drop a cached filesystem / 关闭文件系统
    pub async fn close_file_system(&self, root: &str) -> bool {
        let mut file_systems = self.file_systems.write().await;
        let removed = file_systems.remove(root).is_some();
        if removed {
            tracing::info!("File system closed: {}", root);
        }
        removed
    }
}
