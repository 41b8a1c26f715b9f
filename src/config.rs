//! Application configuration module / 应用配置模块
//!
//! Manages application configuration loaded from config.json
//! Creates default config file on first run / 首次运行时创建默认配置文件

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::drivers::s3::{ProbePolicy, S3Config, SpoolSettings};

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// S3 client configuration / S3客户端配置
    #[serde(default)]
    pub s3: S3Config,
    /// Upload spool configuration / 上传临时文件配置
    #[serde(default)]
    pub spool: SpoolConfig,
    /// Existence probe configuration / 存在性探测配置
    #[serde(default)]
    pub probe: ProbeConfig,
}

/// Spool configuration / 临时文件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpoolConfig {
    /// Spool directory, empty means the system temp dir / 临时目录
    #[serde(default)]
    pub dir: String,
    /// File name prefix / 文件名前缀
    #[serde(default = "default_spool_prefix")]
    pub prefix: String,
    /// Write buffer size in bytes / 写入缓冲区大小
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

/// Probe configuration / 探测配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Propagate probe failures instead of treating them as absence
    /// 探测失败时返回错误而不是视为不存在
    #[serde(default)]
    pub strict_probe: bool,
}

fn default_spool_prefix() -> String {
    "bucketfs-".to_string()
}

fn default_buffer_size() -> usize {
    64 * 1024
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            dir: String::new(),
            prefix: default_spool_prefix(),
            buffer_size: default_buffer_size(),
        }
    }
}

impl AppConfig {
    /// Get the spool settings / 获取临时文件设置
    pub fn spool_settings(&self) -> SpoolSettings {
        let dir = if self.spool.dir.is_empty() {
            std::env::temp_dir()
        } else {
            PathBuf::from(&self.spool.dir)
        };
        SpoolSettings {
            dir,
            prefix: self.spool.prefix.clone(),
            buffer_size: self.spool.buffer_size,
        }
    }

    /// Get the probe policy / 获取探测策略
    pub fn probe_policy(&self) -> ProbePolicy {
        if self.probe.strict_probe {
            ProbePolicy::Strict
        } else {
            ProbePolicy::FailOpen
        }
    }
}

/// Get the config file path / 获取配置文件路径
fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config() -> Result<AppConfig, String> {
    load_config_from(&get_config_path())
}

/// Load configuration from an explicit path / 从指定路径加载配置
pub fn load_config_from(config_path: &Path) -> Result<AppConfig, String> {
    if config_path.exists() {
        let content = std::fs::read_to_string(config_path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        Ok(config)
    } else {
        let config = AppConfig::default();
        save_config_to(&config, config_path)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        Ok(config)
    }
}

/// Save configuration to file / 保存配置到文件
fn save_config_to(config: &AppConfig, config_path: &Path) -> Result<(), String> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    std::fs::write(config_path, content)
        .map_err(|e| format!("Failed to write config file: {}", e))?;

    Ok(())
}
