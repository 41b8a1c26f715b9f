use std::sync::Arc;

use crate::storage::{Capability, FileObject, FileSystem, ObjectStore};
use super::classify::ProbePolicy;
use super::object::S3FileObject;
use super::writer::SpoolSettings;

/// Capabilities advertised by object-storage filesystems / 对象存储文件系统能力
pub const CAPABILITIES: &[Capability] = &[
    Capability::GetType,
    Capability::ReadContent,
    Capability::AppendContent,
    Capability::RandomAccessRead,
    Capability::DirectoryReadContent,
    Capability::ListChildren,
    Capability::LastModified,
    Capability::Create,
    Capability::Delete,
];

/// One filesystem root: a single shared client plus write/probe settings
/// 文件系统根（共享同一个客户端）
pub struct S3FileSystem {
    store: Arc<dyn ObjectStore>,
    spool: SpoolSettings,
    policy: ProbePolicy,
}

impl S3FileSystem {
    pub fn new(store: Arc<dyn ObjectStore>, spool: SpoolSettings, policy: ProbePolicy) -> Self {
        Self { store, spool, policy }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn spool(&self) -> &SpoolSettings {
        &self.spool
    }

    pub fn policy(&self) -> ProbePolicy {
        self.policy
    }

    /// Create an unattached binding for `path` / 创建文件对象
    pub fn open(self: &Arc<Self>, path: &str) -> S3FileObject {
        S3FileObject::new(self.clone(), path)
    }
}

impl FileSystem for S3FileSystem {
    fn file(self: Arc<Self>, path: &str) -> Box<dyn FileObject> {
        Box::new(S3FileObject::new(self, path))
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }
}
