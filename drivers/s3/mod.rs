//! S3 object storage filesystem / S3对象存储文件系统
//!
//! Maps `container/key` paths onto a flat object store. Folders are
//! emulated from key prefixes; writes are spooled locally and uploaded as a
//! single object on close.

pub mod classify;
pub mod client;
pub mod config;
pub mod factory;
pub mod filesystem;
pub mod object;
pub mod path;
pub mod reader;
pub mod writer;

pub use classify::{classify, probe_exact, ProbePolicy};
pub use client::BucketClient;
pub use config::S3Config;
pub use factory::S3FileProvider;
pub use filesystem::{S3FileSystem, CAPABILITIES};
pub use object::S3FileObject;
pub use path::{resolve, resolve_opt, ResolvedPath, ROOT_KEY};
pub use reader::ObjectReader;
pub use writer::{SpoolSettings, UploadWriter};
