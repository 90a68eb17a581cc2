//! Blob storage for receipt images.
//!
//! The intake service only ever writes whole objects, and removes one it
//!  just wrote when a later step fails. Backends are provided by the
//!  `object_store` crate.

mod object;
mod setup;

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;

pub use object::ObjectBlobStore;
pub use setup::setup_blob_store;

/// Which backend holds the receipt images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobStoreConfig {
    /// Google Cloud Storage, credentials from the environment
    Gcs { bucket: String },
    /// S3-compatible storage, endpoint and credentials from the environment
    S3 { bucket: String },
    /// A directory on the local filesystem, one sub-directory per bucket
    Local { root: PathBuf, bucket: String },
    /// In-memory storage (for testing)
    Memory,
}

#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    /// Write `data` under `name`, tagging it with `content_type`.
    async fn put(&self, name: &str, data: Bytes, content_type: &str) -> Result<(), BlobStoreError>;

    /// Remove `name`. Removing an object that is already gone succeeds.
    async fn delete(&self, name: &str) -> Result<(), BlobStoreError>;

    async fn exists(&self, name: &str) -> Result<bool, BlobStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("object storage error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("bucket '{0}' does not exist. Create it before starting the service.")]
    BucketNotFound(String),
}
