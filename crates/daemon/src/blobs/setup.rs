//! Blob store setup logic.

use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;

use super::{BlobStore, BlobStoreConfig, BlobStoreError, ObjectBlobStore};

/// Setup the blob store based on configuration.
///
/// Remote backends are probed with an empty listing so that a missing
///  bucket fails at startup rather than on the first upload.
pub async fn setup_blob_store(
    config: &BlobStoreConfig,
) -> Result<Arc<dyn BlobStore>, BlobStoreError> {
    let store = match config {
        BlobStoreConfig::Gcs { bucket } => {
            tracing::info!(bucket = %bucket, "Using Google Cloud Storage blob store");
            let store: Arc<dyn ObjectStore> = Arc::new(
                GoogleCloudStorageBuilder::from_env()
                    .with_bucket_name(bucket)
                    .build()
                    .map_err(|e| BlobStoreError::InvalidConfig(e.to_string()))?,
            );
            verify_bucket(store.as_ref(), bucket).await?;
            ObjectBlobStore::new(store, true)
        }

        BlobStoreConfig::S3 { bucket } => {
            tracing::info!(bucket = %bucket, "Using S3 blob store");
            let store: Arc<dyn ObjectStore> = Arc::new(
                AmazonS3Builder::from_env()
                    .with_bucket_name(bucket)
                    .build()
                    .map_err(|e| BlobStoreError::InvalidConfig(e.to_string()))?,
            );
            verify_bucket(store.as_ref(), bucket).await?;
            ObjectBlobStore::new(store, true)
        }

        BlobStoreConfig::Local { root, bucket } => {
            let path = root.join(bucket);
            tracing::info!(path = %path.display(), "Using local filesystem blob store");
            tokio::fs::create_dir_all(&path).await?;
            let store = LocalFileSystem::new_with_prefix(&path)
                .map_err(|e| BlobStoreError::InvalidConfig(e.to_string()))?;
            ObjectBlobStore::new(Arc::new(store), false)
        }

        BlobStoreConfig::Memory => {
            tracing::warn!("Using in-memory blob store, uploads will not survive a restart");
            ObjectBlobStore::memory()
        }
    };

    Ok(Arc::new(store))
}

async fn verify_bucket(store: &dyn ObjectStore, bucket: &str) -> Result<(), BlobStoreError> {
    use futures::TryStreamExt;

    let prefix = ObjectPath::from("");
    let mut stream = store.list(Some(&prefix));
    match stream.try_next().await {
        Ok(_) => Ok(()),
        Err(object_store::Error::NotFound { .. }) => {
            Err(BlobStoreError::BucketNotFound(bucket.to_string()))
        }
        Err(e) => {
            let msg = e.to_string();
            if msg.contains("NoSuchBucket") || (msg.contains("bucket") && msg.contains("not")) {
                return Err(BlobStoreError::BucketNotFound(bucket.to_string()));
            }
            Err(e.into())
        }
    }
}
