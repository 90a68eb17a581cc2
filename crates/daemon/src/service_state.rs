use std::sync::Arc;

use crate::blobs::{setup_blob_store, BlobStore, BlobStoreError};
use crate::database::{Database, DatabaseSetupError, ReceiptStore};
use crate::queue::{setup_publisher, JobPublisher, PublishError};
use crate::ServiceConfig;

/// Main service state - handles to the blob store, the tracking record
///  store and the job queue.
///
/// Built once at startup and shared read-only by every request.
#[derive(Clone, Debug)]
pub struct State {
    blobs: Arc<dyn BlobStore>,
    receipts: Arc<dyn ReceiptStore>,
    jobs: Arc<dyn JobPublisher>,
}

impl State {
    /// Assemble state from already constructed collaborators.
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        receipts: Arc<dyn ReceiptStore>,
        jobs: Arc<dyn JobPublisher>,
    ) -> Self {
        Self {
            blobs,
            receipts,
            jobs,
        }
    }

    pub async fn from_config(config: &ServiceConfig) -> Result<Self, StateSetupError> {
        // 1. Setup blob store
        let blobs = setup_blob_store(&config.blob_store).await?;

        // 2. Setup document store
        tracing::info!("Document store URL: {}", redact(&config.document_store_url));
        let database = Database::connect(&config.document_store_url).await?;

        // 3. Setup job queue
        let jobs = setup_publisher(&config.queue)?;

        Ok(Self::new(blobs, Arc::new(database), jobs))
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    pub fn receipts(&self) -> &Arc<dyn ReceiptStore> {
        &self.receipts
    }

    pub fn jobs(&self) -> &Arc<dyn JobPublisher> {
        &self.jobs
    }
}

// keep credentials embedded in connection strings out of the logs
fn redact(url: &url::Url) -> String {
    let mut url = url.clone();
    if url.password().is_some() {
        let _ = url.set_password(Some("****"));
    }
    url.to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("Blob store setup error: {0}")]
    BlobStore(#[from] BlobStoreError),
    #[error("Database setup error: {0}")]
    DatabaseSetupError(#[from] DatabaseSetupError),
    #[error("Job queue setup error: {0}")]
    Queue(#[from] PublishError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_hides_password() {
        let url = url::Url::parse("postgres://kvitta:hunter2@db:5432/receipts").unwrap();
        assert_eq!(redact(&url), "postgres://kvitta:****@db:5432/receipts");

        let url = url::Url::parse("sqlite::memory:").unwrap();
        assert_eq!(redact(&url), "sqlite::memory:");
    }
}
