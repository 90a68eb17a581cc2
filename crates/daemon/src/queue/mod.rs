//! Job queue for the receipt processing worker.
//!
//! Publishing is fire-and-forget: once the broker acknowledges a message
//!  the intake service is done with it. Delivery guarantees are whatever
//!  the broker provides (at-least-once for Pub/Sub).

mod memory;
mod pubsub;

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use common::prelude::ReceiptJob;

pub use memory::MemoryPublisher;
pub use pubsub::{PubSubAuth, PubSubPublisher};

/// Which broker receives processing jobs.
#[derive(Debug, Clone)]
pub enum QueueConfig {
    PubSub {
        project: String,
        topic: String,
        endpoint: Url,
        auth: PubSubAuth,
    },
    /// Jobs are logged and dropped, for local runs without a broker
    Memory,
}

#[async_trait]
pub trait JobPublisher: Send + Sync + std::fmt::Debug {
    /// Publish a job, returning the broker-assigned message id.
    async fn publish(&self, job: &ReceiptJob) -> Result<String, PublishError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to encode job: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("broker rejected publish with status {0}: {1}")]
    Rejected(reqwest::StatusCode, String),

    #[error("failed to obtain access token: {0}")]
    Auth(String),

    #[error("invalid queue configuration: {0}")]
    InvalidConfig(String),

    #[error("broker response did not include a message id")]
    MissingMessageId,

    #[error("queue is closed")]
    Closed,
}

/// Build the publisher described by `config`.
pub fn setup_publisher(config: &QueueConfig) -> Result<Arc<dyn JobPublisher>, PublishError> {
    match config {
        QueueConfig::PubSub {
            project,
            topic,
            endpoint,
            auth,
        } => {
            tracing::info!(
                project = %project,
                topic = %topic,
                endpoint = %endpoint,
                "Using Pub/Sub job queue"
            );
            let publisher = PubSubPublisher::new(endpoint, project, topic, auth.clone())?;
            Ok(Arc::new(publisher))
        }
        QueueConfig::Memory => {
            tracing::warn!("Using in-memory job queue, jobs are logged and dropped");
            let (publisher, jobs) = MemoryPublisher::new();
            tokio::spawn(async move {
                while let Ok(job) = jobs.recv_async().await {
                    tracing::info!(
                        receipt_id = %job.receipt_id,
                        blob_name = %job.blob_name,
                        "dropping job (in-memory queue)"
                    );
                }
            });
            Ok(Arc::new(publisher))
        }
    }
}
