use async_trait::async_trait;
use uuid::Uuid;

use common::prelude::ReceiptJob;

use super::{JobPublisher, PublishError};

/// Publisher backed by an unbounded channel.
///
/// Whoever holds the receiving end plays the worker.
#[derive(Debug, Clone)]
pub struct MemoryPublisher {
    tx: flume::Sender<ReceiptJob>,
}

impl MemoryPublisher {
    pub fn new() -> (Self, flume::Receiver<ReceiptJob>) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl JobPublisher for MemoryPublisher {
    async fn publish(&self, job: &ReceiptJob) -> Result<String, PublishError> {
        self.tx
            .send_async(job.clone())
            .await
            .map_err(|_| PublishError::Closed)?;
        Ok(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use common::prelude::ReceiptId;

    use super::*;

    #[tokio::test]
    async fn test_memory_publisher_delivers() {
        let (publisher, jobs) = MemoryPublisher::new();
        let id = ReceiptId::generate();
        let job = ReceiptJob {
            receipt_id: id,
            blob_name: id.blob_name(),
        };

        publisher.publish(&job).await.unwrap();
        assert_eq!(jobs.try_recv().unwrap(), job);
    }

    #[tokio::test]
    async fn test_memory_publisher_closed() {
        let (publisher, jobs) = MemoryPublisher::new();
        drop(jobs);

        let id = ReceiptId::generate();
        let job = ReceiptJob {
            receipt_id: id,
            blob_name: id.blob_name(),
        };
        assert!(matches!(
            publisher.publish(&job).await,
            Err(PublishError::Closed)
        ));
    }
}
