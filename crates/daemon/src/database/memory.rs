use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use common::prelude::{Receipt, ReceiptId};

use super::{ReceiptStore, ReceiptStoreError};

/// In-memory receipt store using a HashMap
#[derive(Debug, Clone, Default)]
pub struct MemoryReceiptStore {
    inner: Arc<RwLock<HashMap<ReceiptId, Receipt>>>,
}

impl MemoryReceiptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReceiptStore for MemoryReceiptStore {
    async fn insert(&self, receipt: &Receipt) -> Result<(), ReceiptStoreError> {
        let mut inner = self.inner.write().map_err(|e| {
            ReceiptStoreError::Unavailable(format!("failed to acquire write lock: {}", e))
        })?;

        if inner.contains_key(&receipt.id) {
            return Err(ReceiptStoreError::Conflict(receipt.id));
        }
        inner.insert(receipt.id, receipt.clone());
        Ok(())
    }

    async fn get(&self, id: &ReceiptId) -> Result<Option<Receipt>, ReceiptStoreError> {
        let inner = self.inner.read().map_err(|e| {
            ReceiptStoreError::Unavailable(format!("failed to acquire read lock: {}", e))
        })?;

        Ok(inner.get(id).cloned())
    }

    async fn ping(&self) -> Result<(), ReceiptStoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryReceiptStore::new();
        let receipt = Receipt::pending(ReceiptId::generate(), OffsetDateTime::now_utc());

        store.insert(&receipt).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&receipt.id).await.unwrap(), Some(receipt.clone()));

        let err = store.insert(&receipt).await.unwrap_err();
        assert!(matches!(err, ReceiptStoreError::Conflict(_)));
    }
}
