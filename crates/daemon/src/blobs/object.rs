use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions};

use super::{BlobStore, BlobStoreError};

/// [`BlobStore`] over any `object_store` backend.
#[derive(Debug, Clone)]
pub struct ObjectBlobStore {
    inner: Arc<dyn ObjectStore>,
    // the local filesystem backend rejects puts carrying attributes
    tag_content_type: bool,
}

impl ObjectBlobStore {
    pub fn new(inner: Arc<dyn ObjectStore>, tag_content_type: bool) -> Self {
        Self {
            inner,
            tag_content_type,
        }
    }

    /// Create an in-memory store.
    pub fn memory() -> Self {
        Self::new(Arc::new(InMemory::new()), true)
    }

    /// Read an object back, `None` if it does not exist.
    pub async fn get(&self, name: &str) -> Result<Option<Bytes>, BlobStoreError> {
        match self.inner.get(&ObjectPath::from(name)).await {
            Ok(result) => Ok(Some(result.bytes().await?)),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Content type recorded for an object, if the backend keeps one.
    pub async fn content_type(&self, name: &str) -> Result<Option<String>, BlobStoreError> {
        match self.inner.get(&ObjectPath::from(name)).await {
            Ok(result) => Ok(result
                .attributes
                .get(&Attribute::ContentType)
                .map(|v| v.to_string())),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Number of objects currently stored.
    pub async fn len(&self) -> Result<usize, BlobStoreError> {
        use futures::TryStreamExt;

        let items: Vec<_> = self.inner.list(None).try_collect().await?;
        Ok(items.len())
    }

    pub async fn is_empty(&self) -> Result<bool, BlobStoreError> {
        Ok(self.len().await? == 0)
    }
}

#[async_trait]
impl BlobStore for ObjectBlobStore {
    async fn put(&self, name: &str, data: Bytes, content_type: &str) -> Result<(), BlobStoreError> {
        let path = ObjectPath::from(name);

        let mut opts = PutOptions::default();
        if self.tag_content_type {
            let mut attributes = Attributes::new();
            attributes.insert(Attribute::ContentType, content_type.to_string().into());
            opts.attributes = attributes;
        }

        self.inner.put_opts(&path, data.into(), opts).await?;
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), BlobStoreError> {
        match self.inner.delete(&ObjectPath::from(name)).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool, BlobStoreError> {
        match self.inner.head(&ObjectPath::from(name)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
