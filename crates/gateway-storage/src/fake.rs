//! In-memory [`ObjectStore`] for tests that exercise [`crate::facade::GatewayStorage`]
//! without a live object-storage endpoint.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use gateway_error::GatewayError;

use crate::traits::{ObjectStore, Result};

#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: DashMap<String, Bytes>,
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, key: &str, bytes: Bytes, _content_type: &str) -> Result<()> {
        self.objects.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        self.objects
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| GatewayError::Internal(format!("object not found: {key}")))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.remove(key);
        Ok(())
    }

    async fn copy(&self, src_key: &str, dst_key: &str) -> Result<()> {
        let bytes = self.get(src_key).await?;
        self.objects.insert(dst_key.to_string(), bytes);
        Ok(())
    }
}
