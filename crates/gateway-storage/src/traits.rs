//! Backend-agnostic byte-object storage, the seam `GatewayStorage` builds
//! its upload/download/copy operations on top of.

use async_trait::async_trait;
use bytes::Bytes;
use gateway_error::GatewayError;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Bytes>;
    async fn exists(&self, key: &str) -> Result<bool>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn copy(&self, src_key: &str, dst_key: &str) -> Result<()>;
}
