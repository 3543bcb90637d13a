//! Object storage seam used by the pipeline.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::client::R2Client;
use crate::error::StorageResult;

/// Blob storage for generated assets and rendered output.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key` and return a URL for it.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        key: &str,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> StorageResult<String>;

    /// Time-limited download URL for `key`.
    async fn download_url(&self, key: &str, ttl: Duration) -> StorageResult<String>;

    async fn download(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Delete `keys`; returns how many were requested for deletion.
    async fn delete(&self, keys: &[String]) -> StorageResult<u32>;
}

#[async_trait]
impl ObjectStore for R2Client {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        key: &str,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> StorageResult<String> {
        self.upload_bytes(bytes, key, content_type, metadata).await?;

        match self.public_url(key) {
            Some(url) => Ok(url),
            None => self.presign_get(key, self.presign_ttl()).await,
        }
    }

    async fn download_url(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        self.presign_get(key, ttl).await
    }

    async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.download_bytes(key).await
    }

    async fn delete(&self, keys: &[String]) -> StorageResult<u32> {
        self.delete_objects(keys).await
    }
}
