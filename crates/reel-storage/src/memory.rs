//! In-process object store for local runs and tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};
use crate::store::ObjectStore;

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub metadata: HashMap<String, String>,
}

/// [`ObjectStore`] keeping objects in a map; URLs use the `memory://` scheme.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn url_for(key: &str) -> String {
        format!("memory://{}", key)
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, HashMap<String, StoredObject>>> {
        self.objects
            .lock()
            .map_err(|_| StorageError::AwsSdk("object map lock poisoned".to_string()))
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.lock().ok().and_then(|m| m.get(key).cloned())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .lock()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        key: &str,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> StorageResult<String> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("empty key".to_string()));
        }
        self.lock()?.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
                metadata,
            },
        );
        Ok(Self::url_for(key))
    }

    async fn download_url(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        if !self.lock()?.contains_key(key) {
            return Err(StorageError::not_found(key));
        }
        Ok(format!("{}?ttl={}", Self::url_for(key), ttl.as_secs()))
    }

    async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.lock()?
            .get(key)
            .map(|o| o.bytes.clone())
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn delete(&self, keys: &[String]) -> StorageResult<u32> {
        let mut objects = self.lock()?;
        for key in keys {
            objects.remove(key);
        }
        Ok(keys.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_download_delete() {
        let store = MemoryObjectStore::new();
        let url = store
            .upload(vec![1, 2], "videos/v1/final.mp4", "video/mp4", HashMap::new())
            .await
            .unwrap();
        assert_eq!(url, "memory://videos/v1/final.mp4");
        assert_eq!(store.download("videos/v1/final.mp4").await.unwrap(), vec![1, 2]);

        assert_eq!(store.delete(&["videos/v1/final.mp4".to_string()]).await.unwrap(), 1);
        assert!(matches!(
            store.download("videos/v1/final.mp4").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_download_url_requires_object() {
        let store = MemoryObjectStore::new();
        assert!(store.download_url("nope", Duration::from_secs(1)).await.is_err());
    }
}
