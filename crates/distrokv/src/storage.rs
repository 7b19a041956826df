//! In-memory key-value store backing the data plane.

use distrokv_common::KvError;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Guarded `key -> value` map.
///
/// Readers share the lock; `set` and `delete` take it exclusively, so a `get`
/// never observes a half-applied write.
#[derive(Debug, Default)]
pub struct KeyValueStore {
    data: RwLock<HashMap<String, String>>,
}

impl KeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `key`
    pub async fn get(&self, key: &str) -> Result<String, KvError> {
        let data = self.data.read().await;
        match data.get(key) {
            Some(value) => {
                tracing::debug!(key = %key, "Get");
                Ok(value.clone())
            }
            None => {
                tracing::debug!(key = %key, "Get for missing key");
                Err(KvError::KeyNotFound(key.to_string()))
            }
        }
    }

    /// Insert or overwrite `key`
    pub async fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        tracing::debug!(key = %key, "Set");
        self.data.write().await.insert(key, value.into());
    }

    /// Remove `key`, failing if it is absent
    pub async fn delete(&self, key: &str) -> Result<(), KvError> {
        let mut data = self.data.write().await;
        if data.remove(key).is_none() {
            tracing::debug!(key = %key, "Delete for missing key");
            return Err(KvError::KeyNotFound(key.to_string()));
        }
        tracing::debug!(key = %key, "Deleted");
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_set_get_delete_round_trip() {
        let store = KeyValueStore::new();

        store.set("k", "v").await;
        assert_eq!(store.get("k").await.unwrap(), "v");

        store.delete("k").await.unwrap();
        assert!(matches!(store.get("k").await, Err(KvError::KeyNotFound(k)) if k == "k"));
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let store = KeyValueStore::new();
        store.set("k", "v1").await;
        store.set("k", "v2").await;
        assert_eq!(store.get("k").await.unwrap(), "v2");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_missing_key_has_no_side_effects() {
        let store = KeyValueStore::new();
        store.set("other", "x").await;

        let result = store.delete("absent").await;
        assert!(matches!(result, Err(KvError::KeyNotFound(_))));
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("other").await.unwrap(), "x");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_and_readers() {
        let store = Arc::new(KeyValueStore::new());

        let writers = (0..64).map(|i| {
            let store = store.clone();
            tokio::spawn(async move { store.set(format!("key-{}", i), format!("value-{}", i)).await })
        });
        futures::future::join_all(writers).await;

        let readers = (0..64).map(|i| {
            let store = store.clone();
            tokio::spawn(async move { store.get(&format!("key-{}", i)).await })
        });
        for (i, result) in futures::future::join_all(readers).await.into_iter().enumerate() {
            assert_eq!(result.unwrap().unwrap(), format!("value-{}", i));
        }
        assert_eq!(store.len().await, 64);
    }
}
