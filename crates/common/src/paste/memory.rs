use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::id::PasteId;
use super::store::{PasteStore, PasteStoreError, StoredItem};

/// In-memory paste store using a HashMap
///
/// Lives exactly as long as the process (or the last clone of the store);
///  nothing is written anywhere else.
#[derive(Debug, Clone)]
pub struct MemoryPasteStore {
    inner: Arc<RwLock<MemoryPasteStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryPasteStoreInner {
    /// Store items: paste_id -> item
    items: HashMap<PasteId, StoredItem>,
}

impl MemoryPasteStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryPasteStoreInner::default())),
        }
    }

    /// Number of stored pastes
    pub fn len(&self) -> Result<usize, PasteStoreError> {
        let inner = self.inner.read().map_err(|e| {
            PasteStoreError::Provider(format!("failed to acquire read lock: {}", e))
        })?;
        Ok(inner.items.len())
    }

    pub fn is_empty(&self) -> Result<bool, PasteStoreError> {
        Ok(self.len()? == 0)
    }
}

impl Default for MemoryPasteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PasteStore for MemoryPasteStore {
    async fn insert(&self, item: StoredItem) -> Result<(), PasteStoreError> {
        let mut inner = self.inner.write().map_err(|e| {
            PasteStoreError::Provider(format!("failed to acquire write lock: {}", e))
        })?;

        match inner.items.entry(item.id.clone()) {
            Entry::Occupied(_) => Err(PasteStoreError::Conflict(item.id)),
            Entry::Vacant(slot) => {
                slot.insert(item);
                Ok(())
            }
        }
    }

    async fn fetch(&self, id: &str) -> Result<Option<StoredItem>, PasteStoreError> {
        let inner = self.inner.read().map_err(|e| {
            PasteStoreError::Provider(format!("failed to acquire read lock: {}", e))
        })?;

        Ok(inner.items.get(&PasteId::from(id)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paste::store::MAX_ID_ATTEMPTS;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryPasteStore::new();

        let id = store.create("hello world".to_string()).await.unwrap();
        let item = store.get(&id).await.unwrap();

        assert_eq!(item.id, id);
        assert_eq!(item.payload, "hello world");
    }

    #[tokio::test]
    async fn test_payload_is_stored_untrimmed() {
        let store = MemoryPasteStore::new();

        let payload = "  indented\n\n".to_string();
        let id = store.create(payload.clone()).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap().payload, payload);
    }

    #[tokio::test]
    async fn test_empty_payload_rejected() {
        let store = MemoryPasteStore::new();

        for payload in ["", "   ", "\n\t "] {
            let result = store.create(payload.to_string()).await;
            assert_eq!(result, Err(PasteStoreError::InvalidInput));
        }
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_get_unknown_id() {
        let store = MemoryPasteStore::new();
        store.create("something".to_string()).await.unwrap();

        let result = store.get("zzzzzz").await;
        assert_eq!(result, Err(PasteStoreError::NotFound("zzzzzz".to_string())));
    }

    #[tokio::test]
    async fn test_insert_never_overwrites() {
        let store = MemoryPasteStore::new();
        let id = store.create("first".to_string()).await.unwrap();

        let item = StoredItem {
            id: id.clone(),
            payload: "second".to_string(),
            created_at: time::OffsetDateTime::now_utc(),
        };
        let result = store.insert(item).await;
        assert_eq!(result, Err(PasteStoreError::Conflict(id.clone())));
        assert_eq!(store.get(&id).await.unwrap().payload, "first");
    }

    #[tokio::test]
    async fn test_collision_retries_with_new_id() {
        let store = MemoryPasteStore::new();

        let mut ids = ["aaaaaa", "aaaaaa", "aaaaaa", "bbbbbb"].into_iter();
        let mut next_id = move || PasteId::from(ids.next().unwrap_or("cccccc"));

        let first = store
            .create_with("one".to_string(), &mut next_id)
            .await
            .unwrap();
        let second = store
            .create_with("two".to_string(), &mut next_id)
            .await
            .unwrap();

        assert_eq!(first.as_str(), "aaaaaa");
        assert_eq!(second.as_str(), "bbbbbb");
        assert_eq!(store.get("aaaaaa").await.unwrap().payload, "one");
        assert_eq!(store.get("bbbbbb").await.unwrap().payload, "two");
    }

    #[tokio::test]
    async fn test_collision_streak_gives_up() {
        let store = MemoryPasteStore::new();
        let mut always_same = || PasteId::from("aaaaaa");

        store
            .create_with("taken".to_string(), &mut always_same)
            .await
            .unwrap();
        let result = store
            .create_with("unlucky".to_string(), &mut always_same)
            .await;

        assert_eq!(result, Err(PasteStoreError::IdSpaceExhausted(MAX_ID_ATTEMPTS)));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_creates() {
        let store = MemoryPasteStore::new();

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.create(format!("paste {}", i)).await })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(store.len().unwrap(), 64);
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(store.get(id).await.unwrap().payload, format!("paste {}", i));
        }
    }
}
