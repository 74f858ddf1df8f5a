//! Per-page persistence of the view map.
//!
//! Every operation here is best-effort: the in-memory partitions stay the
//! source of truth, so failures are logged and never retried.

use super::codec::{decode, encode, storage_key};
use super::{Storage, StorageError, StorageResult};
use crate::view::{ViewId, ViewMap};
use std::sync::Arc;

/// Storage handle bound to one page's key.
pub struct InkStore<S: Storage> {
    storage: Arc<S>,
    key: String,
}

impl<S: Storage> Clone for InkStore<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            key: self.key.clone(),
        }
    }
}

impl<S: Storage> InkStore<S> {
    /// Bind `storage` to the page at `page_path`.
    pub fn new(storage: Arc<S>, page_path: &str) -> Self {
        Self {
            storage,
            key: storage_key(page_path),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Load the page's ink. Missing, unreadable or malformed data all
    /// yield an empty map.
    pub async fn load(&self, current: &ViewId) -> ViewMap {
        match self.storage.get(&self.key).await {
            Ok(Some(json)) => {
                let views = decode(&json, current);
                log::info!(
                    "Loaded {} view(s) for {}",
                    views.len(),
                    self.key
                );
                views
            }
            Ok(None) => ViewMap::new(),
            Err(e) => {
                log::warn!("Failed to load ink for {}: {}", self.key, e);
                ViewMap::new()
            }
        }
    }

    /// Write the whole view map, replacing what was stored.
    pub async fn save(&self, views: &ViewMap) -> StorageResult<()> {
        let json = encode(views).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.storage.set(&self.key, json).await
    }

    /// [`InkStore::save`], logging instead of returning failures.
    pub async fn flush(&self, views: &ViewMap) {
        match self.save(views).await {
            Ok(()) => log::debug!("Saved ink for {}", self.key),
            Err(e) => log::warn!("Failed to save ink for {}: {}", self.key, e),
        }
    }

    /// Remove every view's ink for this page.
    pub async fn wipe(&self) {
        match self.storage.remove(&self.key).await {
            Ok(()) => log::info!("Cleared stored ink for {}", self.key),
            Err(e) => log::error!("Failed to clear stored ink for {}: {}", self.key, e),
        }
    }
}

/// Create a platform-appropriate storage backend.
#[cfg(not(target_arch = "wasm32"))]
pub fn create_default_storage() -> StorageResult<Arc<crate::storage::FileStorage>> {
    Ok(Arc::new(crate::storage::FileStorage::default_location()?))
}

#[cfg(target_arch = "wasm32")]
pub fn create_default_storage() -> StorageResult<Arc<crate::storage::IndexedDbStorage>> {
    Ok(Arc::new(crate::storage::IndexedDbStorage::new()))
}

#[cfg(not(target_arch = "wasm32"))]
pub type PlatformStorage = crate::storage::FileStorage;

#[cfg(target_arch = "wasm32")]
pub type PlatformStorage = crate::storage::IndexedDbStorage;

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::ink::{InkColor, InkPoint, InkTool, Stroke};
    use crate::storage::{BoxFuture, MemoryStorage, block_on};

    fn views() -> ViewMap {
        let stroke = Stroke::new(InkTool::Pen, InkColor::black(), 1.0)
            .with_points(vec![InkPoint::new(0.0, 0.0), InkPoint::new(10.0, 10.0)]);
        let mut map = ViewMap::new();
        map.insert(ViewId::default(), vec![stroke]);
        map
    }

    /// Storage whose every operation fails.
    struct Unavailable;

    impl Storage for Unavailable {
        fn get(&self, _key: &str) -> BoxFuture<'_, StorageResult<Option<String>>> {
            Box::pin(async { Err(StorageError::Io("quota exceeded".to_string())) })
        }

        fn set(&self, _key: &str, _value: String) -> BoxFuture<'_, StorageResult<()>> {
            Box::pin(async { Err(StorageError::Io("quota exceeded".to_string())) })
        }

        fn remove(&self, _key: &str) -> BoxFuture<'_, StorageResult<()>> {
            Box::pin(async { Err(StorageError::Io("quota exceeded".to_string())) })
        }

        fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
            Box::pin(async { Err(StorageError::Io("quota exceeded".to_string())) })
        }

        fn exists(&self, _key: &str) -> BoxFuture<'_, StorageResult<bool>> {
            Box::pin(async { Err(StorageError::Io("quota exceeded".to_string())) })
        }
    }

    #[test]
    fn test_save_then_load() {
        let store = InkStore::new(Arc::new(MemoryStorage::new()), "/lesson/1.html");
        assert_eq!(store.key(), "marginalia:/lesson/1.html");

        block_on(store.save(&views())).unwrap();
        assert_eq!(block_on(store.load(&ViewId::default())), views());
    }

    #[test]
    fn test_pages_are_isolated() {
        let storage = Arc::new(MemoryStorage::new());
        let a = InkStore::new(Arc::clone(&storage), "/a.html");
        let b = InkStore::new(storage, "/b.html");
        block_on(a.save(&views())).unwrap();
        assert!(block_on(b.load(&ViewId::default())).is_empty());
    }

    #[test]
    fn test_load_missing_is_empty() {
        let store = InkStore::new(Arc::new(MemoryStorage::new()), "/new.html");
        assert!(block_on(store.load(&ViewId::default())).is_empty());
    }

    #[test]
    fn test_load_legacy_list() {
        let storage = Arc::new(MemoryStorage::new());
        let json = serde_json::to_string(&views()[&ViewId::default()]).unwrap();
        block_on(storage.set("marginalia:/old.html", json)).unwrap();

        let store = InkStore::new(storage, "/old.html");
        let loaded = block_on(store.load(&ViewId::from("intro")));
        assert_eq!(loaded.keys().collect::<Vec<_>>(), vec![&ViewId::from("intro")]);
    }

    #[test]
    fn test_wipe_removes_everything() {
        let store = InkStore::new(Arc::new(MemoryStorage::new()), "/lesson.html");
        block_on(store.save(&views())).unwrap();
        block_on(store.wipe());
        assert!(!block_on(store.storage().exists(store.key())).unwrap());
    }

    #[test]
    fn test_failures_are_swallowed() {
        let store = InkStore::new(Arc::new(Unavailable), "/lesson.html");
        assert!(block_on(store.save(&views())).is_err());
        // None of these panic or propagate.
        block_on(store.flush(&views()));
        block_on(store.wipe());
        assert!(block_on(store.load(&ViewId::default())).is_empty());
    }
}
