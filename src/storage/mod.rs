//! Key-value persistence for the admin collections
//!
//! The services only need `load(key)` / `save(key, value)` over JSON text.
//! Two backends are provided: [`MemoryStore`] and [`FileStore`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use strum::{AsRefStr, EnumIter};
use tracing::{debug, warn};

use crate::config::{StorageConfig, StoreBackend};
use crate::errors::{CoasterError, Result};

pub mod file;
pub mod memory;
pub mod models;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use models::{BeanCatalog, CoffeeBean, SaleInfo};

/// Keys of the persisted collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumIter)]
pub enum StoreKey {
    #[strum(serialize = "nfc-scan-events")]
    EventLog,
    #[strum(serialize = "coffee-beans")]
    Catalog,
    #[strum(serialize = "url-history")]
    UrlHistory,
    #[strum(serialize = "url-generator-config")]
    GeneratorConfig,
    #[strum(serialize = "google-sheets-config")]
    SyncConfig,
    #[strum(serialize = "sync-history")]
    SyncHistory,
    #[strum(serialize = "cafe-info")]
    CafeInfo,
    #[strum(serialize = "social-media")]
    SocialMedia,
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Opaque get/set store of JSON documents
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn load(&self, key: StoreKey) -> Result<Option<String>>;
    async fn save(&self, key: StoreKey, value: String) -> Result<()>;

    /// 获取后端名称（用于日志）
    fn backend_name(&self) -> &'static str;
}

/// Load and deserialize a collection; `None` when the key was never written
pub async fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: StoreKey,
) -> Result<Option<T>> {
    match store.load(key).await? {
        Some(raw) => {
            let value = serde_json::from_str(&raw).map_err(|e| {
                warn!("Store: failed to parse '{}': {}", key, e);
                CoasterError::serialization(format!("Failed to parse '{}': {}", key, e))
            })?;
            Ok(Some(value))
        }
        None => {
            debug!("Store: key '{}' not present", key);
            Ok(None)
        }
    }
}

/// Serialize and persist a collection
pub async fn save_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: StoreKey,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.save(key, raw).await
}

pub struct StoreFactory;

impl StoreFactory {
    pub fn create(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>> {
        let store: Arc<dyn KeyValueStore> = match config.backend {
            StoreBackend::File => Arc::new(FileStore::new(&config.data_dir)?),
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        };
        debug!("Store: using {} backend", store.backend_name());
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_store_keys_are_distinct() {
        let keys: std::collections::HashSet<String> =
            StoreKey::iter().map(|k| k.as_ref().to_string()).collect();
        assert_eq!(keys.len(), StoreKey::iter().count());
        assert_eq!(StoreKey::Catalog.as_ref(), "coffee-beans");
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let store = MemoryStore::new();
        assert!(
            load_json::<Vec<String>>(&store, StoreKey::Catalog)
                .await
                .unwrap()
                .is_none()
        );

        save_json(&store, StoreKey::Catalog, &vec!["a".to_string()])
            .await
            .unwrap();
        let loaded: Vec<String> = load_json(&store, StoreKey::Catalog).await.unwrap().unwrap();
        assert_eq!(loaded, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_corrupt_json_is_serialization_error() {
        let store = MemoryStore::new();
        store
            .save(StoreKey::CafeInfo, "{not json".to_string())
            .await
            .unwrap();
        let err = load_json::<serde_json::Value>(&store, StoreKey::CafeInfo)
            .await
            .unwrap_err();
        assert!(matches!(err, CoasterError::Serialization(_)));
    }
}
