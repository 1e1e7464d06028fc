use async_trait::async_trait;
use dashmap::DashMap;

use super::{KeyValueStore, StoreKey};
use crate::errors::Result;

/// In-process store, used by tests and `storage.backend = "memory"`
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: DashMap<StoreKey, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn load(&self, key: StoreKey) -> Result<Option<String>> {
        Ok(self.data.get(&key).map(|v| v.value().clone()))
    }

    async fn save(&self, key: StoreKey, value: String) -> Result<()> {
        self.data.insert(key, value);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
