// In-memory implementation of TokenStore.
// Nothing survives the process; used where a throwaway session is enough.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::core::session::{TokenStore, TokenStoreError};

pub struct InMemoryTokenStore {
    values: DashMap<String, String>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self {
            values: DashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for InMemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get(&self, key: &str) -> Result<Option<String>, TokenStoreError> {
        Ok(self.values.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), TokenStoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), TokenStoreError> {
        self.values.remove(key);
        Ok(())
    }
}

// Lets a caller keep a handle on the store it handed to a SessionService.
#[async_trait]
impl TokenStore for std::sync::Arc<InMemoryTokenStore> {
    async fn get(&self, key: &str) -> Result<Option<String>, TokenStoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), TokenStoreError> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), TokenStoreError> {
        (**self).remove(key).await
    }
}
