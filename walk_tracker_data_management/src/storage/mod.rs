use std::sync::Arc;

use crate::DataManagerError;

pub mod constants;
pub mod file_store;
pub mod memory_store;

/// String key-value persistence. No transactions: every call stands alone.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// `None` when the key has never been written or was removed.
    async fn get(&self, key: &str) -> Result<Option<String>, DataManagerError>;

    async fn set(&self, key: &str, value: String) -> Result<(), DataManagerError>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), DataManagerError>;
}

#[async_trait::async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<String>, DataManagerError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), DataManagerError> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), DataManagerError> {
        (**self).remove(key).await
    }
}
