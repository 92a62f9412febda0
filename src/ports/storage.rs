use crate::error::StorageError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    pub url: String,
    pub key: String,
    pub size: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Persist bytes under `path` and return where they ended up
    async fn upload(&self, bytes: &[u8], path: &str) -> Result<StoredObject, StorageError>;

    /// Public URL for a stored key
    fn public_url(&self, key: &str) -> String;

    /// Fetch an object (by key or by one of our public URLs) to a local path
    async fn download(&self, key_or_url: &str, local_path: &Path) -> Result<(), StorageError>;
}
