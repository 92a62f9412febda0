use crate::error::StorageError;
use crate::ports::storage::{ObjectStore, StoredObject};
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Component, Path, PathBuf};

/// Object store backed by a local directory, served under `public_base_url`.
#[derive(Clone)]
pub struct FsObjectStore {
    root: PathBuf,
    public_base_url: String,
    http: Client,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    /// Keys are relative paths that stay inside the root.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if key.is_empty() || escapes {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn key_from_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(&self.public_base_url)?.strip_prefix('/')
    }

    async fn fetch(&self, url: &str, local_path: &Path) -> Result<(), StorageError> {
        let response = self.http.get(url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(url.to_string()));
        }
        let bytes = response.error_for_status()?.bytes().await?;
        tokio::fs::write(local_path, &bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn upload(&self, bytes: &[u8], path: &str) -> Result<StoredObject, StorageError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;

        Ok(StoredObject {
            url: self.public_url(path),
            key: path.to_string(),
            size: bytes.len() as u64,
        })
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    async fn download(&self, key_or_url: &str, local_path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // One of ours: read straight from disk.
        let key = self.key_from_url(key_or_url).unwrap_or(key_or_url);
        if let Ok(source) = self.resolve(key) {
            if tokio::fs::try_exists(&source).await? {
                tokio::fs::copy(&source, local_path).await?;
                return Ok(());
            }
        }

        if key_or_url.starts_with("http://") || key_or_url.starts_with("https://") {
            return self.fetch(key_or_url, local_path).await;
        }

        // Plain local path outside the store.
        let source = Path::new(key_or_url.strip_prefix("file://").unwrap_or(key_or_url));
        if source.is_absolute() && tokio::fs::try_exists(source).await? {
            tokio::fs::copy(source, local_path).await?;
            return Ok(());
        }
        Err(StorageError::NotFound(key_or_url.to_string()))
    }
}
