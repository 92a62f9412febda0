use crate::domain::jobs::FrameRef;
use crate::error::StorageError;
use crate::ports::FrameSource;
use async_trait::async_trait;
use std::path::PathBuf;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

/// Frames stored as `<root>/<owner_id>/<name>`, ordered by file name.
#[derive(Debug, Clone)]
pub struct FsFrameSource {
    root: PathBuf,
    public_base_url: Option<String>,
}

impl FsFrameSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            public_base_url: None,
        }
    }

    /// Publish frame URLs under a base instead of local paths.
    pub fn with_public_base_url(mut self, base: impl Into<String>) -> Self {
        self.public_base_url = Some(base.into().trim_end_matches('/').to_string());
        self
    }
}

fn is_image(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[async_trait]
impl FrameSource for FsFrameSource {
    async fn list(&self, owner_id: &str) -> Result<Vec<FrameRef>, StorageError> {
        if owner_id.is_empty() || owner_id.contains(['/', '\\']) || owner_id == ".." {
            return Err(StorageError::InvalidKey(owner_id.to_string()));
        }
        let dir = self.root.join(owner_id);
        if !tokio::fs::try_exists(&dir).await? {
            return Err(StorageError::NotFound(dir.display().to_string()));
        }

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if is_image(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();

        Ok(names
            .into_iter()
            .map(|name| {
                let key = format!("{}/{}", owner_id, name);
                let url = match &self.public_base_url {
                    Some(base) => format!("{}/{}", base, key),
                    None => dir.join(&name).display().to_string(),
                };
                FrameRef::new(key, url, name)
            })
            .collect())
    }
}
