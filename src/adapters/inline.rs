//! Inlines frame images as `data:` URIs so the provider never has to fetch
//! them from our storage.

use crate::domain::jobs::FrameRef;
use crate::error::StorageError;
use crate::ports::FramePreprocessor;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::path::Path;

#[derive(Clone, Default)]
pub struct DataUriInliner {
    http: Client,
}

impl DataUriInliner {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    async fn fetch(&self, url: &str) -> Result<(Vec<u8>, Option<String>), StorageError> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| v.starts_with("image/"));
        Ok((response.bytes().await?.to_vec(), mime))
    }
}

pub fn mime_for(reference: &str) -> &'static str {
    let ext = Path::new(reference.split('?').next().unwrap_or(reference))
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl FramePreprocessor for DataUriInliner {
    async fn prepare(&self, frame: &FrameRef) -> Result<String, StorageError> {
        let reference = frame.url.as_str();
        if reference.starts_with("data:") {
            return Ok(reference.to_string());
        }

        let (bytes, mime) = if reference.starts_with("http://") || reference.starts_with("https://") {
            self.fetch(reference).await?
        } else {
            let path = reference.strip_prefix("file://").unwrap_or(reference);
            (tokio::fs::read(path).await?, None)
        };

        let mime = mime.unwrap_or_else(|| mime_for(reference).to_string());
        Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
    }
}
