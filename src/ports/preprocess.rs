use crate::domain::jobs::FrameRef;
use crate::error::StorageError;
use async_trait::async_trait;

/// Optional conversion of a frame reference before it is submitted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FramePreprocessor: Send + Sync {
    async fn prepare(&self, frame: &FrameRef) -> Result<String, StorageError>;
}
