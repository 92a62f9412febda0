use crate::domain::jobs::FrameRef;
use crate::error::StorageError;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Source frames of an owner, in the order clips should follow
    async fn list(&self, owner_id: &str) -> Result<Vec<FrameRef>, StorageError>;
}
