use crate::domain::jobs::GenerationSession;
use crate::error::StorageError;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Store (or replace) a finished generation session
    async fn save_session(&self, session: &GenerationSession) -> Result<(), StorageError>;

    /// Get a session by id
    async fn get_session(&self, session_id: &str)
        -> Result<Option<GenerationSession>, StorageError>;
}
