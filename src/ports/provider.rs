use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What a single clip submission carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Frame reference, possibly inlined as a data URI.
    pub image: String,
    pub prompt: String,
    #[serde(rename = "duration")]
    pub duration_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollResult {
    pub status: ProviderStatus,
    pub output_url: Option<String>,
    pub duration_seconds: Option<f64>,
    pub error: Option<String>,
}

impl PollResult {
    pub fn completed(url: impl Into<String>, duration_seconds: Option<f64>) -> Self {
        Self {
            status: ProviderStatus::Completed,
            output_url: Some(url.into()),
            duration_seconds,
            error: None,
        }
    }

    pub fn with_status(status: ProviderStatus) -> Self {
        Self {
            status,
            output_url: None,
            duration_seconds: None,
            error: None,
        }
    }
}

/// A submission either starts an async job or answers right away.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Pending(JobHandle),
    Ready(PollResult),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoGenerationProvider: Send + Sync {
    /// Start generating one clip from a source frame.
    async fn submit(&self, request: &GenerationRequest) -> Result<Submission, ProviderError>;

    /// Current status of a previously submitted job.
    async fn poll(&self, handle: &JobHandle) -> Result<PollResult, ProviderError>;
}
