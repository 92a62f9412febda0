//! Error taxonomy shared by the orchestrator, the merge engine and the adapters.

use thiserror::Error;

/// Bad input rejected before any collaborator is called.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("no frames to generate clips from")]
    EmptyFrames,

    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    #[error("quality must be within [0, 1], got {0}")]
    InvalidQuality(f64),

    #[error("frame rate must be at least 1")]
    InvalidFrameRate,
}

/// Failure reported by (or while talking to) the video-generation provider.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Transient: network trouble, 5xx, rate limiting.
    #[error("provider error (retryable): {0}")]
    Retryable(String),

    /// Explicit rejection, failed or cancelled job.
    #[error("provider error: {0}")]
    Terminal(String),

    /// The job did not reach a terminal status within the wait budget.
    #[error("clip generation timed out after {waited_secs}s")]
    Timeout { waited_secs: u64 },
}

impl ProviderError {
    pub fn retryable(msg: impl Into<String>) -> Self {
        Self::Retryable(msg.into())
    }

    pub fn terminal(msg: impl Into<String>) -> Self {
        Self::Terminal(msg.into())
    }

    /// Terminal errors are the only kind a retry can never fix.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ProviderError::Terminal(_))
    }
}

/// Object store, frame source and session repository failures.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a merge call. No partial asset is ever returned alongside one.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("nothing to merge")]
    NothingToMerge,

    #[error("invalid merge options: {0}")]
    InvalidOptions(#[from] ValidationError),

    #[error("failed to decode clip {index} ({reference}): {reason}")]
    Decode {
        index: usize,
        reference: String,
        reason: String,
    },

    #[error("encode failed: {0}")]
    Encode(String),

    #[error("no supported encoder for {0} output")]
    NoSupportedEncoder(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MergeError {
    pub fn decode(index: usize, reference: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            index,
            reference: reference.into(),
            reason: reason.to_string(),
        }
    }

    pub fn encode(reason: impl ToString) -> Self {
        Self::Encode(reason.to_string())
    }
}

/// Errors surfaced by the end-to-end reel pipeline.
#[derive(Debug, Error)]
pub enum ReelError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
