//! Framereel - still frames in, one merged video out.
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (jobs, retry, batches, merge planning, av)
//! - ports/: Trait definitions
//! - adapters/: Concrete implementations
//! - application/: Generic services
//! - config: Environment configuration
//!
//! # Pipeline
//! - `ClipOrchestrator`: one generated clip per frame, batched, with retries
//! - `MergeService`: the completed clips, in frame order, as a single video
//! - `ReelService`: both, plus handing the session to persistence

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

// Re-exports for convenience
pub use application::{ClipOrchestrator, MergeService, ReelService};
pub use config::AppConfig;
pub use domain::av;
pub use error::{MergeError, ProviderError, ReelError, StorageError, ValidationError};
