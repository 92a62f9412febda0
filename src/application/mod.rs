//! Application layer - Generic services that use ports.

pub mod merge;
pub mod orchestrator;
pub mod progress;
pub mod reel;
pub mod worker;

pub use merge::{FallbackMode, MergeOptions, MergeService, MergeTask, MergedAsset};
pub use orchestrator::{ClipOrchestrator, GenerationControl, GenerationOptions, OrchestratorConfig};
pub use reel::{ReelOptions, ReelOutcome, ReelService};
pub use worker::PollConfig;
