//! Domain layer - Pure business logic.

// Decode/composite/encode (requires ffmpeg-next)
pub mod av;

pub mod batch;
pub mod jobs;
pub mod plan;
pub mod retry;
