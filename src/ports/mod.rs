//! Ports - Trait definitions for the collaborators the core talks to.

pub mod frames;
pub mod preprocess;
pub mod provider;
pub mod repository;
pub mod storage;

pub use frames::FrameSource;
pub use preprocess::FramePreprocessor;
pub use provider::VideoGenerationProvider;
pub use repository::SessionRepository;
pub use storage::ObjectStore;
