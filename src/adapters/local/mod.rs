//! Local adapters for single-host deployment.

pub mod frames;
pub mod fs;

pub use frames::FsFrameSource;
pub use fs::FsObjectStore;
