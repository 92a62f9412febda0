//! Adapters - Concrete implementations of ports.

pub mod http;
pub mod inline;
pub mod local;
pub mod memory;

pub use http::{HttpProviderConfig, HttpVideoProvider};
pub use inline::DataUriInliner;
pub use local::{FsFrameSource, FsObjectStore};
pub use memory::InMemorySessionRepository;
