//! Audio/Video domain modules.

pub mod clock;
pub mod codec;
pub mod letterbox;
pub mod merge;
pub mod probe;
