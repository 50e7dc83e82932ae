//! Reusable utils for the bridge services.
//! Such as initializing the tracing framework and supervising the parts of a service.

pub mod logging;
pub mod peer;

// Re-export tracing crate for convenience.
pub use tracing;
