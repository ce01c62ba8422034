//! Platform-specific defaults and time sources

#[cfg(not(target_family = "wasm"))]
pub use std::time::Instant;
#[cfg(target_family = "wasm")]
pub use web_time::Instant;

/// Maximum number of page sequences kept by the in-memory store
pub const DEFAULT_MAX_CACHE_SIZE: usize = 1000;

