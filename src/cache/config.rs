//! Cache configuration.
//!
//! Selects the listing cache backend via `recipebox.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_MEMORY_CAPACITY: NonZeroUsize = match NonZeroUsize::new(16) {
    Some(capacity) => capacity,
    None => NonZeroUsize::MIN,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
    Disabled,
}

impl CacheBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheBackend::Memory => "memory",
            CacheBackend::Redis => "redis",
            CacheBackend::Disabled => "disabled",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Required when `backend` is `redis`.
    pub redis_url: Option<String>,
    /// Expiry for the listing snapshot. `None` keeps it until invalidated.
    pub listing_ttl: Option<Duration>,
    /// Maximum entries held by the in-process backend.
    pub memory_capacity: NonZeroUsize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            redis_url: None,
            listing_ttl: None,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            backend: settings.backend,
            redis_url: settings.redis_url.clone(),
            listing_ttl: settings.listing_ttl,
            memory_capacity: settings.memory_capacity,
        }
    }
}
