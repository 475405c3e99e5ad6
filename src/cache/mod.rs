//! Recipe listing cache.
//!
//! The catalog keeps exactly one derived entry: the serialized snapshot of the
//! full recipe listing, stored under [`RECIPES_LISTING_KEY`]. Backends:
//!
//! - **memory**: in-process LRU ([`MemoryCache`]), optional per-entry TTL
//! - **redis**: shared key-value cache (`infra::redis::RedisCache`)
//! - **disabled**: no cache layer; the listing always reads the store
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! backend = "redis"
//! redis_url = "redis://127.0.0.1:6379"
//! # listing_ttl_seconds = 300
//! ```

mod config;
mod lock;
mod store;

pub use config::{CacheBackend, CacheConfig};
pub use store::{CacheError, CacheStore, MemoryCache};

/// Key of the full listing snapshot. Written whole, never patched.
pub const RECIPES_LISTING_KEY: &str = "recipes";
