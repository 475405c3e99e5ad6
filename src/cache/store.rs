//! Cache adapter contract and the in-process backend.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use thiserror::Error;

use crate::application::context::{CallContext, Interrupted};

use super::config::CacheConfig;
use super::lock::mutex_lock;

const SOURCE: &str = "cache::store";

/// A failed cache round-trip. An absent key is not an error: `get` returns
/// `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Backend(String),
    #[error("cache operation timed out")]
    Timeout,
    #[error("cache operation cancelled")]
    Cancelled,
}

impl CacheError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<Interrupted> for CacheError {
    fn from(value: Interrupted) -> Self {
        match value {
            Interrupted::Cancelled => Self::Cancelled,
            Interrupted::DeadlineExceeded => Self::Timeout,
        }
    }
}

/// Key-value cache holding opaque blobs.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, ctx: &CallContext, key: &str) -> Result<Option<Bytes>, CacheError>;

    /// `ttl = None` keeps the entry until it is deleted.
    async fn set(
        &self,
        ctx: &CallContext,
        key: &str,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError>;

    async fn delete(&self, ctx: &CallContext, key: &str) -> Result<(), CacheError>;
}

struct MemoryEntry {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// In-process LRU cache. Entries are evicted by capacity or lazily on expiry.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, MemoryEntry>>,
}

impl MemoryCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(config.memory_capacity)),
        }
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, ctx: &CallContext, key: &str) -> Result<Option<Bytes>, CacheError> {
        ctx.check()?;
        let mut entries = mutex_lock(&self.entries, SOURCE, "get");
        let expired = match entries.get(key) {
            Some(entry) if entry.is_expired(Instant::now()) => true,
            Some(entry) => return Ok(Some(entry.value.clone())),
            None => return Ok(None),
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    async fn set(
        &self,
        ctx: &CallContext,
        key: &str,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        ctx.check()?;
        let entry = MemoryEntry {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        mutex_lock(&self.entries, SOURCE, "set").put(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, ctx: &CallContext, key: &str) -> Result<(), CacheError> {
        ctx.check()?;
        mutex_lock(&self.entries, SOURCE, "delete").pop(key);
        Ok(())
    }
}
