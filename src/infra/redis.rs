//! Redis-backed listing cache.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::{Client, aio::ConnectionManager};
use tracing::debug;

use crate::application::context::CallContext;
use crate::cache::{CacheError, CacheStore};

const TARGET: &str = "recipebox::infra::redis";

/// Shares one multiplexed connection that reconnects on failure.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(CacheError::backend)?;
        let connection = client
            .get_connection_manager()
            .await
            .map_err(CacheError::backend)?;
        debug!(target: TARGET, "redis connection manager ready");
        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, ctx: &CallContext, key: &str) -> Result<Option<Bytes>, CacheError> {
        let mut connection = self.connection.clone();
        let value = ctx
            .run(
                redis::cmd("GET")
                    .arg(key)
                    .query_async::<_, Option<Vec<u8>>>(&mut connection),
            )
            .await?
            .map_err(CacheError::backend)?;
        Ok(value.map(Bytes::from))
    }

    async fn set(
        &self,
        ctx: &CallContext,
        key: &str,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        let mut command = redis::cmd("SET");
        command.arg(key).arg(value.as_ref());
        if let Some(ttl) = ttl {
            // PX rejects zero; the shortest expiry Redis accepts is one millisecond.
            let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
            command.arg("PX").arg(millis);
        }
        ctx.run(command.query_async::<_, ()>(&mut connection))
            .await?
            .map_err(CacheError::backend)
    }

    async fn delete(&self, ctx: &CallContext, key: &str) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        ctx.run(
            redis::cmd("DEL")
                .arg(key)
                .query_async::<_, i64>(&mut connection),
        )
        .await?
        .map_err(CacheError::backend)?;
        Ok(())
    }
}
