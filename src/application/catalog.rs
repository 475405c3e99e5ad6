//! Recipe catalog: cache-aside listing, invalidation on write, tag search and
//! identity-keyed mutation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use metrics::{counter, histogram};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, error, info};

use crate::application::context::CallContext;
use crate::application::repos::{
    NewRecipeParams, RecipeFields, RecipeFilter, RecipesRepo, RepoError,
};
use crate::cache::{CacheError, CacheStore, RECIPES_LISTING_KEY};
use crate::domain::entities::{RecipeId, RecipeRecord};
use crate::domain::error::DomainError;
use crate::domain::recipes::{RecipeInput, publication_time};

const TARGET: &str = "recipebox::catalog";

pub const METRIC_LISTING_CACHE_HIT: &str = "recipebox_listing_cache_hit_total";
pub const METRIC_LISTING_CACHE_MISS: &str = "recipebox_listing_cache_miss_total";
pub const METRIC_LISTING_INVALIDATE: &str = "recipebox_listing_invalidate_total";
pub const METRIC_STORE_FIND_MS: &str = "recipebox_store_find_ms";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("recipe `{id}` not found")]
    NotFound { id: String },
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("store operation `{operation}` failed (recipe: {})", .id.as_deref().unwrap_or("*"))]
    Store {
        operation: &'static str,
        id: Option<String>,
        #[source]
        source: RepoError,
    },
    #[error("cache operation `{operation}` failed")]
    Cache {
        operation: &'static str,
        #[source]
        source: CacheError,
    },
    #[error("cached listing could not be {operation}")]
    Codec {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl CatalogError {
    fn store(operation: &'static str, id: Option<RecipeId>, source: RepoError) -> Self {
        Self::Store {
            operation,
            id: id.map(|id| id.to_string()),
            source,
        }
    }

    fn cache(operation: &'static str, source: CacheError) -> Self {
        Self::Cache { operation, source }
    }

    fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }
}

/// Stateless per call; share it behind `Arc` across request tasks.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn RecipesRepo>,
    cache: Option<Arc<dyn CacheStore>>,
    listing_ttl: Option<Duration>,
    /// Bumped before every invalidation. A listing read that sees it move does
    /// not fill the cache.
    write_generation: Arc<AtomicU64>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn RecipesRepo>) -> Self {
        Self {
            store,
            cache: None,
            listing_ttl: None,
            write_generation: Arc::default(),
        }
    }

    pub fn with_cache(self, cache: Arc<dyn CacheStore>) -> Self {
        self.with_cache_opt(Some(cache))
    }

    pub fn with_cache_opt(mut self, cache: Option<Arc<dyn CacheStore>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_listing_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.listing_ttl = ttl;
        self
    }

    /// Full listing, served from the cache when a snapshot is present.
    pub async fn list(&self, ctx: &CallContext) -> Result<Vec<RecipeRecord>, CatalogError> {
        let Some(cache) = self.cache.as_ref() else {
            return self.find_all(ctx).await;
        };

        let cached = cache
            .get(ctx, RECIPES_LISTING_KEY)
            .await
            .map_err(|source| CatalogError::cache("get", source))?;

        if let Some(blob) = cached {
            counter!(METRIC_LISTING_CACHE_HIT).increment(1);
            debug!(target: TARGET, bytes = blob.len(), "Serving recipe listing from cache");
            return serde_json::from_slice(&blob).map_err(|source| CatalogError::Codec {
                operation: "decoded",
                source,
            });
        }

        counter!(METRIC_LISTING_CACHE_MISS).increment(1);
        info!(target: TARGET, "Recipe listing cache miss, reading store");

        let generation = self.write_generation.load(Ordering::Acquire);
        let recipes = self.find_all(ctx).await?;
        if self.write_generation.load(Ordering::Acquire) != generation {
            debug!(target: TARGET, "Recipe listing changed during store read, not caching it");
            return Ok(recipes);
        }

        let blob = serde_json::to_vec(&recipes).map_err(|source| CatalogError::Codec {
            operation: "encoded",
            source,
        })?;

        cache
            .set(ctx, RECIPES_LISTING_KEY, Bytes::from(blob), self.listing_ttl)
            .await
            .map_err(|source| CatalogError::cache("set", source))?;

        Ok(recipes)
    }

    pub async fn create(
        &self,
        ctx: &CallContext,
        input: RecipeInput,
    ) -> Result<RecipeRecord, CatalogError> {
        let input = input.validate()?;
        let published_at = publication_time(OffsetDateTime::now_utc())?;

        let params = NewRecipeParams {
            name: input.name,
            tags: input.tags,
            ingredients: input.ingredients,
            instructions: input.instructions,
            published_at,
        };

        let id = self
            .store
            .insert(ctx, params.clone())
            .await
            .map_err(|source| CatalogError::store("insert", None, source))?;

        info!(target: TARGET, recipe_id = %id, "Recipe created");
        self.invalidate_listing(ctx, "create").await?;

        Ok(RecipeRecord {
            id,
            name: params.name,
            tags: params.tags,
            ingredients: params.ingredients,
            instructions: params.instructions,
            published_at: params.published_at,
        })
    }

    /// Replaces the content fields; identifier and publication time are kept.
    pub async fn update(
        &self,
        ctx: &CallContext,
        raw_id: &str,
        input: RecipeInput,
    ) -> Result<RecipeRecord, CatalogError> {
        let input = input.validate()?;
        let id = RecipeId::parse(raw_id).ok_or_else(|| CatalogError::not_found(raw_id))?;

        let existing = self
            .store
            .find(ctx, &RecipeFilter::Id(id))
            .await
            .map_err(|source| CatalogError::store("find", Some(id), source))?
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::not_found(raw_id))?;

        let fields = RecipeFields {
            name: input.name,
            tags: input.tags,
            ingredients: input.ingredients,
            instructions: input.instructions,
        };

        let matched = self
            .store
            .update_fields(ctx, id, &fields)
            .await
            .map_err(|source| CatalogError::store("update", Some(id), source))?;
        if matched == 0 {
            return Err(CatalogError::not_found(raw_id));
        }

        info!(target: TARGET, recipe_id = %id, "Recipe updated");
        self.invalidate_listing(ctx, "update").await?;

        Ok(RecipeRecord {
            id: existing.id,
            name: fields.name,
            tags: fields.tags,
            ingredients: fields.ingredients,
            instructions: fields.instructions,
            published_at: existing.published_at,
        })
    }

    pub async fn delete(&self, ctx: &CallContext, raw_id: &str) -> Result<(), CatalogError> {
        let id = RecipeId::parse(raw_id).ok_or_else(|| CatalogError::not_found(raw_id))?;

        let deleted = self
            .store
            .delete(ctx, id)
            .await
            .map_err(|source| CatalogError::store("delete", Some(id), source))?;
        if deleted == 0 {
            return Err(CatalogError::not_found(raw_id));
        }

        info!(target: TARGET, recipe_id = %id, "Recipe deleted");
        self.invalidate_listing(ctx, "delete").await
    }

    /// Uncached; always reads the store.
    pub async fn search_by_tag(
        &self,
        ctx: &CallContext,
        tag: &str,
    ) -> Result<Vec<RecipeRecord>, CatalogError> {
        self.store
            .find(ctx, &RecipeFilter::Tag(tag.to_string()))
            .await
            .map_err(|source| CatalogError::store("search", None, source))
    }

    pub async fn health(&self, ctx: &CallContext) -> Result<(), CatalogError> {
        self.store
            .health_check(ctx)
            .await
            .map_err(|source| CatalogError::store("health_check", None, source))
    }

    async fn find_all(&self, ctx: &CallContext) -> Result<Vec<RecipeRecord>, CatalogError> {
        let started_at = Instant::now();
        let recipes = self
            .store
            .find(ctx, &RecipeFilter::All)
            .await
            .map_err(|source| CatalogError::store("find", None, source))?;
        histogram!(METRIC_STORE_FIND_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        Ok(recipes)
    }

    /// Runs only after the store confirmed the write it follows.
    async fn invalidate_listing(
        &self,
        ctx: &CallContext,
        cause: &'static str,
    ) -> Result<(), CatalogError> {
        self.write_generation.fetch_add(1, Ordering::AcqRel);
        let Some(cache) = self.cache.as_ref() else {
            return Ok(());
        };

        if let Err(source) = cache.delete(ctx, RECIPES_LISTING_KEY).await {
            error!(
                target: TARGET,
                cause,
                error = %source,
                "Recipe listing invalidation failed after a committed write"
            );
            return Err(CatalogError::cache("delete", source));
        }

        counter!(METRIC_LISTING_INVALIDATE, "cause" => cause).increment(1);
        debug!(target: TARGET, cause, "Recipe listing invalidated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Shared log recording the order of store writes and cache deletes.
    type EventLog = Arc<Mutex<Vec<&'static str>>>;

    struct LoggingStore {
        log: EventLog,
        fail_writes: bool,
        /// Rows reported as matched by `update_fields` and `delete`.
        matched: u64,
    }

    #[async_trait]
    impl RecipesRepo for LoggingStore {
        async fn find(
            &self,
            _ctx: &CallContext,
            filter: &RecipeFilter,
        ) -> Result<Vec<RecipeRecord>, RepoError> {
            let RecipeFilter::Id(id) = filter else {
                return Ok(Vec::new());
            };
            Ok(vec![RecipeRecord {
                id: *id,
                name: "Stored".into(),
                tags: Vec::new(),
                ingredients: Vec::new(),
                instructions: Vec::new(),
                published_at: OffsetDateTime::UNIX_EPOCH,
            }])
        }

        async fn insert(
            &self,
            _ctx: &CallContext,
            _params: NewRecipeParams,
        ) -> Result<RecipeId, RepoError> {
            if self.fail_writes {
                return Err(RepoError::from_persistence("disk full"));
            }
            self.log.lock().unwrap().push("store.insert");
            Ok(RecipeId::generate())
        }

        async fn update_fields(
            &self,
            _ctx: &CallContext,
            _id: RecipeId,
            _fields: &RecipeFields,
        ) -> Result<u64, RepoError> {
            if self.fail_writes {
                return Err(RepoError::from_persistence("constraint violated"));
            }
            self.log.lock().unwrap().push("store.update");
            Ok(self.matched)
        }

        async fn delete(&self, _ctx: &CallContext, _id: RecipeId) -> Result<u64, RepoError> {
            if self.fail_writes {
                return Err(RepoError::Timeout);
            }
            self.log.lock().unwrap().push("store.delete");
            Ok(self.matched)
        }
    }

    struct LoggingCache {
        log: EventLog,
    }

    #[async_trait]
    impl CacheStore for LoggingCache {
        async fn get(&self, _ctx: &CallContext, _key: &str) -> Result<Option<Bytes>, CacheError> {
            Ok(None)
        }

        async fn set(
            &self,
            _ctx: &CallContext,
            _key: &str,
            _value: Bytes,
            _ttl: Option<Duration>,
        ) -> Result<(), CacheError> {
            self.log.lock().unwrap().push("cache.set");
            Ok(())
        }

        async fn delete(&self, _ctx: &CallContext, key: &str) -> Result<(), CacheError> {
            assert_eq!(key, RECIPES_LISTING_KEY);
            self.log.lock().unwrap().push("cache.delete");
            Ok(())
        }
    }

    fn service(fail_writes: bool) -> (CatalogService, EventLog) {
        service_matching(fail_writes, 1)
    }

    fn service_matching(fail_writes: bool, matched: u64) -> (CatalogService, EventLog) {
        let log: EventLog = Arc::default();
        let store = Arc::new(LoggingStore {
            log: log.clone(),
            fail_writes,
            matched,
        });
        let cache = Arc::new(LoggingCache { log: log.clone() });
        (CatalogService::new(store).with_cache(cache), log)
    }

    fn pasta() -> RecipeInput {
        RecipeInput {
            name: "Pasta".into(),
            tags: vec!["italian".into()],
            ingredients: vec!["pasta".into(), "tomato".into()],
            instructions: vec!["boil".into(), "mix".into()],
        }
    }

    #[tokio::test]
    async fn create_invalidates_after_store_write() {
        let (service, log) = service(false);

        service
            .create(&CallContext::background(), pasta())
            .await
            .expect("create succeeds");

        assert_eq!(*log.lock().unwrap(), vec!["store.insert", "cache.delete"]);
    }

    #[tokio::test]
    async fn failed_insert_leaves_cache_untouched() {
        let (service, log) = service(true);

        let err = service
            .create(&CallContext::background(), pasta())
            .await
            .expect_err("insert fails");

        assert!(matches!(
            err,
            CatalogError::Store {
                operation: "insert",
                ..
            }
        ));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_delete_leaves_cache_untouched() {
        let (service, log) = service(true);
        let id = RecipeId::generate().to_string();

        let err = service
            .delete(&CallContext::background(), &id)
            .await
            .expect_err("delete fails");

        match err {
            CatalogError::Store {
                operation,
                id: Some(failed_id),
                source: RepoError::Timeout,
            } => {
                assert_eq!(operation, "delete");
                assert_eq!(failed_id, id);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_invalidates_after_store_write() {
        let (service, log) = service(false);
        let id = RecipeId::generate();

        let updated = service
            .update(&CallContext::background(), &id.to_string(), pasta())
            .await
            .expect("update succeeds");

        assert_eq!(updated.id, id);
        assert_eq!(updated.name, "Pasta");
        assert_eq!(updated.published_at, OffsetDateTime::UNIX_EPOCH);
        assert_eq!(*log.lock().unwrap(), vec!["store.update", "cache.delete"]);
    }

    #[tokio::test]
    async fn delete_invalidates_after_store_write() {
        let (service, log) = service(false);
        let id = RecipeId::generate().to_string();

        service
            .delete(&CallContext::background(), &id)
            .await
            .expect("delete succeeds");

        assert_eq!(*log.lock().unwrap(), vec!["store.delete", "cache.delete"]);
    }

    #[tokio::test]
    async fn failed_update_leaves_cache_untouched() {
        let (service, log) = service(true);
        let id = RecipeId::generate().to_string();

        let err = service
            .update(&CallContext::background(), &id, pasta())
            .await
            .expect_err("update fails");

        assert!(matches!(
            err,
            CatalogError::Store {
                operation: "update",
                ..
            }
        ));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unmatched_writes_leave_cache_untouched() {
        let (service, log) = service_matching(false, 0);
        let ctx = CallContext::background();
        let id = RecipeId::generate().to_string();

        let err = service
            .update(&ctx, &id, pasta())
            .await
            .expect_err("nothing updated");
        assert!(err.is_not_found());

        let err = service.delete(&ctx, &id).await.expect_err("nothing deleted");
        assert!(err.is_not_found());

        assert_eq!(*log.lock().unwrap(), vec!["store.update", "store.delete"]);
    }

    #[tokio::test]
    async fn invalid_input_fails_before_any_io() {
        let (service, log) = service(false);
        let input = RecipeInput {
            name: " ".into(),
            ..pasta()
        };

        let err = service
            .create(&CallContext::background(), input)
            .await
            .expect_err("validation fails");

        assert!(matches!(
            err,
            CatalogError::Domain(DomainError::Validation { .. })
        ));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_id_is_not_found() {
        let (service, log) = service(false);

        let err = service
            .delete(&CallContext::background(), "definitely-not-an-id")
            .await
            .expect_err("not found");

        assert!(err.is_not_found());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn store_error_names_operation_and_recipe() {
        let id = RecipeId::generate();
        let err = CatalogError::store("delete", Some(id), RepoError::Timeout);
        assert_eq!(
            err.to_string(),
            format!("store operation `delete` failed (recipe: {id})")
        );
    }
}
