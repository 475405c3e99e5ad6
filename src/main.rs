use std::{process, sync::Arc};

use recipebox::{
    application::{
        catalog::CatalogService, context::CallContext, error::AppError, repos::RecipesRepo, seed,
    },
    cache::{CacheBackend, CacheConfig, CacheStore, MemoryCache},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState},
        memory::MemoryRecipesRepo,
        redis::RedisCache,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const BOOTSTRAP_TARGET: &str = "recipebox::bootstrap";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Import(args) => run_import(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let catalog = Arc::new(build_catalog(&settings).await?);
    let state = ApiState::new(catalog, settings.server.request_timeout)
        .with_api_key(settings.auth.api_key.clone());

    serve_http(&settings, state).await
}

async fn run_import(settings: config::Settings, args: config::ImportArgs) -> Result<(), AppError> {
    settings
        .check_import_target(args.allow_stale_listings)
        .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?;
    if settings.cache.backend != CacheBackend::Redis {
        warn!(
            target: "recipebox::import",
            cache_backend = settings.cache.backend.as_str(),
            "Running servers keep their cached recipe listing until their next write"
        );
    }

    let catalog = build_catalog(&settings).await?;
    let path = args.file;

    info!(
        target: "recipebox::import",
        path = %path.display(),
        "Starting import"
    );

    let imported = seed::import_recipes(&catalog, &CallContext::background(), &path).await?;
    info!(target: "recipebox::import", imported, "Import completed");
    Ok(())
}

async fn build_catalog(settings: &config::Settings) -> Result<CatalogService, AppError> {
    let store = init_store(settings).await?;
    let cache_config = CacheConfig::from(&settings.cache);
    let cache = init_cache(&cache_config).await?;

    info!(
        target: BOOTSTRAP_TARGET,
        cache_backend = cache_config.backend.as_str(),
        listing_ttl_secs = cache_config.listing_ttl.map(|ttl| ttl.as_secs()),
        "Catalog ready"
    );

    Ok(CatalogService::new(store)
        .with_cache_opt(cache)
        .with_listing_ttl(cache_config.listing_ttl))
}

async fn init_store(settings: &config::Settings) -> Result<Arc<dyn RecipesRepo>, AppError> {
    let Some(database_url) = settings.database.url.as_ref() else {
        warn!(
            target: BOOTSTRAP_TARGET,
            "database.url is not configured; recipes are kept in memory and lost on exit"
        );
        return Ok(Arc::new(MemoryRecipesRepo::new()));
    };

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn init_cache(config: &CacheConfig) -> Result<Option<Arc<dyn CacheStore>>, AppError> {
    match config.backend {
        CacheBackend::Disabled => Ok(None),
        CacheBackend::Memory => Ok(Some(Arc::new(MemoryCache::new(config)))),
        CacheBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| InfraError::configuration("cache.redis_url is not configured"))?;
            let cache = RedisCache::connect(url)
                .await
                .map_err(|err| InfraError::cache(format!("failed to connect to redis: {err}")))?;
            Ok(Some(Arc::new(cache)))
        }
    }
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(target: BOOTSTRAP_TARGET, addr = %settings.server.addr, "Listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target: BOOTSTRAP_TARGET, error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(target: BOOTSTRAP_TARGET, "Shutdown signal received, draining connections");
}
