use std::collections::HashSet;
use std::sync::Arc;

use metrics_util::debugging::DebuggingRecorder;
use recipebox::application::catalog::CatalogService;
use recipebox::application::context::CallContext;
use recipebox::cache::{CacheConfig, MemoryCache};
use recipebox::domain::recipes::RecipeInput;
use recipebox::infra::memory::MemoryRecipesRepo;

#[tokio::test]
async fn listing_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let catalog = CatalogService::new(Arc::new(MemoryRecipesRepo::new()))
        .with_cache(Arc::new(MemoryCache::new(&CacheConfig::default())));
    let ctx = CallContext::background();

    // miss, then hit, then invalidation
    catalog.list(&ctx).await.expect("first listing");
    catalog.list(&ctx).await.expect("cached listing");
    catalog
        .create(
            &ctx,
            RecipeInput {
                name: "Risotto".to_string(),
                ..Default::default()
            },
        )
        .await
        .expect("create");

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "recipebox_listing_cache_hit_total",
        "recipebox_listing_cache_miss_total",
        "recipebox_listing_invalidate_total",
        "recipebox_store_find_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
