//! Postgres store adapter against a live database.
//!
//! - Requires `DATABASE_URL`; `sqlx::test` creates a scratch database per test.
//! - Marked `#[ignore]`; run with `cargo test -- --ignored`.

use std::sync::Arc;

use sqlx::PgPool;
use time::OffsetDateTime;

use recipebox::application::catalog::CatalogService;
use recipebox::application::context::CallContext;
use recipebox::application::repos::{NewRecipeParams, RecipeFields, RecipeFilter, RecipesRepo};
use recipebox::domain::entities::RecipeId;
use recipebox::domain::recipes::{RecipeInput, publication_time};
use recipebox::infra::db::PostgresRepositories;

fn params(name: &str, tags: &[&str]) -> NewRecipeParams {
    NewRecipeParams {
        name: name.to_string(),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        ingredients: vec!["water".to_string()],
        instructions: vec!["boil".to_string()],
        published_at: publication_time(OffsetDateTime::now_utc()).expect("timestamp"),
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn insert_find_update_delete(pool: PgPool) {
    let repo = PostgresRepositories::new(pool);
    let ctx = CallContext::background();

    let inserted = params("Broth", &["Soup", "warm"]);
    let id = repo.insert(&ctx, inserted.clone()).await.expect("insert");

    let found = repo
        .find(&ctx, &RecipeFilter::Id(id))
        .await
        .expect("find by id");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Broth");
    assert_eq!(found[0].published_at, inserted.published_at);

    let by_tag = repo
        .find(&ctx, &RecipeFilter::Tag("soup".to_string()))
        .await
        .expect("find by tag");
    assert_eq!(by_tag.len(), 1);

    let fields = RecipeFields {
        name: "Bone broth".to_string(),
        tags: vec!["warm".to_string()],
        ingredients: Vec::new(),
        instructions: Vec::new(),
    };
    assert_eq!(repo.update_fields(&ctx, id, &fields).await.expect("update"), 1);
    assert_eq!(
        repo.update_fields(&ctx, RecipeId::generate(), &fields)
            .await
            .expect("update missing"),
        0
    );

    assert_eq!(repo.delete(&ctx, id).await.expect("delete"), 1);
    assert_eq!(repo.delete(&ctx, id).await.expect("delete again"), 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn tag_search_matches_in_process_fold(pool: PgPool) {
    let repo = PostgresRepositories::new(pool);
    let ctx = CallContext::background();
    let id = repo
        .insert(&ctx, params("Avgolemono", &["ΣΟΥΠΑ", "Crème"]))
        .await
        .expect("insert");

    for tag in ["σουπα", "Σουπα", "CRÈME"] {
        let found = repo
            .find(&ctx, &RecipeFilter::Tag(tag.to_string()))
            .await
            .expect("find by tag");
        assert_eq!(found.len(), 1, "tag {tag}");
        assert!(RecipeFilter::Tag(tag.to_string()).matches(&found[0]));
    }

    let fields = RecipeFields {
        name: "Avgolemono".to_string(),
        tags: vec!["Ζεστό".to_string()],
        ingredients: Vec::new(),
        instructions: Vec::new(),
    };
    repo.update_fields(&ctx, id, &fields).await.expect("update");

    let stale = repo
        .find(&ctx, &RecipeFilter::Tag("σουπα".to_string()))
        .await
        .expect("find old tag");
    assert!(stale.is_empty());
    let fresh = repo
        .find(&ctx, &RecipeFilter::Tag("ζεστό".to_string()))
        .await
        .expect("find new tag");
    assert_eq!(fresh.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn listing_follows_publication_order(pool: PgPool) {
    let repo = Arc::new(PostgresRepositories::new(pool));
    let catalog = CatalogService::new(repo.clone());
    let ctx = CallContext::background();

    for name in ["First", "Second", "Third"] {
        catalog
            .create(
                &ctx,
                RecipeInput {
                    name: name.to_string(),
                    ..Default::default()
                },
            )
            .await
            .expect("create");
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let names: Vec<String> = catalog
        .list(&ctx)
        .await
        .expect("list")
        .into_iter()
        .map(|recipe| recipe.name)
        .collect();
    assert_eq!(names, ["First", "Second", "Third"]);

    catalog.health(&ctx).await.expect("store reachable");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn listing_index_exists(pool: PgPool) {
    let indexes: Vec<String> = sqlx::query_scalar(
        "SELECT indexname FROM pg_indexes WHERE schemaname = 'public' AND tablename = 'recipes'",
    )
    .fetch_all(&pool)
    .await
    .expect("fetch recipe indexes");

    assert!(
        indexes.iter().any(|name| name == "recipes_published_at_id_idx"),
        "missing recipes_published_at_id_idx"
    );
    assert!(
        indexes.iter().any(|name| name == "recipes_tag_keys_idx"),
        "missing recipes_tag_keys_idx"
    );
}
