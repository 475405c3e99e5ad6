//! Seeding the catalog from a JSON file of recipes.

use std::path::Path;

use tracing::{error, info};

use crate::{
    application::{catalog::CatalogService, context::CallContext, error::AppError},
    domain::recipes::RecipeInput,
    infra::error::InfraError,
};

/// Creates every recipe in the JSON array at `path` through the catalog.
/// Identifiers and timestamps present in the file are ignored; each entry is
/// assigned fresh ones. Stops at the first entry that fails. Returns the number
/// of recipes created.
pub async fn import_recipes(
    catalog: &CatalogService,
    ctx: &CallContext,
    path: &Path,
) -> Result<usize, AppError> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|err| AppError::from(InfraError::Io(err)))?;
    let inputs: Vec<RecipeInput> = serde_json::from_slice(&data)
        .map_err(|err| AppError::validation(format!("invalid recipe file: {err}")))?;

    let total = inputs.len();
    for (position, input) in inputs.into_iter().enumerate() {
        let recipe = match catalog.create(ctx, input).await {
            Ok(recipe) => recipe,
            Err(err) => {
                error!(
                    target: "recipebox::import",
                    position,
                    error = %err,
                    "Recipe could not be imported"
                );
                return Err(AppError::from(err));
            }
        };
        info!(
            target: "recipebox::import",
            recipe_id = %recipe.id,
            name = %recipe.name,
            "Imported recipe"
        );
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use super::*;
    use crate::application::repos::RecipeFilter;
    use crate::infra::memory::MemoryRecipesRepo;

    #[tokio::test]
    async fn imports_each_entry_with_fresh_identity() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"[
                {{"id":"c0fd8m0ti5u3g5jkvmrg","name":"Oregano Pizza","tags":["italian","pizza"],"ingredients":["dough"],"instructions":["bake"],"publishedAt":"2021-01-17T19:28:52.803062+01:00"}},
                {{"name":"Gazpacho","tags":["spanish","soup"]}}
            ]"#
        )
        .expect("write recipes");

        let store = Arc::new(MemoryRecipesRepo::new());
        let catalog = CatalogService::new(store.clone());
        let ctx = CallContext::background();

        let imported = import_recipes(&catalog, &ctx, file.path())
            .await
            .expect("import succeeds");
        assert_eq!(imported, 2);

        let stored = store.snapshot().await;
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].name, "Oregano Pizza");
        assert_ne!(stored[0].published_at.year(), 2021);
        assert!(RecipeFilter::Tag("SOUP".into()).matches(&stored[1]));
    }

    #[tokio::test]
    async fn malformed_file_is_a_validation_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"name":"not an array"}}"#).expect("write");

        let catalog = CatalogService::new(Arc::new(MemoryRecipesRepo::new()));
        let err = import_recipes(&catalog, &CallContext::background(), file.path())
            .await
            .expect_err("import fails");

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn stops_at_first_invalid_entry() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"[{{"name":"Toast"}},{{"name":"  "}},{{"name":"Jam"}}]"#).expect("write");

        let store = Arc::new(MemoryRecipesRepo::new());
        let catalog = CatalogService::new(store.clone());
        let err = import_recipes(&catalog, &CallContext::background(), file.path())
            .await
            .expect_err("blank name rejected");

        assert!(matches!(err, AppError::Catalog(_)));
        assert_eq!(store.snapshot().await.len(), 1);
    }
}
