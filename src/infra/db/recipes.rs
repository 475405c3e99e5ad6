use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::{
        context::CallContext,
        repos::{NewRecipeParams, RecipeFields, RecipeFilter, RecipesRepo, RepoError},
    },
    domain::entities::{RecipeId, RecipeRecord, fold_tag},
};

use super::{PostgresRepositories, map_sqlx_error};

const RECIPE_COLUMNS: &str = "id, name, tags, ingredients, instructions, published_at";

#[derive(sqlx::FromRow)]
struct RecipeRow {
    id: Uuid,
    name: String,
    tags: Vec<String>,
    ingredients: Vec<String>,
    instructions: Vec<String>,
    published_at: OffsetDateTime,
}

impl From<RecipeRow> for RecipeRecord {
    fn from(row: RecipeRow) -> Self {
        Self {
            id: RecipeId::from(row.id),
            name: row.name,
            tags: row.tags,
            ingredients: row.ingredients,
            instructions: row.instructions,
            published_at: row.published_at,
        }
    }
}

impl PostgresRepositories {
    fn push_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &RecipeFilter) {
        match filter {
            RecipeFilter::All => {}
            RecipeFilter::Id(id) => {
                qb.push(" WHERE id = ");
                qb.push_bind(id.as_uuid());
            }
            RecipeFilter::Tag(tag) => {
                qb.push(" WHERE ");
                qb.push_bind(fold_tag(tag));
                qb.push(" = ANY(tag_keys)");
            }
        }
    }
}

/// Folded `tags`, kept in `tag_keys` so tag search never relies on `lower()`.
fn tag_keys(tags: &[String]) -> Vec<String> {
    tags.iter().map(|tag| fold_tag(tag)).collect()
}

#[async_trait]
impl RecipesRepo for PostgresRepositories {
    async fn find(
        &self,
        ctx: &CallContext,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!("SELECT {RECIPE_COLUMNS} FROM recipes"));
        Self::push_filter(&mut qb, filter);
        qb.push(" ORDER BY published_at, id");

        let rows = ctx
            .run(qb.build_query_as::<RecipeRow>().fetch_all(self.pool()))
            .await?
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(RecipeRecord::from).collect())
    }

    async fn insert(
        &self,
        ctx: &CallContext,
        params: NewRecipeParams,
    ) -> Result<RecipeId, RepoError> {
        let id = RecipeId::generate();
        ctx.run(
            sqlx::query(
                r#"
                INSERT INTO recipes (id, name, tags, tag_keys, ingredients, instructions, published_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(id.as_uuid())
            .bind(&params.name)
            .bind(&params.tags)
            .bind(tag_keys(&params.tags))
            .bind(&params.ingredients)
            .bind(&params.instructions)
            .bind(params.published_at)
            .execute(self.pool()),
        )
        .await?
        .map_err(map_sqlx_error)?;

        Ok(id)
    }

    async fn update_fields(
        &self,
        ctx: &CallContext,
        id: RecipeId,
        fields: &RecipeFields,
    ) -> Result<u64, RepoError> {
        let result = ctx
            .run(
                sqlx::query(
                    r#"
                    UPDATE recipes
                    SET name = $2, tags = $3, tag_keys = $4, ingredients = $5, instructions = $6
                    WHERE id = $1
                    "#,
                )
                .bind(id.as_uuid())
                .bind(&fields.name)
                .bind(&fields.tags)
                .bind(tag_keys(&fields.tags))
                .bind(&fields.ingredients)
                .bind(&fields.instructions)
                .execute(self.pool()),
            )
            .await?
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, ctx: &CallContext, id: RecipeId) -> Result<u64, RepoError> {
        let result = ctx
            .run(
                sqlx::query("DELETE FROM recipes WHERE id = $1")
                    .bind(id.as_uuid())
                    .execute(self.pool()),
            )
            .await?
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn health_check(&self, ctx: &CallContext) -> Result<(), RepoError> {
        ctx.run(self.ping()).await?.map_err(map_sqlx_error)
    }
}
