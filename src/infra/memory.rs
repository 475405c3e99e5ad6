//! In-process recipe store for single-node runs and tests.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::application::context::CallContext;
use crate::application::repos::{
    NewRecipeParams, RecipeFields, RecipeFilter, RecipesRepo, RepoError,
};
use crate::domain::entities::{RecipeId, RecipeRecord};

/// Insertion-ordered; iteration order is creation order.
#[derive(Default)]
pub struct MemoryRecipesRepo {
    records: RwLock<Vec<RecipeRecord>>,
}

impl MemoryRecipesRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Vec<RecipeRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl RecipesRepo for MemoryRecipesRepo {
    async fn find(
        &self,
        ctx: &CallContext,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeRecord>, RepoError> {
        let records = ctx.run(self.records.read()).await?;
        Ok(records
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    async fn insert(
        &self,
        ctx: &CallContext,
        params: NewRecipeParams,
    ) -> Result<RecipeId, RepoError> {
        let mut records = ctx.run(self.records.write()).await?;
        let id = RecipeId::generate();
        records.push(RecipeRecord {
            id,
            name: params.name,
            tags: params.tags,
            ingredients: params.ingredients,
            instructions: params.instructions,
            published_at: params.published_at,
        });
        Ok(id)
    }

    async fn update_fields(
        &self,
        ctx: &CallContext,
        id: RecipeId,
        fields: &RecipeFields,
    ) -> Result<u64, RepoError> {
        let mut records = ctx.run(self.records.write()).await?;
        let Some(record) = records.iter_mut().find(|record| record.id == id) else {
            return Ok(0);
        };
        record.name = fields.name.clone();
        record.tags = fields.tags.clone();
        record.ingredients = fields.ingredients.clone();
        record.instructions = fields.instructions.clone();
        Ok(1)
    }

    async fn delete(&self, ctx: &CallContext, id: RecipeId) -> Result<u64, RepoError> {
        let mut records = ctx.run(self.records.write()).await?;
        let before = records.len();
        records.retain(|record| record.id != id);
        Ok((before - records.len()) as u64)
    }
}
