//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::context::{CallContext, Interrupted};
use crate::domain::entities::{RecipeId, RecipeRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
    #[error("operation cancelled")]
    Cancelled,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<Interrupted> for RepoError {
    fn from(value: Interrupted) -> Self {
        match value {
            Interrupted::Cancelled => Self::Cancelled,
            Interrupted::DeadlineExceeded => Self::Timeout,
        }
    }
}

/// Equality predicates understood by every store adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeFilter {
    All,
    Id(RecipeId),
    /// Tag membership under case-insensitive comparison.
    Tag(String),
}

impl RecipeFilter {
    pub fn matches(&self, record: &RecipeRecord) -> bool {
        match self {
            RecipeFilter::All => true,
            RecipeFilter::Id(id) => record.id == *id,
            RecipeFilter::Tag(tag) => record.has_tag(tag),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewRecipeParams {
    pub name: String,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub published_at: OffsetDateTime,
}

/// The replaceable part of a recipe. Identity and publication time are not here.
#[derive(Debug, Clone)]
pub struct RecipeFields {
    pub name: String,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
}

#[async_trait]
pub trait RecipesRepo: Send + Sync {
    /// Records matching `filter`, in store iteration order.
    async fn find(
        &self,
        ctx: &CallContext,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeRecord>, RepoError>;

    /// Persists a new record and returns the identifier the store assigned.
    async fn insert(
        &self,
        ctx: &CallContext,
        params: NewRecipeParams,
    ) -> Result<RecipeId, RepoError>;

    /// Returns the number of records matched (0 or 1).
    async fn update_fields(
        &self,
        ctx: &CallContext,
        id: RecipeId,
        fields: &RecipeFields,
    ) -> Result<u64, RepoError>;

    /// Returns the number of records removed (0 or 1).
    async fn delete(&self, ctx: &CallContext, id: RecipeId) -> Result<u64, RepoError>;

    async fn health_check(&self, ctx: &CallContext) -> Result<(), RepoError> {
        ctx.check().map_err(RepoError::from)
    }
}
