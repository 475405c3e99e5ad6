use serde::{Deserialize, Serialize};

use crate::domain::recipes::RecipeInput;

/// Body of create and update requests. `id` and `publishedAt` are ignored when sent.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RecipeRequest {
    pub name: String,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
}

impl From<RecipeRequest> for RecipeInput {
    fn from(request: RecipeRequest) -> Self {
        Self {
            name: request.name,
            tags: request.tags,
            ingredients: request.ingredients,
            instructions: request.instructions,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub tag: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
