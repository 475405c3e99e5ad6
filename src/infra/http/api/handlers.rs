use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::error::{ApiError, catalog_to_api};
use super::models::{MessageResponse, RecipeRequest, SearchQuery};
use super::state::ApiState;

pub async fn list_recipes(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let ctx = state.call_context();
    let recipes = state.catalog.list(&ctx).await.map_err(catalog_to_api)?;
    Ok(Json(recipes))
}

pub async fn create_recipe(
    State(state): State<ApiState>,
    payload: Result<Json<RecipeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload.map_err(invalid_body)?;
    let ctx = state.call_context();
    let recipe = state
        .catalog
        .create(&ctx, request.into())
        .await
        .map_err(catalog_to_api)?;
    Ok(Json(recipe))
}

pub async fn update_recipe(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    payload: Result<Json<RecipeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload.map_err(invalid_body)?;
    let ctx = state.call_context();
    let recipe = state
        .catalog
        .update(&ctx, &id, request.into())
        .await
        .map_err(catalog_to_api)?;
    Ok(Json(recipe))
}

pub async fn delete_recipe(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let ctx = state.call_context();
    state
        .catalog
        .delete(&ctx, &id)
        .await
        .map_err(catalog_to_api)?;
    Ok(Json(MessageResponse {
        message: "Recipe has been deleted",
    }))
}

pub async fn search_recipes(
    State(state): State<ApiState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(|rejection| {
        ApiError::bad_request("Invalid query string", Some(rejection.body_text()))
    })?;
    let tag = query.tag.unwrap_or_default();
    let ctx = state.call_context();
    let recipes = state
        .catalog
        .search_by_tag(&ctx, &tag)
        .await
        .map_err(catalog_to_api)?;
    Ok(Json(recipes))
}

pub async fn health(State(state): State<ApiState>) -> Result<StatusCode, ApiError> {
    let ctx = state.call_context();
    state.catalog.health(&ctx).await.map_err(catalog_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request("Invalid request body", Some(rejection.body_text()))
}
