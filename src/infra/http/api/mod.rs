pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, put},
};

use crate::infra::http::middleware::{log_responses, set_request_context};

pub fn build_router(state: ApiState) -> Router {
    let auth_state = state.clone();

    Router::new()
        .route(
            "/recipes",
            get(handlers::list_recipes).post(handlers::create_recipe),
        )
        .route("/recipes/search", get(handlers::search_recipes))
        .route(
            "/recipes/{id}",
            put(handlers::update_recipe)
                .patch(handlers::update_recipe)
                .delete(handlers::delete_recipe),
        )
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(
            auth_state,
            middleware::require_api_key,
        ))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
