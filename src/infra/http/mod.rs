//! HTTP surface over the recipe catalog.

pub mod api;
mod middleware;

pub use api::{ApiState, build_router};
pub use middleware::RequestContext;
