use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;
use crate::domain::entities::RecipeId;

const TARGET: &str = "recipebox::http::response";

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
    /// Recipe addressed by `/recipes/{id}`. `None` for other routes and for
    /// segments that cannot name a recipe.
    pub recipe_id: Option<RecipeId>,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext {
        request_id: Uuid::new_v4().to_string(),
        recipe_id: addressed_recipe(request.uri().path()),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

fn addressed_recipe(path: &str) -> Option<RecipeId> {
    let segment = path.strip_prefix("/recipes/")?;
    if segment.contains('/') {
        return None;
    }
    RecipeId::parse(segment)
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let (request_id, recipe_id) = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| (ctx.request_id.clone(), ctx.recipe_id.map(|id| id.to_string())))
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();

    if !(status.is_client_error() || status.is_server_error()) {
        debug!(
            target: TARGET,
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            recipe_id = recipe_id.as_deref(),
            elapsed_ms = elapsed_ms,
            request_id = request_id,
            "request completed",
        );
        return response;
    }

    let report = response.extensions_mut().remove::<ErrorReport>();
    let (source, messages) = match report {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };
    let detail = messages
        .first()
        .cloned()
        .unwrap_or_else(|| "no diagnostic available".to_string());

    if status.is_server_error() {
        error!(
            target: TARGET,
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            query = uri.query().unwrap_or(""),
            recipe_id = recipe_id.as_deref(),
            elapsed_ms = elapsed_ms,
            source = source,
            detail = %detail,
            chain = ?messages,
            request_id = request_id,
            "recipe request failed",
        );
    } else {
        warn!(
            target: TARGET,
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            query = uri.query().unwrap_or(""),
            recipe_id = recipe_id.as_deref(),
            elapsed_ms = elapsed_ms,
            source = source,
            detail = %detail,
            chain = ?messages,
            request_id = request_id,
            "recipe request rejected",
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addressed_recipe_reads_only_item_routes() {
        let id = RecipeId::generate();

        assert_eq!(addressed_recipe(&format!("/recipes/{id}")), Some(id));
        assert_eq!(addressed_recipe("/recipes/search"), None);
        assert_eq!(addressed_recipe("/recipes/not-an-id"), None);
        assert_eq!(addressed_recipe(&format!("/recipes/{id}/extra")), None);
        assert_eq!(addressed_recipe("/recipes"), None);
        assert_eq!(addressed_recipe("/health"), None);
    }
}
