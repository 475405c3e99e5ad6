use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::catalog::CatalogError;
use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;
use crate::cache::CacheError;
use crate::domain::error::DomainError;

const SOURCE: &str = "infra::http::api";

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const NOT_FOUND: &str = "not_found";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const CANCELLED: &str = "cancelled";
    pub const REPO: &str = "repo_error";
    pub const CACHE: &str = "cache_unavailable";
    pub const INTERNAL: &str = "internal_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
    report: Option<ErrorReport>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
            report: None,
        }
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            "API key required",
            None,
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    fn with_report(mut self, error: &(dyn std::error::Error + 'static)) -> Self {
        self.report = Some(ErrorReport::from_error(SOURCE, self.status, error));
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = self.report.unwrap_or_else(|| {
            ErrorReport::from_message(
                SOURCE,
                self.status,
                format!(
                    "{}: {}",
                    self.code,
                    self.hint.as_deref().unwrap_or(self.message)
                ),
            )
        });
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}

pub fn catalog_to_api(err: CatalogError) -> ApiError {
    let api = match &err {
        CatalogError::NotFound { id } => ApiError::new(
            StatusCode::NOT_FOUND,
            codes::NOT_FOUND,
            "Recipe not found",
            Some(format!("no recipe with id `{id}`")),
        ),
        CatalogError::Domain(DomainError::Validation { message }) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid recipe",
            Some(message.clone()),
        ),
        CatalogError::Domain(DomainError::Invariant { .. }) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::INTERNAL,
            "Internal error",
            None,
        ),
        CatalogError::Store { source, .. } => repo_to_api(source),
        CatalogError::Cache { source, .. } => cache_to_api(source),
        CatalogError::Codec { .. } => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::INTERNAL,
            "Cached listing is unreadable",
            None,
        ),
    };
    api.with_report(&err)
}

fn repo_to_api(err: &RepoError) -> ApiError {
    match err {
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message.clone()),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        ),
        RepoError::Cancelled => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::CANCELLED,
            "Request cancelled",
            None,
        ),
        RepoError::Persistence(_) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Persistence error",
            None,
        ),
    }
}

fn cache_to_api(err: &CacheError) -> ApiError {
    match err {
        CacheError::Cancelled => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::CANCELLED,
            "Request cancelled",
            None,
        ),
        CacheError::Backend(_) | CacheError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::CACHE,
            "Cache unavailable",
            None,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let api = catalog_to_api(CatalogError::NotFound {
            id: "abc".to_string(),
        });
        assert_eq!(api.status(), StatusCode::NOT_FOUND);
        assert_eq!(api.code(), codes::NOT_FOUND);
    }

    #[test]
    fn store_timeout_maps_to_503() {
        let api = catalog_to_api(CatalogError::Store {
            operation: "find",
            id: None,
            source: RepoError::Timeout,
        });
        assert_eq!(api.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(api.code(), codes::DB_TIMEOUT);
    }

    #[test]
    fn persistence_failure_maps_to_500_with_report_chain() {
        let api = catalog_to_api(CatalogError::Store {
            operation: "insert",
            id: None,
            source: RepoError::Persistence("connection reset".into()),
        });
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = api.into_response();
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(
            report.messages.last().map(String::as_str),
            Some("persistence error: connection reset")
        );
    }

    #[test]
    fn cache_failure_maps_to_503() {
        let api = catalog_to_api(CatalogError::Cache {
            operation: "delete",
            source: CacheError::backend("connection refused"),
        });
        assert_eq!(api.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(api.code(), codes::CACHE);
    }

    #[test]
    fn validation_maps_to_400() {
        let api = catalog_to_api(CatalogError::Domain(DomainError::validation(
            "recipe name must not be blank",
        )));
        assert_eq!(api.status(), StatusCode::BAD_REQUEST);
    }
}
