use std::sync::Arc;
use std::time::Duration;

use crate::application::catalog::CatalogService;
use crate::application::context::CallContext;

#[derive(Clone)]
pub struct ApiState {
    pub catalog: Arc<CatalogService>,
    /// When set, mutating routes require a matching `X-API-KEY` header.
    pub api_key: Option<Arc<str>>,
    pub request_timeout: Duration,
}

impl ApiState {
    pub fn new(catalog: Arc<CatalogService>, request_timeout: Duration) -> Self {
        Self {
            catalog,
            api_key: None,
            request_timeout,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.map(Arc::from);
        self
    }

    /// Fresh per-request context; dropping the handler future abandons the call.
    pub fn call_context(&self) -> CallContext {
        CallContext::with_timeout(self.request_timeout)
    }
}
