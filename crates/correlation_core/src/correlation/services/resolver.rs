//! Correlation resolver.
//!
//! Picks the effective path of a request, first match wins:
//! 1. the `x-envoy-original-path` header when present, even if empty,
//! 2. the original path when non-empty,
//! 3. the request path.
//!
//! The effective path is then looked up in the store. A proxy-rewritten path
//! therefore takes priority over the caller's own path.
use crate::correlation::{
    api::types::{RequestInfo, ResourceContext, TransactionContext},
    services::store::ResourceMappingStore,
};

/// Header set by the reverse proxy when it rewrote the request path.
pub const ORIGINAL_PATH_HEADER: &str = "x-envoy-original-path";

/// Path driving the lookup. A missing request selects the empty path.
pub fn effective_path(request: Option<&RequestInfo>) -> &str {
    let Some(request) = request else {
        return "";
    };
    if let Some(path) = request.headers.get(ORIGINAL_PATH_HEADER) {
        path.as_str()
    } else if !request.original_path.is_empty() {
        request.original_path.as_str()
    } else {
        request.path.as_str()
    }
}

/// Resolves the resource context of `ctx`. Never fails and never mutates `store`.
pub fn resolve(ctx: &TransactionContext, store: &ResourceMappingStore) -> ResourceContext {
    store.get(effective_path(ctx.request.as_ref())).map(ResourceContext::from).unwrap_or_default()
}
