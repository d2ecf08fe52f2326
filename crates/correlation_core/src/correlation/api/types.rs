//! Correlation API type definitions.
//!
//! A caller describes an observed request with a [`TransactionContext`]; the
//! service answers with the [`ResourceContext`] of the resource the request was
//! correlated to. A request that matches nothing yields an empty context, which
//! is a regular answer and not an error.
//!
//! [`CorrelationRequest`] and [`CorrelationResponse`] are the request/response
//! pair of the correlation tower service, covering both the lookup and the
//! administrative mapping insertion.

use std::collections::HashMap;

use crate::correlation::infrastructure::{mapping::Resource, value::DynamicValue};

/// Attributes of the observed request used to pick the lookup path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestInfo {
    /// Path as seen by the caller
    pub path: String,
    /// Path before any rewrite, empty when unknown
    pub original_path: String,
    /// Request headers, keys compared verbatim
    pub headers: HashMap<String, String>,
}

impl RequestInfo {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), ..Default::default() }
    }

    pub fn with_original_path(mut self, original_path: impl Into<String>) -> Self {
        self.original_path = original_path.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Request envelope sent by correlation clients.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionContext {
    /// Unique per call, generated by the caller
    pub transaction_id: String,
    /// Observed request, may be absent
    pub request: Option<RequestInfo>,
    /// Free-form caller metadata, logged by the service and never interpreted
    pub metadata: HashMap<String, DynamicValue>,
}

impl TransactionContext {
    pub fn new(transaction_id: impl Into<String>, request: RequestInfo) -> Self {
        Self { transaction_id: transaction_id.into(), request: Some(request), ..Default::default() }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: DynamicValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Business identity of the resource a request was correlated to.
///
/// Every field is empty when no mapping matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceContext {
    pub api_id: String,
    pub version: String,
    pub stage: String,
    pub consumer_id: String,
}

impl ResourceContext {
    /// Whether this is the "no match" context.
    pub fn is_empty(&self) -> bool {
        self.api_id.is_empty()
            && self.version.is_empty()
            && self.stage.is_empty()
            && self.consumer_id.is_empty()
    }

    /// Maps the context back into a resource record for `path`.
    pub fn into_resource(self, path: impl Into<String>) -> Resource {
        Resource {
            path: path.into(),
            api_id: self.api_id,
            version: self.version,
            stage: self.stage,
            client_id: self.consumer_id,
        }
    }
}

impl From<Resource> for ResourceContext {
    fn from(resource: Resource) -> Self {
        ResourceContext {
            api_id: resource.api_id,
            version: resource.version,
            stage: resource.stage,
            consumer_id: resource.client_id,
        }
    }
}

/// Requests handled by the correlation API service.
#[derive(Debug, Clone)]
pub enum CorrelationRequest {
    /// Correlate an observed request with a mapped resource.
    GetResourceContext(TransactionContext),

    /// Upsert the mapping for `path`, replacing any previous resource.
    AddResourceMapping {
        path: String,
        resource: Resource,
    },
}

/// Responses of the correlation API service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrelationResponse {
    /// Resource identity, empty when nothing matched.
    ResourceContext(ResourceContext),

    /// Acknowledgment of an administrative request.
    Ack,
}
