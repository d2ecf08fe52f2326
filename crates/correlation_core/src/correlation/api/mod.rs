//! Correlation API service.
//!
//! [`CorrelationApiService`] is the server-side handler behind the gRPC
//! endpoint. For a lookup it first logs every metadata entry of the incoming
//! context, decoded through the metadata codec, then delegates to the
//! resolver. Logging is observability only and cannot fail the call; a lookup
//! miss is answered with an empty resource context.

pub mod types;

use std::{collections::HashMap, future::Future, pin::Pin, task::Poll};

use tower::Service;
use tracing::{debug, info};

pub use types::*;

use crate::correlation::{
    error::CorrelationError,
    infrastructure::value::DynamicValue,
    services::{codec::MetadataCodec, resolver, store::ResourceMappingStore},
};

#[derive(Debug, Default, Clone)]
pub struct CorrelationApiService {
    store: ResourceMappingStore,
}

impl CorrelationApiService {
    pub fn new(store: ResourceMappingStore) -> Self {
        Self { store }
    }

    /// Store consulted by this service, shared with all its clones.
    pub fn store(&self) -> &ResourceMappingStore {
        &self.store
    }
}

fn log_metadata(transaction_id: &str, metadata: &HashMap<String, DynamicValue>) {
    for (name, value) in metadata {
        let view = MetadataCodec::decode(value);
        info!(
            transaction_id = %transaction_id,
            key = %name,
            kind = view.kind(),
            value = %view,
            "request context metadata"
        );
    }
}

impl Service<CorrelationRequest> for CorrelationApiService {
    type Response = CorrelationResponse;
    type Error = CorrelationError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: CorrelationRequest) -> Self::Future {
        let store = self.store.clone();
        Box::pin(async move {
            match request {
                CorrelationRequest::GetResourceContext(ctx) => {
                    info!(transaction_id = %ctx.transaction_id, "received request");
                    debug!(?ctx.request, "request context");
                    log_metadata(&ctx.transaction_id, &ctx.metadata);
                    let resource_ctx = resolver::resolve(&ctx, &store);
                    debug!(
                        transaction_id = %ctx.transaction_id,
                        matched = !resource_ctx.is_empty(),
                        api_id = %resource_ctx.api_id,
                        "resolved resource context"
                    );
                    Ok(CorrelationResponse::ResourceContext(resource_ctx))
                }
                CorrelationRequest::AddResourceMapping { path, resource } => {
                    store.insert(path, resource);
                    Ok(CorrelationResponse::Ack)
                }
            }
        })
    }
}
