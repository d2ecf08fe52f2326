//! Caller-side helper of the correlation service.
//!
//! [`CorrelationClient`] turns an observed request path into a
//! [`TransactionContext`], sends it through any transport implementing
//! `tower::Service<TransactionContext>` and maps the answer back into a
//! [`Resource`]. The gRPC transport is used in production, the loopback
//! transport in tests.
//!
//! Each call is bounded by a deadline, independent of the connect timeout
//! applied when the gRPC channel is established. Failures are reported to the
//! caller and never retried.
use std::{collections::HashMap, time::Duration};

use correlation_core::{
    config::{Config, DEFAULT_REQUEST_TIMEOUT_MS},
    correlation::{
        api::{RequestInfo, ResourceContext, TransactionContext},
        error::CorrelationError,
        infrastructure::{mapping::Resource, value::DynamicValue},
        services::codec::{MetadataCodec, Serialized, ToDynamicValue},
    },
    transport::grpc::CorrelationGrpc,
};
use serde::Serialize;
use tower::{Service, ServiceExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Record attached under the `filter_metadata` key, encoded through the
/// serialization fallback.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct FilterMetadata {
    filter_metadata: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct CorrelationClient<T> {
    transport: T,
    request_timeout: Duration,
}

impl CorrelationClient<CorrelationGrpc> {
    /// Connects to the correlation server described by `config`.
    ///
    /// # Errors
    ///
    /// Fails with the transport error if the channel cannot be established
    /// within the connect timeout.
    pub async fn connect(config: &Config) -> Result<Self, CorrelationError> {
        let transport = CorrelationGrpc::connect(config).await?;
        Ok(Self::new(transport).with_request_timeout(config.request_timeout()))
    }
}

impl<T> CorrelationClient<T>
where
    T: Service<TransactionContext, Response = ResourceContext, Error = CorrelationError>
        + Clone
        + Send
        + 'static,
    T::Future: Send,
{
    pub fn new(transport: T) -> Self {
        Self { transport, request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS) }
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Builds the context sent for `path`: a fresh transaction id and the seed
    /// metadata. A metadata entry that cannot be encoded is logged and left out.
    pub fn transaction_context(&self, path: &str) -> TransactionContext {
        let mut ctx = TransactionContext::new(Uuid::new_v4().to_string(), RequestInfo::new(path));
        append_metadata(
            &mut ctx.metadata,
            "custom_tags",
            &HashMap::from([("test".to_string(), "value".to_string())]),
        );
        append_metadata(
            &mut ctx.metadata,
            "filter_metadata",
            &Serialized(FilterMetadata {
                filter_metadata: HashMap::from([("test".to_string(), "value".to_string())]),
            }),
        );
        append_metadata(&mut ctx.metadata, "sample_rate", "100");
        ctx
    }

    /// Resolves the resource mapped to `path`.
    ///
    /// A path without mapping resolves to a resource whose fields other than
    /// `path` are empty.
    ///
    /// # Errors
    ///
    /// Returns `TransportTimeout` when the call deadline elapses, otherwise the
    /// error reported by the transport.
    pub async fn get_resource(&self, path: &str) -> Result<Resource, CorrelationError> {
        let ctx = self.transaction_context(path);
        let transaction_id = ctx.transaction_id.clone();
        debug!(%transaction_id, path, "requesting resource context");

        let transport = self.transport.clone();
        let resource_ctx = tokio::time::timeout(self.request_timeout, transport.oneshot(ctx))
            .await
            .map_err(|_| CorrelationError::TransportTimeout)??;
        Ok(resource_ctx.into_resource(path))
    }

    /// Resolves every path in order. A failing path is logged and does not stop
    /// the batch.
    pub async fn resolve_all<I, P>(&self, paths: I) -> Vec<(String, Result<Resource, CorrelationError>)>
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let mut results = Vec::new();
        for path in paths {
            let path = path.into();
            let result = self.get_resource(&path).await;
            match &result {
                Ok(resource) => info!(
                    path = %path,
                    api_id = %resource.api_id,
                    version = %resource.version,
                    stage = %resource.stage,
                    client_id = %resource.client_id,
                    "resolved resource"
                ),
                Err(e) => warn!(path = %path, error = %e, "failed to resolve resource"),
            }
            results.push((path, result));
        }
        results
    }
}

fn append_metadata<V: ToDynamicValue + ?Sized>(
    metadata: &mut HashMap<String, DynamicValue>,
    key: &str,
    value: &V,
) {
    if let Err(e) = MetadataCodec::encode_into(metadata, key, value) {
        warn!(key, error = %e, "skipping metadata entry");
    }
}
