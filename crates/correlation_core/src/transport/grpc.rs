//! # gRPC Transport Implementation
//!
//! This module provides the gRPC transport of the correlation service, built on
//! Protocol Buffers and the Tonic gRPC framework.
//!
//! ## Components
//!
//! - **CorrelationHandler**: Server implementation routing incoming calls to the
//!   correlation API service
//! - **CorrelationGrpc**: Client transport performing outbound calls to a remote
//!   correlation service
//! - **serve**: Server bootstrap with optional TLS and gRPC reflection
//! - **Protocol Buffer Conversions**: Type conversions between internal and protobuf types
//!
//! ## Connection Management
//!
//! `CorrelationGrpc` establishes its channel eagerly, bounded by the configured
//! connect timeout, so an unreachable server is reported when connecting rather
//! than on the first call. Failures are never retried. Each call carries the
//! configured deadline in its `grpc-timeout` header.
//!
//! ## Transport Security
//!
//! Channels are plaintext unless certificate material is configured: the server
//! terminates TLS when both `tls_cert` and `tls_key` are set, the client
//! verifies the server against `tls_ca` when set.

use std::{
    fs,
    future::Future,
    path::Path,
    pin::Pin,
    task::Poll,
    time::Duration,
};

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{
    Code, Request, Response, Status,
    transport::{
        Certificate, Channel, ClientTlsConfig, Endpoint, Identity, Server, ServerTlsConfig,
        server::Router,
    },
};
use tower::Service;
use tracing::{info, warn};

/// Protocol Buffer definitions and descriptor set for the correlation gRPC service.
pub mod proto {
    tonic::include_proto!("correlation");

    /// Pre-compiled Protocol Buffer descriptor set for service reflection.
    pub const CORRELATION_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("correlation_descriptor");
}

use crate::{
    config::Config,
    correlation::{
        api::types::{
            CorrelationRequest, CorrelationResponse, RequestInfo, ResourceContext,
            TransactionContext,
        },
        error::CorrelationError,
        infrastructure::value::DynamicValue,
    },
};

/// Converts correlation errors to gRPC Status codes for wire transmission.
impl From<CorrelationError> for Status {
    fn from(error: CorrelationError) -> Self {
        match error {
            CorrelationError::UnsupportedValue { .. } => Status::invalid_argument(error.to_string()),
            CorrelationError::TransportTimeout => Status::deadline_exceeded(error.to_string()),
            _ => Status::internal(error.to_string()),
        }
    }
}

/// Converts a failed call status into a correlation error.
fn call_error(status: Status) -> CorrelationError {
    match status.code() {
        Code::DeadlineExceeded => CorrelationError::TransportTimeout,
        Code::Unavailable => CorrelationError::TransportFailedToConnect(status.message().to_owned()),
        _ => CorrelationError::TransportCallFailed(status.to_string()),
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>, CorrelationError> {
    fs::read(path).map_err(|e| {
        CorrelationError::TransportFailedToConnect(format!("{}: {e}", path.display()))
    })
}

/// gRPC client transport for the correlation service.
///
/// `CorrelationGrpc` turns a [`TransactionContext`] into a `GetResourceContext`
/// call on a remote correlation service and maps the reply back. The underlying
/// channel is cheap to clone and multiplexes concurrent calls.
#[derive(Debug, Clone)]
pub struct CorrelationGrpc {
    client: proto::correlation_service_client::CorrelationServiceClient<Channel>,
    /// Deadline advertised to the server for each call.
    request_timeout: Option<Duration>,
}

impl CorrelationGrpc {
    /// Wraps an already established channel.
    pub fn new(channel: Channel) -> Self {
        Self {
            client: proto::correlation_service_client::CorrelationServiceClient::new(channel),
            request_timeout: None,
        }
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = Some(request_timeout);
        self
    }

    /// Connects to the correlation service described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEndpoint` for a malformed host/port, `TransportTimeout` if
    /// the channel is not established within the connect timeout, and
    /// `TransportFailedToConnect` for any other connection failure.
    pub async fn connect(config: &Config) -> Result<Self, CorrelationError> {
        let url = config.endpoint_url();
        let mut endpoint = Endpoint::from_shared(url.clone())
            .map_err(|e| CorrelationError::InvalidEndpoint(format!("{url}: {e}")))?
            .connect_timeout(config.connect_timeout());
        if let Some(ca) = &config.tls_ca {
            let tls = ClientTlsConfig::new()
                .ca_certificate(Certificate::from_pem(read_pem(ca)?))
                .domain_name(config.host.clone());
            endpoint = endpoint
                .tls_config(tls)
                .map_err(|e| CorrelationError::InvalidEndpoint(format!("{url}: {e}")))?;
        }

        let channel = tokio::time::timeout(config.connect_timeout(), endpoint.connect())
            .await
            .map_err(|_| CorrelationError::TransportTimeout)?
            .map_err(|e| CorrelationError::TransportFailedToConnect(format!("{url}: {e}")))?;
        info!(endpoint = %url, "connected to correlation service");
        Ok(Self::new(channel).with_request_timeout(config.request_timeout()))
    }
}

impl Service<TransactionContext> for CorrelationGrpc {
    type Response = ResourceContext;
    type Error = CorrelationError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, ctx: TransactionContext) -> Self::Future {
        let mut client = self.client.clone();
        let request_timeout = self.request_timeout;
        Box::pin(async move {
            let mut request = Request::new(proto::TransactionContext::from(ctx));
            if let Some(request_timeout) = request_timeout {
                request.set_timeout(request_timeout);
            }
            let response = client.get_resource_context(request).await.map_err(call_error)?;
            Ok(response.into_inner().into())
        })
    }
}

/// gRPC server handler routing incoming calls to the correlation API service.
///
/// ## Type Parameters
///
/// * `CorrelationApi` - Service handling correlation requests
pub struct CorrelationHandler<CorrelationApi> {
    /// Correlation API service handler.
    correlation: CorrelationApi,
}

impl<CorrelationApi> CorrelationHandler<CorrelationApi> {
    /// Creates a new handler delegating to `correlation`.
    pub fn new(correlation: CorrelationApi) -> Self {
        Self { correlation }
    }
}

/// Implementation of the correlation gRPC service protocol.
#[tonic::async_trait]
impl<CorrelationApi> proto::correlation_service_server::CorrelationService
    for CorrelationHandler<CorrelationApi>
where
    CorrelationApi: Service<CorrelationRequest, Response = CorrelationResponse, Error = CorrelationError>
        + Clone
        + Sync
        + Send
        + 'static,
    CorrelationApi::Future: Send,
{
    /// Correlates the observed request with a mapped resource.
    ///
    /// A request matching no mapping is answered with an empty context rather
    /// than an error.
    async fn get_resource_context(
        &self,
        request: Request<proto::TransactionContext>,
    ) -> Result<Response<proto::ResourceContext>, Status> {
        let req = request.into_inner();
        let mut correlation = self.correlation.clone();
        match correlation.call(CorrelationRequest::GetResourceContext(req.into())).await? {
            CorrelationResponse::ResourceContext(ctx) => Ok(Response::new(ctx.into())),
            _ => Err(Status::internal("Internal correlation API error")),
        }
    }
}

/// Builds the gRPC router for `correlation`, with TLS and reflection as configured.
///
/// # Errors
///
/// Returns `ServerFailed` if the TLS material cannot be loaded or the reflection
/// service cannot be built.
pub fn router<CorrelationApi>(
    config: &Config,
    correlation: CorrelationApi,
) -> Result<Router, CorrelationError>
where
    CorrelationApi: Service<CorrelationRequest, Response = CorrelationResponse, Error = CorrelationError>
        + Clone
        + Sync
        + Send
        + 'static,
    CorrelationApi::Future: Send,
{
    let mut server = Server::builder();
    if let (Some(cert), Some(key)) = (&config.tls_cert, &config.tls_key) {
        let load = |path: &Path| {
            fs::read(path)
                .map_err(|e| CorrelationError::ServerFailed(format!("{}: {e}", path.display())))
        };
        let identity = Identity::from_pem(load(cert.as_path())?, load(key.as_path())?);
        server = server
            .tls_config(ServerTlsConfig::new().identity(identity))
            .map_err(|e| CorrelationError::ServerFailed(e.to_string()))?;
    }

    let reflection = if config.reflection {
        Some(
            tonic_reflection::server::Builder::configure()
                .register_encoded_file_descriptor_set(proto::CORRELATION_DESCRIPTOR_SET)
                .build_v1()
                .map_err(|e| CorrelationError::ServerFailed(e.to_string()))?,
        )
    } else {
        None
    };

    Ok(server
        .add_service(proto::correlation_service_server::CorrelationServiceServer::new(
            CorrelationHandler::new(correlation),
        ))
        .add_optional_service(reflection))
}

/// Serves `correlation` on `listener` until `shutdown` resolves.
pub async fn serve_with_listener<CorrelationApi>(
    config: &Config,
    correlation: CorrelationApi,
    listener: TcpListener,
    shutdown: impl Future<Output = ()>,
) -> Result<(), CorrelationError>
where
    CorrelationApi: Service<CorrelationRequest, Response = CorrelationResponse, Error = CorrelationError>
        + Clone
        + Sync
        + Send
        + 'static,
    CorrelationApi::Future: Send,
{
    router(config, correlation)?
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
        .await
        .map_err(|e| CorrelationError::ServerFailed(e.to_string()))
}

/// Binds the configured listen address and serves `correlation` until `shutdown` resolves.
///
/// # Errors
///
/// Returns `ServerFailed` if the address cannot be bound or the server fails.
pub async fn serve<CorrelationApi>(
    config: &Config,
    correlation: CorrelationApi,
    shutdown: impl Future<Output = ()>,
) -> Result<(), CorrelationError>
where
    CorrelationApi: Service<CorrelationRequest, Response = CorrelationResponse, Error = CorrelationError>
        + Clone
        + Sync
        + Send
        + 'static,
    CorrelationApi::Future: Send,
{
    let address = config.listen_address();
    let listener = TcpListener::bind(address).await.map_err(|e| {
        CorrelationError::ServerFailed(format!("unable to bind {address}: {e}"))
    })?;
    if !config.server_tls() && config.tls_ca.is_some() {
        warn!("tls_ca is only used by clients, the server runs without TLS");
    }
    info!(%address, tls = config.server_tls(), reflection = config.reflection, "correlation service listening");
    serve_with_listener(config, correlation, listener, shutdown).await
}

// Protocol Buffer type conversion implementations

/// Converts Protocol Buffer TransactionContext to the internal transaction context.
impl From<proto::TransactionContext> for TransactionContext {
    fn from(ctx: proto::TransactionContext) -> Self {
        TransactionContext {
            transaction_id: ctx.transaction_id,
            request: ctx.request.map(|r| r.into()),
            metadata: ctx.metadata.into_iter().map(|(key, value)| (key, value.into())).collect(),
        }
    }
}

/// Converts the internal transaction context to Protocol Buffer TransactionContext.
impl From<TransactionContext> for proto::TransactionContext {
    fn from(ctx: TransactionContext) -> Self {
        proto::TransactionContext {
            transaction_id: ctx.transaction_id,
            request: ctx.request.map(|r| r.into()),
            metadata: ctx.metadata.into_iter().map(|(key, value)| (key, value.into())).collect(),
        }
    }
}

impl From<proto::Request> for RequestInfo {
    fn from(request: proto::Request) -> Self {
        RequestInfo {
            path: request.path,
            original_path: request.original_path,
            headers: request.headers.into_iter().collect(),
        }
    }
}

impl From<RequestInfo> for proto::Request {
    fn from(request: RequestInfo) -> Self {
        proto::Request {
            path: request.path,
            original_path: request.original_path,
            headers: request.headers.into_iter().collect(),
        }
    }
}

impl From<proto::ResourceContext> for ResourceContext {
    fn from(ctx: proto::ResourceContext) -> Self {
        ResourceContext {
            api_id: ctx.api_id,
            version: ctx.version,
            stage: ctx.stage,
            consumer_id: ctx.consumer_id,
        }
    }
}

impl From<ResourceContext> for proto::ResourceContext {
    fn from(ctx: ResourceContext) -> Self {
        proto::ResourceContext {
            api_id: ctx.api_id,
            version: ctx.version,
            stage: ctx.stage,
            consumer_id: ctx.consumer_id,
        }
    }
}

/// Converts `google.protobuf.Value` to a dynamic value. A value without kind is null.
impl From<prost_types::Value> for DynamicValue {
    fn from(value: prost_types::Value) -> Self {
        use prost_types::value::Kind;
        match value.kind {
            None | Some(Kind::NullValue(_)) => DynamicValue::Null,
            Some(Kind::BoolValue(b)) => DynamicValue::Bool(b),
            Some(Kind::NumberValue(n)) => DynamicValue::Number(n),
            Some(Kind::StringValue(s)) => DynamicValue::String(s),
            Some(Kind::ListValue(list)) => {
                DynamicValue::List(list.values.into_iter().map(|v| v.into()).collect())
            }
            Some(Kind::StructValue(fields)) => DynamicValue::Map(
                fields.fields.into_iter().map(|(key, value)| (key, value.into())).collect(),
            ),
        }
    }
}

/// Converts a dynamic value to `google.protobuf.Value`.
impl From<DynamicValue> for prost_types::Value {
    fn from(value: DynamicValue) -> Self {
        use prost_types::value::Kind;
        let kind = match value {
            DynamicValue::Null => Kind::NullValue(prost_types::NullValue::NullValue as i32),
            DynamicValue::Bool(b) => Kind::BoolValue(b),
            DynamicValue::Number(n) => Kind::NumberValue(n),
            DynamicValue::String(s) => Kind::StringValue(s),
            DynamicValue::List(items) => Kind::ListValue(prost_types::ListValue {
                values: items.into_iter().map(|v| v.into()).collect(),
            }),
            DynamicValue::Map(fields) => Kind::StructValue(prost_types::Struct {
                fields: fields.into_iter().map(|(key, value)| (key, value.into())).collect(),
            }),
        };
        prost_types::Value { kind: Some(kind) }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn unit_grpc_dynamic_value_wire_conversion() {
        let value = DynamicValue::Map(BTreeMap::from([
            ("rate".to_string(), DynamicValue::Number(100.0)),
            (
                "tags".to_string(),
                DynamicValue::List(vec![DynamicValue::String("a".to_string()), DynamicValue::Null]),
            ),
            ("enabled".to_string(), DynamicValue::Bool(false)),
        ]));
        let wire = prost_types::Value::from(value.clone());
        assert!(matches!(wire.kind, Some(prost_types::value::Kind::StructValue(_))));
        assert_eq!(DynamicValue::from(wire), value);
    }

    #[test]
    fn unit_grpc_value_without_kind_is_null() {
        assert_eq!(DynamicValue::from(prost_types::Value { kind: None }), DynamicValue::Null);
    }

    #[test]
    fn unit_grpc_transaction_context_conversion() {
        let ctx = TransactionContext::new(
            "t1",
            RequestInfo::new("/v1/orders")
                .with_original_path("/orders")
                .with_header("x-envoy-original-path", "/v1/orders"),
        )
        .with_metadata("sample_rate", DynamicValue::String("100".to_string()));
        let wire = proto::TransactionContext::from(ctx.clone());
        assert_eq!(wire.request.as_ref().unwrap().original_path, "/orders");
        assert_eq!(TransactionContext::from(wire), ctx);
    }

    #[test]
    fn unit_grpc_missing_request_stays_missing() {
        let ctx = TransactionContext::from(proto::TransactionContext {
            transaction_id: "t1".to_string(),
            ..Default::default()
        });
        assert_eq!(ctx.request, None);
    }

    #[test]
    fn unit_grpc_status_mapping() {
        assert_eq!(Status::from(CorrelationError::TransportTimeout).code(), Code::DeadlineExceeded);
        assert_eq!(
            Status::from(CorrelationError::UnexpectedResponse).code(),
            Code::Internal
        );
        assert_eq!(
            call_error(Status::deadline_exceeded("slow")),
            CorrelationError::TransportTimeout
        );
        assert_eq!(
            call_error(Status::unavailable("down")),
            CorrelationError::TransportFailedToConnect("down".to_string())
        );
    }
}
