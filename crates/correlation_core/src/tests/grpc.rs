use tower::Service;

use super::fixtures::{self, GrpcServer};
use crate::{
    config::Config,
    correlation::{
        api::{CorrelationRequest, RequestInfo, ResourceContext, TransactionContext},
        error::CorrelationError,
        infrastructure::{mapping::Resource, value::DynamicValue},
        services::resolver::ORIGINAL_PATH_HEADER,
    },
    transport::grpc::CorrelationGrpc,
};

#[tokio::test]
async fn integration_grpc_resolves_mapped_path() {
    let server = GrpcServer::spawn(fixtures::correlation_service()).await;
    let mut client = CorrelationGrpc::connect(&server.client_config()).await.unwrap();

    assert_resolves!(
        client,
        TransactionContext::new("t1", RequestInfo::new("/v1/orders")),
        ResourceContext {
            api_id: "a1".to_string(),
            version: "1.0".to_string(),
            stage: "prod".to_string(),
            consumer_id: "c1".to_string(),
        }
    );
    assert_resolves!(
        client,
        TransactionContext::new("t2", RequestInfo::new("/unknown")),
        ResourceContext::default()
    );
}

#[tokio::test]
async fn integration_grpc_header_survives_the_wire() {
    let server = GrpcServer::spawn(fixtures::correlation_service()).await;
    let mut client = CorrelationGrpc::connect(&server.client_config()).await.unwrap();

    let request = RequestInfo::new("/path")
        .with_original_path("/original")
        .with_header(ORIGINAL_PATH_HEADER, "/rewritten");
    let resolved = client.call(TransactionContext::new("t3", request)).await.unwrap();
    assert_eq!(resolved.api_id, "api-header");
    assert_eq!(resolved.consumer_id, "c-header");
}

#[tokio::test]
async fn integration_grpc_metadata_is_accepted() {
    let server = GrpcServer::spawn(fixtures::correlation_service()).await;
    let mut client = CorrelationGrpc::connect(&server.client_config()).await.unwrap();

    let ctx = TransactionContext::new("t4", RequestInfo::new("/v1/orders"))
        .with_metadata("sample_rate", DynamicValue::String("100".to_string()))
        .with_metadata(
            "filter_metadata",
            DynamicValue::Map(
                [(
                    "envoy.filters.http.lua".to_string(),
                    DynamicValue::List(vec![DynamicValue::Bool(true), DynamicValue::Number(1.5)]),
                )]
                .into(),
            ),
        )
        .with_metadata("nothing", DynamicValue::Null);
    assert_eq!(client.call(ctx).await.unwrap().api_id, "a1");
}

#[tokio::test]
async fn integration_grpc_sees_mappings_added_at_runtime() {
    let mut correlation = fixtures::correlation_service();
    let server = GrpcServer::spawn(correlation.clone()).await;
    let mut client = CorrelationGrpc::connect(&server.client_config()).await.unwrap();

    let ctx = TransactionContext::new("t5", RequestInfo::new("/v2/items"));
    assert!(client.call(ctx.clone()).await.unwrap().is_empty());

    correlation
        .call(CorrelationRequest::AddResourceMapping {
            path: "/v2/items".to_string(),
            resource: Resource::new("/v2/items", "a2", "2.0", "test", "c2"),
        })
        .await
        .unwrap();
    assert_eq!(client.call(ctx).await.unwrap().api_id, "a2");
}

#[tokio::test]
async fn integration_grpc_reflection_enabled_server() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let (shutdown, signal) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        let config = Config { reflection: true, ..Default::default() };
        crate::transport::grpc::serve_with_listener(
            &config,
            fixtures::correlation_service(),
            listener,
            async {
                let _ = signal.await;
            },
        )
        .await
    });

    let config = Config { host: address.ip().to_string(), port: address.port(), ..Default::default() };
    let mut client = CorrelationGrpc::connect(&config).await.unwrap();
    let resolved = client.call(TransactionContext::new("t6", RequestInfo::new("/v1/orders"))).await;
    assert_eq!(resolved.unwrap().api_id, "a1");

    shutdown.send(()).unwrap();
    assert_eq!(server.await.unwrap(), Ok(()));
}

#[tokio::test]
async fn integration_grpc_connect_refused() {
    // Reserve a port, then release it so nothing listens there
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let config = Config {
        host: address.ip().to_string(),
        port: address.port(),
        connect_timeout_ms: 200,
        ..Default::default()
    };
    match CorrelationGrpc::connect(&config).await {
        Err(CorrelationError::TransportFailedToConnect(_)) | Err(CorrelationError::TransportTimeout) => {}
        other => panic!("unexpected connect result: {other:?}"),
    }
}

#[tokio::test]
async fn integration_grpc_invalid_endpoint() {
    let config = Config { host: "bad host".to_string(), ..Default::default() };
    assert!(matches!(
        CorrelationGrpc::connect(&config).await,
        Err(CorrelationError::InvalidEndpoint(_))
    ));
}

#[tokio::test]
async fn integration_grpc_server_tls_files_missing() {
    let config = Config {
        tls_cert: Some("/nonexistent/cert.pem".into()),
        tls_key: Some("/nonexistent/key.pem".into()),
        ..Default::default()
    };
    assert!(matches!(
        crate::transport::grpc::router(&config, fixtures::correlation_service()),
        Err(CorrelationError::ServerFailed(_))
    ));
}
