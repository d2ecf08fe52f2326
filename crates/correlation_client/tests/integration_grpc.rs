use correlation_client::CorrelationClient;
use correlation_core::{
    config::Config,
    correlation::{
        infrastructure::mapping::{MappingDocument, Resource},
        init_correlation_service,
    },
    transport::grpc::serve_with_listener,
};
use tokio::{net::TcpListener, sync::oneshot};

const MAPPING: &str = r#"
mapping:
  - path: /v1/orders
    api_id: a1
    version: "1.0"
    stage: prod
    client_id: c1
  - path: /v1/users
    api_id: a2
    version: "2.0"
    stage: test
    client_id: c2
"#;

async fn spawn_server() -> (Config, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let correlation = init_correlation_service(MappingDocument::from_yaml(MAPPING).unwrap().into());
    let (shutdown, signal) = oneshot::channel::<()>();
    tokio::spawn(async move {
        serve_with_listener(&Config::default(), correlation, listener, async {
            let _ = signal.await;
        })
        .await
        .unwrap();
    });
    let config = Config { host: address.ip().to_string(), port: address.port(), ..Default::default() };
    (config, shutdown)
}

#[tokio::test]
async fn integration_client_resolves_over_grpc() {
    let (config, _shutdown) = spawn_server().await;
    let client = CorrelationClient::connect(&config).await.unwrap();

    assert_eq!(
        client.get_resource("/v1/orders").await.unwrap(),
        Resource::new("/v1/orders", "a1", "1.0", "prod", "c1")
    );
    assert_eq!(
        client.get_resource("/unknown").await.unwrap(),
        Resource { path: "/unknown".to_string(), ..Default::default() }
    );
}

#[tokio::test]
async fn integration_client_resolve_all_over_grpc() {
    let (config, _shutdown) = spawn_server().await;
    let client = CorrelationClient::connect(&config).await.unwrap();
    let document = MappingDocument::from_yaml(MAPPING).unwrap();

    let results = client.resolve_all(document.paths()).await;
    let resolved: Vec<_> = results.into_iter().map(|(_, result)| result.unwrap()).collect();
    assert_eq!(resolved, document.mapping);
}
