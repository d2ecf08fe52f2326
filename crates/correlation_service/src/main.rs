use anyhow::Context;
use clap::Parser;
use correlation_client::CorrelationClient;
use correlation_core::{
    config::{Config, Mode},
    correlation::{infrastructure::mapping::MappingDocument, init_correlation_service},
    logging,
    transport::grpc,
};
use tracing::{error, info};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn run_server(config: &Config) -> anyhow::Result<()> {
    info!("starting correlation service");
    let document = MappingDocument::load(&config.resource_mapping_file)
        .context("unable to load resource mapping")?;
    let correlation = init_correlation_service(document.to_mappings());
    info!(resources = correlation.store().len(), "resource mapping loaded");

    grpc::serve(config, correlation, shutdown_signal()).await.context("unable to start server")?;
    Ok(())
}

async fn run_client(config: &Config) -> anyhow::Result<()> {
    info!("starting correlation client");
    let client = CorrelationClient::connect(config)
        .await
        .with_context(|| format!("unable to connect to {}", config.endpoint_url()))?;
    let document = MappingDocument::load(&config.resource_mapping_file)
        .context("unable to load resource mapping")?;

    let results = client.resolve_all(document.paths()).await;
    let failures = results.iter().filter(|(_, result)| result.is_err()).count();
    info!(resolved = results.len() - failures, failures, "client run complete");
    Ok(())
}

#[cfg(not(tarpaulin_include))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    logging::init(&config.log_level, config.log_format)
        .with_context(|| format!("invalid log level {:?}", config.log_level))?;

    match config.mode {
        Mode::Server => run_server(&config).await,
        Mode::Client => run_client(&config).await,
    }
}
