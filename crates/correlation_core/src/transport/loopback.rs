//! # Loopback Transport Implementation
//!
//! Routes correlation lookups directly to a correlation API service living in
//! the same process, without going through the network. Used to test clients
//! and to embed the resolver in an agent.
//!
//! ## Network Simulation
//!
//! An optional fixed delay is applied before each call to exercise client
//! deadlines.

use std::{future::Future, pin::Pin, task::Poll, time::Duration};

use tower::Service;

use crate::correlation::{
    api::{
        CorrelationApiService,
        types::{CorrelationRequest, CorrelationResponse, ResourceContext, TransactionContext},
    },
    error::CorrelationError,
};

/// In-process transport to a local correlation API service.
#[derive(Debug, Clone, Default)]
pub struct CorrelationLoopback {
    correlation: CorrelationApiService,
    /// Simulated network delay applied to every call.
    delay: Duration,
}

impl CorrelationLoopback {
    pub fn new(correlation: CorrelationApiService) -> Self {
        Self { correlation, delay: Duration::ZERO }
    }

    /// Delays every call by `delay` before it reaches the service.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// The local service calls are routed to.
    pub fn correlation(&self) -> &CorrelationApiService {
        &self.correlation
    }
}

impl Service<TransactionContext> for CorrelationLoopback {
    type Response = ResourceContext;
    type Error = CorrelationError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, ctx: TransactionContext) -> Self::Future {
        let mut correlation = self.correlation.clone();
        let delay = self.delay;
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match correlation.call(CorrelationRequest::GetResourceContext(ctx)).await? {
                CorrelationResponse::ResourceContext(resource_ctx) => Ok(resource_ctx),
                _ => Err(CorrelationError::UnexpectedResponse),
            }
        })
    }
}
