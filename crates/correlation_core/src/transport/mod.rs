//! Transports carrying correlation lookups between clients and the service.
//!
//! Every client-side transport is a tower service from [`TransactionContext`] to
//! [`ResourceContext`], so the correlation client is agnostic of how its
//! requests reach the service.
//!
//! - [`grpc`]: Tonic gRPC client and server
//! - [`loopback`]: in-process routing to a local correlation service
//!
//! [`TransactionContext`]: crate::correlation::api::TransactionContext
//! [`ResourceContext`]: crate::correlation::api::ResourceContext

pub mod grpc;
pub mod loopback;
