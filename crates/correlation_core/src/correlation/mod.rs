//! Correlation module.
//!
//! Associates observed requests with the resource identity they target, using a
//! lookup table keyed by request path.
//!
//! ## Components
//!
//! ### Services
//! - **Store**: concurrent path to resource table with point lookup and upsert
//! - **Codec**: conversion of application values into transport-safe [`DynamicValue`]s
//!   and back into display-friendly views for structured logging
//! - **Resolver**: effective path selection and lookup
//!
//! ### API
//! - [`api::CorrelationApiService`]: the tower service behind the gRPC handler. It logs
//!   the request metadata, then delegates to the resolver.
//!
//! ### Infrastructure
//! - **Mapping**: [`Resource`] records and the YAML mapping document they are loaded from
//! - **Value**: the [`DynamicValue`] tagged union carried as request metadata
//!
//! [`DynamicValue`]: infrastructure::value::DynamicValue
//! [`Resource`]: infrastructure::mapping::Resource
pub mod api;
pub mod error;
pub mod infrastructure;
pub mod services;

/// Builds the correlation API service over a freshly loaded mapping table.
///
/// The returned service is cheap to clone; every clone shares the same store, so
/// mappings inserted through one clone are visible to all of them.
pub fn init_correlation_service(
    mappings: infrastructure::mapping::ResourceMappings,
) -> api::CorrelationApiService {
    api::CorrelationApiService::new(services::store::ResourceMappingStore::new(mappings))
}
