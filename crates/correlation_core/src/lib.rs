//! Correlation oracle for API-gateway-adjacent agents.
//!
//! Resolves an observed request (path, headers and free-form metadata) into the
//! business identity of the resource it targeted: API identifier, version,
//! deployment stage and consuming client. The lookup table is loaded once from
//! a YAML mapping file and served over gRPC.
//!
//! - [`correlation`]: resolution engine, mapping store and metadata codec
//! - [`transport`]: gRPC and in-process transports
//! - [`config`]: process configuration parsed from flags and environment
//! - [`logging`]: `tracing` subscriber setup
pub mod config;
pub mod correlation;
pub mod logging;
pub mod transport;

#[cfg(test)]
mod tests;
