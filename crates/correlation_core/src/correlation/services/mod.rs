//! Core services of the correlation engine.
//!
//! - **Store**: path to resource table shared by all handlers
//! - **Codec**: metadata conversion to and from [`DynamicValue`](super::infrastructure::value::DynamicValue)
//! - **Resolver**: path precedence and lookup

pub mod codec;
pub mod resolver;
pub mod store;
