//! Infrastructure primitives for the correlation engine.
//!
//! Resource records, the mapping document they are loaded from, and the dynamic
//! value type used to carry free-form request metadata.

pub mod mapping;
pub mod value;
