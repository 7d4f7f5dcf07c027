//! RPC layer: wire types, error codes, method registry, and handlers.

pub mod context;
pub mod errors;
pub mod handlers;
pub mod registry;
pub mod types;
