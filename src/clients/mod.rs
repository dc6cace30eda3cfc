//! HTTP clients for the remote services the gateway fronts.

pub mod builder;
pub mod dockstore;
pub mod rerank;
