//! Data models for the access layer.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod query;

// Re-export commonly used types
pub use connection::{ConnectionConfig, DEFAULT_MAX_CONNECTIONS, SslMode};
pub use query::QueryParam;
