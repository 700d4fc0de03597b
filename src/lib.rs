//! dbsql Library
//!
//! A PostgreSQL access layer: pooled connections verified by a status check,
//! named-parameter queries mapped onto caller types, mutations, a stable
//! error taxonomy and query rendering for logs.

pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod models;

pub use db::{QueryContext, open, run_cud, run_query, run_query_slice};
pub use error::{DbError, DbResult};
pub use format::format_query;
pub use models::ConnectionConfig;
