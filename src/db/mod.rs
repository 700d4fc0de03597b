//! Database access layer.
//!
//! This module provides:
//! - Pool bootstrap with a mandatory status check
//! - Cancellation and deadline contexts for every call
//! - Named-parameter query execution (single row, many rows, mutations)
//! - Row decoding and name-based record mapping

pub mod context;
pub mod executor;
pub mod health;
pub mod named;
pub mod params;
pub mod pool;
pub mod row;
pub mod types;

pub use context::{CancelHandle, ContextError, QueryContext};
pub use executor::{run_cud, run_query, run_query_slice, run_query_slice_with, run_query_with};
pub use health::{Probe, status_check};
pub use named::{Args, BindStyle, NamedArgs, args_from};
pub use pool::open;
pub use row::{ByName, Derived, RowMapper};
