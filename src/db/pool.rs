//! Connection pool bootstrap.
//!
//! [`open`] turns a [`ConnectionConfig`] into a ready [`PgPool`]: TLS material
//! is validated, pool limits are applied before any traffic, and the pool is
//! only handed out after a successful status check.

use crate::db::context::QueryContext;
use crate::db::health::{DEFAULT_STATUS_TIMEOUT, status_check};
use crate::error::DbResult;
use crate::models::ConnectionConfig;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::{info, warn};

/// How long a checkout waits for a free or new connection.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Pool options derived from the configured limits.
pub fn pool_options(config: &ConnectionConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections())
        .min_connections(config.min_connections())
        .idle_timeout(config.idle_timeout())
        .acquire_timeout(DEFAULT_ACQUIRE_TIMEOUT)
}

/// Open a pool and verify the database answers.
///
/// Fails with a configuration error, without any network I/O, when TLS is
/// enabled but a certificate path is missing. On a failed status check the
/// pool is closed before the error is returned.
pub async fn open(config: &ConnectionConfig) -> DbResult<PgPool> {
    let connect_options = config.connect_options()?;

    info!(
        url = %config.masked_url()?,
        max_connections = config.max_connections(),
        min_connections = config.min_connections(),
        idle_timeout_secs = ?config.idle_timeout().map(|d| d.as_secs()),
        "Opening database pool"
    );

    let pool = pool_options(config).connect_lazy_with(connect_options);

    let ctx = QueryContext::background().with_timeout(DEFAULT_STATUS_TIMEOUT);
    if let Err(e) = status_check(&ctx, &pool).await {
        warn!(error = %e, "Database status check failed, closing pool");
        pool.close().await;
        return Err(e);
    }

    info!(host = %config.host, database = %config.name, "Database pool ready");
    Ok(pool)
}
