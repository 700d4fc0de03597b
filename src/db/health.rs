//! Database status check.
//!
//! [`status_check`] pings until the database answers or the context is done,
//! sleeping one more second after each failed attempt, then confirms the
//! server executes statements with a `SELECT true` round trip.

use crate::db::context::QueryContext;
use crate::error::{DbError, DbResult, translate};
use sqlx::postgres::PgConnection;
use sqlx::{Connection, PgPool};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Deadline imposed when the caller's context has none.
pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Something that can be pinged and asked to run a trivial statement.
pub trait Probe: Sync {
    fn ping(&self) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Run `SELECT true` and return the decoded value.
    fn round_trip(&self) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}

impl Probe for PgPool {
    /// Pings over a dedicated connection built from the pool's options, so a
    /// refused connect fails at once with the driver error instead of waiting
    /// out the pool's acquire retries.
    async fn ping(&self) -> Result<(), sqlx::Error> {
        let mut conn = PgConnection::connect_with(&self.connect_options()).await?;
        conn.ping().await?;
        conn.close().await
    }

    async fn round_trip(&self) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT true").fetch_one(self).await
    }
}

/// Verify the database is reachable and answering.
///
/// A context without a deadline gets [`DEFAULT_STATUS_TIMEOUT`]. Backoff
/// sleeps are not interrupted by the context; the deadline is checked after
/// each one.
pub async fn status_check<P: Probe + ?Sized>(ctx: &QueryContext, probe: &P) -> DbResult<()> {
    let ctx = match ctx.deadline() {
        Some(_) => ctx.clone(),
        None => ctx.with_timeout(DEFAULT_STATUS_TIMEOUT),
    };

    let mut attempt: u64 = 1;
    loop {
        let result = tokio::select! {
            biased;
            cause = ctx.done() => Err(DbError::cancelled("ping", cause)),
            res = probe.ping() => res.map_err(|e| translate("ping", e)),
        };

        let err = match result {
            Ok(()) => break,
            Err(err) => err,
        };

        warn!(attempt, error = %err, "Database ping failed");
        tokio::time::sleep(Duration::from_secs(attempt)).await;

        if let Some(cause) = ctx.err() {
            return Err(DbError::status_check(cause, err));
        }
        attempt += 1;
    }

    if let Some(cause) = ctx.err() {
        return Err(DbError::cancelled("status check", cause));
    }

    let ok = ctx.run("status query", probe.round_trip()).await?;
    debug!(attempt, ok, "Database status check passed");
    Ok(())
}
