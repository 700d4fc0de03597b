//! Query execution.
//!
//! Three entry points, all taking a [`QueryContext`] and any PostgreSQL
//! executor (pool, connection or transaction):
//! - [`run_query`]: exactly one record, `NotFound` when nothing matches
//! - [`run_query_slice`]: every matching record, in result order
//! - [`run_cud`]: create/update/delete, returning rows affected
//!
//! Queries use named placeholders (see [`crate::db::named`]). The row stream
//! lives only inside the call and is dropped before returning on every path.

use crate::db::context::QueryContext;
use crate::db::named::{self, BindStyle, NamedArgs};
use crate::db::params::build_query;
use crate::db::row::{ByName, RowMapper};
use crate::error::{DbError, DbResult, translate};
use futures_util::TryStreamExt;
use serde::de::DeserializeOwned;
use sqlx::postgres::PgRow;
use sqlx::{Executor, Postgres};
use std::time::Instant;
use tracing::debug;

/// Run a query expected to yield one record, bound by column name.
///
/// Zero rows is [`DbError::NotFound`]; rows after the first are discarded.
pub async fn run_query<'c, E, A, T>(
    ctx: &QueryContext,
    executor: E,
    query: &str,
    args: &A,
) -> DbResult<T>
where
    E: Executor<'c, Database = Postgres>,
    A: NamedArgs + ?Sized,
    T: DeserializeOwned,
{
    run_query_with(ctx, executor, query, args, &ByName::new()).await
}

/// [`run_query`] with an explicit row mapper.
pub async fn run_query_with<'c, E, A, T, M>(
    ctx: &QueryContext,
    executor: E,
    query: &str,
    args: &A,
    mapper: &M,
) -> DbResult<T>
where
    E: Executor<'c, Database = Postgres>,
    A: NamedArgs + ?Sized,
    M: RowMapper<T>,
{
    let start = Instant::now();
    let (sql, params) = named::bind(query, args, BindStyle::Dollar)?;

    debug!(sql = %sql, params = params.len(), "Executing query");

    let operation = target("query", &sql);
    let row = ctx
        .run(&operation, async {
            let mut rows = build_query(&sql, &params).fetch(executor);
            rows.try_next().await
        })
        .await?;

    let Some(row) = row else {
        debug!(
            execution_time_ms = start.elapsed().as_millis() as u64,
            "Query matched no rows"
        );
        return Err(DbError::NotFound);
    };

    let record = mapper
        .map_row(&row)
        .map_err(|e| translate(&target("map row", &sql), e))?;

    debug!(
        execution_time_ms = start.elapsed().as_millis() as u64,
        "Query completed"
    );
    Ok(record)
}

/// Run a query and collect every record, bound by column name.
///
/// Zero rows yields an empty `Vec`. The caller only ever sees a fully
/// mapped result.
pub async fn run_query_slice<'c, E, A, T>(
    ctx: &QueryContext,
    executor: E,
    query: &str,
    args: &A,
) -> DbResult<Vec<T>>
where
    E: Executor<'c, Database = Postgres>,
    A: NamedArgs + ?Sized,
    T: DeserializeOwned,
{
    run_query_slice_with(ctx, executor, query, args, &ByName::new()).await
}

/// [`run_query_slice`] with an explicit row mapper.
pub async fn run_query_slice_with<'c, E, A, T, M>(
    ctx: &QueryContext,
    executor: E,
    query: &str,
    args: &A,
    mapper: &M,
) -> DbResult<Vec<T>>
where
    E: Executor<'c, Database = Postgres>,
    A: NamedArgs + ?Sized,
    M: RowMapper<T>,
{
    let start = Instant::now();
    let (sql, params) = named::bind(query, args, BindStyle::Dollar)?;

    debug!(sql = %sql, params = params.len(), "Executing query slice");

    let operation = target("query slice", &sql);
    let rows: Vec<PgRow> = ctx
        .run(&operation, async {
            build_query(&sql, &params)
                .fetch(executor)
                .try_collect::<Vec<_>>()
                .await
        })
        .await?;

    let records = map_rows(&rows, mapper)
        .map_err(|e| translate(&target("map row", &sql), e))?;

    debug!(
        row_count = records.len(),
        execution_time_ms = start.elapsed().as_millis() as u64,
        "Query slice completed"
    );
    Ok(records)
}

fn map_rows<T, M: RowMapper<T>>(rows: &[PgRow], mapper: &M) -> Result<Vec<T>, sqlx::Error> {
    rows.iter().map(|row| mapper.map_row(row)).collect()
}

/// Operation label naming the statement, folded onto one line.
fn target(kind: &str, sql: &str) -> String {
    format!("{kind} `{}`", sql.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Execute an insert, update or delete with `data` supplying named values.
///
/// Returns the number of rows affected; zero is not an error.
pub async fn run_cud<'c, E, A>(
    ctx: &QueryContext,
    executor: E,
    query: &str,
    data: &A,
) -> DbResult<u64>
where
    E: Executor<'c, Database = Postgres>,
    A: NamedArgs + ?Sized,
{
    let start = Instant::now();
    let (sql, params) = named::bind(query, data, BindStyle::Dollar)?;

    debug!(sql = %sql, params = params.len(), "Executing write operation");

    let result = ctx
        .run(
            &target("exec", &sql),
            build_query(&sql, &params).execute(executor),
        )
        .await?;

    debug!(
        rows_affected = result.rows_affected(),
        execution_time_ms = start.elapsed().as_millis() as u64,
        "Write operation completed"
    );
    Ok(result.rows_affected())
}
