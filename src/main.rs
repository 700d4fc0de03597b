//! dbsql - Main entry point.
//!
//! Checks database connectivity, runs named queries and mutations, and
//! renders queries for logging.

use clap::Parser;
use dbsql::config::{Command, Config, StatementArgs};
use dbsql::db::{self, QueryContext};
use dbsql::error::DbResult;
use dbsql::format::format_query;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // stdout carries command output
    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Context for one command: optional timeout, cancelled by Ctrl-C.
fn command_context(config: &Config) -> (QueryContext, tokio::task::JoinHandle<()>) {
    let (ctx, cancel) = QueryContext::background().with_cancel();
    let ctx = match config.query_timeout_duration() {
        Some(timeout) => ctx.with_timeout(timeout),
        None => ctx,
    };

    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            cancel.cancel();
        }
    });
    (ctx, watcher)
}

async fn query(ctx: &QueryContext, pool: &PgPool, stmt: &StatementArgs) -> DbResult<()> {
    let args = stmt.named_args();
    info!(query = %format_query(&stmt.sql, &args), "Running query");

    let rows: Vec<JsonValue> = db::run_query_slice(ctx, pool, &stmt.sql, &args).await?;
    for row in &rows {
        println!("{row}");
    }
    info!(row_count = rows.len(), "Query finished");
    Ok(())
}

async fn exec(ctx: &QueryContext, pool: &PgPool, stmt: &StatementArgs) -> DbResult<()> {
    let args = stmt.named_args();
    info!(query = %format_query(&stmt.sql, &args), "Running statement");

    let rows_affected = db::run_cud(ctx, pool, &stmt.sql, &args).await?;
    println!("{rows_affected}");
    Ok(())
}

async fn run(config: &Config) -> DbResult<()> {
    if let Command::Render(stmt) = &config.command {
        println!("{}", format_query(&stmt.sql, &stmt.named_args()));
        return Ok(());
    }

    let start = Instant::now();
    let pool = db::open(&config.db.to_connection_config()).await?;
    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Database status check passed"
    );

    let (ctx, watcher) = command_context(config);
    let result = match &config.command {
        Command::Query(stmt) => query(&ctx, &pool, stmt).await,
        Command::Exec(stmt) => exec(&ctx, &pool, stmt).await,
        Command::Check | Command::Render(_) => Ok(()),
    };
    watcher.abort();

    pool.close().await;
    result
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    info!(
        host = %config.db.host,
        database = %config.db.name,
        "Starting dbsql v{}",
        env!("CARGO_PKG_VERSION")
    );

    if let Err(e) = run(&config).await {
        error!(error = %e, retryable = e.is_retryable(), "Command failed");
        return Err(e.into());
    }

    Ok(())
}
