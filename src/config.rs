//! Configuration handling for the dbsql binary.
//!
//! This module provides configuration management via CLI arguments and
//! `APP_`-prefixed environment variables.

use crate::db::Args;
use crate::models::QueryParam;
use crate::models::connection::{
    ConnectionConfig, DEFAULT_HOST, DEFAULT_MAX_IDLE_CONNS, DEFAULT_PORT,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_APPLICATION_NAME: &str = "dbsql";

/// Database connection settings.
#[derive(Debug, Clone, clap::Args)]
pub struct DbArgs {
    #[arg(long = "db-user", default_value = "postgres", env = "APP_DB_USER")]
    pub user: String,

    #[arg(
        long = "db-password",
        default_value = "postgres",
        env = "APP_DB_PASSWORD",
        hide_env_values = true,
        hide_default_value = true
    )]
    pub password: String,

    #[arg(long = "db-host", default_value = DEFAULT_HOST, env = "APP_DB_HOST")]
    pub host: String,

    #[arg(long = "db-port", default_value_t = DEFAULT_PORT, env = "APP_DB_PORT")]
    pub port: u16,

    /// Database name
    #[arg(long = "db-name", default_value = "postgres", env = "APP_DB_NAME")]
    pub name: String,

    /// search_path for new sessions
    #[arg(long = "db-schema", env = "APP_DB_SCHEMA")]
    pub schema: Option<String>,

    /// Connections kept open while idle
    #[arg(
        long = "db-max-idle-conns",
        default_value_t = DEFAULT_MAX_IDLE_CONNS,
        env = "APP_DB_MAX_IDLE_CONNS"
    )]
    pub max_idle_conns: u32,

    /// Upper bound on open connections (0 uses the pool default)
    #[arg(
        long = "db-max-open-conns",
        default_value_t = 0,
        env = "APP_DB_MAX_OPEN_CONNS"
    )]
    pub max_open_conns: u32,

    /// Idle connection timeout in seconds (0 disables it)
    #[arg(
        long = "db-idle-conn-timeout",
        default_value_t = 0,
        env = "APP_DB_IDLE_CONN_TIMEOUT"
    )]
    pub idle_conn_timeout: u64,

    /// Require TLS; needs all three certificate paths
    #[arg(long = "db-enable-tls", env = "APP_DB_ENABLE_TLS")]
    pub enable_tls: bool,

    #[arg(long = "db-ca-cert", value_name = "PATH", env = "APP_DB_CA_CERT")]
    pub ca_cert: Option<PathBuf>,

    #[arg(long = "db-client-cert", value_name = "PATH", env = "APP_DB_CLIENT_CERT")]
    pub client_cert: Option<PathBuf>,

    #[arg(long = "db-client-key", value_name = "PATH", env = "APP_DB_CLIENT_KEY")]
    pub client_key: Option<PathBuf>,

    #[arg(
        long = "db-application-name",
        default_value = DEFAULT_APPLICATION_NAME,
        env = "APP_DB_APPLICATION_NAME"
    )]
    pub application_name: String,
}

impl DbArgs {
    pub fn to_connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            user: self.user.clone(),
            password: self.password.clone(),
            host: self.host.clone(),
            port: self.port,
            name: self.name.clone(),
            schema: self.schema.clone().filter(|s| !s.is_empty()),
            max_idle_conns: self.max_idle_conns,
            max_open_conns: self.max_open_conns,
            idle_timeout: Duration::from_secs(self.idle_conn_timeout),
            enable_tls: self.enable_tls,
            ca_cert: self.ca_cert.clone(),
            client_cert: self.client_cert.clone(),
            client_key: self.client_key.clone(),
            application_name: self.application_name.clone(),
        }
    }
}

/// A statement plus its named arguments.
#[derive(Debug, Clone, clap::Args)]
pub struct StatementArgs {
    /// SQL with `:name` placeholders
    pub sql: String,

    /// Named argument, repeatable. Values that parse as JSON scalars keep
    /// their type; anything else is text.
    #[arg(long = "arg", value_name = "NAME=VALUE", value_parser = parse_named_arg)]
    pub args: Vec<(String, String)>,
}

impl StatementArgs {
    pub fn named_args(&self) -> Args {
        self.args
            .iter()
            .map(|(name, raw)| (name.clone(), parse_value(raw)))
            .collect()
    }
}

fn parse_named_arg(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{s}'")),
    }
}

fn parse_value(raw: &str) -> QueryParam {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) if !value.is_array() && !value.is_object() => QueryParam::from_json(&value),
        _ => QueryParam::String(raw.to_string()),
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Open the pool and run the status check
    Check,
    /// Run a query and print each row as a JSON line
    Query(StatementArgs),
    /// Run an insert, update or delete and print rows affected
    Exec(StatementArgs),
    /// Print the query with arguments substituted, without connecting
    Render(StatementArgs),
}

/// Configuration for dbsql.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dbsql",
    about = "PostgreSQL access layer - status checks, named queries and mutations",
    version,
    author
)]
pub struct Config {
    #[command(flatten)]
    pub db: DbArgs,

    /// Query timeout in seconds (0 disables it)
    #[arg(
        long,
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS,
        env = "APP_QUERY_TIMEOUT",
        global = true
    )]
    pub query_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "APP_LOG_LEVEL", global = true)]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "APP_JSON_LOGS", global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the query timeout, `None` when disabled.
    pub fn query_timeout_duration(&self) -> Option<Duration> {
        (self.query_timeout > 0).then(|| Duration::from_secs(self.query_timeout))
    }
}
