//! Connection configuration.
//!
//! [`ConnectionConfig`] is the immutable value the bootstrap consumes. It knows
//! how to validate its TLS material and how to render itself as a PostgreSQL
//! connection URL; it never opens a connection.

use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_MAX_IDLE_CONNS: u32 = 2;
/// Used when `max_open_conns` is 0.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// SSL mode written into the connection target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslMode {
    Disable,
    Require,
}

impl SslMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disable => "disable",
            Self::Require => "require",
        }
    }
}

impl std::fmt::Display for SslMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a database connection pool.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub user: String,
    /// Contains sensitive data - never log
    #[serde(skip_serializing)]
    pub password: String,
    pub host: String,
    pub port: u16,
    /// Database name.
    pub name: String,
    /// Optional search_path for new sessions.
    pub schema: Option<String>,
    /// Connections kept open while idle.
    pub max_idle_conns: u32,
    /// Upper bound on open connections. 0 means [`DEFAULT_MAX_CONNECTIONS`].
    pub max_open_conns: u32,
    /// Idle connections above `max_idle_conns` are closed after this long.
    /// Zero disables the limit.
    #[serde(with = "duration_secs")]
    pub idle_timeout: Duration,
    pub enable_tls: bool,
    pub ca_cert: Option<PathBuf>,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
    /// Reported to the server as `application_name`.
    pub application_name: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            user: "postgres".to_string(),
            password: String::new(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            name: "postgres".to_string(),
            schema: None,
            max_idle_conns: DEFAULT_MAX_IDLE_CONNS,
            max_open_conns: 0,
            idle_timeout: Duration::ZERO,
            enable_tls: false,
            ca_cert: None,
            client_cert: None,
            client_key: None,
            application_name: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("user", &self.user)
            .field("password", &"****")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("max_idle_conns", &self.max_idle_conns)
            .field("max_open_conns", &self.max_open_conns)
            .field("idle_timeout", &self.idle_timeout)
            .field("enable_tls", &self.enable_tls)
            .field("ca_cert", &self.ca_cert)
            .field("client_cert", &self.client_cert)
            .field("client_key", &self.client_key)
            .field("application_name", &self.application_name)
            .finish()
    }
}

fn is_missing(path: &Option<PathBuf>) -> bool {
    path.as_deref()
        .is_none_or(|p: &Path| p.as_os_str().is_empty())
}

impl ConnectionConfig {
    /// Resolve the SSL mode, rejecting TLS without complete certificate material.
    pub fn ssl_mode(&self) -> DbResult<SslMode> {
        if !self.enable_tls {
            return Ok(SslMode::Disable);
        }

        let missing: Vec<&str> = [
            ("ca_cert", &self.ca_cert),
            ("client_cert", &self.client_cert),
            ("client_key", &self.client_key),
        ]
        .into_iter()
        .filter(|(_, path)| is_missing(path))
        .map(|(field, _)| field)
        .collect();

        if !missing.is_empty() {
            return Err(DbError::configuration(format!(
                "SSL certificates not properly configured (missing: {})",
                missing.join(", ")
            )));
        }

        Ok(SslMode::Require)
    }

    /// Upper bound on open connections handed to the pool.
    pub fn max_connections(&self) -> u32 {
        if self.max_open_conns == 0 {
            DEFAULT_MAX_CONNECTIONS
        } else {
            self.max_open_conns
        }
    }

    /// Connections the pool keeps open through idle periods.
    pub fn min_connections(&self) -> u32 {
        self.max_idle_conns.min(self.max_connections())
    }

    /// Idle timeout for the pool, `None` when disabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (!self.idle_timeout.is_zero()).then_some(self.idle_timeout)
    }

    /// Session options sent in the startup packet.
    fn session_options(&self) -> String {
        let mut options = String::from("-c TimeZone=UTC");
        if let Some(schema) = self.schema.as_deref().filter(|s| !s.is_empty()) {
            options.push_str(" -c search_path=");
            // libpq options escape spaces with a backslash
            options.push_str(&schema.replace('\\', "\\\\").replace(' ', "\\ "));
        }
        options
    }

    /// Build the connection target.
    ///
    /// Carries the SSL mode, UTC session time zone, application name, the
    /// optional search_path and, when TLS is on, the certificate paths.
    pub fn connection_url(&self) -> DbResult<Url> {
        let ssl_mode = self.ssl_mode()?;

        // bare IPv6 addresses need brackets in a URL authority
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        let mut url = Url::parse(&format!("postgres://{}:{}", host, self.port))
            .map_err(|e| DbError::configuration(format!("Invalid database host: {e}")))?;
        url.set_username(&self.user)
            .map_err(|_| DbError::configuration("Database user cannot be set on URL"))?;
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| DbError::configuration("Database password cannot be set on URL"))?;
        }
        url.set_path(&format!("/{}", self.name));

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("sslmode", ssl_mode.as_str());
            if !self.application_name.is_empty() {
                query.append_pair("application_name", &self.application_name);
            }
            if ssl_mode == SslMode::Require {
                for (key, path) in [
                    ("sslrootcert", &self.ca_cert),
                    ("sslcert", &self.client_cert),
                    ("sslkey", &self.client_key),
                ] {
                    if let Some(path) = path {
                        query.append_pair(key, &path.to_string_lossy());
                    }
                }
            }
            query.append_pair("options", &self.session_options());
        }

        Ok(url)
    }

    /// The connection URL with the password replaced, safe for logs.
    pub fn masked_url(&self) -> DbResult<String> {
        let mut url = self.connection_url()?;
        if url.password().is_some() {
            // Replacing an existing password cannot fail.
            let _ = url.set_password(Some("****"));
        }
        Ok(url.to_string())
    }

    /// Driver connect options parsed from [`connection_url`](Self::connection_url).
    pub fn connect_options(&self) -> DbResult<PgConnectOptions> {
        let url = self.connection_url()?;
        PgConnectOptions::from_str(url.as_str()).map_err(|e| {
            DbError::configuration(format!("Invalid PostgreSQL connection options: {e}"))
        })
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
