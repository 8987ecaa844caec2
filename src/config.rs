//! Client configuration.
//!
//! This module contains:
//! - `ClientConfig` - Connection parameters and pool bounds, set once at
//!   construction and immutable for the client's lifetime
//! - `RowShape` - How result rows are materialized for the caller
//! - `SslMode` - TLS negotiation options
//! - `AcquireOptions` - Bounded retry policy for pool acquisition

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default schema placed on the connection's search path.
const DEFAULT_SCHEMA: &str = "public";

/// How result rows are handed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RowShape {
    /// Positional values, one `Vec<Value>` per row.
    #[default]
    Tuple,
    /// Ordered (column name, value) pairs per row.
    Record,
    /// Name-keyed map per row. Duplicate column names collapse to the last.
    Map,
}

/// SSL mode options for the server connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    /// No SSL connection
    Disable,
    /// Try SSL first, fall back to non-SSL
    #[default]
    Prefer,
    /// Require SSL, don't verify certificates
    Require,
    /// Require SSL and verify server certificate
    VerifyCa,
    /// Require SSL, verify certificate and hostname
    VerifyFull,
}

/// Retry policy for acquiring a connection from the pool.
///
/// Each attempt waits up to `attempt_timeout`; a timed-out attempt is retried
/// with exponential backoff until `max_retries` is exhausted, after which the
/// acquire fails with [`Error::AcquireTimeout`](crate::Error::AcquireTimeout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquireOptions {
    /// Upper bound on a single acquire attempt.
    pub attempt_timeout: Duration,
    /// Number of retries after the first attempt.
    pub max_retries: u32,
    /// Backoff before the first retry; doubles per retry.
    pub initial_backoff: Duration,
    /// Ceiling for the backoff between retries.
    pub max_backoff: Duration,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(5),
            max_retries: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl AcquireOptions {
    /// Backoff to sleep before the retry with the given 1-based index.
    pub(crate) fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Connection parameters and pool bounds for a [`Client`](crate::Client).
///
/// # Example
///
/// ```
/// use pgkit::{ClientConfig, RowShape};
///
/// let config = ClientConfig::new("appdb", "app_user", "secret")
///     .with_host("db.internal")
///     .with_port(5433)
///     .with_schema("reporting")
///     .with_pool_size(2, 10)
///     .with_row_shape(RowShape::Map);
///
/// assert_eq!(config.port, 5433);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Database name to connect to
    pub database: String,
    /// Username for authentication
    pub username: String,
    /// Password for authentication
    #[serde(skip_serializing, default)]
    pub password: String,
    /// Schema placed on the connection's search path
    pub schema: String,
    /// Server hostname or IP address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Minimum number of idle connections kept by the pool
    pub min_connections: u32,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// SSL mode for the connection
    #[serde(default)]
    pub ssl_mode: SslMode,
    /// How result rows are materialized by [`Client::shape`](crate::Client::shape)
    #[serde(default)]
    pub row_shape: RowShape,
    /// Pool acquisition retry policy
    #[serde(default)]
    pub acquire: AcquireOptions,
}

impl ClientConfig {
    /// Create a configuration with the standard defaults: `public` schema,
    /// localhost:5432, pool of 1..=20 connections.
    pub fn new(
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            username: username.into(),
            password: password.into(),
            schema: DEFAULT_SCHEMA.to_string(),
            host: "127.0.0.1".to_string(),
            port: 5432,
            min_connections: 1,
            max_connections: 20,
            ssl_mode: SslMode::default(),
            row_shape: RowShape::default(),
            acquire: AcquireOptions::default(),
        }
    }

    /// Set the server hostname.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the server port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the schema placed on the search path.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Set the pool bounds.
    pub fn with_pool_size(mut self, min: u32, max: u32) -> Self {
        self.min_connections = min;
        self.max_connections = max;
        self
    }

    /// Set the SSL mode.
    pub fn with_ssl_mode(mut self, ssl_mode: SslMode) -> Self {
        self.ssl_mode = ssl_mode;
        self
    }

    /// Set the result-row shape.
    pub fn with_row_shape(mut self, row_shape: RowShape) -> Self {
        self.row_shape = row_shape;
        self
    }

    /// Set the pool acquisition retry policy.
    pub fn with_acquire(mut self, acquire: AcquireOptions) -> Self {
        self.acquire = acquire;
        self
    }

    /// Validate the configuration before the pool is created.
    pub fn validate(&self) -> Result<(), String> {
        if self.database.is_empty() {
            return Err("database name must not be empty".to_string());
        }
        if self.username.is_empty() {
            return Err("username must not be empty".to_string());
        }
        if self.max_connections == 0 {
            return Err("max_connections must be at least 1".to_string());
        }
        if self.min_connections > self.max_connections {
            return Err(format!(
                "min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            ));
        }
        Ok(())
    }

    /// Human-readable connection target, `user@host:port/database`.
    pub fn display_name(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.username, self.host, self.port, self.database
        )
    }
}
