//! Configuration handling for the introspection server.
//!
//! Configuration comes from CLI arguments with environment variable fallbacks.

use crate::db::{PoolSettings, QueryExecutor};
use crate::dialect::DriverType;
use crate::error::DbResult;
use clap::Parser;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DRIVER: &str = "sqlserver";
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SHORT_QUERY_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_LOG_LEVEL: &str = "info";

// Pool configuration defaults
pub const DEFAULT_MAX_CONNECTIONS: u32 = 25;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

/// Server configuration parsed from CLI arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "db-introspect-mcp",
    about = "MCP server for database introspection - lets AI assistants explore SQL databases read-only",
    version,
    author
)]
pub struct Config {
    /// Driver of the startup datasource (sqlserver, postgres, mysql, oracle, sqlite)
    #[arg(long, default_value = DEFAULT_DRIVER, env = "DB_DRIVER")]
    pub driver: String,

    /// Connection string of the startup datasource.
    /// Without it the server starts disconnected; use configure_datasource.
    #[arg(long, value_name = "DSN", env = "DB_CONNECTION_STRING")]
    pub connection_string: Option<String>,

    /// Timeout in seconds for listings and query execution
    #[arg(
        long,
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS,
        env = "MCP_QUERY_TIMEOUT"
    )]
    pub query_timeout: u64,

    /// Timeout in seconds for database-info queries
    #[arg(
        long,
        default_value_t = DEFAULT_SHORT_QUERY_TIMEOUT_SECS,
        env = "MCP_SHORT_QUERY_TIMEOUT"
    )]
    pub short_query_timeout: u64,

    /// Timeout in seconds for connecting and the connection ping
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "MCP_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Maximum connections in the pool
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_CONNECTIONS,
        env = "MCP_MAX_CONNECTIONS"
    )]
    pub max_connections: u32,

    /// Seconds a pooled connection may stay idle
    #[arg(
        long,
        default_value_t = DEFAULT_IDLE_TIMEOUT_SECS,
        env = "MCP_IDLE_TIMEOUT"
    )]
    pub idle_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = DEFAULT_LOG_LEVEL, env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            driver: DEFAULT_DRIVER.to_string(),
            connection_string: None,
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            short_query_timeout: DEFAULT_SHORT_QUERY_TIMEOUT_SECS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            idle_timeout: DEFAULT_IDLE_TIMEOUT_SECS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            json_logs: false,
        }
    }

    /// Validate numeric settings and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_connections == 0 {
            return Err("max_connections must be greater than 0".to_string());
        }
        for (name, value) in [
            ("query_timeout", self.query_timeout),
            ("short_query_timeout", self.short_query_timeout),
            ("connect_timeout", self.connect_timeout),
        ] {
            if value == 0 {
                return Err(format!("{} must be greater than 0", name));
            }
        }
        Ok(())
    }

    /// Startup datasource, if one is configured.
    ///
    /// An unknown driver is an error even without a connection string.
    pub fn startup_datasource(&self) -> DbResult<Option<(DriverType, String)>> {
        let driver = DriverType::from_str(&self.driver)?;
        Ok(self
            .connection_string
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| (driver, s.to_string())))
    }

    /// Get the query timeout as a Duration.
    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    /// Get the database-info query timeout as a Duration.
    pub fn short_query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.short_query_timeout)
    }

    /// Get the connection timeout as a Duration.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Get the idle timeout as a Duration.
    pub fn idle_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.idle_timeout)
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.max_connections,
            idle_timeout: self.idle_timeout_duration(),
            connect_timeout: self.connect_timeout_duration(),
        }
    }

    pub fn executor(&self) -> QueryExecutor {
        QueryExecutor::with_timeouts(
            self.query_timeout_duration(),
            self.short_query_timeout_duration(),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
