//! Database Introspection MCP Server - Main entry point.
//!
//! Serves MCP tools over stdio that let AI assistants explore SQL Server,
//! PostgreSQL, MySQL, Oracle and SQLite databases read-only.

use db_introspect_mcp::config::Config;
use db_introspect_mcp::db::DatasourceManager;
use db_introspect_mcp::transport::{StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs are written to stderr; stdout carries the MCP protocol.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

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

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse_args();

    init_tracing(&config);

    if let Err(message) = config.validate() {
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }

    info!(
        query_timeout = config.query_timeout,
        max_connections = config.max_connections,
        "Starting db-introspect-mcp v{}",
        env!("CARGO_PKG_VERSION")
    );

    let manager = Arc::new(DatasourceManager::new(
        config.pool_settings(),
        config.executor(),
    ));

    // Startup datasource is optional; a failed connect leaves the server
    // running disconnected.
    match config.startup_datasource() {
        Ok(Some((driver, connection_string))) => {
            if let Err(e) = manager.configure(driver, &connection_string, None).await {
                warn!(driver = %driver, error = %e, "Startup datasource unavailable");
            }
        }
        Ok(None) => {
            info!("No startup datasource; waiting for configure_datasource");
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    let transport = StdioTransport::new(manager);
    info!(transport = transport.name(), "Serving MCP");

    if let Err(e) = transport.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
