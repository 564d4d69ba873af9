//! Error types for the introspection server.
//!
//! All failures flow through [`DbError`], a `thiserror` enum whose variants
//! follow the server's error taxonomy: configuration problems, invalid input,
//! security rejections, engine capability gaps, and driver failures. Each
//! variant renders an actionable message for the calling assistant.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Schema error: {message} (object: {object})")]
    Schema { message: String, object: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("no database connection. Use configure_datasource to connect first")]
    NoDatasource,

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("{feature} are not supported by this database")]
    NotSupported { feature: String },

    /// Validator rejection. The triggering rule is logged, never returned.
    #[error("query not allowed")]
    QueryNotAllowed,

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("{kind} not found: {name}")]
    NotFound { kind: String, name: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    pub fn schema(message: impl Into<String>, object: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            object: object.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// `feature` is a plural noun phrase, e.g. "stored procedures".
    pub fn not_supported(feature: impl Into<String>) -> Self {
        Self::NotSupported {
            feature: feature.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Identifier failed the identifier grammar.
    pub fn invalid_identifier(kind: &str, value: &str) -> Self {
        Self::invalid_input(format!("invalid identifier: {} '{}'", kind, value))
    }

    /// A required call parameter was not supplied.
    pub fn missing_parameter(name: &str) -> Self {
        Self::invalid_input(format!("missing required parameter: {}", name))
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::NoDatasource => {
                Some("Call configure_datasource with a driver and connection string")
            }
            Self::NotSupported { .. } => Some("Check get_database_info for the active driver"),
            _ => None,
        }
    }

    /// Only transient driver conditions are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => DbError::database(
                "No rows returned",
                None,
                "Verify the object name and schema",
            ),
            sqlx::Error::PoolTimedOut => DbError::timeout("connection pool acquire", 30),
            sqlx::Error::PoolClosed => DbError::connection(
                "Connection pool is closed",
                "Call configure_datasource to reconnect",
            ),
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::TypeNotFound { type_name } => DbError::schema(
                format!("Type not found: {}", type_name),
                type_name.to_string(),
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::schema(format!("Column not found: {}", col), col.to_string())
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert DbError to MCP ErrorData for semantic error categorization.
/// Includes the suggestion field in the `data` object when available.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        let data = suggestion_data(err.suggestion());
        match &err {
            // Caller-correctable input, configuration and capability problems
            DbError::InvalidInput { .. }
            | DbError::Configuration { .. }
            | DbError::Schema { .. }
            | DbError::NotSupported { .. }
            | DbError::QueryNotAllowed => rmcp::ErrorData::invalid_params(err.to_string(), data),

            DbError::NoDatasource | DbError::NotFound { .. } => {
                rmcp::ErrorData::resource_not_found(err.to_string(), data)
            }

            // Database errors -> invalid_params with sql_state in message
            DbError::Database {
                message, sql_state, ..
            } => {
                let msg = match sql_state {
                    Some(code) => format!("{} (SQLSTATE: {})", message, code),
                    None => message.clone(),
                };
                rmcp::ErrorData::invalid_params(msg, data)
            }

            DbError::Timeout { .. } => rmcp::ErrorData::internal_error(
                err.to_string(),
                suggestion_data(Some(
                    "Narrow the query or raise the configured query timeout",
                )),
            ),

            DbError::Connection { .. } | DbError::Internal { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), data)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_error_suggestion() {
        let err = DbError::database(
            "Syntax error",
            Some("42601".to_string()),
            "Check SQL syntax",
        );
        assert_eq!(err.suggestion(), Some("Check SQL syntax"));
    }

    #[test]
    fn test_error_retryable() {
        assert!(DbError::timeout("query", 30).is_retryable());
        assert!(DbError::connection("err", "sugg").is_retryable());
        assert!(!DbError::QueryNotAllowed.is_retryable());
        assert!(!DbError::configuration("bad driver").is_retryable());
        assert!(!DbError::not_supported("stored procedures").is_retryable());
    }

    #[test]
    fn test_sentinel_messages() {
        assert_eq!(DbError::QueryNotAllowed.to_string(), "query not allowed");
        assert_eq!(
            DbError::NoDatasource.to_string(),
            "no database connection. Use configure_datasource to connect first"
        );
        assert_eq!(
            DbError::not_supported("stored procedures").to_string(),
            "stored procedures are not supported by this database"
        );
        assert!(
            DbError::missing_parameter("customer_id")
                .to_string()
                .contains("missing required parameter: customer_id")
        );
        assert!(
            DbError::invalid_identifier("table", "a b")
                .to_string()
                .contains("invalid identifier")
        );
    }

    // Tests for From<DbError> for rmcp::ErrorData

    #[test]
    fn test_invalid_input_maps_to_invalid_params() {
        let mcp_err: rmcp::ErrorData = DbError::invalid_input("bad input").into();
        // invalid_params uses -32602
        assert_eq!(mcp_err.code.0, -32602);
    }

    #[test]
    fn test_query_not_allowed_maps_to_invalid_params() {
        let mcp_err: rmcp::ErrorData = DbError::QueryNotAllowed.into();
        assert_eq!(mcp_err.code.0, -32602);
        assert_eq!(mcp_err.message, "query not allowed");
    }

    #[test]
    fn test_not_supported_maps_to_invalid_params() {
        let mcp_err: rmcp::ErrorData = DbError::not_supported("functions").into();
        assert_eq!(mcp_err.code.0, -32602);
    }

    #[test]
    fn test_configuration_maps_to_invalid_params() {
        let mcp_err: rmcp::ErrorData = DbError::configuration("invalid driver").into();
        assert_eq!(mcp_err.code.0, -32602);
    }

    #[test]
    fn test_no_datasource_maps_to_resource_not_found() {
        let mcp_err: rmcp::ErrorData = DbError::NoDatasource.into();
        // resource_not_found uses -32002 in rmcp
        assert_eq!(mcp_err.code.0, -32002);
        assert!(mcp_err.data.is_some());
    }

    #[test]
    fn test_not_found_maps_to_resource_not_found() {
        let mcp_err: rmcp::ErrorData = DbError::not_found("table", "users").into();
        assert_eq!(mcp_err.code.0, -32002);
    }

    #[test]
    fn test_connection_maps_to_internal_error() {
        let mcp_err: rmcp::ErrorData = DbError::connection("failed", "try again").into();
        // internal_error uses -32603
        assert_eq!(mcp_err.code.0, -32603);
    }

    #[test]
    fn test_timeout_maps_to_internal_error() {
        let mcp_err: rmcp::ErrorData = DbError::timeout("query", 30).into();
        assert_eq!(mcp_err.code.0, -32603);
    }

    #[test]
    fn test_database_error_includes_sql_state() {
        let err = DbError::database("syntax error", Some("42601".to_string()), "check syntax");
        let mcp_err: rmcp::ErrorData = err.into();
        assert!(mcp_err.message.contains("42601"));
        let data = mcp_err.data.unwrap();
        assert_eq!(data["suggestion"], "check syntax");
    }

    #[test]
    fn test_connection_error_includes_suggestion_in_data() {
        let err = DbError::connection("failed", "try reconnecting");
        let mcp_err: rmcp::ErrorData = err.into();
        let data = mcp_err.data.unwrap();
        assert_eq!(data["suggestion"], "try reconnecting");
    }
}
