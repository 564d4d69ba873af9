//! Data models for the introspection server.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod identifier;
pub mod pagination;
pub mod query;

// Re-export commonly used types
pub use connection::{
    ConnectionRecord, DEFAULT_DATASOURCE_NAME, DatasourceInfo, mask_connection_string,
};
pub use identifier::{MAX_IDENTIFIER_LEN, is_valid_identifier, resolve_schema, validate_identifier};
pub use pagination::{PageInfo, PaginationParams};
pub use query::{
    DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT, QueryParam, RowSet, json_as_bool, json_as_i64, json_as_string,
};
