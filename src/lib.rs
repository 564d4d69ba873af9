//! Database Introspection MCP Server Library
//!
//! MCP (Model Context Protocol) tools that let AI assistants explore SQL
//! Server, PostgreSQL, MySQL, Oracle and SQLite databases read-only. The
//! [`dialect`] and [`builder`] modules generate engine-specific catalog SQL;
//! [`db`] runs it against the active datasource.

pub mod builder;
pub mod config;
pub mod db;
pub mod dialect;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use builder::QueryBuilder;
pub use config::Config;
pub use dialect::DriverType;
pub use error::DbError;
pub use mcp::IntrospectService;
