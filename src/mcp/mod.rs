//! MCP server integration module.
//!
//! Connects the MCP protocol to the introspection tool handlers through the
//! rmcp framework.

pub mod service;

pub use service::IntrospectService;
