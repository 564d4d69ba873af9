//! Free-form query tool.
//!
//! `execute_query` runs caller-written SQL after the [`SqlValidator`] gate.
//! Anything other than a single read-only SELECT or WITH statement is
//! refused with a generic "query not allowed"; the specific rule is logged.
//!
//! [`SqlValidator`]: crate::tools::sql_validator::SqlValidator

use crate::db::DatasourceManager;
use crate::error::DbResult;
use crate::models::{DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT, RowSet};
use crate::tools::format::{OutputFormat, format_as_markdown, format_as_table};
use crate::tools::sql_validator;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Input for the execute_query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExecuteQueryInput {
    /// SQL query to execute. Only a single SELECT or WITH statement is allowed.
    pub query: String,
    /// Maximum rows to return. Default: 1000, max: 10000
    #[serde(default)]
    pub limit: Option<u32>,
    /// Output format: "json" returns structured data, "table" returns ASCII table, "markdown" returns markdown table
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output from the execute_query tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ExecuteQueryOutput {
    /// Column names in result order
    pub columns: Vec<String>,
    /// Result rows as key-value maps. Empty if format is table/markdown.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    /// Pre-formatted output when format is table or markdown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    /// Number of rows returned
    pub row_count: usize,
    /// True if more rows were available than the limit allowed
    pub truncated: bool,
    /// Row limit that was applied
    pub max_rows: u32,
    /// Query execution time in milliseconds
    pub execution_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ExecuteQueryOutput {
    fn from_rows(
        rows: RowSet,
        format: OutputFormat,
        max_rows: u32,
        execution_time_ms: u64,
        warning: Option<String>,
    ) -> Self {
        let row_count = rows.len();
        let truncated = rows.truncated;
        let formatted = match format {
            OutputFormat::Json => None,
            OutputFormat::Table => Some(format_as_table(&rows, execution_time_ms)),
            OutputFormat::Markdown => Some(format_as_markdown(&rows)),
        };
        let columns = rows.columns.clone();
        let rows = if formatted.is_some() {
            Vec::new()
        } else {
            rows.into_maps()
        };

        Self {
            columns,
            rows,
            formatted,
            row_count,
            truncated,
            max_rows,
            execution_time_ms,
            warning,
        }
    }
}

/// Handler for the execute_query tool.
pub struct QueryToolHandler {
    manager: Arc<DatasourceManager>,
}

impl QueryToolHandler {
    pub fn new(manager: Arc<DatasourceManager>) -> Self {
        Self { manager }
    }

    pub async fn execute_query(&self, input: ExecuteQueryInput) -> DbResult<ExecuteQueryOutput> {
        let datasource = self.manager.current().await?;

        sql_validator::validate_readonly(&input.query)?;

        let limit_warning = match input.limit {
            Some(requested) if requested > MAX_ROW_LIMIT => Some(format!(
                "Requested limit {} exceeds maximum allowed ({}). Results capped to {} rows.",
                requested, MAX_ROW_LIMIT, MAX_ROW_LIMIT
            )),
            _ => None,
        };
        let max_rows = input
            .limit
            .unwrap_or(DEFAULT_ROW_LIMIT)
            .clamp(1, MAX_ROW_LIMIT);

        let executor = self.manager.executor();
        let start = Instant::now();
        let rows = executor
            .fetch_with(
                &datasource.pool,
                input.query.trim(),
                &[],
                max_rows,
                executor.query_timeout(),
            )
            .await?;
        let execution_time_ms = start.elapsed().as_millis() as u64;

        info!(
            connection_id = %datasource.record.id,
            row_count = rows.len(),
            truncated = rows.truncated,
            execution_time_ms,
            "Query executed"
        );

        Ok(ExecuteQueryOutput::from_rows(
            rows,
            input.format,
            max_rows,
            execution_time_ms,
            limit_warning,
        ))
    }
}
