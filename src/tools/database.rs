//! Database-wide tools: object search and the server overview.

use crate::builder::BuiltQuery;
use crate::db::{ActiveDatasource, DatasourceManager};
use crate::error::{DbError, DbResult};
use crate::models::{RowSet, json_as_i64, json_as_string};
use crate::tools::listing::{cell, cell_flag, cell_or_empty};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Input for the search_objects tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct SearchObjectsInput {
    /// Text to look for in object names
    #[serde(default)]
    pub search_term: String,
    /// Also search procedure, function, view and trigger source. Default: false
    #[serde(default)]
    pub search_in_code: bool,
    /// Restrict to these object types (table, view, procedure, function, trigger)
    #[serde(default)]
    pub object_types: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SearchResult {
    pub schema: String,
    pub name: String,
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_altered: Option<String>,
    pub has_code: bool,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SearchSummary {
    pub term: String,
    pub in_code: bool,
    pub count: usize,
}

/// Output from the search_objects tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SearchObjectsOutput {
    pub results: Vec<SearchResult>,
    pub search: SearchSummary,
}

/// Input for the get_database_info tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct GetDatabaseInfoInput {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ObjectCounts {
    pub tables: i64,
    pub views: i64,
    pub procedures: i64,
    pub functions: i64,
    pub triggers: i64,
}

impl ObjectCounts {
    /// Counts are read by position: tables, views, procedures, functions, triggers.
    fn from_rows(rows: &RowSet) -> Option<Self> {
        let row = rows.rows.first()?;
        let at = |idx: usize| row.get(idx).and_then(json_as_i64).unwrap_or(0);
        Some(Self {
            tables: at(0),
            views: at(1),
            procedures: at(2),
            functions: at(3),
            triggers: at(4),
        })
    }
}

/// Output from the get_database_info tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct GetDatabaseInfoOutput {
    pub driver: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_counts: Option<ObjectCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schemas: Option<Vec<String>>,
}

/// Handler for database-wide tools.
pub struct DatabaseToolHandler {
    manager: Arc<DatasourceManager>,
}

impl DatabaseToolHandler {
    pub fn new(manager: Arc<DatasourceManager>) -> Self {
        Self { manager }
    }

    pub async fn search_objects(&self, input: SearchObjectsInput) -> DbResult<SearchObjectsOutput> {
        let datasource = self.manager.current().await?;
        let term = input.search_term.trim();
        if term.is_empty() {
            return Err(DbError::invalid_input("search_term is required"));
        }

        let object_types = input.object_types.unwrap_or_default();
        let query = datasource
            .builder
            .search_objects(term, input.search_in_code, &object_types);
        let rows = self.manager.executor().fetch(&datasource.pool, &query).await?;

        let results: Vec<SearchResult> = rows
            .rows
            .iter()
            .map(|row| SearchResult {
                schema: cell_or_empty(row, 0),
                name: cell_or_empty(row, 1),
                object_type: cell_or_empty(row, 2),
                created: cell(row, 3),
                last_altered: cell(row, 4),
                has_code: cell_flag(row, 5),
            })
            .collect();

        Ok(SearchObjectsOutput {
            search: SearchSummary {
                term: term.to_string(),
                in_code: input.search_in_code,
                count: results.len(),
            },
            results,
        })
    }

    pub async fn get_database_info(
        &self,
        _input: GetDatabaseInfoInput,
    ) -> DbResult<GetDatabaseInfoOutput> {
        let datasource = self.manager.current().await?;
        let builder = &datasource.builder;

        let version = self
            .optional_section(&datasource, "version", builder.version())
            .await
            .and_then(|rows| rows.scalar().and_then(json_as_string))
            .unwrap_or_else(|| "Unknown".to_string());

        let details = self
            .optional_section(&datasource, "details", builder.details())
            .await
            .and_then(|rows| rows.first_row_map());

        let object_counts = self
            .optional_section(&datasource, "object_counts", builder.object_counts())
            .await
            .and_then(|rows| ObjectCounts::from_rows(&rows));

        let schemas = self
            .optional_section(&datasource, "schemas", builder.list_schemas())
            .await
            .map(|rows| rows.first_column_strings());

        Ok(GetDatabaseInfoOutput {
            driver: builder.driver().as_str().to_string(),
            version,
            details,
            object_counts,
            schemas,
        })
    }

    /// Run one part of the overview; unsupported or failing parts are left out.
    async fn optional_section(
        &self,
        datasource: &ActiveDatasource,
        section: &str,
        query: Option<BuiltQuery>,
    ) -> Option<RowSet> {
        let query = query?;
        match self
            .manager
            .executor()
            .fetch_info(&datasource.pool, &query)
            .await
        {
            Ok(rows) => Some(rows),
            Err(e) => {
                warn!(section, error = %e, "Database info section unavailable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_counts_by_position() {
        let rows = RowSet {
            columns: vec!["TABLES".into(), "VIEWS".into(), "PROCEDURES".into()],
            rows: vec![vec![json!(12), json!("3"), serde_json::Value::Null, json!(1), json!(0)]],
            truncated: false,
        };
        let counts = ObjectCounts::from_rows(&rows).unwrap();
        assert_eq!(counts.tables, 12);
        assert_eq!(counts.views, 3);
        assert_eq!(counts.procedures, 0);
        assert_eq!(counts.functions, 1);
        assert_eq!(counts.triggers, 0);

        assert!(ObjectCounts::from_rows(&RowSet::default()).is_none());
    }

    #[tokio::test]
    async fn test_search_requires_term() {
        let manager = Arc::new(DatasourceManager::default());
        manager
            .configure(crate::dialect::DriverType::Sqlite, "sqlite::memory:", None)
            .await
            .unwrap();
        let handler = DatabaseToolHandler::new(manager);
        let err = handler
            .search_objects(SearchObjectsInput {
                search_term: "   ".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("search_term is required"));
    }
}
