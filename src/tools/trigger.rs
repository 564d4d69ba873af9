//! Trigger tools.

use crate::db::DatasourceManager;
use crate::dialect::DialectFeature;
use crate::error::{DbError, DbResult};
use crate::models::{PageInfo, PaginationParams, resolve_schema};
use crate::tools::listing::{
    DefinitionOutput, ListingFilter, cell, cell_flag, cell_or_empty, display_name,
    fetch_definition, listing_schema, name_filter, optional_identifier, page_info,
    required_identifier,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const FEATURE: DialectFeature = DialectFeature::Triggers;

fn default_include_disabled() -> bool {
    true
}

/// Input for the list_triggers tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListTriggersInput {
    /// Schema name (optional, all schemas when omitted)
    #[serde(default)]
    pub schema: Option<String>,
    /// Only triggers defined on this table (optional)
    #[serde(default)]
    pub table_name: Option<String>,
    /// Filter by trigger name substring (optional)
    #[serde(default)]
    pub name_filter: Option<String>,
    /// Include disabled triggers. Default: true
    #[serde(default = "default_include_disabled")]
    pub include_disabled: bool,
    /// Page number. Default: 1
    #[serde(default)]
    pub page: Option<i64>,
    /// Items per page. Default: 100, max: 500
    #[serde(default)]
    pub page_size: Option<i64>,
}

impl Default for ListTriggersInput {
    fn default() -> Self {
        Self {
            schema: None,
            table_name: None,
            name_filter: None,
            include_disabled: default_include_disabled(),
            page: None,
            page_size: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct TriggerEntry {
    pub schema: String,
    pub name: String,
    pub table: String,
    pub is_disabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_altered: Option<String>,
}

/// Output from the list_triggers tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListTriggersOutput {
    pub triggers: Vec<TriggerEntry>,
    pub count: usize,
    pub pagination: PageInfo,
    pub filter: ListingFilter,
}

/// Input for the get_trigger_code tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TriggerCodeInput {
    /// Trigger name
    pub trigger_name: String,
    /// Schema name (optional, driver default when omitted)
    #[serde(default)]
    pub schema: Option<String>,
}

/// Handler for trigger tools.
pub struct TriggerToolHandler {
    manager: Arc<DatasourceManager>,
}

impl TriggerToolHandler {
    pub fn new(manager: Arc<DatasourceManager>) -> Self {
        Self { manager }
    }

    pub async fn list_triggers(&self, input: ListTriggersInput) -> DbResult<ListTriggersOutput> {
        let datasource = self.manager.current().await?;
        let schema = listing_schema(input.schema.as_deref())?;
        let table = optional_identifier("table", input.table_name.as_deref())?;
        let name = name_filter(input.name_filter.as_deref());
        let page = PaginationParams::listing(input.page, input.page_size);

        let query = datasource
            .builder
            .list_triggers(
                schema.as_deref(),
                table.as_deref(),
                name.as_deref(),
                input.include_disabled,
                page.page_size,
                page.offset,
            )
            .ok_or_else(|| DbError::not_supported(FEATURE.name()))?;
        let rows = self.manager.executor().fetch(&datasource.pool, &query).await?;

        let triggers: Vec<TriggerEntry> = rows
            .rows
            .iter()
            .map(|row| TriggerEntry {
                schema: cell_or_empty(row, 0),
                name: cell_or_empty(row, 1),
                table: cell_or_empty(row, 2),
                is_disabled: cell_flag(row, 3),
                created: cell(row, 4),
                last_altered: cell(row, 5),
            })
            .collect();

        Ok(ListTriggersOutput {
            count: triggers.len(),
            pagination: page_info(page, &rows),
            triggers,
            filter: ListingFilter {
                schema,
                table_name: table,
                name_filter: name,
                ..Default::default()
            },
        })
    }

    pub async fn get_trigger_code(&self, input: TriggerCodeInput) -> DbResult<DefinitionOutput> {
        let datasource = self.manager.current().await?;
        let name = required_identifier("trigger", &input.trigger_name)?;
        let schema = resolve_schema(input.schema.as_deref(), datasource.builder.default_schema())?;

        let query = datasource
            .builder
            .trigger_code(&schema, &name)
            .ok_or_else(|| DbError::not_supported(FEATURE.name()))?;
        let definition = fetch_definition(
            &datasource,
            self.manager.executor(),
            &query,
            "source code",
            &display_name(&schema, &name),
        )
        .await?;

        Ok(DefinitionOutput {
            schema,
            name,
            definition,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_include_disabled_defaults_to_true() {
        let input: ListTriggersInput = serde_json::from_value(json!({})).unwrap();
        assert!(input.include_disabled);
        assert!(ListTriggersInput::default().include_disabled);

        let input: ListTriggersInput =
            serde_json::from_value(json!({"include_disabled": false, "table_name": "orders"}))
                .unwrap();
        assert!(!input.include_disabled);
        assert_eq!(input.table_name.as_deref(), Some("orders"));
    }
}
