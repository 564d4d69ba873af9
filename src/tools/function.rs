//! User-defined function tools.

use crate::builder::FunctionType;
use crate::db::DatasourceManager;
use crate::dialect::DialectFeature;
use crate::error::{DbError, DbResult};
use crate::models::{PageInfo, PaginationParams, resolve_schema};
use crate::tools::listing::{
    DefinitionOutput, ListingFilter, cell, cell_or_empty, display_name, fetch_definition,
    listing_schema, name_filter, page_info, required_identifier,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const FEATURE: DialectFeature = DialectFeature::Functions;

/// Input for the list_functions tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListFunctionsInput {
    /// Schema name (optional, all schemas when omitted)
    #[serde(default)]
    pub schema: Option<String>,
    /// Function type: scalar, table or all. Default: all
    #[serde(default)]
    pub function_type: Option<String>,
    /// Filter by name substring (optional)
    #[serde(default)]
    pub name_filter: Option<String>,
    /// Page number. Default: 1
    #[serde(default)]
    pub page: Option<i64>,
    /// Items per page. Default: 100, max: 500
    #[serde(default)]
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FunctionEntry {
    pub schema: String,
    pub name: String,
    #[serde(rename = "type")]
    pub function_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_altered: Option<String>,
}

/// Output from the list_functions tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListFunctionsOutput {
    pub functions: Vec<FunctionEntry>,
    pub count: usize,
    pub pagination: PageInfo,
    pub filter: ListingFilter,
}

/// Input for the get_function_code tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FunctionCodeInput {
    /// Function name
    pub function_name: String,
    /// Schema name (optional, driver default when omitted)
    #[serde(default)]
    pub schema: Option<String>,
}

/// Handler for function tools.
pub struct FunctionToolHandler {
    manager: Arc<DatasourceManager>,
}

impl FunctionToolHandler {
    pub fn new(manager: Arc<DatasourceManager>) -> Self {
        Self { manager }
    }

    pub async fn list_functions(&self, input: ListFunctionsInput) -> DbResult<ListFunctionsOutput> {
        let datasource = self.manager.current().await?;
        let schema = listing_schema(input.schema.as_deref())?;
        let name = name_filter(input.name_filter.as_deref());
        let function_type = FunctionType::parse(input.function_type.as_deref());
        let page = PaginationParams::listing(input.page, input.page_size);

        let query = datasource
            .builder
            .list_functions(
                schema.as_deref(),
                name.as_deref(),
                function_type,
                page.page_size,
                page.offset,
            )
            .ok_or_else(|| DbError::not_supported(FEATURE.name()))?;
        let rows = self.manager.executor().fetch(&datasource.pool, &query).await?;

        let functions: Vec<FunctionEntry> = rows
            .rows
            .iter()
            .map(|row| FunctionEntry {
                schema: cell_or_empty(row, 0),
                name: cell_or_empty(row, 1),
                function_type: cell_or_empty(row, 2),
                created: cell(row, 3),
                last_altered: cell(row, 4),
            })
            .collect();

        Ok(ListFunctionsOutput {
            count: functions.len(),
            pagination: page_info(page, &rows),
            functions,
            filter: ListingFilter {
                schema,
                name_filter: name,
                function_type: Some(function_type.as_str().to_string()),
                ..Default::default()
            },
        })
    }

    pub async fn get_function_code(&self, input: FunctionCodeInput) -> DbResult<DefinitionOutput> {
        let datasource = self.manager.current().await?;
        let name = required_identifier("function", &input.function_name)?;
        let schema = resolve_schema(input.schema.as_deref(), datasource.builder.default_schema())?;

        let query = datasource
            .builder
            .function_code(&schema, &name)
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
