//! Stored procedure tools.
//!
//! - `list_procedures`: paginated procedure listing
//! - `get_procedure_code`: procedure source text
//! - `execute_procedure`: invoke a procedure with named parameters
//!
//! Engines without stored procedures (SQLite) answer "not supported".

use crate::builder::ProcedureParameter;
use crate::db::{ActiveDatasource, DatasourceManager};
use crate::dialect::DialectFeature;
use crate::error::{DbError, DbResult};
use crate::models::{PageInfo, PaginationParams, resolve_schema};
use crate::tools::listing::{
    DefinitionOutput, ListingFilter, cell, cell_flag, cell_or_empty, display_name,
    fetch_definition, listing_schema, name_filter, page_info, required_identifier,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

const FEATURE: DialectFeature = DialectFeature::StoredProcedures;

/// Input shared by the routine, view and trigger listings.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListRoutinesInput {
    /// Schema name (optional, all schemas when omitted)
    #[serde(default)]
    pub schema: Option<String>,
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
pub struct ProcedureEntry {
    pub schema: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_altered: Option<String>,
}

/// Output from the list_procedures tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListProceduresOutput {
    pub procedures: Vec<ProcedureEntry>,
    pub count: usize,
    pub pagination: PageInfo,
    pub filter: ListingFilter,
}

/// Input for the get_procedure_code tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ProcedureCodeInput {
    /// Procedure name
    pub procedure_name: String,
    /// Schema name (optional, driver default when omitted)
    #[serde(default)]
    pub schema: Option<String>,
}

/// Input for the execute_procedure tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExecuteProcedureInput {
    /// Procedure name
    pub procedure_name: String,
    /// Schema name (optional, driver default when omitted)
    #[serde(default)]
    pub schema: Option<String>,
    /// Named parameters, e.g. {"CustomerId": 42}. A leading @ is optional.
    #[serde(default)]
    pub parameters: BTreeMap<String, JsonValue>,
}

/// Output from the execute_procedure tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ExecuteProcedureOutput {
    pub status: String,
    pub procedure: String,
    pub schema: String,
    /// Rows of the first result set, if the procedure returned one
    pub results: Vec<serde_json::Map<String, JsonValue>>,
    pub row_count: usize,
    pub truncated: bool,
}

/// Handler for stored procedure tools.
pub struct ProcedureToolHandler {
    manager: Arc<DatasourceManager>,
}

impl ProcedureToolHandler {
    pub fn new(manager: Arc<DatasourceManager>) -> Self {
        Self { manager }
    }

    pub async fn list_procedures(
        &self,
        input: ListRoutinesInput,
    ) -> DbResult<ListProceduresOutput> {
        let datasource = self.manager.current().await?;
        let schema = listing_schema(input.schema.as_deref())?;
        let name = name_filter(input.name_filter.as_deref());
        let page = PaginationParams::listing(input.page, input.page_size);

        let query = datasource
            .builder
            .list_procedures(schema.as_deref(), name.as_deref(), page.page_size, page.offset)
            .ok_or_else(|| DbError::not_supported(FEATURE.name()))?;
        let rows = self.manager.executor().fetch(&datasource.pool, &query).await?;

        let procedures: Vec<ProcedureEntry> = rows
            .rows
            .iter()
            .map(|row| ProcedureEntry {
                schema: cell_or_empty(row, 0),
                name: cell_or_empty(row, 1),
                created: cell(row, 2),
                last_altered: cell(row, 3),
            })
            .collect();

        Ok(ListProceduresOutput {
            count: procedures.len(),
            pagination: page_info(page, &rows),
            procedures,
            filter: ListingFilter {
                schema,
                name_filter: name,
                ..Default::default()
            },
        })
    }

    pub async fn get_procedure_code(
        &self,
        input: ProcedureCodeInput,
    ) -> DbResult<DefinitionOutput> {
        let datasource = self.manager.current().await?;
        let name = required_identifier("procedure", &input.procedure_name)?;
        let schema = resolve_schema(input.schema.as_deref(), datasource.builder.default_schema())?;

        let query = datasource
            .builder
            .procedure_code(&schema, &name)
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

    pub async fn execute_procedure(
        &self,
        input: ExecuteProcedureInput,
    ) -> DbResult<ExecuteProcedureOutput> {
        let datasource = self.manager.current().await?;
        if !datasource.builder.supports(DialectFeature::StoredProcedures) {
            return Err(DbError::not_supported(FEATURE.name()));
        }
        let name = required_identifier("procedure", &input.procedure_name)?;
        let schema = resolve_schema(input.schema.as_deref(), datasource.builder.default_schema())?;

        let declared = self.declared_parameters(&datasource, &schema, &name).await?;
        let query =
            datasource
                .builder
                .procedure_call(&schema, &name, &declared, &input.parameters)?;

        let rows = self.manager.executor().fetch(&datasource.pool, &query).await?;

        info!(
            procedure = %display_name(&schema, &name),
            args = query.args.len(),
            row_count = rows.len(),
            "Procedure executed"
        );

        let truncated = rows.truncated;
        let results = rows.into_maps();
        Ok(ExecuteProcedureOutput {
            status: "success".to_string(),
            procedure: name,
            schema,
            row_count: results.len(),
            results,
            truncated,
        })
    }

    /// Parameters declared in the catalog, where the engine exposes them.
    async fn declared_parameters(
        &self,
        datasource: &ActiveDatasource,
        schema: &str,
        name: &str,
    ) -> DbResult<Vec<ProcedureParameter>> {
        let Some(query) = datasource.builder.procedure_parameters(schema, name) else {
            return Ok(Vec::new());
        };
        let rows = self.manager.executor().fetch(&datasource.pool, &query).await?;
        let declared: Vec<ProcedureParameter> = rows
            .rows
            .iter()
            .filter_map(|row| {
                let name = cell(row, 0).filter(|n| !n.is_empty())?;
                Some(ProcedureParameter {
                    name,
                    is_output: cell_flag(row, 1),
                })
            })
            .collect();
        debug!(count = declared.len(), "Discovered procedure parameters");
        Ok(declared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_execute_input_parameters() {
        let input: ExecuteProcedureInput = serde_json::from_value(json!({
            "procedure_name": "usp_GetOrders",
            "parameters": {"@CustomerId": 42, "Since": "2024-01-01"}
        }))
        .unwrap();
        assert_eq!(input.parameters.len(), 2);
        assert_eq!(input.parameters["@CustomerId"], json!(42));
        assert!(input.schema.is_none());

        let input: ExecuteProcedureInput =
            serde_json::from_value(json!({"procedure_name": "refresh"})).unwrap();
        assert!(input.parameters.is_empty());
    }

    #[tokio::test]
    async fn test_requires_datasource() {
        let handler = ProcedureToolHandler::new(Arc::new(DatasourceManager::default()));
        let err = handler
            .list_procedures(ListRoutinesInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NoDatasource));
    }
}
