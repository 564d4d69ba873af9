//! MCP service implementation using rmcp.
//!
//! `IntrospectService` exposes the datasource, query and catalog tools over
//! MCP through the rmcp framework's macros. All tools share one
//! [`DatasourceManager`], so a `configure_datasource` call retargets every
//! tool that follows it.

use crate::db::DatasourceManager;
use crate::tools::database::{
    DatabaseToolHandler, GetDatabaseInfoOutput, SearchObjectsInput, SearchObjectsOutput,
};
use crate::tools::datasource::{
    ConfigureDatasourceInput, ConfigureDatasourceOutput, DatasourceToolHandler,
    DisconnectDatasourceOutput, GetCurrentDatasourceOutput, ListDriversOutput,
    TestConnectionInput, TestConnectionOutput,
};
use crate::tools::function::{
    FunctionCodeInput, FunctionToolHandler, ListFunctionsInput, ListFunctionsOutput,
};
use crate::tools::listing::DefinitionOutput;
use crate::tools::procedure::{
    ExecuteProcedureInput, ExecuteProcedureOutput, ListProceduresOutput, ListRoutinesInput,
    ProcedureCodeInput, ProcedureToolHandler,
};
use crate::tools::query::{ExecuteQueryInput, ExecuteQueryOutput, QueryToolHandler};
use crate::tools::table::{
    DescribeTableOutput, ListTableRowsInput, ListTableRowsOutput, ListTablesInput,
    ListTablesOutput, TableInput, TableSchemaOutput, TableToolHandler,
};
use crate::tools::trigger::{
    ListTriggersInput, ListTriggersOutput, TriggerCodeInput, TriggerToolHandler,
};
use crate::tools::view::{ListViewsOutput, ViewDefinitionInput, ViewToolHandler};
use rmcp::Json;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct IntrospectService {
    /// Active datasource shared by every tool
    manager: Arc<DatasourceManager>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl IntrospectService {
    pub fn new(manager: Arc<DatasourceManager>) -> Self {
        Self {
            manager,
            tool_router: Self::tool_router(),
        }
    }

    pub fn manager(&self) -> &Arc<DatasourceManager> {
        &self.manager
    }
}

#[tool_router]
impl IntrospectService {
    // =========================================================================
    // Datasource management
    // =========================================================================

    #[tool(
        description = "Connect to a database and make it the active datasource.\nReplaces any current connection. Drivers: sqlserver, postgres, mysql, sqlite, oracle.\nCall list_database_drivers for connection string formats."
    )]
    async fn configure_datasource(
        &self,
        Parameters(input): Parameters<ConfigureDatasourceInput>,
    ) -> Result<Json<ConfigureDatasourceOutput>, McpError> {
        let handler = DatasourceToolHandler::new(self.manager.clone());
        handler
            .configure_datasource(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Show the active datasource (driver, name, masked connection string, server version) and the connection history."
    )]
    async fn get_current_datasource(&self) -> Result<Json<GetCurrentDatasourceOutput>, McpError> {
        let handler = DatasourceToolHandler::new(self.manager.clone());
        handler
            .get_current_datasource(Default::default())
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Test a connection string without changing the active datasource.\nReports latency and server version, or the failure reason."
    )]
    async fn test_connection(
        &self,
        Parameters(input): Parameters<TestConnectionInput>,
    ) -> Result<Json<TestConnectionOutput>, McpError> {
        let handler = DatasourceToolHandler::new(self.manager.clone());
        handler
            .test_connection(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(description = "Close the active datasource.")]
    async fn disconnect_datasource(&self) -> Result<Json<DisconnectDatasourceOutput>, McpError> {
        let handler = DatasourceToolHandler::new(self.manager.clone());
        handler
            .disconnect_datasource(Default::default())
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "List supported database drivers with connection string formats and examples."
    )]
    async fn list_database_drivers(&self) -> Json<ListDriversOutput> {
        let handler = DatasourceToolHandler::new(self.manager.clone());
        Json(handler.list_database_drivers(Default::default()))
    }

    // =========================================================================
    // Query
    // =========================================================================

    #[tool(
        description = "Execute a read-only SELECT (or WITH ... SELECT) query.\nData-modifying statements, multiple statements and system procedures are rejected.\nOutput format: json (default), table, or markdown. Default limit 1000 rows, max 10000."
    )]
    async fn execute_query(
        &self,
        Parameters(input): Parameters<ExecuteQueryInput>,
    ) -> Result<Json<ExecuteQueryOutput>, McpError> {
        let handler = QueryToolHandler::new(self.manager.clone());
        handler
            .execute_query(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    // =========================================================================
    // Tables
    // =========================================================================

    #[tool(
        description = "List tables, optionally filtered by schema and name substring.\nPaginated: page (default 1), page_size (default 100, max 500)."
    )]
    async fn list_tables(
        &self,
        Parameters(input): Parameters<ListTablesInput>,
    ) -> Result<Json<ListTablesOutput>, McpError> {
        let handler = TableToolHandler::new(self.manager.clone());
        handler.list_tables(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(description = "Describe the columns of a table: type, length, nullability, default.")]
    async fn describe_table(
        &self,
        Parameters(input): Parameters<TableInput>,
    ) -> Result<Json<DescribeTableOutput>, McpError> {
        let handler = TableToolHandler::new(self.manager.clone());
        handler
            .describe_table(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Full table structure: columns, primary key, indexes and foreign keys."
    )]
    async fn get_table_schema_full(
        &self,
        Parameters(input): Parameters<TableInput>,
    ) -> Result<Json<TableSchemaOutput>, McpError> {
        let handler = TableToolHandler::new(self.manager.clone());
        handler
            .get_table_schema_full(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Browse table rows with column selection, filters and sorting.\nFilters: [{column, operator, value}] with operators eq, neq, gt, gte, lt, lte, contains, starts_with, ends_with, is_null, is_not_null.\nPaginated: page (default 1), page_size (default 50, max 1000)."
    )]
    async fn list_table_rows(
        &self,
        Parameters(input): Parameters<ListTableRowsInput>,
    ) -> Result<Json<ListTableRowsOutput>, McpError> {
        let handler = TableToolHandler::new(self.manager.clone());
        handler
            .list_table_rows(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    // =========================================================================
    // Routines
    // =========================================================================

    #[tool(description = "List stored procedures. Not available on SQLite.")]
    async fn list_procedures(
        &self,
        Parameters(input): Parameters<ListRoutinesInput>,
    ) -> Result<Json<ListProceduresOutput>, McpError> {
        let handler = ProcedureToolHandler::new(self.manager.clone());
        handler
            .list_procedures(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(description = "Get the source code of a stored procedure.")]
    async fn get_procedure_code(
        &self,
        Parameters(input): Parameters<ProcedureCodeInput>,
    ) -> Result<Json<DefinitionOutput>, McpError> {
        let handler = ProcedureToolHandler::new(self.manager.clone());
        handler
            .get_procedure_code(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Execute a stored procedure with named parameters and return its first result set."
    )]
    async fn execute_procedure(
        &self,
        Parameters(input): Parameters<ExecuteProcedureInput>,
    ) -> Result<Json<ExecuteProcedureOutput>, McpError> {
        let handler = ProcedureToolHandler::new(self.manager.clone());
        handler
            .execute_procedure(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "List user-defined functions. function_type: scalar, table or all (default)."
    )]
    async fn list_functions(
        &self,
        Parameters(input): Parameters<ListFunctionsInput>,
    ) -> Result<Json<ListFunctionsOutput>, McpError> {
        let handler = FunctionToolHandler::new(self.manager.clone());
        handler
            .list_functions(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(description = "Get the source code of a user-defined function.")]
    async fn get_function_code(
        &self,
        Parameters(input): Parameters<FunctionCodeInput>,
    ) -> Result<Json<DefinitionOutput>, McpError> {
        let handler = FunctionToolHandler::new(self.manager.clone());
        handler
            .get_function_code(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    // =========================================================================
    // Views and triggers
    // =========================================================================

    #[tool(description = "List views, optionally filtered by schema and name substring.")]
    async fn list_views(
        &self,
        Parameters(input): Parameters<ListRoutinesInput>,
    ) -> Result<Json<ListViewsOutput>, McpError> {
        let handler = ViewToolHandler::new(self.manager.clone());
        handler.list_views(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(description = "Get the SQL definition of a view.")]
    async fn get_view_definition(
        &self,
        Parameters(input): Parameters<ViewDefinitionInput>,
    ) -> Result<Json<DefinitionOutput>, McpError> {
        let handler = ViewToolHandler::new(self.manager.clone());
        handler
            .get_view_definition(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "List triggers, optionally for one table. Disabled triggers are included unless include_disabled is false."
    )]
    async fn list_triggers(
        &self,
        Parameters(input): Parameters<ListTriggersInput>,
    ) -> Result<Json<ListTriggersOutput>, McpError> {
        let handler = TriggerToolHandler::new(self.manager.clone());
        handler
            .list_triggers(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(description = "Get the source code of a trigger.")]
    async fn get_trigger_code(
        &self,
        Parameters(input): Parameters<TriggerCodeInput>,
    ) -> Result<Json<DefinitionOutput>, McpError> {
        let handler = TriggerToolHandler::new(self.manager.clone());
        handler
            .get_trigger_code(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    // =========================================================================
    // Database
    // =========================================================================

    #[tool(
        description = "Search database objects by name, and optionally inside procedure, function, view and trigger source.\nobject_types limits the search: table, view, procedure, function, trigger."
    )]
    async fn search_objects(
        &self,
        Parameters(input): Parameters<SearchObjectsInput>,
    ) -> Result<Json<SearchObjectsOutput>, McpError> {
        let handler = DatabaseToolHandler::new(self.manager.clone());
        handler
            .search_objects(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Database overview: driver, server version, database details, object counts and schemas."
    )]
    async fn get_database_info(&self) -> Result<Json<GetDatabaseInfoOutput>, McpError> {
        let handler = DatabaseToolHandler::new(self.manager.clone());
        handler
            .get_database_info(Default::default())
            .await
            .map(Json)
            .map_err(McpError::from)
    }
}

#[tool_handler]
impl ServerHandler for IntrospectService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "db-introspect-mcp".to_owned(),
                title: Some("Database Introspection MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Read-only database introspection for SQL Server, PostgreSQL, MySQL, Oracle and SQLite.\n\
                \n\
                ## Workflow\n\
                1. Call `list_database_drivers` for connection string formats\n\
                2. Call `configure_datasource` (or `test_connection` first) to connect\n\
                3. Explore with `get_database_info`, `list_tables`, `describe_table`, `search_objects`\n\
                4. Query with `execute_query` (SELECT / WITH only)\n\
                \n\
                ## Notes\n\
                - One datasource is active at a time; configuring another replaces it.\n\
                - Listings accept `page` and `page_size`; `list_table_rows` reports totals.\n\
                - SQLite has no stored procedures or user-defined functions; those tools report \"not supported\".\n\
                - Identifiers must be plain names (letters, digits, `_`, `$`, `#`)."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> IntrospectService {
        IntrospectService::new(Arc::new(DatasourceManager::default()))
    }

    #[test]
    fn test_server_info() {
        let service = create_test_service();
        let info = service.get_info();
        assert_eq!(info.server_info.name, "db-introspect-mcp");
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().contains("configure_datasource"));
    }

    #[test]
    fn test_all_tools_registered() {
        let service = create_test_service();
        let mut names: Vec<String> = service
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        assert_eq!(names.len(), 21);
        for expected in [
            "configure_datasource",
            "execute_query",
            "get_table_schema_full",
            "list_table_rows",
            "execute_procedure",
            "get_trigger_code",
            "search_objects",
            "get_database_info",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing tool {}", expected);
        }
    }

    #[tokio::test]
    async fn test_tools_share_datasource() {
        let service = create_test_service();
        let Err(err) = service.get_database_info().await else {
            panic!("get_database_info succeeded without a datasource");
        };
        assert!(err.message.contains("no database connection"));

        service
            .configure_datasource(Parameters(ConfigureDatasourceInput {
                driver: "sqlite".to_string(),
                connection_string: "sqlite::memory:".to_string(),
                name: Some("scratch".to_string()),
            }))
            .await
            .unwrap();

        let Json(info) = service.get_database_info().await.unwrap();
        assert_eq!(info.driver, "sqlite3");
        assert!(service.manager().is_connected().await);
    }
}
