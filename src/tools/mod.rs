//! MCP tool implementations.
//!
//! This module contains all database tool handlers:
//! - `datasource`: configure, inspect, test and drop the active datasource
//! - `query`: Execute validated read-only queries
//! - `table`: Table listing, structure and paged row browsing
//! - `procedure` / `function`: Routine listings, source and procedure calls
//! - `view` / `trigger`: View definitions and trigger source
//! - `database`: Object search and server overview
//! - `sql_validator`: SQL statement validation for read-only enforcement

pub mod database;
pub mod datasource;
pub mod format;
pub mod function;
pub(crate) mod listing;
pub mod procedure;
pub mod query;
pub mod sql_validator;
pub mod table;
pub mod trigger;
pub mod view;

pub use database::{
    DatabaseToolHandler, GetDatabaseInfoInput, GetDatabaseInfoOutput, SearchObjectsInput,
    SearchObjectsOutput,
};
pub use datasource::{
    ConfigureDatasourceInput, ConfigureDatasourceOutput, DatasourceToolHandler,
    DisconnectDatasourceInput, DisconnectDatasourceOutput, GetCurrentDatasourceInput,
    GetCurrentDatasourceOutput, ListDriversInput, ListDriversOutput, TestConnectionInput,
    TestConnectionOutput,
};
pub use format::OutputFormat;
pub use function::{FunctionCodeInput, FunctionToolHandler, ListFunctionsInput, ListFunctionsOutput};
pub use listing::{DefinitionOutput, ListingFilter};
pub use procedure::{
    ExecuteProcedureInput, ExecuteProcedureOutput, ListProceduresOutput, ListRoutinesInput,
    ProcedureCodeInput, ProcedureToolHandler,
};
pub use query::{ExecuteQueryInput, ExecuteQueryOutput, QueryToolHandler};
pub use sql_validator::validate_readonly;
pub use table::{
    DescribeTableOutput, ListTableRowsInput, ListTableRowsOutput, ListTablesInput,
    ListTablesOutput, TableInput, TableSchemaOutput, TableToolHandler,
};
pub use trigger::{ListTriggersInput, ListTriggersOutput, TriggerCodeInput, TriggerToolHandler};
pub use view::{ListViewsOutput, ViewDefinitionInput, ViewToolHandler};
