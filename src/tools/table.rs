//! Table introspection tools.
//!
//! - `list_tables`: paginated table listing
//! - `describe_table`: column overview
//! - `get_table_schema_full`: columns, primary key, indexes and foreign keys
//! - `list_table_rows`: filtered, sorted, paginated table contents

use crate::builder::{RowFilter, SelectQueryParams, SortDirection};
use crate::db::{
    ActiveDatasource, ColumnInfo, ColumnRow, ColumnShape, DatasourceManager, ForeignKeyInfo,
    ForeignKeyRow, IndexInfo, IndexRow, PrimaryKeyRow, group_indexes,
};
use crate::error::{DbError, DbResult};
use crate::models::{PageInfo, PaginationParams, RowSet, resolve_schema};
use crate::tools::listing::{
    ListingFilter, cell_or_empty, display_name, listing_schema, name_filter, page_info,
    required_identifier,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{info, warn};

/// Input for the list_tables tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListTablesInput {
    /// Schema name (optional, all schemas when omitted)
    #[serde(default)]
    pub schema: Option<String>,
    /// Filter by table name substring (optional)
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
pub struct TableEntry {
    pub schema: String,
    pub name: String,
    /// BASE TABLE, VIEW, ...
    #[serde(rename = "type")]
    pub table_type: String,
}

/// Output from the list_tables tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListTablesOutput {
    pub tables: Vec<TableEntry>,
    pub count: usize,
    pub pagination: PageInfo,
    pub filter: ListingFilter,
}

/// Input for describe_table and get_table_schema_full.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TableInput {
    /// Table name
    pub table_name: String,
    /// Schema name (optional, driver default when omitted)
    #[serde(default)]
    pub schema: Option<String>,
}

/// Output from the describe_table tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DescribeTableOutput {
    pub schema: String,
    pub table: String,
    pub columns: Vec<ColumnInfo>,
}

/// Output from the get_table_schema_full tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct TableSchemaOutput {
    pub schema: String,
    pub table: String,
    pub columns: Vec<ColumnInfo>,
    /// Primary key columns in key order
    pub primary_key: Vec<String>,
    pub indexes: Vec<IndexInfo>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
}

/// Input for the list_table_rows tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListTableRowsInput {
    /// Table name
    pub table_name: String,
    /// Schema name (optional, driver default when omitted)
    #[serde(default)]
    pub schema: Option<String>,
    /// Columns to return (optional, all columns when omitted)
    #[serde(default)]
    pub columns: Vec<String>,
    /// Filters, AND-joined. Example: [{"column": "name", "operator": "contains", "value": "john"}]
    #[serde(default)]
    pub filters: Vec<RowFilter>,
    /// Column for sorting. Default: first column
    #[serde(default)]
    pub order_by: Option<String>,
    /// Sorting direction: ASC or DESC. Default: ASC
    #[serde(default)]
    pub order_direction: Option<String>,
    /// Page number. Default: 1
    #[serde(default)]
    pub page: Option<i64>,
    /// Items per page. Default: 50, max: 1000
    #[serde(default)]
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RowsTableInfo {
    pub schema: String,
    pub name: String,
    pub order_by: String,
    pub order_direction: String,
}

/// Output from the list_table_rows tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListTableRowsOutput {
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    pub columns: Vec<String>,
    pub pagination: PageInfo,
    pub table: RowsTableInfo,
}

/// Handler for table tools.
pub struct TableToolHandler {
    manager: Arc<DatasourceManager>,
}

impl TableToolHandler {
    pub fn new(manager: Arc<DatasourceManager>) -> Self {
        Self { manager }
    }

    pub async fn list_tables(&self, input: ListTablesInput) -> DbResult<ListTablesOutput> {
        let datasource = self.manager.current().await?;
        let schema = listing_schema(input.schema.as_deref())?;
        let name = name_filter(input.name_filter.as_deref());
        let page = PaginationParams::listing(input.page, input.page_size);

        let query = datasource.builder.list_tables(
            schema.as_deref(),
            name.as_deref(),
            page.page_size,
            page.offset,
        );
        let rows = self.manager.executor().fetch(&datasource.pool, &query).await?;

        let tables: Vec<TableEntry> = rows
            .rows
            .iter()
            .map(|row| TableEntry {
                schema: cell_or_empty(row, 0),
                name: cell_or_empty(row, 1),
                table_type: cell_or_empty(row, 2),
            })
            .collect();

        Ok(ListTablesOutput {
            count: tables.len(),
            pagination: page_info(page, &rows),
            tables,
            filter: ListingFilter {
                schema,
                name_filter: name,
                ..Default::default()
            },
        })
    }

    pub async fn describe_table(&self, input: TableInput) -> DbResult<DescribeTableOutput> {
        let datasource = self.manager.current().await?;
        let (schema, table) =
            table_target(&datasource, &input.table_name, input.schema.as_deref())?;

        let query = datasource.builder.describe_table(&schema, &table)?;
        let rows = self.manager.executor().fetch(&datasource.pool, &query).await?;
        let columns: Vec<ColumnInfo> =
            ColumnRow::decode_all(datasource.builder.driver(), ColumnShape::Describe, &rows)
                .iter()
                .map(ColumnRow::to_info)
                .collect();

        if columns.is_empty() {
            return Err(DbError::not_found("table", display_name(&schema, &table)));
        }

        Ok(DescribeTableOutput {
            schema,
            table,
            columns,
        })
    }

    pub async fn get_table_schema_full(&self, input: TableInput) -> DbResult<TableSchemaOutput> {
        let datasource = self.manager.current().await?;
        let (schema, table) =
            table_target(&datasource, &input.table_name, input.schema.as_deref())?;
        let driver = datasource.builder.driver();
        let executor = self.manager.executor();

        let query = datasource.builder.full_schema(&schema, &table)?;
        let rows = executor.fetch(&datasource.pool, &query).await?;
        let column_rows = ColumnRow::decode_all(driver, ColumnShape::Full, &rows);
        if column_rows.is_empty() {
            return Err(DbError::not_found("table", display_name(&schema, &table)));
        }

        // Constraint details are best-effort: a failing catalog query leaves
        // its section empty instead of failing the whole description.
        let query = datasource.builder.primary_key(&schema, &table)?;
        let primary_key = self
            .best_effort(&datasource, &query, "primary key")
            .await
            .map(|rows| {
                PrimaryKeyRow::decode_all(driver, &rows)
                    .iter()
                    .map(|pk| pk.column().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let query = datasource.builder.indexes(&schema, &table)?;
        let indexes = self
            .best_effort(&datasource, &query, "indexes")
            .await
            .map(|rows| group_indexes(&IndexRow::decode_all(driver, &rows)))
            .unwrap_or_default();

        let query = datasource.builder.foreign_keys(&schema, &table)?;
        let foreign_keys = self
            .best_effort(&datasource, &query, "foreign keys")
            .await
            .map(|rows| {
                ForeignKeyRow::decode_all(driver, &rows)
                    .iter()
                    .map(ForeignKeyRow::to_info)
                    .collect()
            })
            .unwrap_or_default();

        Ok(TableSchemaOutput {
            schema,
            table,
            columns: column_rows.iter().map(ColumnRow::to_info).collect(),
            primary_key,
            indexes,
            foreign_keys,
        })
    }

    pub async fn list_table_rows(
        &self,
        input: ListTableRowsInput,
    ) -> DbResult<ListTableRowsOutput> {
        let datasource = self.manager.current().await?;
        let (schema, table) =
            table_target(&datasource, &input.table_name, input.schema.as_deref())?;
        let builder = &datasource.builder;
        let executor = self.manager.executor();

        let query = builder.table_exists(&schema, &table)?;
        let exists = executor
            .fetch(&datasource.pool, &query)
            .await?
            .scalar_i64()
            .unwrap_or(0)
            > 0;
        if !exists {
            return Err(DbError::not_found("table", display_name(&schema, &table)));
        }

        let query = builder.columns(&schema, &table)?;
        let rows = executor.fetch(&datasource.pool, &query).await?;
        let table_columns: Vec<String> =
            ColumnRow::decode_all(builder.driver(), ColumnShape::Columns, &rows)
                .iter()
                .map(|c| c.name().to_string())
                .collect();
        if table_columns.is_empty() {
            return Err(DbError::schema(
                "no columns found",
                display_name(&schema, &table),
            ));
        }

        let selected = select_columns(&input.columns, &table_columns)?;
        let order_by = match input.order_by.as_deref().map(str::trim) {
            Some(requested) if !requested.is_empty() => {
                match_column(requested, &table_columns)?.to_string()
            }
            _ => table_columns[0].clone(),
        };
        let direction = SortDirection::parse(input.order_direction.as_deref());
        let filter = builder.where_clause(&input.filters, &table_columns)?;
        let page = PaginationParams::rows(input.page, input.page_size);

        let query = builder.count_rows(&schema, &table, Some(&filter))?;
        let total_count = executor
            .fetch(&datasource.pool, &query)
            .await?
            .scalar_i64()
            .unwrap_or(0)
            .max(0) as u64;

        let query = builder.select_rows(&SelectQueryParams {
            schema: schema.clone(),
            table: table.clone(),
            columns: selected,
            filter: Some(filter),
            order_by: Some(order_by.clone()),
            direction,
            limit: page.page_size,
            offset: page.offset,
        })?;
        let rows: RowSet = executor.fetch(&datasource.pool, &query).await?;

        info!(
            table = %display_name(&schema, &table),
            total_count,
            returned = rows.len(),
            "Listed table rows"
        );

        let columns = if rows.columns.is_empty() {
            table_columns
        } else {
            rows.columns.clone()
        };

        Ok(ListTableRowsOutput {
            rows: rows.into_maps(),
            columns,
            pagination: PageInfo::with_total(page, total_count),
            table: RowsTableInfo {
                schema,
                name: table,
                order_by,
                order_direction: direction.as_sql().to_string(),
            },
        })
    }

    async fn best_effort(
        &self,
        datasource: &ActiveDatasource,
        query: &crate::builder::BuiltQuery,
        section: &str,
    ) -> Option<RowSet> {
        match self.manager.executor().fetch(&datasource.pool, query).await {
            Ok(rows) => Some(rows),
            Err(e) => {
                warn!(section, error = %e, "Catalog query failed");
                None
            }
        }
    }
}

/// Validate the table name and resolve the schema against the driver default.
fn table_target(
    datasource: &ActiveDatasource,
    table_name: &str,
    schema: Option<&str>,
) -> DbResult<(String, String)> {
    let table = required_identifier("table", table_name)?;
    let schema = resolve_schema(schema, datasource.builder.default_schema())?;
    Ok((schema, table))
}

/// Case-insensitive match against the table's columns, returning its spelling.
fn match_column<'a>(requested: &str, columns: &'a [String]) -> DbResult<&'a str> {
    crate::models::validate_identifier("column", requested)?;
    columns
        .iter()
        .find(|c| c.eq_ignore_ascii_case(requested))
        .map(String::as_str)
        .ok_or_else(|| DbError::invalid_input(format!("column does not exist: {}", requested)))
}

/// Requested projection; empty selects every table column.
fn select_columns(requested: &[String], columns: &[String]) -> DbResult<Vec<String>> {
    if requested.is_empty() {
        return Ok(columns.to_vec());
    }
    requested
        .iter()
        .map(|c| match_column(c.trim(), columns).map(str::to_string))
        .collect()
}
