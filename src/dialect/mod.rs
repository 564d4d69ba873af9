//! SQL dialects for the supported database engines.
//!
//! Every engine gets one stateless implementation of [`Dialect`]. A dialect
//! produces SQL fragments (placeholders, quoted identifiers, pagination) and
//! the catalog templates used to introspect tables, routines, views, triggers
//! and database-level information.
//!
//! # Template conventions
//!
//! - Filter fragments contain a [`PARAM_SLOT`] where the query builder puts the
//!   placeholder for the next positional argument.
//! - SQLite per-table templates are `PRAGMA` statements with a [`TABLE_SLOT`]
//!   that receives the quoted table name.
//! - [`LIKE_SLOT`], [`SYSTEM_SCHEMAS_SLOT`] and [`DATABASE_SLOT`] are filled
//!   from the dialect by [`render_template`].
//! - An empty template means the engine has no such query.

mod mysql;
mod oracle;
mod postgres;
mod sqlite;
mod sqlserver;

pub use mysql::MySqlDialect;
pub use oracle::OracleDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;
pub use sqlserver::SqlServerDialect;

use crate::error::DbError;
use crate::models::{QueryParam, RowSet, json_as_string};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Slot in filter fragments replaced by the next placeholder.
pub const PARAM_SLOT: &str = "{p}";

/// Slot in SQLite pragma templates replaced by the quoted table name.
pub const TABLE_SLOT: &str = "{table}";

/// Slot for the case-insensitive match operator.
pub const LIKE_SLOT: &str = "{like}";

/// Slot for the quoted list of system schemas, used inside `NOT IN (...)`.
pub const SYSTEM_SCHEMAS_SLOT: &str = "{system_schemas}";

/// Slot for the current-database expression.
pub const DATABASE_SLOT: &str = "{database}";

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum DriverType {
    #[serde(rename = "sqlserver")]
    SqlServer,
    #[serde(rename = "postgres")]
    PostgreSql,
    #[serde(rename = "mysql")]
    MySql,
    #[serde(rename = "godror")]
    Oracle,
    #[serde(rename = "sqlite3")]
    Sqlite,
}

impl DriverType {
    /// All drivers, in catalogue order.
    pub const ALL: [DriverType; 5] = [
        DriverType::SqlServer,
        DriverType::PostgreSql,
        DriverType::MySql,
        DriverType::Oracle,
        DriverType::Sqlite,
    ];

    /// Canonical driver name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SqlServer => "sqlserver",
            Self::PostgreSql => "postgres",
            Self::MySql => "mysql",
            Self::Oracle => "godror",
            Self::Sqlite => "sqlite3",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SqlServer => "Microsoft SQL Server",
            Self::PostgreSql => "PostgreSQL",
            Self::MySql => "MySQL / MariaDB",
            Self::Oracle => "Oracle Database",
            Self::Sqlite => "SQLite",
        }
    }

    /// Schema used when the caller does not name one.
    pub fn default_schema(&self) -> &'static str {
        match self {
            Self::SqlServer => "dbo",
            Self::PostgreSql => "public",
            Self::MySql | Self::Oracle => "",
            Self::Sqlite => "main",
        }
    }

    /// The dialect instance for this driver.
    pub fn dialect(&self) -> &'static dyn Dialect {
        match self {
            Self::SqlServer => &SqlServerDialect,
            Self::PostgreSql => &PostgresDialect,
            Self::MySql => &MySqlDialect,
            Self::Oracle => &OracleDialect,
            Self::Sqlite => &SqliteDialect,
        }
    }
}

impl fmt::Display for DriverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriverType {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlserver" | "mssql" => Ok(Self::SqlServer),
            "postgres" | "postgresql" => Ok(Self::PostgreSql),
            "mysql" | "mariadb" => Ok(Self::MySql),
            "oracle" | "godror" => Ok(Self::Oracle),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            _ => Err(DbError::configuration(format!(
                "invalid database driver: '{}'. Supported drivers: sqlserver, postgres, mysql, sqlite, oracle",
                s
            ))),
        }
    }
}

/// Optional engine capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectFeature {
    StoredProcedures,
    Functions,
    Triggers,
    Views,
    Schemas,
    /// Case-insensitive LIKE operator.
    ILike,
}

impl DialectFeature {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StoredProcedures => "stored procedures",
            Self::Functions => "functions",
            Self::Triggers => "triggers",
            Self::Views => "views",
            Self::Schemas => "schemas",
            Self::ILike => "case-insensitive LIKE",
        }
    }
}

// =============================================================================
// Metadata Query Sets
// =============================================================================

/// Table catalog templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableMetadataSql {
    /// Rows: (schema, name, type)
    pub list_tables: &'static str,
    pub schema_filter: &'static str,
    pub name_filter: &'static str,
    pub order_by: &'static str,
    /// Rows: (name, type, nullable, default, max_length)
    pub describe_table: &'static str,
    pub table_exists: &'static str,
    /// Rows: (name, type, max_length, nullable, default)
    pub get_columns: &'static str,
    /// Rows: (name, type, max_length, precision, scale, nullable, default, is_primary_key)
    pub get_full_schema: &'static str,
    /// Rows: (column)
    pub get_primary_key: &'static str,
    /// Rows: (name, type, is_unique, column)
    pub get_indexes: &'static str,
    /// Rows: (constraint, column, referenced_schema, referenced_table, referenced_column)
    pub get_foreign_keys: &'static str,
}

/// Stored procedure catalog templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcedureMetadataSql {
    /// Rows: (schema, name, created, modified)
    pub list_procedures: &'static str,
    pub schema_filter: &'static str,
    pub name_filter: &'static str,
    pub order_by: &'static str,
    pub get_code: &'static str,
}

/// Function catalog templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionMetadataSql {
    /// Rows: (schema, name, type, created, modified)
    pub list_functions: &'static str,
    pub type_filter_scalar: &'static str,
    pub type_filter_table: &'static str,
    pub type_filter_all: &'static str,
    pub schema_filter: &'static str,
    pub name_filter: &'static str,
    pub order_by: &'static str,
    pub get_code: &'static str,
}

/// View catalog templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewMetadataSql {
    /// Rows: (schema, name, created, modified)
    pub list_views: &'static str,
    pub schema_filter: &'static str,
    pub name_filter: &'static str,
    pub order_by: &'static str,
    pub get_definition: &'static str,
}

/// Trigger catalog templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerMetadataSql {
    /// Rows: (schema, name, table, is_disabled, created, modified)
    pub list_triggers: &'static str,
    pub schema_filter: &'static str,
    pub table_filter: &'static str,
    pub name_filter: &'static str,
    /// Appended when disabled triggers are excluded.
    pub disabled_filter: &'static str,
    pub order_by: &'static str,
    pub get_code: &'static str,
}

/// Database-level templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseInfoSql {
    pub version: &'static str,
    pub details: &'static str,
    /// Rows: (tables, views, procedures, functions, triggers)
    pub object_counts: &'static str,
    pub list_schemas: &'static str,
}

// =============================================================================
// Dialect Trait
// =============================================================================

/// Engine-specific SQL generation.
///
/// Implementations are stateless unit structs, so `&'static dyn Dialect`
/// can be shared freely across tasks.
pub trait Dialect: Send + Sync + fmt::Debug {
    fn driver(&self) -> DriverType;

    /// Positional marker for the 1-based argument `index`.
    fn placeholder(&self, index: usize) -> String;

    fn quote_identifier(&self, name: &str) -> String;

    /// Pagination clause without a leading space.
    fn pagination_clause(&self, limit: u64, offset: u64, order_by: &str) -> String;

    fn like_operator(&self, case_sensitive: bool) -> &'static str {
        if !case_sensitive && self.supports_feature(DialectFeature::ILike) {
            "ILIKE"
        } else {
            "LIKE"
        }
    }

    /// String concatenation expression over `parts`.
    fn concat(&self, parts: &[&str]) -> String {
        parts.join(" || ")
    }

    /// SQL expression yielding the current database name.
    fn current_database(&self) -> &'static str;

    fn system_schemas(&self) -> &'static [&'static str];

    /// Catalog form of an identifier used as a bound filter value.
    fn normalize_identifier(&self, name: &str) -> String {
        name.to_string()
    }

    fn supports_feature(&self, feature: DialectFeature) -> bool {
        feature != DialectFeature::ILike
    }

    /// `schema.table` with both parts quoted, or just the table when `schema` is empty.
    fn qualify_table(&self, schema: &str, table: &str) -> String {
        if schema.is_empty() {
            self.quote_identifier(table)
        } else {
            format!(
                "{}.{}",
                self.quote_identifier(schema),
                self.quote_identifier(table)
            )
        }
    }

    /// Arguments identifying a catalog object by (schema, name).
    fn object_args(&self, schema: &str, name: &str) -> Vec<QueryParam> {
        vec![
            QueryParam::String(self.normalize_identifier(schema)),
            QueryParam::String(self.normalize_identifier(name)),
        ]
    }

    /// Statement invoking procedure `target` with `params` bound in order.
    fn procedure_invocation(&self, target: &str, params: &[&str]) -> String {
        let placeholders = placeholder_list(self, 1, params.len());
        format!("CALL {}({})", target, placeholders.join(", "))
    }

    /// Source text from the rows of a code lookup; the first cell by default.
    fn assemble_source(&self, rows: &RowSet) -> String {
        rows.scalar().and_then(json_as_string).unwrap_or_default()
    }

    /// Catalog type code for a caller-facing object type word (`table`, `view`, ...).
    fn search_type_code(&self, object_type: &str) -> Option<&'static str>;

    /// Object search over the catalog, restricted to `type_codes` when non-empty.
    ///
    /// Rows: (schema, name, type, created, modified, has_code)
    fn search_objects(&self, type_codes: &[&'static str], in_code: bool) -> String;

    /// Number of times the search term is bound.
    fn search_term_binds(&self, _in_code: bool) -> usize {
        1
    }

    /// Declared parameters of a stored procedure, bound as (schema, name).
    ///
    /// Rows: (name, is_output)
    fn procedure_parameters(&self) -> &'static str {
        ""
    }

    fn table_metadata(&self) -> TableMetadataSql;
    fn procedure_metadata(&self) -> ProcedureMetadataSql;
    fn function_metadata(&self) -> FunctionMetadataSql;
    fn view_metadata(&self) -> ViewMetadataSql;
    fn trigger_metadata(&self) -> TriggerMetadataSql;
    fn database_info(&self) -> DatabaseInfoSql;
}

/// `count` consecutive placeholders starting at `start`.
pub fn placeholder_list<D: Dialect + ?Sized>(
    dialect: &D,
    start: usize,
    count: usize,
) -> Vec<String> {
    (start..start + count)
        .map(|index| dialect.placeholder(index))
        .collect()
}

/// Fill the dialect-level slots of a catalog template.
pub fn render_template<D: Dialect + ?Sized>(dialect: &D, template: &str) -> String {
    let mut sql = template.replace(LIKE_SLOT, dialect.like_operator(false));
    if sql.contains(SYSTEM_SCHEMAS_SLOT) {
        sql = sql.replace(SYSTEM_SCHEMAS_SLOT, &quoted_list(dialect.system_schemas()));
    }
    sql.replace(DATABASE_SLOT, dialect.current_database())
}

/// `'%' <concat> term <concat> '%'` substring pattern around `term`.
fn contains_pattern<D: Dialect + ?Sized>(dialect: &D, term: &str) -> String {
    dialect.concat(&["'%'", term, "'%'"])
}

/// `'A', 'B'` list of internal type codes for an `IN (...)` clause.
fn quoted_list(codes: &[&'static str]) -> String {
    codes
        .iter()
        .map(|code| format!("'{}'", code))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Shared LIMIT/OFFSET pagination for engines that do not need ORDER BY.
fn limit_offset_clause(limit: u64, offset: u64, order_by: &str) -> String {
    let pagination = format!("LIMIT {} OFFSET {}", limit, offset);
    if order_by.is_empty() {
        pagination
    } else {
        format!("ORDER BY {} {}", order_by, pagination)
    }
}

/// Shared OFFSET/FETCH pagination; a constant ordering stands in for a missing sort.
fn offset_fetch_clause(limit: u64, offset: u64, order_by: &str) -> String {
    let order_by = if order_by.is_empty() {
        "(SELECT NULL)"
    } else {
        order_by
    };
    format!(
        "ORDER BY {} OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
        order_by, offset, limit
    )
}
