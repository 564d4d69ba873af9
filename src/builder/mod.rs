//! Engine-agnostic query building.
//!
//! [`QueryBuilder`] binds one [`Dialect`] at construction and turns catalog
//! operations into a [`BuiltQuery`]: the SQL text plus its positional
//! arguments. Placeholders are numbered as fragments are appended, so an
//! omitted filter drops its placeholder and its argument together.
//!
//! Feature-gated operations return `None` when the active engine lacks the
//! feature or has no template for it.

mod procedure;
mod select;

pub use procedure::ProcedureParameter;
pub use select::{FilterOperator, RowFilter, SelectQueryParams, SortDirection, WhereClause};

use crate::dialect::{
    Dialect, DialectFeature, DriverType, PARAM_SLOT, TABLE_SLOT, render_template,
};
use crate::error::DbResult;
use crate::models::QueryParam;
use crate::models::identifier::validate_identifier;
use tracing::debug;

/// SQL text and the arguments for its placeholders, in placeholder order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuiltQuery {
    pub sql: String,
    pub args: Vec<QueryParam>,
}

impl BuiltQuery {
    /// A query without arguments.
    pub fn plain(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }
}

/// Function kinds accepted by `list_functions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FunctionType {
    Scalar,
    Table,
    #[default]
    All,
}

impl FunctionType {
    /// `scalar` and `table` select a kind; anything else means all.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("scalar") => Self::Scalar,
            Some("table") => Self::Table,
            _ => Self::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Table => "table",
            Self::All => "all",
        }
    }
}

/// Appends fragments and keeps placeholder numbering in step with the arguments.
struct Assembler {
    dialect: &'static dyn Dialect,
    sql: String,
    args: Vec<QueryParam>,
}

impl Assembler {
    fn new(dialect: &'static dyn Dialect, base: &str) -> Self {
        Self {
            dialect,
            sql: base.to_string(),
            args: Vec::new(),
        }
    }

    /// Append `fragment` with its slot bound to `value`, if both are present.
    fn filter(&mut self, fragment: &str, value: Option<String>) {
        let Some(value) = value else { return };
        if fragment.is_empty() || value.is_empty() {
            return;
        }
        let placeholder = self.dialect.placeholder(self.args.len() + 1);
        self.sql.push_str(&fragment.replace(PARAM_SLOT, &placeholder));
        self.args.push(QueryParam::String(value));
    }

    fn push(&mut self, fragment: &str) {
        self.sql.push_str(fragment);
    }

    fn paginate(&mut self, order_by: &str, limit: u64, offset: u64) {
        append_pagination(self.dialect, &mut self.sql, order_by, limit, offset);
    }

    fn finish(self, operation: &str) -> BuiltQuery {
        debug!(
            driver = %self.dialect.driver(),
            operation,
            args = self.args.len(),
            "Built query"
        );
        BuiltQuery {
            sql: render_template(self.dialect, &self.sql),
            args: self.args,
        }
    }
}

/// Append the dialect's pagination clause to `sql`.
///
/// `order_by` may carry a leading `ORDER BY` keyword, which is stripped before
/// the columns are handed to the dialect.
pub fn append_pagination(
    dialect: &dyn Dialect,
    sql: &mut String,
    order_by: &str,
    limit: u64,
    offset: u64,
) {
    let columns = strip_order_by(order_by);
    sql.push(' ');
    sql.push_str(&dialect.pagination_clause(limit, offset, columns));
}

fn strip_order_by(fragment: &str) -> &str {
    let trimmed = fragment.trim();
    match trimmed.get(..9) {
        Some(prefix) if prefix.eq_ignore_ascii_case("ORDER BY ") => trimmed[9..].trim(),
        _ => trimmed,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Engine-selecting SQL builder.
///
/// Cheap to construct; the datasource context builds a new one whenever the
/// active datasource changes instead of mutating the old one.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder {
    driver: DriverType,
    dialect: &'static dyn Dialect,
}

impl QueryBuilder {
    pub fn new(driver: DriverType) -> Self {
        Self {
            driver,
            dialect: driver.dialect(),
        }
    }

    pub fn driver(&self) -> DriverType {
        self.driver
    }

    pub fn dialect(&self) -> &'static dyn Dialect {
        self.dialect
    }

    pub fn default_schema(&self) -> &'static str {
        self.driver.default_schema()
    }

    pub fn supports(&self, feature: DialectFeature) -> bool {
        self.dialect.supports_feature(feature)
    }

    pub fn quote(&self, name: &str) -> String {
        self.dialect.quote_identifier(name)
    }

    /// Quoted `schema.table`; engines without schemas and an empty schema yield the table alone.
    pub fn qualify_table(&self, schema: &str, table: &str) -> String {
        self.dialect.qualify_table(schema, table)
    }

    fn normalize(&self, value: Option<&str>) -> Option<String> {
        non_empty(value).map(|v| self.dialect.normalize_identifier(v))
    }

    fn like_pattern(&self, value: Option<&str>) -> Option<String> {
        self.normalize(value).map(|v| format!("%{}%", v))
    }

    // =========================================================================
    // Listings
    // =========================================================================

    pub fn list_tables(
        &self,
        schema: Option<&str>,
        name: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> BuiltQuery {
        let meta = self.dialect.table_metadata();
        let mut q = Assembler::new(self.dialect, meta.list_tables);
        q.filter(meta.schema_filter, self.normalize(schema));
        q.filter(meta.name_filter, self.like_pattern(name));
        q.paginate(meta.order_by, limit, offset);
        q.finish("list_tables")
    }

    pub fn list_procedures(
        &self,
        schema: Option<&str>,
        name: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> Option<BuiltQuery> {
        let meta = self.dialect.procedure_metadata();
        if !self.supports(DialectFeature::StoredProcedures) || meta.list_procedures.is_empty() {
            return None;
        }
        let mut q = Assembler::new(self.dialect, meta.list_procedures);
        q.filter(meta.schema_filter, self.normalize(schema));
        q.filter(meta.name_filter, self.like_pattern(name));
        q.paginate(meta.order_by, limit, offset);
        Some(q.finish("list_procedures"))
    }

    pub fn list_functions(
        &self,
        schema: Option<&str>,
        name: Option<&str>,
        function_type: FunctionType,
        limit: u64,
        offset: u64,
    ) -> Option<BuiltQuery> {
        let meta = self.dialect.function_metadata();
        if !self.supports(DialectFeature::Functions) || meta.list_functions.is_empty() {
            return None;
        }
        let mut q = Assembler::new(self.dialect, meta.list_functions);
        q.push(match function_type {
            FunctionType::Scalar => meta.type_filter_scalar,
            FunctionType::Table => meta.type_filter_table,
            FunctionType::All => meta.type_filter_all,
        });
        q.filter(meta.schema_filter, self.normalize(schema));
        q.filter(meta.name_filter, self.like_pattern(name));
        q.paginate(meta.order_by, limit, offset);
        Some(q.finish("list_functions"))
    }

    pub fn list_views(
        &self,
        schema: Option<&str>,
        name: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> Option<BuiltQuery> {
        let meta = self.dialect.view_metadata();
        if !self.supports(DialectFeature::Views) || meta.list_views.is_empty() {
            return None;
        }
        let mut q = Assembler::new(self.dialect, meta.list_views);
        q.filter(meta.schema_filter, self.normalize(schema));
        q.filter(meta.name_filter, self.like_pattern(name));
        q.paginate(meta.order_by, limit, offset);
        Some(q.finish("list_views"))
    }

    pub fn list_triggers(
        &self,
        schema: Option<&str>,
        table: Option<&str>,
        name: Option<&str>,
        include_disabled: bool,
        limit: u64,
        offset: u64,
    ) -> Option<BuiltQuery> {
        let meta = self.dialect.trigger_metadata();
        if !self.supports(DialectFeature::Triggers) || meta.list_triggers.is_empty() {
            return None;
        }
        let mut q = Assembler::new(self.dialect, meta.list_triggers);
        q.filter(meta.schema_filter, self.normalize(schema));
        q.filter(meta.table_filter, self.normalize(table));
        q.filter(meta.name_filter, self.like_pattern(name));
        if !include_disabled {
            q.push(meta.disabled_filter);
        }
        q.paginate(meta.order_by, limit, offset);
        Some(q.finish("list_triggers"))
    }

    /// Catalog-wide search by name (and by source text where the engine allows).
    ///
    /// Unknown entries in `object_types` are ignored; when none is known every
    /// searchable type is included. Not paginated.
    pub fn search_objects(&self, term: &str, in_code: bool, object_types: &[String]) -> BuiltQuery {
        let mut codes: Vec<&'static str> = Vec::new();
        for code in object_types
            .iter()
            .filter_map(|t| self.dialect.search_type_code(t.trim()))
        {
            if !codes.contains(&code) {
                codes.push(code);
            }
        }

        let term = self.dialect.normalize_identifier(term.trim());
        let binds = self.dialect.search_term_binds(in_code);
        let q = Assembler {
            dialect: self.dialect,
            sql: self.dialect.search_objects(&codes, in_code),
            args: vec![QueryParam::String(term); binds],
        };
        q.finish("search_objects")
    }

    // =========================================================================
    // Per-table structure
    // =========================================================================

    /// Per-table template: pragma templates get the quoted table spliced in and
    /// no arguments; catalog queries bind the dialect's object arguments.
    fn table_query(
        &self,
        operation: &str,
        template: &'static str,
        schema: &str,
        table: &str,
    ) -> DbResult<BuiltQuery> {
        validate_identifier("table", table)?;
        if !schema.is_empty() {
            validate_identifier("schema", schema)?;
        }

        let q = if template.contains(TABLE_SLOT) {
            Assembler::new(self.dialect, &template.replace(TABLE_SLOT, &self.quote(table)))
        } else {
            Assembler {
                dialect: self.dialect,
                sql: template.to_string(),
                args: self.dialect.object_args(schema, table),
            }
        };
        Ok(q.finish(operation))
    }

    pub fn describe_table(&self, schema: &str, table: &str) -> DbResult<BuiltQuery> {
        let template = self.dialect.table_metadata().describe_table;
        self.table_query("describe_table", template, schema, table)
    }

    /// Row count query: non-zero means the table exists.
    pub fn table_exists(&self, schema: &str, table: &str) -> DbResult<BuiltQuery> {
        let template = self.dialect.table_metadata().table_exists;
        self.table_query("table_exists", template, schema, table)
    }

    pub fn columns(&self, schema: &str, table: &str) -> DbResult<BuiltQuery> {
        let template = self.dialect.table_metadata().get_columns;
        self.table_query("columns", template, schema, table)
    }

    pub fn full_schema(&self, schema: &str, table: &str) -> DbResult<BuiltQuery> {
        let template = self.dialect.table_metadata().get_full_schema;
        self.table_query("full_schema", template, schema, table)
    }

    pub fn primary_key(&self, schema: &str, table: &str) -> DbResult<BuiltQuery> {
        let template = self.dialect.table_metadata().get_primary_key;
        self.table_query("primary_key", template, schema, table)
    }

    pub fn indexes(&self, schema: &str, table: &str) -> DbResult<BuiltQuery> {
        let template = self.dialect.table_metadata().get_indexes;
        self.table_query("indexes", template, schema, table)
    }

    pub fn foreign_keys(&self, schema: &str, table: &str) -> DbResult<BuiltQuery> {
        let template = self.dialect.table_metadata().get_foreign_keys;
        self.table_query("foreign_keys", template, schema, table)
    }

    // =========================================================================
    // Source code and definitions
    // =========================================================================

    fn code_query(
        &self,
        operation: &str,
        feature: DialectFeature,
        template: &'static str,
        schema: &str,
        name: &str,
    ) -> Option<BuiltQuery> {
        if !self.supports(feature) || template.is_empty() {
            return None;
        }
        let q = Assembler {
            dialect: self.dialect,
            sql: template.to_string(),
            args: self.dialect.object_args(schema, name),
        };
        Some(q.finish(operation))
    }

    pub fn procedure_code(&self, schema: &str, name: &str) -> Option<BuiltQuery> {
        let template = self.dialect.procedure_metadata().get_code;
        self.code_query(
            "procedure_code",
            DialectFeature::StoredProcedures,
            template,
            schema,
            name,
        )
    }

    pub fn function_code(&self, schema: &str, name: &str) -> Option<BuiltQuery> {
        let template = self.dialect.function_metadata().get_code;
        self.code_query("function_code", DialectFeature::Functions, template, schema, name)
    }

    pub fn view_definition(&self, schema: &str, name: &str) -> Option<BuiltQuery> {
        let template = self.dialect.view_metadata().get_definition;
        self.code_query("view_definition", DialectFeature::Views, template, schema, name)
    }

    pub fn trigger_code(&self, schema: &str, name: &str) -> Option<BuiltQuery> {
        let template = self.dialect.trigger_metadata().get_code;
        self.code_query("trigger_code", DialectFeature::Triggers, template, schema, name)
    }

    /// Declared parameters of a procedure, where the catalog exposes them.
    pub fn procedure_parameters(&self, schema: &str, name: &str) -> Option<BuiltQuery> {
        let template = self.dialect.procedure_parameters();
        self.code_query(
            "procedure_parameters",
            DialectFeature::StoredProcedures,
            template,
            schema,
            name,
        )
    }

    // =========================================================================
    // Database information
    // =========================================================================

    fn info_query(&self, operation: &str, template: &'static str) -> Option<BuiltQuery> {
        if template.is_empty() {
            return None;
        }
        Some(Assembler::new(self.dialect, template).finish(operation))
    }

    pub fn version(&self) -> Option<BuiltQuery> {
        self.info_query("version", self.dialect.database_info().version)
    }

    pub fn details(&self) -> Option<BuiltQuery> {
        self.info_query("details", self.dialect.database_info().details)
    }

    pub fn object_counts(&self) -> Option<BuiltQuery> {
        self.info_query("object_counts", self.dialect.database_info().object_counts)
    }

    pub fn list_schemas(&self) -> Option<BuiltQuery> {
        if !self.supports(DialectFeature::Schemas) {
            return None;
        }
        self.info_query("list_schemas", self.dialect.database_info().list_schemas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Listings
    // =========================================================================

    #[test]
    fn test_list_tables_without_filters() {
        let b = QueryBuilder::new(DriverType::PostgreSql);
        let q = b.list_tables(None, None, 100, 0);
        assert!(q.args.is_empty());
        assert!(!q.sql.contains("$1"));
        assert!(q.sql.ends_with(" ORDER BY table_schema, table_name LIMIT 100 OFFSET 0"));
    }

    #[test]
    fn test_list_tables_with_filters() {
        let b = QueryBuilder::new(DriverType::SqlServer);
        let q = b.list_tables(Some("dbo"), Some("order"), 50, 100);
        assert!(q.sql.contains("AND TABLE_SCHEMA = @p1"));
        assert!(q.sql.contains("AND TABLE_NAME LIKE @p2"));
        assert_eq!(q.args, vec![QueryParam::from("dbo"), QueryParam::from("%order%")]);
        assert!(q.sql.ends_with(
            " ORDER BY TABLE_SCHEMA, TABLE_NAME OFFSET 100 ROWS FETCH NEXT 50 ROWS ONLY"
        ));
    }

    #[test]
    fn test_empty_filter_values_are_skipped() {
        let b = QueryBuilder::new(DriverType::PostgreSql);
        let q = b.list_tables(Some(""), Some("users"), 10, 0);
        assert!(q.sql.contains("table_name ILIKE $1"));
        assert_eq!(q.args, vec![QueryParam::from("%users%")]);
    }

    #[test]
    fn test_sqlite_has_no_schema_filter() {
        let b = QueryBuilder::new(DriverType::Sqlite);
        let q = b.list_tables(Some("main"), None, 10, 0);
        assert!(q.args.is_empty());
    }

    #[test]
    fn test_oracle_normalizes_filter_values() {
        let b = QueryBuilder::new(DriverType::Oracle);
        let q = b.list_tables(Some("hr"), Some("emp"), 10, 0).args;
        assert_eq!(q, vec![QueryParam::from("HR"), QueryParam::from("%EMP%")]);
    }

    #[test]
    fn test_feature_gated_listings_on_sqlite() {
        let b = QueryBuilder::new(DriverType::Sqlite);
        assert!(b.list_procedures(None, None, 10, 0).is_none());
        assert!(b.list_functions(None, None, FunctionType::All, 10, 0).is_none());
        assert!(b.procedure_code("", "p").is_none());
        assert!(b.list_views(None, None, 10, 0).is_some());
        assert!(b.list_triggers(None, None, None, true, 10, 0).is_some());
        assert!(b.list_schemas().is_none());
    }

    #[test]
    fn test_list_functions_type_filter() {
        let b = QueryBuilder::new(DriverType::SqlServer);
        let scalar = b.list_functions(None, None, FunctionType::Scalar, 10, 0).unwrap();
        assert!(scalar.sql.contains("AND o.type = 'FN'"));
        let table = b.list_functions(None, None, FunctionType::Table, 10, 0).unwrap();
        assert!(table.sql.contains("AND o.type IN ('IF', 'TF')"));
        assert_eq!(FunctionType::parse(Some("bogus")), FunctionType::All);
        assert_eq!(FunctionType::parse(Some("SCALAR")), FunctionType::Scalar);
    }

    #[test]
    fn test_list_triggers_filters_and_disabled() {
        let b = QueryBuilder::new(DriverType::PostgreSql);
        let q = b
            .list_triggers(Some("public"), Some("orders"), Some("audit"), false, 10, 0)
            .unwrap();
        assert!(q.sql.contains("n.nspname = $1"));
        assert!(q.sql.contains("c.relname = $2"));
        assert!(q.sql.contains("t.tgname ILIKE $3"));
        assert!(q.sql.contains("t.tgenabled <> 'D'"));
        assert_eq!(q.args.len(), 3);

        let all = b.list_triggers(None, None, None, true, 10, 0).unwrap();
        assert!(!all.sql.contains("tgenabled <> 'D'"));
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    #[test]
    fn test_strip_order_by() {
        assert_eq!(strip_order_by(" ORDER BY a, b"), "a, b");
        assert_eq!(strip_order_by("order by name"), "name");
        assert_eq!(strip_order_by("name DESC"), "name DESC");
        assert_eq!(strip_order_by(""), "");
    }

    #[test]
    fn test_append_pagination_without_order() {
        let mut sql = "SELECT 1".to_string();
        append_pagination(DriverType::Oracle.dialect(), &mut sql, "", 5, 0);
        assert_eq!(
            sql,
            "SELECT 1 ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"
        );

        let mut sql = "SELECT 1".to_string();
        append_pagination(DriverType::MySql.dialect(), &mut sql, "", 5, 10);
        assert_eq!(sql, "SELECT 1 LIMIT 5 OFFSET 10");
    }

    // =========================================================================
    // Per-table and code queries
    // =========================================================================

    #[test]
    fn test_sqlite_pragmas_embed_quoted_table() {
        let b = QueryBuilder::new(DriverType::Sqlite);
        let q = b.columns("main", "users").unwrap();
        assert_eq!(q.sql, "PRAGMA table_info(\"users\")");
        assert!(q.args.is_empty());

        let exists = b.table_exists("main", "users").unwrap();
        assert_eq!(exists.args, vec![QueryParam::from("users")]);
    }

    #[test]
    fn test_per_table_binds_schema_and_table() {
        let b = QueryBuilder::new(DriverType::Oracle);
        let q = b.primary_key("hr", "employees").unwrap();
        assert_eq!(q.args, vec![QueryParam::from("HR"), QueryParam::from("EMPLOYEES")]);
    }

    #[test]
    fn test_per_table_rejects_bad_identifiers() {
        let b = QueryBuilder::new(DriverType::Sqlite);
        assert!(b.columns("", "users); DROP TABLE x; --").is_err());
        let pg = QueryBuilder::new(DriverType::PostgreSql);
        assert!(pg.indexes("bad schema", "users").is_err());
    }

    #[test]
    fn test_sqlite_code_binds_name_only() {
        let b = QueryBuilder::new(DriverType::Sqlite);
        let q = b.view_definition("main", "active_users").unwrap();
        assert_eq!(q.args, vec![QueryParam::from("active_users")]);
    }

    #[test]
    fn test_procedure_parameters_only_on_sqlserver() {
        assert!(QueryBuilder::new(DriverType::SqlServer)
            .procedure_parameters("dbo", "p")
            .is_some());
        assert!(QueryBuilder::new(DriverType::PostgreSql)
            .procedure_parameters("public", "p")
            .is_none());
    }

    // =========================================================================
    // Search and info
    // =========================================================================

    #[test]
    fn test_search_objects_type_codes() {
        let b = QueryBuilder::new(DriverType::SqlServer);
        let types = vec!["view".to_string(), "bogus".to_string(), "VIEW".to_string()];
        let q = b.search_objects("cust", false, &types);
        assert!(q.sql.contains("o.type IN ('V')"));
        assert_eq!(q.args, vec![QueryParam::from("cust")]);
    }

    #[test]
    fn test_search_objects_sqlite_binds_twice() {
        let b = QueryBuilder::new(DriverType::Sqlite);
        let q = b.search_objects("user", true, &[]);
        assert_eq!(q.args.len(), 2);
        assert_eq!(q.sql.matches('?').count(), 2);
    }

    #[test]
    fn test_search_objects_oracle_upper_cases() {
        let b = QueryBuilder::new(DriverType::Oracle);
        let q = b.search_objects("emp", true, &[]);
        assert_eq!(q.args, vec![QueryParam::from("EMP")]);
    }

    #[test]
    fn test_info_queries() {
        let b = QueryBuilder::new(DriverType::Oracle);
        assert!(b.version().is_some());
        assert!(b.details().is_none());
        assert!(b.object_counts().is_some());
        assert!(b.list_schemas().is_some());
    }

    #[test]
    fn test_qualify_table() {
        assert_eq!(
            QueryBuilder::new(DriverType::SqlServer).qualify_table("dbo", "users"),
            "[dbo].[users]"
        );
        assert_eq!(
            QueryBuilder::new(DriverType::Sqlite).qualify_table("main", "users"),
            "\"users\""
        );
        assert_eq!(
            QueryBuilder::new(DriverType::MySql).qualify_table("", "users"),
            "`users`"
        );
    }
}
