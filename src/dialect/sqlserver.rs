//! Microsoft SQL Server dialect.
//!
//! Named placeholders (`@p1`), bracket quoting and OFFSET/FETCH pagination,
//! which is only legal after an ORDER BY.

use super::{
    DatabaseInfoSql, Dialect, DriverType, FunctionMetadataSql, ProcedureMetadataSql,
    TableMetadataSql, TriggerMetadataSql, ViewMetadataSql, contains_pattern, offset_fetch_clause,
    placeholder_list, quoted_list,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

/// Search type codes in a fixed order so repeated builds render identically.
const ALL_SEARCH_TYPES: [&str; 4] = ["U", "V", "P", "FN"];

impl Dialect for SqlServerDialect {
    fn driver(&self) -> DriverType {
        DriverType::SqlServer
    }

    fn placeholder(&self, index: usize) -> String {
        format!("@p{}", index)
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("[{}]", name)
    }

    fn pagination_clause(&self, limit: u64, offset: u64, order_by: &str) -> String {
        offset_fetch_clause(limit, offset, order_by)
    }

    fn concat(&self, parts: &[&str]) -> String {
        parts.join(" + ")
    }

    fn current_database(&self) -> &'static str {
        "DB_NAME()"
    }

    fn system_schemas(&self) -> &'static [&'static str] {
        &["sys", "INFORMATION_SCHEMA"]
    }

    fn search_type_code(&self, object_type: &str) -> Option<&'static str> {
        match object_type.to_ascii_lowercase().as_str() {
            "table" => Some("U"),
            "view" => Some("V"),
            "procedure" => Some("P"),
            "function" => Some("FN"),
            _ => None,
        }
    }

    fn search_objects(&self, type_codes: &[&'static str], in_code: bool) -> String {
        let types = if type_codes.is_empty() {
            quoted_list(&ALL_SEARCH_TYPES)
        } else {
            quoted_list(type_codes)
        };
        let pattern = contains_pattern(self, &self.placeholder(1));
        let code_clause = if in_code {
            format!(" OR (m.definition IS NOT NULL AND m.definition LIKE {})", pattern)
        } else {
            String::new()
        };
        queries::SEARCH_OBJECTS
            .replace("{types}", &types)
            .replace("{term}", &pattern)
            .replace("{code}", &code_clause)
    }

    /// `EXEC` with named arguments: `@name = @pN`.
    fn procedure_invocation(&self, target: &str, params: &[&str]) -> String {
        if params.is_empty() {
            return format!("EXEC {}", target);
        }
        let assignments: Vec<String> = params
            .iter()
            .zip(placeholder_list(self, 1, params.len()))
            .map(|(param, placeholder)| format!("@{} = {}", param, placeholder))
            .collect();
        format!("EXEC {} {}", target, assignments.join(", "))
    }

    fn procedure_parameters(&self) -> &'static str {
        queries::PROCEDURE_PARAMETERS
    }

    fn table_metadata(&self) -> TableMetadataSql {
        TableMetadataSql {
            list_tables: queries::LIST_TABLES,
            schema_filter: " AND TABLE_SCHEMA = {p}",
            name_filter: " AND TABLE_NAME {like} {p}",
            order_by: " ORDER BY TABLE_SCHEMA, TABLE_NAME",
            describe_table: queries::DESCRIBE_TABLE,
            table_exists: queries::TABLE_EXISTS,
            get_columns: queries::GET_COLUMNS,
            get_full_schema: queries::GET_FULL_SCHEMA,
            get_primary_key: queries::GET_PRIMARY_KEY,
            get_indexes: queries::GET_INDEXES,
            get_foreign_keys: queries::GET_FOREIGN_KEYS,
        }
    }

    fn procedure_metadata(&self) -> ProcedureMetadataSql {
        ProcedureMetadataSql {
            list_procedures: queries::LIST_PROCEDURES,
            schema_filter: " AND s.name = {p}",
            name_filter: " AND o.name {like} {p}",
            order_by: " ORDER BY s.name, o.name",
            get_code: queries::PROCEDURE_CODE,
        }
    }

    fn function_metadata(&self) -> FunctionMetadataSql {
        FunctionMetadataSql {
            list_functions: queries::LIST_FUNCTIONS,
            type_filter_scalar: " AND o.type = 'FN'",
            type_filter_table: " AND o.type IN ('IF', 'TF')",
            type_filter_all: " AND o.type IN ('FN', 'IF', 'TF')",
            schema_filter: " AND s.name = {p}",
            name_filter: " AND o.name {like} {p}",
            order_by: " ORDER BY s.name, o.name",
            get_code: queries::FUNCTION_CODE,
        }
    }

    fn view_metadata(&self) -> ViewMetadataSql {
        ViewMetadataSql {
            list_views: queries::LIST_VIEWS,
            schema_filter: " AND s.name = {p}",
            name_filter: " AND v.name {like} {p}",
            order_by: " ORDER BY s.name, v.name",
            get_definition: queries::VIEW_DEFINITION,
        }
    }

    fn trigger_metadata(&self) -> TriggerMetadataSql {
        TriggerMetadataSql {
            list_triggers: queries::LIST_TRIGGERS,
            schema_filter: " AND s.name = {p}",
            table_filter: " AND OBJECT_NAME(tr.parent_id) = {p}",
            name_filter: " AND t.name {like} {p}",
            disabled_filter: " AND tr.is_disabled = 0",
            order_by: " ORDER BY s.name, OBJECT_NAME(tr.parent_id), t.name",
            get_code: queries::TRIGGER_CODE,
        }
    }

    fn database_info(&self) -> DatabaseInfoSql {
        DatabaseInfoSql {
            version: "SELECT @@VERSION",
            details: queries::DETAILS,
            object_counts: queries::OBJECT_COUNTS,
            list_schemas: queries::LIST_SCHEMAS,
        }
    }
}

mod queries {
    pub const LIST_TABLES: &str = r#"
            SELECT
                TABLE_SCHEMA,
                TABLE_NAME,
                TABLE_TYPE
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_TYPE = 'BASE TABLE'
                AND TABLE_SCHEMA NOT IN ({system_schemas})"#;

    pub const DESCRIBE_TABLE: &str = r#"
            SELECT
                COLUMN_NAME,
                DATA_TYPE,
                IS_NULLABLE,
                COLUMN_DEFAULT,
                CHARACTER_MAXIMUM_LENGTH
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = @p1 AND TABLE_NAME = @p2
            ORDER BY ORDINAL_POSITION"#;

    pub const TABLE_EXISTS: &str = "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = @p1 AND TABLE_NAME = @p2";

    pub const GET_COLUMNS: &str = r#"
            SELECT
                COLUMN_NAME,
                DATA_TYPE,
                CHARACTER_MAXIMUM_LENGTH,
                IS_NULLABLE,
                COLUMN_DEFAULT
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = @p1 AND TABLE_NAME = @p2
            ORDER BY ORDINAL_POSITION"#;

    pub const GET_FULL_SCHEMA: &str = r#"
            SELECT
                c.COLUMN_NAME,
                c.DATA_TYPE,
                c.CHARACTER_MAXIMUM_LENGTH,
                c.NUMERIC_PRECISION,
                c.NUMERIC_SCALE,
                c.IS_NULLABLE,
                c.COLUMN_DEFAULT,
                CASE WHEN pk.COLUMN_NAME IS NOT NULL THEN 'YES' ELSE 'NO' END AS IS_PRIMARY_KEY
            FROM INFORMATION_SCHEMA.COLUMNS c
            LEFT JOIN (
                SELECT ku.TABLE_SCHEMA, ku.TABLE_NAME, ku.COLUMN_NAME
                FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
                JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE ku
                    ON tc.CONSTRAINT_TYPE = 'PRIMARY KEY'
                    AND tc.CONSTRAINT_NAME = ku.CONSTRAINT_NAME
                    AND tc.TABLE_SCHEMA = ku.TABLE_SCHEMA
                    AND tc.TABLE_NAME = ku.TABLE_NAME
            ) pk ON c.TABLE_SCHEMA = pk.TABLE_SCHEMA
                AND c.TABLE_NAME = pk.TABLE_NAME
                AND c.COLUMN_NAME = pk.COLUMN_NAME
            WHERE c.TABLE_SCHEMA = @p1 AND c.TABLE_NAME = @p2
            ORDER BY c.ORDINAL_POSITION"#;

    pub const GET_PRIMARY_KEY: &str = r#"
            SELECT ku.COLUMN_NAME
            FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
            JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE ku
                ON tc.CONSTRAINT_NAME = ku.CONSTRAINT_NAME
                AND tc.TABLE_SCHEMA = ku.TABLE_SCHEMA
                AND tc.TABLE_NAME = ku.TABLE_NAME
            WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY'
                AND tc.TABLE_SCHEMA = @p1
                AND tc.TABLE_NAME = @p2
            ORDER BY ku.ORDINAL_POSITION"#;

    pub const GET_INDEXES: &str = r#"
            SELECT
                i.name AS index_name,
                i.type_desc AS index_type,
                i.is_unique,
                COL_NAME(ic.object_id, ic.column_id) AS column_name
            FROM sys.indexes i
            INNER JOIN sys.index_columns ic ON i.object_id = ic.object_id AND i.index_id = ic.index_id
            INNER JOIN sys.tables t ON i.object_id = t.object_id
            INNER JOIN sys.schemas s ON t.schema_id = s.schema_id
            WHERE s.name = @p1 AND t.name = @p2
            ORDER BY i.name, ic.key_ordinal"#;

    pub const GET_FOREIGN_KEYS: &str = r#"
            SELECT
                fk.name AS constraint_name,
                COL_NAME(fkc.parent_object_id, fkc.parent_column_id) AS column_name,
                SCHEMA_NAME(ref_t.schema_id) AS referenced_schema,
                ref_t.name AS referenced_table,
                COL_NAME(fkc.referenced_object_id, fkc.referenced_column_id) AS referenced_column
            FROM sys.foreign_keys fk
            INNER JOIN sys.foreign_key_columns fkc ON fk.object_id = fkc.constraint_object_id
            INNER JOIN sys.tables t ON fk.parent_object_id = t.object_id
            INNER JOIN sys.schemas s ON t.schema_id = s.schema_id
            INNER JOIN sys.tables ref_t ON fkc.referenced_object_id = ref_t.object_id
            WHERE s.name = @p1 AND t.name = @p2
            ORDER BY fk.name"#;

    pub const LIST_PROCEDURES: &str = r#"
            SELECT
                s.name AS routine_schema,
                o.name AS routine_name,
                o.create_date AS created,
                o.modify_date AS last_altered
            FROM sys.objects o
            INNER JOIN sys.schemas s ON o.schema_id = s.schema_id
            WHERE o.type = 'P' AND o.is_ms_shipped = 0"#;

    pub const PROCEDURE_CODE: &str = r#"
            SELECT m.definition
            FROM sys.sql_modules m
            INNER JOIN sys.objects o ON m.object_id = o.object_id
            INNER JOIN sys.schemas s ON o.schema_id = s.schema_id
            WHERE o.type = 'P' AND s.name = @p1 AND o.name = @p2"#;

    pub const PROCEDURE_PARAMETERS: &str = r#"
            SELECT
                p.name AS parameter_name,
                p.is_output
            FROM sys.parameters p
            INNER JOIN sys.procedures pr ON p.object_id = pr.object_id
            INNER JOIN sys.schemas s ON pr.schema_id = s.schema_id
            WHERE s.name = @p1 AND pr.name = @p2
            ORDER BY p.parameter_id"#;

    pub const LIST_FUNCTIONS: &str = r#"
            SELECT
                s.name AS routine_schema,
                o.name AS routine_name,
                o.type_desc AS function_type,
                o.create_date AS created,
                o.modify_date AS last_altered
            FROM sys.objects o
            INNER JOIN sys.schemas s ON o.schema_id = s.schema_id
            WHERE o.is_ms_shipped = 0"#;

    pub const FUNCTION_CODE: &str = r#"
            SELECT m.definition
            FROM sys.sql_modules m
            INNER JOIN sys.objects o ON m.object_id = o.object_id
            INNER JOIN sys.schemas s ON o.schema_id = s.schema_id
            WHERE o.type IN ('FN', 'IF', 'TF') AND s.name = @p1 AND o.name = @p2"#;

    pub const LIST_VIEWS: &str = r#"
            SELECT
                s.name AS view_schema,
                v.name AS view_name,
                v.create_date AS created,
                v.modify_date AS last_altered
            FROM sys.views v
            INNER JOIN sys.schemas s ON v.schema_id = s.schema_id
            WHERE v.is_ms_shipped = 0"#;

    pub const VIEW_DEFINITION: &str = r#"
            SELECT m.definition
            FROM sys.sql_modules m
            INNER JOIN sys.views v ON m.object_id = v.object_id
            INNER JOIN sys.schemas s ON v.schema_id = s.schema_id
            WHERE s.name = @p1 AND v.name = @p2"#;

    pub const LIST_TRIGGERS: &str = r#"
            SELECT
                s.name AS schema_name,
                t.name AS trigger_name,
                OBJECT_NAME(tr.parent_id) AS table_name,
                tr.is_disabled,
                tr.create_date,
                tr.modify_date
            FROM sys.triggers tr
            INNER JOIN sys.objects t ON tr.object_id = t.object_id
            INNER JOIN sys.schemas s ON t.schema_id = s.schema_id
            WHERE 1=1"#;

    pub const TRIGGER_CODE: &str = r#"
            SELECT m.definition
            FROM sys.sql_modules m
            INNER JOIN sys.triggers tr ON m.object_id = tr.object_id
            INNER JOIN sys.objects t ON tr.object_id = t.object_id
            INNER JOIN sys.schemas s ON t.schema_id = s.schema_id
            WHERE s.name = @p1 AND t.name = @p2"#;

    pub const DETAILS: &str = r#"
            SELECT
                {database} AS database_name,
                collation_name,
                recovery_model_desc,
                compatibility_level,
                create_date
            FROM sys.databases
            WHERE name = {database}"#;

    pub const OBJECT_COUNTS: &str = r#"
            SELECT
                COUNT(CASE WHEN type = 'U' THEN 1 END) AS tables,
                COUNT(CASE WHEN type = 'V' THEN 1 END) AS views,
                COUNT(CASE WHEN type = 'P' THEN 1 END) AS procedures,
                COUNT(CASE WHEN type IN ('FN', 'IF', 'TF') THEN 1 END) AS functions,
                COUNT(CASE WHEN type = 'TR' THEN 1 END) AS triggers
            FROM sys.objects
            WHERE is_ms_shipped = 0"#;

    pub const LIST_SCHEMAS: &str = r#"
            SELECT name
            FROM sys.schemas
            WHERE schema_id < 16384
                AND name NOT IN ({system_schemas})
            ORDER BY name"#;

    pub const SEARCH_OBJECTS: &str = r#"
            SELECT DISTINCT
                s.name AS schema_name,
                o.name AS object_name,
                o.type_desc AS object_type,
                o.create_date,
                o.modify_date,
                CASE WHEN m.definition IS NOT NULL THEN 1 ELSE 0 END AS has_code
            FROM sys.objects o
            INNER JOIN sys.schemas s ON o.schema_id = s.schema_id
            LEFT JOIN sys.sql_modules m ON o.object_id = m.object_id
            WHERE o.type IN ({types})
              AND (o.name LIKE {term}{code})
            ORDER BY s.name, o.name"#;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_and_quoting() {
        let d = SqlServerDialect;
        assert_eq!(d.placeholder(1), "@p1");
        assert_eq!(d.placeholder(12), "@p12");
        assert_eq!(d.quote_identifier("Order Details"), "[Order Details]");
    }

    #[test]
    fn test_pagination_keeps_order() {
        let d = SqlServerDialect;
        assert_eq!(
            d.pagination_clause(10, 20, "[name] ASC"),
            "ORDER BY [name] ASC OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
        );
    }

    #[test]
    fn test_search_defaults_to_all_types() {
        let sql = SqlServerDialect.search_objects(&[], false);
        assert!(sql.contains("o.type IN ('U', 'V', 'P', 'FN')"));
        assert!(!sql.contains("m.definition LIKE"));
    }

    #[test]
    fn test_search_in_code() {
        let sql = SqlServerDialect.search_objects(&["P"], true);
        assert!(sql.contains("o.type IN ('P')"));
        assert!(sql.contains("m.definition LIKE '%' + @p1 + '%'"));
    }

    #[test]
    fn test_search_type_code() {
        let d = SqlServerDialect;
        assert_eq!(d.search_type_code("Table"), Some("U"));
        assert_eq!(d.search_type_code("function"), Some("FN"));
        assert_eq!(d.search_type_code("trigger"), None);
    }

    #[test]
    fn test_exec_with_named_arguments() {
        let d = SqlServerDialect;
        assert_eq!(d.procedure_invocation("[dbo].[Nightly]", &[]), "EXEC [dbo].[Nightly]");
        assert_eq!(
            d.procedure_invocation("[dbo].[GetOrders]", &["CustomerId", "Since"]),
            "EXEC [dbo].[GetOrders] @CustomerId = @p1, @Since = @p2"
        );
    }

    #[test]
    fn test_disabled_trigger_filter() {
        let meta = SqlServerDialect.trigger_metadata();
        assert_eq!(meta.disabled_filter, " AND tr.is_disabled = 0");
    }
}
