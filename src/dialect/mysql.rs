//! MySQL / MariaDB dialect.
//!
//! Per-object queries fall back to `DATABASE()` when the schema argument is
//! empty, since MySQL has no default schema name of its own.

use super::{
    DatabaseInfoSql, Dialect, DriverType, FunctionMetadataSql, ProcedureMetadataSql,
    TableMetadataSql, TriggerMetadataSql, ViewMetadataSql, contains_pattern, limit_offset_clause,
    quoted_list, render_template,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn driver(&self) -> DriverType {
        DriverType::MySql
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name)
    }

    fn pagination_clause(&self, limit: u64, offset: u64, order_by: &str) -> String {
        limit_offset_clause(limit, offset, order_by)
    }

    fn concat(&self, parts: &[&str]) -> String {
        format!("CONCAT({})", parts.join(", "))
    }

    fn current_database(&self) -> &'static str {
        "DATABASE()"
    }

    fn system_schemas(&self) -> &'static [&'static str] {
        &["mysql", "information_schema", "performance_schema", "sys"]
    }

    fn search_type_code(&self, object_type: &str) -> Option<&'static str> {
        match object_type.to_ascii_lowercase().as_str() {
            "table" => Some("BASE TABLE"),
            "view" => Some("VIEW"),
            _ => None,
        }
    }

    // Routine bodies are not searched; `in_code` has no effect.
    fn search_objects(&self, type_codes: &[&'static str], _in_code: bool) -> String {
        let type_clause = if type_codes.is_empty() {
            String::new()
        } else {
            format!("\n              AND TABLE_TYPE IN ({})", quoted_list(type_codes))
        };
        let sql = queries::SEARCH_OBJECTS
            .replace("{term}", &contains_pattern(self, &self.placeholder(1)))
            .replace("{types}", &type_clause);
        render_template(self, &sql)
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
            schema_filter: " AND ROUTINE_SCHEMA = {p}",
            name_filter: " AND ROUTINE_NAME {like} {p}",
            order_by: " ORDER BY ROUTINE_SCHEMA, ROUTINE_NAME",
            get_code: queries::PROCEDURE_CODE,
        }
    }

    fn function_metadata(&self) -> FunctionMetadataSql {
        FunctionMetadataSql {
            list_functions: queries::LIST_FUNCTIONS,
            type_filter_scalar: "",
            type_filter_table: "",
            type_filter_all: "",
            schema_filter: " AND ROUTINE_SCHEMA = {p}",
            name_filter: " AND ROUTINE_NAME {like} {p}",
            order_by: " ORDER BY ROUTINE_SCHEMA, ROUTINE_NAME",
            get_code: queries::FUNCTION_CODE,
        }
    }

    fn view_metadata(&self) -> ViewMetadataSql {
        ViewMetadataSql {
            list_views: queries::LIST_VIEWS,
            schema_filter: " AND TABLE_SCHEMA = {p}",
            name_filter: " AND TABLE_NAME {like} {p}",
            order_by: " ORDER BY TABLE_SCHEMA, TABLE_NAME",
            get_definition: queries::VIEW_DEFINITION,
        }
    }

    fn trigger_metadata(&self) -> TriggerMetadataSql {
        // MySQL triggers cannot be disabled.
        TriggerMetadataSql {
            list_triggers: queries::LIST_TRIGGERS,
            schema_filter: " AND TRIGGER_SCHEMA = {p}",
            table_filter: " AND EVENT_OBJECT_TABLE = {p}",
            name_filter: " AND TRIGGER_NAME {like} {p}",
            disabled_filter: "",
            order_by: " ORDER BY TRIGGER_SCHEMA, EVENT_OBJECT_TABLE, TRIGGER_NAME",
            get_code: queries::TRIGGER_CODE,
        }
    }

    fn database_info(&self) -> DatabaseInfoSql {
        DatabaseInfoSql {
            version: "SELECT VERSION()",
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
            WHERE TABLE_SCHEMA = COALESCE(NULLIF(?, ''), {database}) AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION"#;

    pub const TABLE_EXISTS: &str = "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = COALESCE(NULLIF(?, ''), {database}) AND TABLE_NAME = ?";

    pub const GET_COLUMNS: &str = r#"
            SELECT
                COLUMN_NAME,
                DATA_TYPE,
                CHARACTER_MAXIMUM_LENGTH,
                IS_NULLABLE,
                COLUMN_DEFAULT
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = COALESCE(NULLIF(?, ''), {database}) AND TABLE_NAME = ?
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
            WHERE c.TABLE_SCHEMA = COALESCE(NULLIF(?, ''), {database}) AND c.TABLE_NAME = ?
            ORDER BY c.ORDINAL_POSITION"#;

    pub const GET_PRIMARY_KEY: &str = r#"
            SELECT ku.COLUMN_NAME
            FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
            JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE ku
                ON tc.CONSTRAINT_NAME = ku.CONSTRAINT_NAME
                AND tc.TABLE_SCHEMA = ku.TABLE_SCHEMA
                AND tc.TABLE_NAME = ku.TABLE_NAME
            WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY'
                AND tc.TABLE_SCHEMA = COALESCE(NULLIF(?, ''), {database})
                AND tc.TABLE_NAME = ?
            ORDER BY ku.ORDINAL_POSITION"#;

    pub const GET_INDEXES: &str = r#"
            SELECT
                INDEX_NAME AS index_name,
                INDEX_TYPE AS index_type,
                CASE WHEN NON_UNIQUE = 0 THEN 1 ELSE 0 END AS is_unique,
                COLUMN_NAME AS column_name
            FROM INFORMATION_SCHEMA.STATISTICS
            WHERE TABLE_SCHEMA = COALESCE(NULLIF(?, ''), {database}) AND TABLE_NAME = ?
            ORDER BY INDEX_NAME, SEQ_IN_INDEX"#;

    pub const GET_FOREIGN_KEYS: &str = r#"
            SELECT
                kcu.CONSTRAINT_NAME AS constraint_name,
                kcu.COLUMN_NAME AS column_name,
                kcu.REFERENCED_TABLE_SCHEMA AS referenced_schema,
                kcu.REFERENCED_TABLE_NAME AS referenced_table,
                kcu.REFERENCED_COLUMN_NAME AS referenced_column
            FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
            WHERE kcu.TABLE_SCHEMA = COALESCE(NULLIF(?, ''), {database})
                AND kcu.TABLE_NAME = ?
                AND kcu.REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY kcu.CONSTRAINT_NAME"#;

    pub const LIST_PROCEDURES: &str = r#"
            SELECT
                ROUTINE_SCHEMA AS routine_schema,
                ROUTINE_NAME AS routine_name,
                CREATED AS created,
                LAST_ALTERED AS last_altered
            FROM INFORMATION_SCHEMA.ROUTINES
            WHERE ROUTINE_TYPE = 'PROCEDURE'
                AND ROUTINE_SCHEMA NOT IN ({system_schemas})"#;

    pub const PROCEDURE_CODE: &str = r#"
            SELECT ROUTINE_DEFINITION
            FROM INFORMATION_SCHEMA.ROUTINES
            WHERE ROUTINE_SCHEMA = COALESCE(NULLIF(?, ''), {database}) AND ROUTINE_NAME = ? AND ROUTINE_TYPE = 'PROCEDURE'"#;

    pub const LIST_FUNCTIONS: &str = r#"
            SELECT
                ROUTINE_SCHEMA AS routine_schema,
                ROUTINE_NAME AS routine_name,
                'FUNCTION' AS function_type,
                CREATED AS created,
                LAST_ALTERED AS last_altered
            FROM INFORMATION_SCHEMA.ROUTINES
            WHERE ROUTINE_TYPE = 'FUNCTION'
                AND ROUTINE_SCHEMA NOT IN ({system_schemas})"#;

    pub const FUNCTION_CODE: &str = r#"
            SELECT ROUTINE_DEFINITION
            FROM INFORMATION_SCHEMA.ROUTINES
            WHERE ROUTINE_SCHEMA = COALESCE(NULLIF(?, ''), {database}) AND ROUTINE_NAME = ? AND ROUTINE_TYPE = 'FUNCTION'"#;

    pub const LIST_VIEWS: &str = r#"
            SELECT
                TABLE_SCHEMA AS view_schema,
                TABLE_NAME AS view_name,
                NULL AS created,
                NULL AS last_altered
            FROM INFORMATION_SCHEMA.VIEWS
            WHERE TABLE_SCHEMA NOT IN ({system_schemas})"#;

    pub const VIEW_DEFINITION: &str = r#"
            SELECT VIEW_DEFINITION
            FROM INFORMATION_SCHEMA.VIEWS
            WHERE TABLE_SCHEMA = COALESCE(NULLIF(?, ''), {database}) AND TABLE_NAME = ?"#;

    pub const LIST_TRIGGERS: &str = r#"
            SELECT
                TRIGGER_SCHEMA AS schema_name,
                TRIGGER_NAME AS trigger_name,
                EVENT_OBJECT_TABLE AS table_name,
                0 AS is_disabled,
                CREATED AS create_date,
                NULL AS modify_date
            FROM INFORMATION_SCHEMA.TRIGGERS
            WHERE TRIGGER_SCHEMA NOT IN ({system_schemas})"#;

    pub const TRIGGER_CODE: &str = r#"
            SELECT ACTION_STATEMENT
            FROM INFORMATION_SCHEMA.TRIGGERS
            WHERE TRIGGER_SCHEMA = COALESCE(NULLIF(?, ''), {database}) AND TRIGGER_NAME = ?"#;

    pub const DETAILS: &str = r#"
            SELECT
                {database} AS database_name,
                DEFAULT_CHARACTER_SET_NAME AS character_set,
                DEFAULT_COLLATION_NAME AS collation_name
            FROM INFORMATION_SCHEMA.SCHEMATA
            WHERE SCHEMA_NAME = {database}"#;

    pub const OBJECT_COUNTS: &str = r#"
            SELECT
                SUM(CASE WHEN TABLE_TYPE = 'BASE TABLE' THEN 1 ELSE 0 END) AS tables,
                SUM(CASE WHEN TABLE_TYPE = 'VIEW' THEN 1 ELSE 0 END) AS views,
                (SELECT COUNT(*) FROM INFORMATION_SCHEMA.ROUTINES WHERE ROUTINE_TYPE = 'PROCEDURE' AND ROUTINE_SCHEMA = {database}) AS procedures,
                (SELECT COUNT(*) FROM INFORMATION_SCHEMA.ROUTINES WHERE ROUTINE_TYPE = 'FUNCTION' AND ROUTINE_SCHEMA = {database}) AS functions,
                (SELECT COUNT(*) FROM INFORMATION_SCHEMA.TRIGGERS WHERE TRIGGER_SCHEMA = {database}) AS triggers
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_SCHEMA = {database}"#;

    pub const LIST_SCHEMAS: &str = r#"
            SELECT SCHEMA_NAME
            FROM INFORMATION_SCHEMA.SCHEMATA
            WHERE SCHEMA_NAME NOT IN ({system_schemas})
            ORDER BY SCHEMA_NAME"#;

    pub const SEARCH_OBJECTS: &str = r#"
            SELECT
                TABLE_SCHEMA AS schema_name,
                TABLE_NAME AS object_name,
                TABLE_TYPE AS object_type,
                CREATE_TIME AS create_date,
                UPDATE_TIME AS modify_date,
                0 AS has_code
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_SCHEMA NOT IN ({system_schemas})
              AND TABLE_NAME LIKE {term}{types}
            ORDER BY TABLE_SCHEMA, TABLE_NAME"#;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_carries_no_index() {
        let d = MySqlDialect;
        assert_eq!(d.placeholder(1), "?");
        assert_eq!(d.placeholder(9), "?");
    }

    #[test]
    fn test_backtick_quoting() {
        assert_eq!(MySqlDialect.quote_identifier("order"), "`order`");
    }

    #[test]
    fn test_search_ignores_in_code() {
        let d = MySqlDialect;
        assert_eq!(d.search_objects(&[], true), d.search_objects(&[], false));
        assert_eq!(d.search_term_binds(true), 1);
    }

    #[test]
    fn test_search_type_clause() {
        let sql = MySqlDialect.search_objects(&["BASE TABLE", "VIEW"], false);
        assert!(sql.contains("AND TABLE_TYPE IN ('BASE TABLE', 'VIEW')"));
        assert!(sql.contains("TABLE_NAME LIKE CONCAT('%', ?, '%')"));
        assert!(
            sql.contains("NOT IN ('mysql', 'information_schema', 'performance_schema', 'sys')")
        );
        assert_eq!(sql.matches('?').count(), 1);
    }

    #[test]
    fn test_per_object_queries_fall_back_to_current_database() {
        let d = MySqlDialect;
        let sql = render_template(&d, d.table_metadata().get_columns);
        assert!(sql.contains("COALESCE(NULLIF(?, ''), DATABASE())"));
        assert_eq!(sql.matches('?').count(), 2);
    }
}
