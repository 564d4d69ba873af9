//! PostgreSQL dialect.

use super::{
    DatabaseInfoSql, Dialect, DialectFeature, DriverType, FunctionMetadataSql,
    ProcedureMetadataSql, TableMetadataSql, TriggerMetadataSql, ViewMetadataSql,
    contains_pattern, limit_offset_clause, quoted_list, render_template,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn driver(&self) -> DriverType {
        DriverType::PostgreSql
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name)
    }

    fn pagination_clause(&self, limit: u64, offset: u64, order_by: &str) -> String {
        limit_offset_clause(limit, offset, order_by)
    }

    fn current_database(&self) -> &'static str {
        "current_database()"
    }

    fn system_schemas(&self) -> &'static [&'static str] {
        &["pg_catalog", "information_schema", "pg_toast"]
    }

    fn supports_feature(&self, _feature: DialectFeature) -> bool {
        true
    }

    fn search_type_code(&self, object_type: &str) -> Option<&'static str> {
        match object_type.to_ascii_lowercase().as_str() {
            "table" => Some("BASE TABLE"),
            "view" => Some("VIEW"),
            _ => None,
        }
    }

    fn search_objects(&self, type_codes: &[&'static str], in_code: bool) -> String {
        let pattern = contains_pattern(self, &self.placeholder(1));
        let code_clause = if in_code {
            format!(" OR v.view_definition {{like}} {}", pattern)
        } else {
            String::new()
        };
        let type_clause = if type_codes.is_empty() {
            String::new()
        } else {
            format!("\n              AND t.table_type IN ({})", quoted_list(type_codes))
        };
        let sql = queries::SEARCH_OBJECTS
            .replace("{term}", &pattern)
            .replace("{code}", &code_clause)
            .replace("{types}", &type_clause);
        render_template(self, &sql)
    }

    fn table_metadata(&self) -> TableMetadataSql {
        TableMetadataSql {
            list_tables: queries::LIST_TABLES,
            schema_filter: " AND table_schema = {p}",
            name_filter: " AND table_name {like} {p}",
            order_by: " ORDER BY table_schema, table_name",
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
            schema_filter: " AND routine_schema = {p}",
            name_filter: " AND routine_name {like} {p}",
            order_by: " ORDER BY routine_schema, routine_name",
            get_code: queries::PROCEDURE_CODE,
        }
    }

    fn function_metadata(&self) -> FunctionMetadataSql {
        // proretset distinguishes set-returning functions; no separate type filter.
        FunctionMetadataSql {
            list_functions: queries::LIST_FUNCTIONS,
            type_filter_scalar: "",
            type_filter_table: "",
            type_filter_all: "",
            schema_filter: " AND n.nspname = {p}",
            name_filter: " AND p.proname {like} {p}",
            order_by: " ORDER BY n.nspname, p.proname",
            get_code: queries::FUNCTION_CODE,
        }
    }

    fn view_metadata(&self) -> ViewMetadataSql {
        ViewMetadataSql {
            list_views: queries::LIST_VIEWS,
            schema_filter: " AND table_schema = {p}",
            name_filter: " AND table_name {like} {p}",
            order_by: " ORDER BY table_schema, table_name",
            get_definition: queries::VIEW_DEFINITION,
        }
    }

    fn trigger_metadata(&self) -> TriggerMetadataSql {
        TriggerMetadataSql {
            list_triggers: queries::LIST_TRIGGERS,
            schema_filter: " AND n.nspname = {p}",
            table_filter: " AND c.relname = {p}",
            name_filter: " AND t.tgname {like} {p}",
            disabled_filter: " AND t.tgenabled <> 'D'",
            order_by: " ORDER BY n.nspname, c.relname, t.tgname",
            get_code: queries::TRIGGER_CODE,
        }
    }

    fn database_info(&self) -> DatabaseInfoSql {
        DatabaseInfoSql {
            version: "SELECT version()",
            details: queries::DETAILS,
            object_counts: queries::OBJECT_COUNTS,
            list_schemas: queries::LIST_SCHEMAS,
        }
    }
}

mod queries {
    pub const LIST_TABLES: &str = r#"
            SELECT
                table_schema,
                table_name,
                table_type
            FROM information_schema.tables
            WHERE table_type = 'BASE TABLE'
                AND table_schema NOT IN ({system_schemas})"#;

    pub const DESCRIBE_TABLE: &str = r#"
            SELECT
                column_name,
                data_type,
                is_nullable,
                column_default,
                character_maximum_length
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position"#;

    pub const TABLE_EXISTS: &str = "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = $1 AND table_name = $2";

    pub const GET_COLUMNS: &str = r#"
            SELECT
                column_name,
                data_type,
                character_maximum_length,
                is_nullable,
                column_default
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position"#;

    pub const GET_FULL_SCHEMA: &str = r#"
            SELECT
                c.column_name,
                c.data_type,
                c.character_maximum_length,
                c.numeric_precision,
                c.numeric_scale,
                c.is_nullable,
                c.column_default,
                CASE WHEN pk.column_name IS NOT NULL THEN 'YES' ELSE 'NO' END AS is_primary_key
            FROM information_schema.columns c
            LEFT JOIN (
                SELECT ku.table_schema, ku.table_name, ku.column_name
                FROM information_schema.table_constraints tc
                JOIN information_schema.key_column_usage ku
                    ON tc.constraint_type = 'PRIMARY KEY'
                    AND tc.constraint_name = ku.constraint_name
                    AND tc.table_schema = ku.table_schema
                    AND tc.table_name = ku.table_name
            ) pk ON c.table_schema = pk.table_schema
                AND c.table_name = pk.table_name
                AND c.column_name = pk.column_name
            WHERE c.table_schema = $1 AND c.table_name = $2
            ORDER BY c.ordinal_position"#;

    pub const GET_PRIMARY_KEY: &str = r#"
            SELECT ku.column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage ku
                ON tc.constraint_name = ku.constraint_name
                AND tc.table_schema = ku.table_schema
                AND tc.table_name = ku.table_name
            WHERE tc.constraint_type = 'PRIMARY KEY'
                AND tc.table_schema = $1
                AND tc.table_name = $2
            ORDER BY ku.ordinal_position"#;

    pub const GET_INDEXES: &str = r#"
            SELECT
                i.indexname AS index_name,
                a.amname AS index_type,
                ix.indisunique AS is_unique,
                a2.attname AS column_name
            FROM pg_indexes i
            JOIN pg_class c ON i.indexname = c.relname
            JOIN pg_index ix ON c.oid = ix.indexrelid
            JOIN pg_class t ON ix.indrelid = t.oid
            JOIN pg_namespace n ON t.relnamespace = n.oid
            JOIN pg_am a ON c.relam = a.oid
            JOIN pg_attribute a2 ON a2.attrelid = t.oid AND a2.attnum = ANY(ix.indkey)
            WHERE n.nspname = $1 AND t.relname = $2
            ORDER BY i.indexname"#;

    pub const GET_FOREIGN_KEYS: &str = r#"
            SELECT
                tc.constraint_name,
                kcu.column_name,
                ccu.table_schema AS referenced_schema,
                ccu.table_name AS referenced_table,
                ccu.column_name AS referenced_column
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            JOIN information_schema.constraint_column_usage ccu
                ON ccu.constraint_name = tc.constraint_name
                AND ccu.table_schema = tc.table_schema
            WHERE tc.constraint_type = 'FOREIGN KEY'
                AND tc.table_schema = $1
                AND tc.table_name = $2
            ORDER BY tc.constraint_name"#;

    pub const LIST_PROCEDURES: &str = r#"
            SELECT
                routine_schema,
                routine_name,
                NULL::timestamp AS created,
                NULL::timestamp AS last_altered
            FROM information_schema.routines
            WHERE routine_type = 'PROCEDURE'
                AND routine_schema NOT IN ({system_schemas})"#;

    pub const PROCEDURE_CODE: &str = r#"
            SELECT pg_get_functiondef(p.oid)
            FROM pg_proc p
            JOIN pg_namespace n ON p.pronamespace = n.oid
            WHERE n.nspname = $1 AND p.proname = $2 AND p.prokind = 'p'"#;

    pub const LIST_FUNCTIONS: &str = r#"
            SELECT
                n.nspname AS routine_schema,
                p.proname AS routine_name,
                CASE WHEN p.proretset THEN 'TABLE' ELSE 'SCALAR' END AS function_type,
                NULL::timestamp AS created,
                NULL::timestamp AS last_altered
            FROM pg_proc p
            JOIN pg_namespace n ON p.pronamespace = n.oid
            WHERE n.nspname NOT IN ({system_schemas})
                AND p.prokind = 'f'"#;

    pub const FUNCTION_CODE: &str = r#"
            SELECT pg_get_functiondef(p.oid)
            FROM pg_proc p
            JOIN pg_namespace n ON p.pronamespace = n.oid
            WHERE n.nspname = $1 AND p.proname = $2 AND p.prokind = 'f'"#;

    pub const LIST_VIEWS: &str = r#"
            SELECT
                table_schema AS view_schema,
                table_name AS view_name,
                NULL::timestamp AS created,
                NULL::timestamp AS last_altered
            FROM information_schema.views
            WHERE table_schema NOT IN ({system_schemas})"#;

    pub const VIEW_DEFINITION: &str = r#"
            SELECT view_definition
            FROM information_schema.views
            WHERE table_schema = $1 AND table_name = $2"#;

    pub const LIST_TRIGGERS: &str = r#"
            SELECT
                n.nspname AS schema_name,
                t.tgname AS trigger_name,
                c.relname AS table_name,
                t.tgenabled = 'D' AS is_disabled,
                NULL::timestamp AS create_date,
                NULL::timestamp AS modify_date
            FROM pg_trigger t
            JOIN pg_class c ON t.tgrelid = c.oid
            JOIN pg_namespace n ON c.relnamespace = n.oid
            WHERE NOT t.tgisinternal
                AND n.nspname NOT IN ({system_schemas})"#;

    pub const TRIGGER_CODE: &str = r#"
            SELECT pg_get_triggerdef(t.oid)
            FROM pg_trigger t
            JOIN pg_class c ON t.tgrelid = c.oid
            JOIN pg_namespace n ON c.relnamespace = n.oid
            WHERE n.nspname = $1 AND t.tgname = $2"#;

    pub const DETAILS: &str = r#"
            SELECT
                {database} AS database_name,
                pg_encoding_to_char(encoding) AS encoding,
                datcollate AS collation
            FROM pg_database
            WHERE datname = {database}"#;

    pub const OBJECT_COUNTS: &str = r#"
            SELECT
                COUNT(CASE WHEN table_type = 'BASE TABLE' THEN 1 END) AS tables,
                COUNT(CASE WHEN table_type = 'VIEW' THEN 1 END) AS views,
                (SELECT COUNT(*) FROM pg_proc p JOIN pg_namespace n ON p.pronamespace = n.oid WHERE n.nspname NOT IN ({system_schemas}) AND p.prokind = 'p') AS procedures,
                (SELECT COUNT(*) FROM pg_proc p JOIN pg_namespace n ON p.pronamespace = n.oid WHERE n.nspname NOT IN ({system_schemas}) AND p.prokind = 'f') AS functions,
                (SELECT COUNT(*) FROM pg_trigger t JOIN pg_class c ON t.tgrelid = c.oid JOIN pg_namespace n ON c.relnamespace = n.oid WHERE n.nspname NOT IN ({system_schemas}) AND NOT t.tgisinternal) AS triggers
            FROM information_schema.tables
            WHERE table_schema NOT IN ({system_schemas})"#;

    pub const LIST_SCHEMAS: &str = r#"
            SELECT schema_name
            FROM information_schema.schemata
            WHERE schema_name NOT IN ({system_schemas})
            ORDER BY schema_name"#;

    pub const SEARCH_OBJECTS: &str = r#"
            SELECT
                t.table_schema AS schema_name,
                t.table_name AS object_name,
                t.table_type AS object_type,
                NULL::timestamp AS create_date,
                NULL::timestamp AS modify_date,
                CASE WHEN v.view_definition IS NOT NULL THEN 1 ELSE 0 END AS has_code
            FROM information_schema.tables t
            LEFT JOIN information_schema.views v
                ON v.table_schema = t.table_schema AND v.table_name = t.table_name
            WHERE t.table_schema NOT IN ({system_schemas})
              AND (t.table_name {like} {term}{code}){types}
            ORDER BY t.table_schema, t.table_name"#;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_and_quoting() {
        let d = PostgresDialect;
        assert_eq!(d.placeholder(1), "$1");
        assert_eq!(d.placeholder(7), "$7");
        assert_eq!(d.quote_identifier("users"), "\"users\"");
    }

    #[test]
    fn test_supports_ilike() {
        assert!(PostgresDialect.supports_feature(DialectFeature::ILike));
        assert_eq!(PostgresDialect.like_operator(false), "ILIKE");
        assert_eq!(PostgresDialect.like_operator(true), "LIKE");
    }

    #[test]
    fn test_name_filters_use_like_slot() {
        let d = PostgresDialect;
        assert_eq!(d.table_metadata().name_filter, " AND table_name {like} {p}");
        assert_eq!(
            render_template(&d, d.view_metadata().name_filter),
            " AND table_name ILIKE {p}"
        );
    }

    #[test]
    fn test_call_invocation() {
        assert_eq!(
            PostgresDialect.procedure_invocation("\"public\".\"refresh\"", &["a", "b"]),
            "CALL \"public\".\"refresh\"($1, $2)"
        );
    }

    #[test]
    fn test_search_with_types_and_code() {
        let sql = PostgresDialect.search_objects(&["VIEW"], true);
        assert!(sql.contains("AND t.table_type IN ('VIEW')"));
        assert!(sql.contains("t.table_name ILIKE '%' || $1 || '%'"));
        assert!(sql.contains("v.view_definition ILIKE '%' || $1 || '%'"));
        assert!(sql.contains("NOT IN ('pg_catalog', 'information_schema', 'pg_toast')"));
    }

    #[test]
    fn test_search_without_types() {
        let sql = PostgresDialect.search_objects(&[], false);
        assert!(!sql.contains("table_type IN"));
        assert!(!sql.contains("view_definition ILIKE"));
    }

    #[test]
    fn test_trigger_disabled_state_uses_tgenabled() {
        let meta = PostgresDialect.trigger_metadata();
        assert!(meta.list_triggers.contains("t.tgenabled = 'D' AS is_disabled"));
        assert_eq!(meta.disabled_filter, " AND t.tgenabled <> 'D'");
    }

    #[test]
    fn test_function_type_filters_are_empty() {
        let meta = PostgresDialect.function_metadata();
        assert!(meta.type_filter_scalar.is_empty());
        assert!(meta.type_filter_table.is_empty());
        assert!(meta.type_filter_all.is_empty());
    }
}
