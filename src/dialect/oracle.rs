//! Oracle Database dialect (12c+ for OFFSET/FETCH).
//!
//! Unquoted identifiers live upper-cased in the Oracle catalog, so quoting and
//! filter values are upper-cased too. Per-object queries fall back to the
//! connected user when the owner argument is empty (Oracle treats `''` as NULL).

use super::{
    DatabaseInfoSql, Dialect, DriverType, FunctionMetadataSql, ProcedureMetadataSql,
    TableMetadataSql, TriggerMetadataSql, ViewMetadataSql, contains_pattern, offset_fetch_clause,
    placeholder_list, quoted_list, render_template,
};
use crate::models::RowSet;

#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDialect;

impl Dialect for OracleDialect {
    fn driver(&self) -> DriverType {
        DriverType::Oracle
    }

    fn placeholder(&self, index: usize) -> String {
        format!(":{}", index)
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.to_uppercase())
    }

    fn pagination_clause(&self, limit: u64, offset: u64, order_by: &str) -> String {
        offset_fetch_clause(limit, offset, order_by)
    }

    fn current_database(&self) -> &'static str {
        "SYS_CONTEXT('USERENV', 'DB_NAME')"
    }

    fn system_schemas(&self) -> &'static [&'static str] {
        &[
            "SYS", "SYSTEM", "OUTLN", "XDB", "WMSYS", "CTXSYS", "MDSYS", "OLAPSYS", "DBSNMP",
        ]
    }

    fn normalize_identifier(&self, name: &str) -> String {
        name.to_uppercase()
    }

    /// Anonymous PL/SQL block; `CALL` is not available to every client.
    fn procedure_invocation(&self, target: &str, params: &[&str]) -> String {
        let placeholders = placeholder_list(self, 1, params.len());
        format!("BEGIN {}({}); END;", target, placeholders.join(", "))
    }

    /// `all_source` keeps one row per line, in `line` order.
    fn assemble_source(&self, rows: &RowSet) -> String {
        rows.first_column_strings().concat()
    }

    fn search_type_code(&self, object_type: &str) -> Option<&'static str> {
        match object_type.to_ascii_lowercase().as_str() {
            "table" => Some("TABLE"),
            "view" => Some("VIEW"),
            "procedure" => Some("PROCEDURE"),
            "function" => Some("FUNCTION"),
            _ => None,
        }
    }

    // Source text lives in all_source and is not searched; `in_code` has no effect.
    fn search_objects(&self, type_codes: &[&'static str], _in_code: bool) -> String {
        let type_clause = if type_codes.is_empty() {
            String::new()
        } else {
            format!("\n              AND object_type IN ({})", quoted_list(type_codes))
        };
        let sql = queries::SEARCH_OBJECTS
            .replace("{term}", &contains_pattern(self, &self.placeholder(1)))
            .replace("{types}", &type_clause);
        render_template(self, &sql)
    }

    fn table_metadata(&self) -> TableMetadataSql {
        TableMetadataSql {
            list_tables: queries::LIST_TABLES,
            schema_filter: " AND owner = {p}",
            name_filter: " AND table_name {like} {p}",
            order_by: " ORDER BY owner, table_name",
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
            schema_filter: " AND owner = {p}",
            name_filter: " AND object_name {like} {p}",
            order_by: " ORDER BY owner, object_name",
            get_code: queries::PROCEDURE_CODE,
        }
    }

    fn function_metadata(&self) -> FunctionMetadataSql {
        FunctionMetadataSql {
            list_functions: queries::LIST_FUNCTIONS,
            type_filter_scalar: "",
            type_filter_table: "",
            type_filter_all: "",
            schema_filter: " AND owner = {p}",
            name_filter: " AND object_name {like} {p}",
            order_by: " ORDER BY owner, object_name",
            get_code: queries::FUNCTION_CODE,
        }
    }

    fn view_metadata(&self) -> ViewMetadataSql {
        ViewMetadataSql {
            list_views: queries::LIST_VIEWS,
            schema_filter: " AND owner = {p}",
            name_filter: " AND view_name {like} {p}",
            order_by: " ORDER BY owner, view_name",
            get_definition: queries::VIEW_DEFINITION,
        }
    }

    fn trigger_metadata(&self) -> TriggerMetadataSql {
        TriggerMetadataSql {
            list_triggers: queries::LIST_TRIGGERS,
            schema_filter: " AND owner = {p}",
            table_filter: " AND table_name = {p}",
            name_filter: " AND trigger_name {like} {p}",
            disabled_filter: " AND status = 'ENABLED'",
            order_by: " ORDER BY owner, table_name, trigger_name",
            get_code: queries::TRIGGER_CODE,
        }
    }

    fn database_info(&self) -> DatabaseInfoSql {
        DatabaseInfoSql {
            version: "SELECT banner FROM v$version WHERE banner LIKE 'Oracle%'",
            details: "",
            object_counts: queries::OBJECT_COUNTS,
            list_schemas: queries::LIST_SCHEMAS,
        }
    }
}

mod queries {
    pub const LIST_TABLES: &str = r#"
            SELECT
                owner AS table_schema,
                table_name,
                'BASE TABLE' AS table_type
            FROM all_tables
            WHERE owner NOT IN ({system_schemas})"#;

    pub const DESCRIBE_TABLE: &str = r#"
            SELECT
                column_name,
                data_type,
                nullable AS is_nullable,
                data_default AS column_default,
                data_length AS character_maximum_length
            FROM all_tab_columns
            WHERE owner = COALESCE(:1, USER) AND table_name = :2
            ORDER BY column_id"#;

    pub const TABLE_EXISTS: &str =
        "SELECT COUNT(*) FROM all_tables WHERE owner = COALESCE(:1, USER) AND table_name = :2";

    pub const GET_COLUMNS: &str = r#"
            SELECT
                column_name,
                data_type,
                data_length,
                nullable,
                data_default
            FROM all_tab_columns
            WHERE owner = COALESCE(:1, USER) AND table_name = :2
            ORDER BY column_id"#;

    pub const GET_FULL_SCHEMA: &str = r#"
            SELECT
                c.column_name,
                c.data_type,
                c.data_length,
                c.data_precision,
                c.data_scale,
                c.nullable,
                c.data_default,
                CASE WHEN pk.column_name IS NOT NULL THEN 'YES' ELSE 'NO' END AS is_primary_key
            FROM all_tab_columns c
            LEFT JOIN (
                SELECT acc.owner, acc.table_name, acc.column_name
                FROM all_constraints ac
                JOIN all_cons_columns acc
                    ON ac.constraint_type = 'P'
                    AND ac.constraint_name = acc.constraint_name
                    AND ac.owner = acc.owner
            ) pk ON c.owner = pk.owner
                AND c.table_name = pk.table_name
                AND c.column_name = pk.column_name
            WHERE c.owner = COALESCE(:1, USER) AND c.table_name = :2
            ORDER BY c.column_id"#;

    pub const GET_PRIMARY_KEY: &str = r#"
            SELECT acc.column_name
            FROM all_constraints ac
            JOIN all_cons_columns acc
                ON ac.constraint_name = acc.constraint_name
                AND ac.owner = acc.owner
            WHERE ac.constraint_type = 'P'
                AND ac.owner = COALESCE(:1, USER)
                AND ac.table_name = :2
            ORDER BY acc.position"#;

    pub const GET_INDEXES: &str = r#"
            SELECT
                i.index_name,
                i.index_type,
                CASE WHEN i.uniqueness = 'UNIQUE' THEN 1 ELSE 0 END AS is_unique,
                ic.column_name
            FROM all_indexes i
            JOIN all_ind_columns ic ON i.index_name = ic.index_name AND i.owner = ic.index_owner
            WHERE i.owner = COALESCE(:1, USER) AND i.table_name = :2
            ORDER BY i.index_name, ic.column_position"#;

    pub const GET_FOREIGN_KEYS: &str = r#"
            SELECT
                ac.constraint_name,
                acc.column_name,
                ac_ref.owner AS referenced_schema,
                ac_ref.table_name AS referenced_table,
                acc_ref.column_name AS referenced_column
            FROM all_constraints ac
            JOIN all_cons_columns acc
                ON ac.constraint_name = acc.constraint_name
                AND ac.owner = acc.owner
            JOIN all_constraints ac_ref
                ON ac.r_constraint_name = ac_ref.constraint_name
                AND ac.r_owner = ac_ref.owner
            JOIN all_cons_columns acc_ref
                ON ac_ref.constraint_name = acc_ref.constraint_name
                AND ac_ref.owner = acc_ref.owner
                AND acc_ref.position = acc.position
            WHERE ac.constraint_type = 'R'
                AND ac.owner = COALESCE(:1, USER)
                AND ac.table_name = :2
            ORDER BY ac.constraint_name"#;

    pub const LIST_PROCEDURES: &str = r#"
            SELECT
                owner AS routine_schema,
                object_name AS routine_name,
                created,
                last_ddl_time AS last_altered
            FROM all_objects
            WHERE object_type = 'PROCEDURE'
                AND owner NOT IN ({system_schemas})"#;

    pub const PROCEDURE_CODE: &str = r#"
            SELECT text
            FROM all_source
            WHERE owner = COALESCE(:1, USER) AND name = :2 AND type = 'PROCEDURE'
            ORDER BY line"#;

    pub const LIST_FUNCTIONS: &str = r#"
            SELECT
                owner AS routine_schema,
                object_name AS routine_name,
                'FUNCTION' AS function_type,
                created,
                last_ddl_time AS last_altered
            FROM all_objects
            WHERE object_type = 'FUNCTION'
                AND owner NOT IN ({system_schemas})"#;

    pub const FUNCTION_CODE: &str = r#"
            SELECT text
            FROM all_source
            WHERE owner = COALESCE(:1, USER) AND name = :2 AND type = 'FUNCTION'
            ORDER BY line"#;

    pub const LIST_VIEWS: &str = r#"
            SELECT
                owner AS view_schema,
                view_name,
                NULL AS created,
                NULL AS last_altered
            FROM all_views
            WHERE owner NOT IN ({system_schemas})"#;

    pub const VIEW_DEFINITION: &str = r#"
            SELECT text
            FROM all_views
            WHERE owner = COALESCE(:1, USER) AND view_name = :2"#;

    pub const LIST_TRIGGERS: &str = r#"
            SELECT
                owner AS schema_name,
                trigger_name,
                table_name,
                CASE WHEN status = 'DISABLED' THEN 1 ELSE 0 END AS is_disabled,
                NULL AS create_date,
                NULL AS modify_date
            FROM all_triggers
            WHERE owner NOT IN ({system_schemas})"#;

    pub const TRIGGER_CODE: &str = r#"
            SELECT trigger_body
            FROM all_triggers
            WHERE owner = COALESCE(:1, USER) AND trigger_name = :2"#;

    pub const OBJECT_COUNTS: &str = r#"
            SELECT
                COUNT(CASE WHEN object_type = 'TABLE' THEN 1 END) AS tables,
                COUNT(CASE WHEN object_type = 'VIEW' THEN 1 END) AS views,
                COUNT(CASE WHEN object_type = 'PROCEDURE' THEN 1 END) AS procedures,
                COUNT(CASE WHEN object_type = 'FUNCTION' THEN 1 END) AS functions,
                COUNT(CASE WHEN object_type = 'TRIGGER' THEN 1 END) AS triggers
            FROM all_objects
            WHERE owner = USER"#;

    pub const LIST_SCHEMAS: &str = r#"
            SELECT username
            FROM all_users
            WHERE username NOT IN ({system_schemas})
            ORDER BY username"#;

    pub const SEARCH_OBJECTS: &str = r#"
            SELECT
                owner AS schema_name,
                object_name,
                object_type,
                created AS create_date,
                last_ddl_time AS modify_date,
                0 AS has_code
            FROM all_objects
            WHERE owner NOT IN ({system_schemas})
              AND object_name LIKE {term}{types}
            ORDER BY owner, object_name"#;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_upper_cases() {
        let d = OracleDialect;
        assert_eq!(d.quote_identifier("employees"), "\"EMPLOYEES\"");
        assert_eq!(d.normalize_identifier("hr"), "HR");
    }

    #[test]
    fn test_numbered_placeholders() {
        assert_eq!(OracleDialect.placeholder(3), ":3");
    }

    #[test]
    fn test_database_details_absent() {
        assert!(OracleDialect.database_info().details.is_empty());
    }

    #[test]
    fn test_search_type_clause() {
        let sql = OracleDialect.search_objects(&["PROCEDURE"], true);
        assert!(sql.contains("AND object_type IN ('PROCEDURE')"));
        assert!(sql.contains("object_name LIKE '%' || :1 || '%'"));
    }

    #[test]
    fn test_plsql_block_invocation() {
        assert_eq!(
            OracleDialect.procedure_invocation("\"HR\".\"RECALC\"", &["x"]),
            "BEGIN \"HR\".\"RECALC\"(:1); END;"
        );
    }

    #[test]
    fn test_listings_exclude_system_owners() {
        let d = OracleDialect;
        let sql = render_template(&d, d.view_metadata().list_views);
        assert!(sql.contains("owner NOT IN ('SYS', 'SYSTEM', 'OUTLN'"));
        assert!(sql.contains("'DBSNMP')"));
    }

    #[test]
    fn test_disabled_filter() {
        assert_eq!(
            OracleDialect.trigger_metadata().disabled_filter,
            " AND status = 'ENABLED'"
        );
    }
}
