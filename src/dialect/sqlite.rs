//! SQLite dialect.
//!
//! SQLite has no schemas, stored procedures or catalogued functions. Per-table
//! structure comes from `PRAGMA` statements whose rows have their own shape;
//! see [`crate::db::catalog`] for decoding.

use super::{
    DatabaseInfoSql, Dialect, DialectFeature, DriverType, FunctionMetadataSql,
    ProcedureMetadataSql, TableMetadataSql, TriggerMetadataSql, ViewMetadataSql,
    contains_pattern, limit_offset_clause, quoted_list,
};
use crate::models::QueryParam;

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn driver(&self) -> DriverType {
        DriverType::Sqlite
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name)
    }

    fn pagination_clause(&self, limit: u64, offset: u64, order_by: &str) -> String {
        limit_offset_clause(limit, offset, order_by)
    }

    fn current_database(&self) -> &'static str {
        "'main'"
    }

    fn system_schemas(&self) -> &'static [&'static str] {
        &[]
    }

    fn supports_feature(&self, feature: DialectFeature) -> bool {
        !matches!(
            feature,
            DialectFeature::StoredProcedures
                | DialectFeature::Functions
                | DialectFeature::Schemas
                | DialectFeature::ILike
        )
    }

    /// No schemas: tables are never qualified.
    fn qualify_table(&self, _schema: &str, table: &str) -> String {
        self.quote_identifier(table)
    }

    /// `sqlite_master` lookups match on the object name alone.
    fn object_args(&self, _schema: &str, name: &str) -> Vec<QueryParam> {
        vec![QueryParam::String(name.to_string())]
    }

    fn search_type_code(&self, object_type: &str) -> Option<&'static str> {
        match object_type.to_ascii_lowercase().as_str() {
            "table" => Some("table"),
            "view" => Some("view"),
            "trigger" => Some("trigger"),
            "index" => Some("index"),
            _ => None,
        }
    }

    fn search_objects(&self, type_codes: &[&'static str], in_code: bool) -> String {
        let pattern = contains_pattern(self, &self.placeholder(1));
        let code_clause = if in_code {
            format!(" OR sql LIKE {}", pattern)
        } else {
            String::new()
        };
        let type_clause = if type_codes.is_empty() {
            String::new()
        } else {
            format!("\n              AND type IN ({})", quoted_list(type_codes))
        };
        queries::SEARCH_OBJECTS
            .replace("{term}", &pattern)
            .replace("{code}", &code_clause)
            .replace("{types}", &type_clause)
    }

    // `?` carries no index, so the term is bound once per occurrence.
    fn search_term_binds(&self, in_code: bool) -> usize {
        if in_code { 2 } else { 1 }
    }

    fn table_metadata(&self) -> TableMetadataSql {
        TableMetadataSql {
            list_tables: queries::LIST_TABLES,
            schema_filter: "",
            name_filter: " AND name {like} {p}",
            order_by: " ORDER BY name",
            describe_table: queries::TABLE_INFO,
            table_exists: queries::TABLE_EXISTS,
            get_columns: queries::TABLE_INFO,
            get_full_schema: queries::TABLE_INFO,
            get_primary_key: queries::TABLE_INFO,
            get_indexes: queries::INDEX_LIST,
            get_foreign_keys: queries::FOREIGN_KEY_LIST,
        }
    }

    fn procedure_metadata(&self) -> ProcedureMetadataSql {
        ProcedureMetadataSql::default()
    }

    fn function_metadata(&self) -> FunctionMetadataSql {
        FunctionMetadataSql::default()
    }

    fn view_metadata(&self) -> ViewMetadataSql {
        ViewMetadataSql {
            list_views: queries::LIST_VIEWS,
            schema_filter: "",
            name_filter: " AND name {like} {p}",
            order_by: " ORDER BY name",
            get_definition: queries::VIEW_DEFINITION,
        }
    }

    fn trigger_metadata(&self) -> TriggerMetadataSql {
        TriggerMetadataSql {
            list_triggers: queries::LIST_TRIGGERS,
            schema_filter: "",
            table_filter: " AND tbl_name = {p}",
            name_filter: " AND name {like} {p}",
            disabled_filter: "",
            order_by: " ORDER BY tbl_name, name",
            get_code: queries::TRIGGER_CODE,
        }
    }

    fn database_info(&self) -> DatabaseInfoSql {
        DatabaseInfoSql {
            version: "SELECT sqlite_version()",
            details: "",
            object_counts: queries::OBJECT_COUNTS,
            list_schemas: "",
        }
    }
}

mod queries {
    pub const LIST_TABLES: &str = r#"
            SELECT
                'main' AS table_schema,
                name AS table_name,
                'BASE TABLE' AS table_type
            FROM sqlite_master
            WHERE type = 'table'
                AND name NOT LIKE 'sqlite_%'"#;

    pub const TABLE_EXISTS: &str =
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?";

    pub const TABLE_INFO: &str = "PRAGMA table_info({table})";
    pub const INDEX_LIST: &str = "PRAGMA index_list({table})";
    pub const FOREIGN_KEY_LIST: &str = "PRAGMA foreign_key_list({table})";

    pub const LIST_VIEWS: &str = r#"
            SELECT
                'main' AS view_schema,
                name AS view_name,
                NULL AS created,
                NULL AS last_altered
            FROM sqlite_master
            WHERE type = 'view'"#;

    pub const VIEW_DEFINITION: &str = r#"
            SELECT sql
            FROM sqlite_master
            WHERE type = 'view' AND name = ?"#;

    pub const LIST_TRIGGERS: &str = r#"
            SELECT
                'main' AS schema_name,
                name AS trigger_name,
                tbl_name AS table_name,
                0 AS is_disabled,
                NULL AS create_date,
                NULL AS modify_date
            FROM sqlite_master
            WHERE type = 'trigger'"#;

    pub const TRIGGER_CODE: &str = r#"
            SELECT sql
            FROM sqlite_master
            WHERE type = 'trigger' AND name = ?"#;

    pub const OBJECT_COUNTS: &str = r#"
            SELECT
                COALESCE(SUM(CASE WHEN type = 'table' THEN 1 ELSE 0 END), 0) AS tables,
                COALESCE(SUM(CASE WHEN type = 'view' THEN 1 ELSE 0 END), 0) AS views,
                0 AS procedures,
                0 AS functions,
                COALESCE(SUM(CASE WHEN type = 'trigger' THEN 1 ELSE 0 END), 0) AS triggers
            FROM sqlite_master
            WHERE name NOT LIKE 'sqlite_%'"#;

    pub const SEARCH_OBJECTS: &str = r#"
            SELECT
                '' AS schema_name,
                name AS object_name,
                type AS object_type,
                NULL AS create_date,
                NULL AS modify_date,
                CASE WHEN sql IS NOT NULL THEN 1 ELSE 0 END AS has_code
            FROM sqlite_master
            WHERE name NOT LIKE 'sqlite_%'
              AND (name LIKE {term}{code}){types}
            ORDER BY name"#;
}
