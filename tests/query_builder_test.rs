//! Query builder properties across all five drivers.

use db_introspect_mcp::builder::{
    FunctionType, QueryBuilder, RowFilter, SelectQueryParams, SortDirection,
};
use db_introspect_mcp::dialect::{DialectFeature, DriverType};
use db_introspect_mcp::models::QueryParam;
use serde_json::json;

fn builders() -> Vec<QueryBuilder> {
    DriverType::ALL.iter().map(|d| QueryBuilder::new(*d)).collect()
}

/// Placeholders the driver would bind, in order of appearance.
fn placeholder_count(driver: DriverType, sql: &str) -> usize {
    match driver {
        DriverType::MySql | DriverType::Sqlite => sql.matches('?').count(),
        DriverType::PostgreSql => (1..=20).filter(|i| sql.contains(&format!("${}", i))).count(),
        DriverType::SqlServer => (1..=20).filter(|i| sql.contains(&format!("@p{}", i))).count(),
        DriverType::Oracle => (1..=20).filter(|i| sql.contains(&format!(":{}", i))).count(),
    }
}

#[test]
fn test_list_tables_binds_match_placeholders() {
    for b in builders() {
        let q = b.list_tables(Some("sales"), Some("ord"), 25, 50);
        let driver = b.driver();
        // SQLite has no schemas; the schema filter is dropped.
        let expected = if driver == DriverType::Sqlite { 1 } else { 2 };
        assert_eq!(q.args.len(), expected, "{:?}", driver);
        if !matches!(driver, DriverType::MySql | DriverType::Sqlite) {
            assert_eq!(placeholder_count(driver, &q.sql), expected, "{}", q.sql);
        }
        assert!(
            q.args
                .iter()
                .any(|a| matches!(a, QueryParam::String(s) if s.to_uppercase() == "%ORD%")),
            "{:?}",
            driver
        );
    }
}

/// Numbered markers in order of appearance; `None` for `?` engines.
fn marker_sequence(driver: DriverType, sql: &str) -> Option<Vec<usize>> {
    let prefix = match driver {
        DriverType::SqlServer => "@p",
        DriverType::PostgreSql => "$",
        DriverType::Oracle => ":",
        DriverType::MySql | DriverType::Sqlite => return None,
    };
    let mut markers = Vec::new();
    let mut rest = sql;
    while let Some(pos) = rest.find(prefix) {
        rest = &rest[pos + prefix.len()..];
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(n) = digits.parse() {
            markers.push(n);
        }
    }
    Some(markers)
}

fn assert_markers_follow_args(driver: DriverType, operation: &str, sql: &str, args: usize) {
    match marker_sequence(driver, sql) {
        Some(markers) => {
            let expected: Vec<usize> = (1..=args).collect();
            assert_eq!(markers, expected, "{:?} {}: {}", driver, operation, sql);
        }
        None => assert_eq!(sql.matches('?').count(), args, "{:?} {}: {}", driver, operation, sql),
    }
}

#[test]
fn test_every_listing_numbers_placeholders_in_order() {
    let options = [None, Some("sales")];
    for b in builders() {
        let driver = b.driver();
        for schema in options {
            for name in [None, Some("ord")] {
                let tables = b.list_tables(schema, name, 10, 0);
                assert_markers_follow_args(driver, "tables", &tables.sql, tables.args.len());

                let listings = [
                    ("procedures", b.list_procedures(schema, name, 10, 0)),
                    (
                        "functions",
                        b.list_functions(schema, name, FunctionType::Scalar, 10, 0),
                    ),
                    ("views", b.list_views(schema, name, 10, 0)),
                ];
                for (operation, query) in listings {
                    if let Some(q) = query {
                        assert_markers_follow_args(driver, operation, &q.sql, q.args.len());
                    }
                }

                for table in [None, Some("orders")] {
                    for include_disabled in [true, false] {
                        let q = b
                            .list_triggers(schema, table, name, include_disabled, 10, 0)
                            .unwrap();
                        let filters = [
                            schema.filter(|_| b.supports(DialectFeature::Schemas)),
                            table,
                            name,
                        ];
                        assert_eq!(
                            q.args.len(),
                            filters.iter().flatten().count(),
                            "{:?}",
                            driver
                        );
                        assert_markers_follow_args(driver, "triggers", &q.sql, q.args.len());
                    }
                }
            }
        }
    }
}

#[test]
fn test_offset_fetch_always_has_order_by() {
    for driver in [DriverType::SqlServer, DriverType::Oracle] {
        let b = QueryBuilder::new(driver);
        let q = b.list_tables(None, None, 10, 20);
        assert!(q.sql.contains("ORDER BY"), "{}", q.sql);
        assert!(
            q.sql.ends_with("OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"),
            "{}",
            q.sql
        );

        let q = b
            .select_rows(&SelectQueryParams {
                schema: driver.default_schema().to_string(),
                table: "orders".to_string(),
                limit: 5,
                offset: 0,
                ..Default::default()
            })
            .unwrap();
        assert!(q.sql.contains("ORDER BY (SELECT NULL) OFFSET 0 ROWS"), "{}", q.sql);
    }
}

#[test]
fn test_limit_offset_drivers() {
    for driver in [DriverType::PostgreSql, DriverType::MySql, DriverType::Sqlite] {
        let q = QueryBuilder::new(driver).list_tables(None, None, 100, 200);
        assert!(q.sql.ends_with("LIMIT 100 OFFSET 200"), "{}", q.sql);
    }
}

#[test]
fn test_builder_is_deterministic() {
    for b in builders() {
        let first = b.list_tables(Some("app"), Some("user"), 10, 0);
        let second = b.list_tables(Some("app"), Some("user"), 10, 0);
        assert_eq!(first, second);

        let first = b.search_objects("cust", true, &["table".to_string()]);
        let second = b.search_objects("cust", true, &["table".to_string()]);
        assert_eq!(first, second);
    }
}

#[test]
fn test_feature_gating() {
    let sqlite = QueryBuilder::new(DriverType::Sqlite);
    assert!(sqlite.list_procedures(None, None, 10, 0).is_none());
    assert!(sqlite.list_functions(None, None, FunctionType::All, 10, 0).is_none());
    assert!(sqlite.procedure_code("main", "p").is_none());
    assert!(sqlite.function_code("main", "f").is_none());
    assert!(sqlite.list_schemas().is_none());
    assert!(sqlite.list_views(None, None, 10, 0).is_some());
    assert!(sqlite.list_triggers(None, None, None, true, 10, 0).is_some());
    assert!(!sqlite.supports(DialectFeature::StoredProcedures));

    for driver in [
        DriverType::SqlServer,
        DriverType::PostgreSql,
        DriverType::MySql,
        DriverType::Oracle,
    ] {
        let b = QueryBuilder::new(driver);
        assert!(b.list_procedures(None, None, 10, 0).is_some(), "{:?}", driver);
        assert!(b.list_views(None, None, 10, 0).is_some(), "{:?}", driver);
        assert!(b.version().is_some(), "{:?}", driver);
    }
}

#[test]
fn test_table_queries_reject_bad_identifiers() {
    for b in builders() {
        assert!(b.describe_table("dbo", "users; DROP TABLE x").is_err());
        assert!(b.columns("bad schema", "users").is_err());
        assert!(b.count_rows("", "", None).is_err());
    }
}

#[test]
fn test_sqlite_pragmas_quote_table() {
    let b = QueryBuilder::new(DriverType::Sqlite);
    let q = b.describe_table("main", "order_items").unwrap();
    assert_eq!(q.sql, "PRAGMA table_info(\"order_items\")");
    assert!(q.args.is_empty());

    let q = b.table_exists("main", "order_items").unwrap();
    assert_eq!(q.args, vec![QueryParam::String("order_items".to_string())]);
}

#[test]
fn test_oracle_uppercases_identifiers() {
    let b = QueryBuilder::new(DriverType::Oracle);
    let q = b.describe_table("hr", "employees").unwrap();
    assert_eq!(
        q.args,
        vec![
            QueryParam::String("HR".to_string()),
            QueryParam::String("EMPLOYEES".to_string())
        ]
    );
}

#[test]
fn test_select_rows_with_filters_per_driver() {
    let columns = vec!["id".to_string(), "status".to_string()];
    let filters = vec![
        RowFilter {
            column: "status".to_string(),
            operator: "eq".to_string(),
            value: Some(json!("open")),
        },
        RowFilter {
            column: "ID".to_string(),
            operator: "gte".to_string(),
            value: Some(json!(100)),
        },
    ];

    for b in builders() {
        let filter = b.where_clause(&filters, &columns).unwrap();
        let schema = b.default_schema().to_string();
        let q = b
            .select_rows(&SelectQueryParams {
                schema,
                table: "tickets".to_string(),
                columns: vec!["id".to_string()],
                filter: Some(filter.clone()),
                order_by: Some("id".to_string()),
                direction: SortDirection::Desc,
                limit: 10,
                offset: 10,
            })
            .unwrap();
        assert_eq!(q.args, vec![QueryParam::from("open"), QueryParam::Int(100)]);
        assert!(q.sql.contains(" WHERE "), "{}", q.sql);
        assert!(q.sql.contains("DESC"), "{}", q.sql);

        let count = b.count_rows(b.default_schema(), "tickets", Some(&filter)).unwrap();
        assert!(count.sql.starts_with("SELECT COUNT(*) FROM "));
        assert_eq!(count.args.len(), 2);
    }
}

#[test]
fn test_where_clause_rejects_unknown_column_and_operator() {
    let b = QueryBuilder::new(DriverType::PostgreSql);
    let columns = vec!["id".to_string()];
    let err = b
        .where_clause(
            &[RowFilter {
                column: "missing".to_string(),
                operator: "eq".to_string(),
                value: Some(json!(1)),
            }],
            &columns,
        )
        .unwrap_err();
    assert!(err.to_string().contains("column does not exist"));

    let err = b
        .where_clause(
            &[RowFilter {
                column: "id".to_string(),
                operator: "between".to_string(),
                value: Some(json!(1)),
            }],
            &columns,
        )
        .unwrap_err();
    assert!(err.to_string().contains("invalid operator"));
}

#[test]
fn test_search_objects_bind_counts() {
    let b = QueryBuilder::new(DriverType::Sqlite);
    assert_eq!(b.search_objects("x", false, &[]).args.len(), 1);
    assert_eq!(b.search_objects("x", true, &[]).args.len(), 2);

    let q = b.search_objects("x", false, &["view".to_string(), "bogus".to_string()]);
    assert!(q.sql.contains("'view'"), "{}", q.sql);
    assert!(!q.sql.contains("bogus"));
}
