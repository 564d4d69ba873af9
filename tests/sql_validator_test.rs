//! Read-only validator acceptance and rejection cases.

use db_introspect_mcp::error::DbError;
use db_introspect_mcp::tools::sql_validator::{
    MAX_QUERY_LENGTH, SqlValidator, ValidationError, validate_readonly,
};

fn check(sql: &str) -> Result<(), ValidationError> {
    SqlValidator::new(sql).validate()
}

#[test]
fn test_accepts_reporting_queries() {
    let accepted = [
        "SELECT 1",
        "select * from orders where status = 'open';",
        "SELECT o.id, c.name FROM orders o JOIN customers c ON c.id = o.customer_id",
        "WITH recent AS (SELECT * FROM orders WHERE created_at > '2024-01-01') SELECT COUNT(*) FROM recent",
        "SELECT name FROM users WHERE note = 'please DELETE me; later'",
        "SELECT [Update Date], \"drop\" FROM audit",
        "SELECT updated_at, created_by, execution_count FROM jobs",
        "-- monthly totals\nSELECT month, SUM(total) FROM sales GROUP BY month",
        "SELECT a FROM t1 UNION SELECT a FROM t2 UNION ALL SELECT a FROM t3",
    ];
    for sql in accepted {
        assert_eq!(check(sql), Ok(()), "{}", sql);
        assert!(validate_readonly(sql).is_ok(), "{}", sql);
    }
}

#[test]
fn test_rejects_writes_and_ddl() {
    let cases = [
        ("INSERT INTO users VALUES (1)", ValidationError::NotSelect),
        ("UPDATE users SET name = 'x'", ValidationError::NotSelect),
        ("DROP TABLE users", ValidationError::NotSelect),
        (
            "WITH x AS (DELETE FROM users RETURNING *) SELECT * FROM x",
            ValidationError::CommandNotAllowed("DELETE".to_string()),
        ),
        (
            "SELECT * FROM users; DROP TABLE users",
            ValidationError::CommandNotAllowed("DROP".to_string()),
        ),
    ];
    for (sql, expected) in cases {
        assert_eq!(check(sql), Err(expected), "{}", sql);
    }
}

#[test]
fn test_rejects_stacked_statements() {
    assert_eq!(
        check("SELECT 1; SELECT 2"),
        Err(ValidationError::MultipleStatements)
    );
    assert_eq!(check("SELECT ';' AS semi"), Ok(()));
}

#[test]
fn test_rejects_server_side_effects() {
    assert!(matches!(
        check("SELECT * FROM OPENROWSET('SQLNCLI', 'x', 'SELECT 1')"),
        Err(ValidationError::DangerousFunction(_))
    ));
    assert!(matches!(
        check("SELECT xp_cmdshell('dir')"),
        Err(ValidationError::CommandNotAllowed(_)) | Err(ValidationError::DangerousFunction(_))
    ));
    assert!(matches!(
        check("SELECT SLEEP(10)"),
        Err(ValidationError::TimingFunction(_))
    ));
    assert!(matches!(
        check("SELECT 1 WHERE 1=1 COMMIT"),
        Err(ValidationError::TransactionCommand(_))
    ));
    assert_eq!(
        check("SELECT * INTO backup_users FROM users"),
        Err(ValidationError::SelectInto)
    );
}

#[test]
fn test_rejects_obfuscation_and_structure() {
    let hex = "SELECT 0x41, 0x42, 0x43, 0x44";
    assert_eq!(check(hex), Err(ValidationError::ExcessiveHex));

    let unions = (0..6)
        .map(|i| format!("SELECT {}", i))
        .collect::<Vec<_>>()
        .join(" UNION ");
    assert_eq!(check(&unions), Err(ValidationError::TooManyUnions));

    assert_eq!(
        check("SELECT (1 + (2)"),
        Err(ValidationError::UnbalancedParentheses)
    );
    let deep = format!("SELECT {}1{}", "(".repeat(21), ")".repeat(21));
    assert_eq!(check(&deep), Err(ValidationError::ParenthesisDepth));

    let long = format!("SELECT '{}'", "a".repeat(MAX_QUERY_LENGTH));
    assert_eq!(check(&long), Err(ValidationError::TooLong));
    assert_eq!(check("   "), Err(ValidationError::Empty));
}

#[test]
fn test_caller_sees_generic_rejection() {
    let err = validate_readonly("DELETE FROM users").unwrap_err();
    assert!(matches!(err, DbError::QueryNotAllowed));
    assert_eq!(err.to_string(), "query not allowed");
}
