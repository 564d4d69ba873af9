//! Read-only gate for caller-authored SQL.
//!
//! [`SqlValidator`] is a layered text heuristic, not a parser. It normalizes
//! the query once (comments stripped, whitespace collapsed, upper-cased), then
//! runs a fixed sequence of checks that stops at the first violation:
//!
//! 1. empty text and the length limit
//! 2. a `SELECT`/`WITH` prefix
//! 3. denied commands and system functions, matched as whole words outside literals
//! 4. transaction-control phrases, matched as substrings
//! 5. statement stacking, `SELECT ... INTO` and the `UNION` limit
//! 6. control characters, and hex or `CHAR()` obfuscation
//! 7. timing functions, the `SELECT` count, and parenthesis balance and depth
//!
//! The caller only ever sees "query not allowed"; the specific rule is logged.

use crate::error::{DbError, DbResult};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::warn;

pub const MAX_QUERY_LENGTH: usize = 50_000;
pub const MAX_SELECT_COUNT: usize = 10;
/// Queries that may be combined with UNION, counting the first.
pub const MAX_UNION_COUNT: usize = 5;
pub const MAX_PAREN_DEPTH: usize = 20;
pub const MAX_HEX_LITERALS: usize = 3;
pub const MAX_CHAR_CALLS: usize = 10;

static LINE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"--[^\n]*").unwrap());
static BLOCK_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static PUNCTUATION_SPACING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([(),;])\s*").unwrap());

static SINGLE_QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'[^']*'").unwrap());
static DOUBLE_QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""[^"]*""#).unwrap());
static BRACKETED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]").unwrap());

static DENIED_COMMANDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(INSERT|UPDATE|DELETE|TRUNCATE|MERGE|DROP|CREATE|ALTER|RENAME|EXEC|EXECUTE|SP_EXECUTESQL|XP_CMDSHELL|BACKUP|RESTORE|DUMP)\b",
    )
    .unwrap()
});
static ADMIN_COMMANDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(SHUTDOWN|RECONFIGURE|DBCC|KILL)\b").unwrap());
static SECURITY_COMMANDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(GRANT|REVOKE|DENY)\b").unwrap());
static DANGEROUS_FUNCTIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(XP_\w*|SP_CONFIGURE|SP_ADDSRVROLEMEMBER|SP_ADDLOGIN|OPENROWSET|OPENDATASOURCE|OPENQUERY|BULK INSERT|BCP)\b",
    )
    .unwrap()
});
static TIMING_FUNCTIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(WAITFOR|DELAY|SLEEP|BENCHMARK)\b").unwrap());

static SELECT_INTO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"SELECT\s+.*\s+INTO\s+").unwrap());
static UNION_KEYWORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bUNION\b").unwrap());
static SELECT_KEYWORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bSELECT\b").unwrap());
static HEX_LITERAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"0X[0-9A-F]+").unwrap());
static CHAR_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(CHAR|NCHAR)\s*\(").unwrap());

/// Matched as substrings of the literal-free view.
const TRANSACTION_PHRASES: [&str; 5] = [
    "BEGIN TRANSACTION",
    "BEGIN TRAN",
    "COMMIT",
    "ROLLBACK",
    "SAVE TRANSACTION",
];

/// Why a query was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("empty query")]
    Empty,

    #[error("query too long (maximum 50000 characters)")]
    TooLong,

    #[error("only SELECT or WITH queries are allowed")]
    NotSelect,

    #[error("command not allowed: {0}")]
    CommandNotAllowed(String),

    #[error("administrative command not allowed: {0}")]
    AdministrativeCommand(String),

    #[error("security command not allowed: {0}")]
    SecurityCommand(String),

    #[error("dangerous function not permitted: {0}")]
    DangerousFunction(String),

    #[error("transaction commands are not allowed: {0}")]
    TransactionCommand(&'static str),

    #[error("multiple commands are not allowed")]
    MultipleStatements,

    #[error("SELECT INTO is not allowed")]
    SelectInto,

    #[error("too many UNION clauses (maximum 5 combined queries)")]
    TooManyUnions,

    #[error("suspicious control character detected")]
    ControlCharacter,

    #[error("excessive use of hexadecimal encoding")]
    ExcessiveHex,

    #[error("excessive use of CHAR/NCHAR (possible obfuscation)")]
    ExcessiveChar,

    #[error("time function not allowed: {0}")]
    TimingFunction(String),

    #[error("too many subqueries (maximum 10)")]
    TooManySubqueries,

    #[error("unbalanced parentheses")]
    UnbalancedParentheses,

    #[error("parenthesis depth too large (maximum 20)")]
    ParenthesisDepth,
}

impl ValidationError {
    /// Short rule name for logs.
    pub fn rule(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::TooLong => "length",
            Self::NotSelect => "prefix",
            Self::CommandNotAllowed(_) => "denied_command",
            Self::AdministrativeCommand(_) => "admin_command",
            Self::SecurityCommand(_) => "security_command",
            Self::DangerousFunction(_) => "dangerous_function",
            Self::TransactionCommand(_) => "transaction",
            Self::MultipleStatements => "stacking",
            Self::SelectInto => "select_into",
            Self::TooManyUnions => "union_count",
            Self::ControlCharacter => "control_character",
            Self::ExcessiveHex => "hex_encoding",
            Self::ExcessiveChar => "char_encoding",
            Self::TimingFunction(_) => "timing",
            Self::TooManySubqueries => "select_count",
            Self::UnbalancedParentheses => "paren_balance",
            Self::ParenthesisDepth => "paren_depth",
        }
    }
}

/// Single-use validator over one query text.
#[derive(Debug, Clone)]
pub struct SqlValidator {
    query: String,
    normalized: String,
}

impl SqlValidator {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            normalized: normalize_sql(query),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Comment-free, whitespace-collapsed, upper-cased form.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.query.trim().is_empty() {
            return Err(ValidationError::Empty);
        }
        if self.query.len() > MAX_QUERY_LENGTH {
            return Err(ValidationError::TooLong);
        }
        if !self.normalized.starts_with("SELECT") && !self.normalized.starts_with("WITH") {
            return Err(ValidationError::NotSelect);
        }

        let literal_free = strip_literals(&self.normalized);

        if let Some(m) = DENIED_COMMANDS.find(&literal_free) {
            return Err(ValidationError::CommandNotAllowed(m.as_str().to_string()));
        }
        if let Some(m) = ADMIN_COMMANDS.find(&literal_free) {
            return Err(ValidationError::AdministrativeCommand(m.as_str().to_string()));
        }
        if let Some(m) = SECURITY_COMMANDS.find(&literal_free) {
            return Err(ValidationError::SecurityCommand(m.as_str().to_string()));
        }
        if let Some(m) = DANGEROUS_FUNCTIONS.find(&literal_free) {
            return Err(ValidationError::DangerousFunction(m.as_str().to_string()));
        }
        if let Some(phrase) = TRANSACTION_PHRASES
            .iter()
            .find(|phrase| literal_free.contains(*phrase))
        {
            return Err(ValidationError::TransactionCommand(phrase));
        }

        self.check_statement_stacking()?;

        if SELECT_INTO.is_match(&literal_free) {
            return Err(ValidationError::SelectInto);
        }
        if UNION_KEYWORD.find_iter(&literal_free).count() + 1 > MAX_UNION_COUNT {
            return Err(ValidationError::TooManyUnions);
        }

        self.check_encoding()?;

        if let Some(m) = TIMING_FUNCTIONS.find(&literal_free) {
            return Err(ValidationError::TimingFunction(m.as_str().to_string()));
        }
        if SELECT_KEYWORD.find_iter(&literal_free).count() > MAX_SELECT_COUNT {
            return Err(ValidationError::TooManySubqueries);
        }

        check_parentheses(&literal_free)
    }

    /// A `;` outside single quotes is only allowed as the last non-blank character.
    fn check_statement_stacking(&self) -> Result<(), ValidationError> {
        let mut in_string = false;
        let mut escape_next = false;

        for (i, ch) in self.query.char_indices() {
            if escape_next {
                escape_next = false;
                continue;
            }
            match ch {
                '\\' => escape_next = true,
                '\'' => in_string = !in_string,
                ';' if !in_string => {
                    if !self.query[i + 1..].trim().is_empty() {
                        return Err(ValidationError::MultipleStatements);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn check_encoding(&self) -> Result<(), ValidationError> {
        if self
            .query
            .chars()
            .any(|c| (c as u32) < 32 && !matches!(c, '\n' | '\r' | '\t'))
        {
            return Err(ValidationError::ControlCharacter);
        }
        if HEX_LITERAL.find_iter(&self.normalized).count() > MAX_HEX_LITERALS {
            return Err(ValidationError::ExcessiveHex);
        }
        if CHAR_CALL.find_iter(&self.normalized).count() > MAX_CHAR_CALLS {
            return Err(ValidationError::ExcessiveChar);
        }
        Ok(())
    }
}

/// Parenthesis balance and depth over the literal-free view, so brackets
/// inside string literals do not count.
fn check_parentheses(literal_free: &str) -> Result<(), ValidationError> {
    let mut depth: i64 = 0;
    let mut max_depth: i64 = 0;
    for ch in literal_free.chars() {
        match ch {
            '(' => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(ValidationError::UnbalancedParentheses);
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ValidationError::UnbalancedParentheses);
    }
    if max_depth as usize > MAX_PAREN_DEPTH {
        return Err(ValidationError::ParenthesisDepth);
    }
    Ok(())
}

/// Strip comments, collapse whitespace, drop spacing around punctuation, upper-case.
pub fn normalize_sql(sql: &str) -> String {
    let sql = LINE_COMMENT.replace_all(sql, " ");
    let sql = BLOCK_COMMENT.replace_all(&sql, " ");
    let sql = WHITESPACE.replace_all(&sql, " ");
    let sql = PUNCTUATION_SPACING.replace_all(&sql, "$1");
    sql.trim().to_uppercase()
}

/// Empty out quoted strings and identifiers so their contents cannot match keywords.
pub fn strip_literals(sql: &str) -> String {
    let sql = SINGLE_QUOTED.replace_all(sql, "''");
    let sql = DOUBLE_QUOTED.replace_all(&sql, "\"\"");
    BRACKETED.replace_all(&sql, "[]").into_owned()
}

/// Validate SQL for read-only execution in `execute_query`.
///
/// The rejection reason is logged and replaced by [`DbError::QueryNotAllowed`].
///
/// ```
/// use db_introspect_mcp::tools::sql_validator::validate_readonly;
///
/// assert!(validate_readonly("SELECT * FROM users").is_ok());
/// assert!(validate_readonly("DELETE FROM users").is_err());
/// ```
pub fn validate_readonly(sql: &str) -> DbResult<()> {
    SqlValidator::new(sql).validate().map_err(|err| {
        warn!(rule = err.rule(), reason = %err, "Query rejected by validator");
        DbError::QueryNotAllowed
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(sql: &str) -> Result<(), ValidationError> {
        SqlValidator::new(sql).validate()
    }

    // =========================================================================
    // Normalization
    // =========================================================================

    #[test]
    fn test_normalize_strips_comments_and_spacing() {
        let v = SqlValidator::new("select a ,  b -- trailing\n from /* note */ t ( x )");
        assert_eq!(v.normalized(), "SELECT A,B FROM T(X)");
    }

    #[test]
    fn test_normalize_multiline_block_comment() {
        assert_eq!(normalize_sql("SELECT /* a\nb */ 1"), "SELECT 1");
    }

    #[test]
    fn test_strip_literals() {
        assert_eq!(
            strip_literals("SELECT 'DROP' FROM [DELETE] WHERE \"UPDATE\"=1"),
            "SELECT '' FROM [] WHERE \"\"=1"
        );
    }

    // =========================================================================
    // Accepted queries
    // =========================================================================

    #[test]
    fn test_accepts_simple_select() {
        assert!(check("SELECT * FROM t").is_ok());
        assert!(check("select * from t").is_ok());
        assert!(check("  WITH x AS (SELECT 1) SELECT * FROM x").is_ok());
        assert!(check("SELECT * FROM t;").is_ok());
    }

    #[test]
    fn test_accepts_keywords_inside_literals() {
        assert!(check("SELECT * FROM t WHERE name = 'a; DROP TABLE t'").is_ok());
        assert!(check("SELECT [Update Date] FROM t").is_ok());
    }

    #[test]
    fn test_accepts_keyword_prefixed_identifiers() {
        assert!(check("SELECT created_at, updated_by, deleted FROM audit").is_ok());
    }

    // =========================================================================
    // Rejections
    // =========================================================================

    #[test]
    fn test_rejects_empty_and_long() {
        assert_eq!(check("   "), Err(ValidationError::Empty));
        let long = "SELECT 1".repeat(6251);
        assert!(long.len() > MAX_QUERY_LENGTH);
        assert_eq!(check(&long), Err(ValidationError::TooLong));
    }

    #[test]
    fn test_rejects_non_select() {
        assert_eq!(check("DELETE FROM t"), Err(ValidationError::NotSelect));
        assert_eq!(check("-- hi\nUPDATE t SET a=1"), Err(ValidationError::NotSelect));
    }

    #[test]
    fn test_rejects_denied_commands() {
        assert_eq!(
            check("WITH x AS (DELETE FROM t RETURNING *) SELECT * FROM x"),
            Err(ValidationError::CommandNotAllowed("DELETE".into()))
        );
        assert!(matches!(
            check("SELECT * FROM t WHERE 1=1 OR EXEC('x')"),
            Err(ValidationError::CommandNotAllowed(_))
        ));
        assert!(matches!(
            check("SELECT KILL FROM t"),
            Err(ValidationError::AdministrativeCommand(_))
        ));
        assert!(matches!(
            check("SELECT GRANT FROM t"),
            Err(ValidationError::SecurityCommand(_))
        ));
        assert!(matches!(
            check("SELECT * FROM OPENROWSET('x')"),
            Err(ValidationError::DangerousFunction(_))
        ));
        assert!(matches!(
            check("SELECT xp_regread()"),
            Err(ValidationError::DangerousFunction(_))
        ));
    }

    #[test]
    fn test_rejects_transaction_phrases() {
        assert_eq!(
            check("SELECT 1 COMMIT"),
            Err(ValidationError::TransactionCommand("COMMIT"))
        );
    }

    #[test]
    fn test_rejects_statement_stacking() {
        assert_eq!(
            check("SELECT * FROM t; DROP TABLE t"),
            Err(ValidationError::CommandNotAllowed("DROP".into()))
        );
        assert_eq!(
            check("SELECT * FROM t; SELECT 2"),
            Err(ValidationError::MultipleStatements)
        );
    }

    #[test]
    fn test_rejects_select_into() {
        assert_eq!(
            check("SELECT * INTO backup_t FROM t"),
            Err(ValidationError::SelectInto)
        );
    }

    #[test]
    fn test_union_limit() {
        let five = "SELECT 1 UNION SELECT 2 UNION SELECT 3 UNION SELECT 4 UNION ALL SELECT 5";
        assert!(check(five).is_ok());
        let six = "SELECT * FROM t WHERE 1=1 UNION SELECT * FROM t UNION SELECT * FROM t UNION SELECT * FROM t UNION SELECT * FROM t UNION SELECT * FROM t";
        assert_eq!(check(six), Err(ValidationError::TooManyUnions));
    }

    #[test]
    fn test_rejects_control_characters() {
        assert_eq!(check("SELECT 1\u{0}"), Err(ValidationError::ControlCharacter));
        assert!(check("SELECT\t1\r\n").is_ok());
    }

    #[test]
    fn test_rejects_obfuscation() {
        assert_eq!(
            check("SELECT 0x41, 0x42, 0x43, 0x44"),
            Err(ValidationError::ExcessiveHex)
        );
        let chars = vec!["CHAR(65)"; 11].join("+");
        assert_eq!(
            check(&format!("SELECT {}", chars)),
            Err(ValidationError::ExcessiveChar)
        );
    }

    #[test]
    fn test_rejects_timing_functions() {
        assert_eq!(
            check("SELECT SLEEP(5)"),
            Err(ValidationError::TimingFunction("SLEEP".into()))
        );
    }

    #[test]
    fn test_rejects_too_many_selects() {
        let many = (0..11)
            .map(|i| format!("(SELECT {})", i))
            .collect::<Vec<_>>()
            .join(", ");
        assert_eq!(
            check(&format!("SELECT {}", many)),
            Err(ValidationError::TooManySubqueries)
        );
    }

    #[test]
    fn test_parentheses() {
        assert_eq!(check("SELECT (1"), Err(ValidationError::UnbalancedParentheses));
        assert_eq!(check("SELECT 1)("), Err(ValidationError::UnbalancedParentheses));
        let deep = format!("SELECT {}1{}", "(".repeat(21), ")".repeat(21));
        assert_eq!(check(&deep), Err(ValidationError::ParenthesisDepth));
        let ok = format!("SELECT {}1{}", "(".repeat(20), ")".repeat(20));
        assert!(check(&ok).is_ok());
    }

    #[test]
    fn test_parentheses_inside_literals_ignored() {
        assert_eq!(check("SELECT 'smile :)' AS face"), Ok(()));
        assert_eq!(check("SELECT \"(col\" FROM t"), Ok(()));
        assert_eq!(
            check("SELECT '(' AS open, (1"),
            Err(ValidationError::UnbalancedParentheses)
        );
    }

    #[test]
    fn test_validate_readonly_hides_reason() {
        let err = validate_readonly("SELECT * FROM t; DROP TABLE t").unwrap_err();
        assert!(matches!(err, DbError::QueryNotAllowed));
        assert_eq!(err.to_string(), "query not allowed");
    }
}
