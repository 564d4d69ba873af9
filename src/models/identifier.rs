//! Identifier grammar for caller-supplied object names.
//!
//! Table, column, schema and routine names cannot be bound as query
//! arguments, so they are checked against a conservative grammar before they
//! are quoted into SQL text: ASCII letters, digits, `_`, `#`, `@` and `$`,
//! between 1 and 127 bytes long.

use crate::error::{DbError, DbResult};

/// Identifiers must be strictly shorter than this many bytes.
pub const MAX_IDENTIFIER_LEN: usize = 128;

pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.len() < MAX_IDENTIFIER_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'#' | b'@' | b'$'))
}

/// Validate `value` as an identifier of the given kind ("table", "schema", ...).
pub fn validate_identifier(kind: &str, value: &str) -> DbResult<()> {
    if is_valid_identifier(value) {
        Ok(())
    } else {
        Err(DbError::invalid_identifier(kind, value))
    }
}

/// Resolve an optional schema argument against the driver default.
///
/// An empty result is allowed (engines without a default schema); anything
/// else must pass the identifier grammar.
pub fn resolve_schema(requested: Option<&str>, default_schema: &str) -> DbResult<String> {
    let schema = match requested.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => default_schema,
    };
    if !schema.is_empty() {
        validate_identifier("schema", schema)?;
    }
    Ok(schema.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_grammar() {
        assert!(is_valid_identifier("order_items"));
        assert!(is_valid_identifier("#temp"));
        assert!(is_valid_identifier("@var"));
        assert!(is_valid_identifier("price$"));
        assert!(is_valid_identifier("T1"));
    }

    #[test]
    fn test_dots_and_leading_digits() {
        assert!(!is_valid_identifier("dbo.users"));
        assert!(!is_valid_identifier("."));
        assert!(is_valid_identifier("1st_quarter"));
    }

    #[test]
    fn test_rejects_bad_identifiers() {
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("order items"));
        assert!(!is_valid_identifier("users;"));
        assert!(!is_valid_identifier("users--"));
        assert!(!is_valid_identifier("naïve"));
        assert!(!is_valid_identifier(&"a".repeat(128)));
        assert!(is_valid_identifier(&"a".repeat(127)));
    }

    #[test]
    fn test_validate_identifier_error() {
        let err = validate_identifier("table", "a b").unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
    }

    #[test]
    fn test_resolve_schema() {
        assert_eq!(resolve_schema(None, "dbo").unwrap(), "dbo");
        assert_eq!(resolve_schema(Some(""), "public").unwrap(), "public");
        assert_eq!(resolve_schema(Some("sales"), "dbo").unwrap(), "sales");
        assert_eq!(resolve_schema(None, "").unwrap(), "");
        assert!(resolve_schema(Some("bad schema"), "dbo").is_err());
    }
}
