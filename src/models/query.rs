//! Query-related data models.
//!
//! Bound parameter values, the positional row set produced by the executor,
//! and the row-limit constants shared by query tools.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Default row cap for `execute_query`.
pub const DEFAULT_ROW_LIMIT: u32 = 1000;

/// Maximum allowed row cap for `execute_query`.
pub const MAX_ROW_LIMIT: u32 = 10000;

/// A value bound to a positional placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryParam {
    Null,
    Bool(bool),
    /// Stored as i64 for maximum range
    Int(i64),
    Float(f64),
    String(String),
    /// Arrays and objects, bound as JSON
    Json(JsonValue),
}

impl QueryParam {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Json(_) => "json",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a caller-supplied JSON value into a bindable parameter.
    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            },
            JsonValue::String(s) => Self::String(s),
            other => Self::Json(other),
        }
    }
}

impl From<String> for QueryParam {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for QueryParam {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i64> for QueryParam {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// Rows in column order, as returned by the executor.
///
/// Catalog decoders read values positionally; tools that return rows to the
/// caller convert them to name-keyed maps with [`RowSet::into_maps`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
    /// True if more rows were available than the limit allowed
    pub truncated: bool,
}

impl RowSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column of the first row.
    pub fn scalar(&self) -> Option<&JsonValue> {
        self.rows.first().and_then(|row| row.first())
    }

    /// First column of the first row as an integer (counts).
    pub fn scalar_i64(&self) -> Option<i64> {
        self.scalar().and_then(json_as_i64)
    }

    /// First column of every row, as text, skipping NULLs.
    pub fn first_column_strings(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.first())
            .filter_map(json_as_string)
            .collect()
    }

    /// Name-keyed map of the first row.
    pub fn first_row_map(&self) -> Option<serde_json::Map<String, JsonValue>> {
        self.rows.first().map(|row| zip_row(&self.columns, row))
    }

    pub fn into_maps(self) -> Vec<serde_json::Map<String, JsonValue>> {
        let columns = self.columns;
        self.rows
            .iter()
            .map(|row| zip_row(&columns, row))
            .collect()
    }
}

fn zip_row(columns: &[String], row: &[JsonValue]) -> serde_json::Map<String, JsonValue> {
    columns
        .iter()
        .cloned()
        .zip(row.iter().cloned())
        .collect()
}

/// Integer view of a catalog value. Drivers report counts and flags as
/// numbers, booleans, decimals rendered as strings, or `Y`/`N` text.
pub fn json_as_i64(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64)),
        JsonValue::Bool(b) => Some(i64::from(*b)),
        JsonValue::String(s) => s
            .trim()
            .parse::<i64>()
            .ok()
            .or_else(|| s.trim().parse::<f64>().ok().map(|f| f as i64)),
        _ => None,
    }
}

/// Truthiness of a catalog flag (`1`, `true`, `YES`, `Y`, `UNIQUE`).
pub fn json_as_bool(value: &JsonValue) -> bool {
    match value {
        JsonValue::Bool(b) => *b,
        JsonValue::Number(_) => json_as_i64(value).is_some_and(|n| n != 0),
        JsonValue::String(s) => matches!(
            s.trim().to_ascii_uppercase().as_str(),
            "1" | "TRUE" | "YES" | "Y" | "UNIQUE"
        ),
        _ => false,
    }
}

/// Text view of a catalog value; `None` for SQL NULL.
pub fn json_as_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_param_types() {
        assert!(QueryParam::Null.is_null());
        assert!(!QueryParam::Bool(true).is_null());
        assert_eq!(QueryParam::Int(42).type_name(), "int");
        assert_eq!(QueryParam::from("hello").type_name(), "string");
    }

    #[test]
    fn test_query_param_from_json() {
        assert_eq!(QueryParam::from_json(json!(7)), QueryParam::Int(7));
        assert_eq!(QueryParam::from_json(json!(1.5)), QueryParam::Float(1.5));
        assert_eq!(QueryParam::from_json(json!("x")), QueryParam::from("x"));
        assert_eq!(QueryParam::from_json(json!(null)), QueryParam::Null);
        assert_eq!(
            QueryParam::from_json(json!([1, 2])),
            QueryParam::Json(json!([1, 2]))
        );
    }

    #[test]
    fn test_query_param_deserialize_untagged() {
        let params: Vec<QueryParam> = serde_json::from_str(r#"[null, true, 3, 2.5, "a"]"#).unwrap();
        assert_eq!(
            params,
            vec![
                QueryParam::Null,
                QueryParam::Bool(true),
                QueryParam::Int(3),
                QueryParam::Float(2.5),
                QueryParam::from("a"),
            ]
        );
    }

    #[test]
    fn test_row_set_into_maps() {
        let rows = RowSet {
            columns: vec!["id".into(), "name".into()],
            rows: vec![vec![json!(1), json!("alice")]],
            truncated: false,
        };
        assert_eq!(rows.scalar_i64(), Some(1));
        let maps = rows.into_maps();
        assert_eq!(maps[0]["name"], "alice");
    }

    #[test]
    fn test_json_coercions() {
        assert_eq!(json_as_i64(&json!("42")), Some(42));
        assert_eq!(json_as_i64(&json!("3.0")), Some(3));
        assert_eq!(json_as_i64(&json!(true)), Some(1));
        assert!(json_as_bool(&json!("YES")));
        assert!(json_as_bool(&json!("UNIQUE")));
        assert!(json_as_bool(&json!(1)));
        assert!(!json_as_bool(&json!("NO")));
        assert!(!json_as_bool(&json!(null)));
        assert_eq!(json_as_string(&json!(null)), None);
        assert_eq!(json_as_string(&json!(5)), Some("5".to_string()));
    }
}
