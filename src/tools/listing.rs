//! Shared pieces of the catalog tools: argument resolution, listing
//! envelopes and positional cell readers for catalog rows.

use crate::builder::BuiltQuery;
use crate::db::ActiveDatasource;
use crate::error::{DbError, DbResult};
use crate::models::{
    PageInfo, PaginationParams, RowSet, json_as_bool, json_as_string, resolve_schema,
    validate_identifier,
};
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Filters echoed back with a listing.
#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct ListingFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_type: Option<String>,
}

/// Source text of a routine, view or trigger.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DefinitionOutput {
    pub schema: String,
    pub name: String,
    pub definition: String,
}

/// Schema argument of a listing: no default, so an absent schema lists every
/// schema the catalog query covers.
pub(crate) fn listing_schema(schema: Option<&str>) -> DbResult<Option<String>> {
    let schema = resolve_schema(schema, "")?;
    Ok((!schema.is_empty()).then_some(schema))
}

/// Optional identifier argument (table filter of `list_triggers`).
pub(crate) fn optional_identifier(kind: &str, value: Option<&str>) -> DbResult<Option<String>> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => {
            validate_identifier(kind, v)?;
            Ok(Some(v.to_string()))
        }
        _ => Ok(None),
    }
}

/// Name substring filter; blank means no filter.
pub(crate) fn name_filter(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Required object name, checked against the identifier grammar.
pub(crate) fn required_identifier(kind: &str, value: &str) -> DbResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DbError::invalid_input(format!("{}_name is required", kind)));
    }
    validate_identifier(kind, value)?;
    Ok(value.to_string())
}

pub(crate) fn page_info(params: PaginationParams, rows: &RowSet) -> PageInfo {
    PageInfo::from_page_len(params, rows.len())
}

/// Text of the cell at `idx`; `None` for NULL or a short row.
pub(crate) fn cell(row: &[JsonValue], idx: usize) -> Option<String> {
    row.get(idx).and_then(json_as_string)
}

pub(crate) fn cell_or_empty(row: &[JsonValue], idx: usize) -> String {
    cell(row, idx).unwrap_or_default()
}

pub(crate) fn cell_flag(row: &[JsonValue], idx: usize) -> bool {
    row.get(idx).is_some_and(json_as_bool)
}

/// Run a code/definition lookup and assemble the text.
///
/// The dialect assembles the text from the returned rows. A missing or blank
/// definition is an error naming `what`.
pub(crate) async fn fetch_definition(
    datasource: &ActiveDatasource,
    executor: &crate::db::QueryExecutor,
    query: &BuiltQuery,
    what: &str,
    object: &str,
) -> DbResult<String> {
    let rows = executor.fetch(&datasource.pool, query).await?;
    let definition = datasource.builder.dialect().assemble_source(&rows);

    if definition.trim().is_empty() {
        return Err(DbError::schema(format!("{} not available", what), object));
    }
    Ok(definition)
}

/// `schema.name`, or just `name` without a schema.
pub(crate) fn display_name(schema: &str, name: &str) -> String {
    if schema.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", schema, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_listing_schema() {
        assert_eq!(listing_schema(None).unwrap(), None);
        assert_eq!(listing_schema(Some("  ")).unwrap(), None);
        assert_eq!(listing_schema(Some("sales")).unwrap(), Some("sales".to_string()));
        assert!(listing_schema(Some("bad schema")).is_err());
    }

    #[test]
    fn test_required_identifier() {
        assert_eq!(required_identifier("table", " users ").unwrap(), "users");
        let err = required_identifier("table", "").unwrap_err();
        assert!(err.to_string().contains("table_name is required"));
        let err = required_identifier("table", "users;drop").unwrap_err();
        assert!(err.to_string().contains("invalid identifier"));
    }

    #[test]
    fn test_optional_identifier() {
        assert_eq!(optional_identifier("table", None).unwrap(), None);
        assert_eq!(
            optional_identifier("table", Some("orders")).unwrap(),
            Some("orders".to_string())
        );
        assert!(optional_identifier("table", Some("or-ders")).is_err());
    }

    #[test]
    fn test_cells() {
        let row = vec![json!("dbo"), JsonValue::Null, json!(1), json!("N")];
        assert_eq!(cell(&row, 0).as_deref(), Some("dbo"));
        assert_eq!(cell(&row, 1), None);
        assert_eq!(cell(&row, 9), None);
        assert_eq!(cell_or_empty(&row, 1), "");
        assert!(cell_flag(&row, 2));
        assert!(!cell_flag(&row, 3));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("dbo", "Orders"), "dbo.Orders");
        assert_eq!(display_name("", "orders"), "orders");
    }
}
