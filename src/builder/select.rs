//! Row selection: `SELECT`/`COUNT` over a single table with typed filters.

use super::{BuiltQuery, QueryBuilder, append_pagination};
use crate::error::{DbError, DbResult};
use crate::models::QueryParam;
use crate::models::identifier::validate_identifier;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::str::FromStr;

/// Comparison operators accepted in row filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    StartsWith,
    EndsWith,
    IsNull,
    IsNotNull,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
        }
    }

    fn takes_value(&self) -> bool {
        !matches!(self, Self::IsNull | Self::IsNotNull)
    }

    fn is_pattern(&self) -> bool {
        matches!(self, Self::Contains | Self::StartsWith | Self::EndsWith)
    }
}

impl FromStr for FilterOperator {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eq" => Ok(Self::Eq),
            "neq" => Ok(Self::Neq),
            "gt" => Ok(Self::Gt),
            "gte" => Ok(Self::Gte),
            "lt" => Ok(Self::Lt),
            "lte" => Ok(Self::Lte),
            "contains" => Ok(Self::Contains),
            "starts_with" => Ok(Self::StartsWith),
            "ends_with" => Ok(Self::EndsWith),
            "is_null" => Ok(Self::IsNull),
            "is_not_null" => Ok(Self::IsNotNull),
            other => Err(DbError::invalid_input(format!("invalid operator: {}", other))),
        }
    }
}

/// One `column <op> value` condition supplied by the caller.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RowFilter {
    /// Column to filter on
    pub column: String,
    /// eq, neq, gt, gte, lt, lte, contains, starts_with, ends_with, is_null, is_not_null
    pub operator: String,
    /// Comparison value (ignored by is_null / is_not_null)
    #[serde(default)]
    pub value: Option<JsonValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// `desc` in any case selects descending; anything else ascending.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("desc") => Self::Desc,
            _ => Self::Asc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A rendered WHERE condition (without the keyword) and its arguments.
///
/// Placeholders are numbered from 1, so the clause must be the first thing
/// in its statement that binds arguments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WhereClause {
    pub sql: String,
    pub args: Vec<QueryParam>,
}

impl WhereClause {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Parameters for [`QueryBuilder::select_rows`].
#[derive(Debug, Clone, Default)]
pub struct SelectQueryParams {
    pub schema: String,
    pub table: String,
    /// Empty selects every column
    pub columns: Vec<String>,
    pub filter: Option<WhereClause>,
    pub order_by: Option<String>,
    pub direction: SortDirection,
    pub limit: u64,
    pub offset: u64,
}

impl QueryBuilder {
    /// AND-joined conditions over `columns` (the table's real columns).
    ///
    /// Column names match case-insensitively and are emitted with the table's
    /// own spelling.
    pub fn where_clause(&self, filters: &[RowFilter], columns: &[String]) -> DbResult<WhereClause> {
        let mut conditions = Vec::with_capacity(filters.len());
        let mut args = Vec::new();

        for filter in filters {
            let column = resolve_column(&filter.column, columns)?;
            let operator: FilterOperator = filter.operator.parse()?;
            let quoted = self.quote(column);

            if !operator.takes_value() {
                let test = if operator == FilterOperator::IsNull {
                    "IS NULL"
                } else {
                    "IS NOT NULL"
                };
                conditions.push(format!("{} {}", quoted, test));
                continue;
            }

            let value = match filter.value.clone() {
                Some(JsonValue::Null) | None => {
                    return Err(DbError::invalid_input(format!(
                        "'{}' operator requires a value",
                        operator.as_str()
                    )));
                }
                Some(value) => value,
            };

            let placeholder = self.dialect().placeholder(args.len() + 1);
            if operator.is_pattern() {
                let JsonValue::String(text) = value else {
                    return Err(DbError::invalid_input(format!(
                        "'{}' operator requires a string value",
                        operator.as_str()
                    )));
                };
                let pattern = match operator {
                    FilterOperator::StartsWith => format!("{}%", text),
                    FilterOperator::EndsWith => format!("%{}", text),
                    _ => format!("%{}%", text),
                };
                conditions.push(format!("{} LIKE {}", quoted, placeholder));
                args.push(QueryParam::String(pattern));
            } else {
                let symbol = match operator {
                    FilterOperator::Eq => "=",
                    FilterOperator::Neq => "!=",
                    FilterOperator::Gt => ">",
                    FilterOperator::Gte => ">=",
                    FilterOperator::Lt => "<",
                    _ => "<=",
                };
                conditions.push(format!("{} {} {}", quoted, symbol, placeholder));
                args.push(QueryParam::from_json(value));
            }
        }

        Ok(WhereClause {
            sql: conditions.join(" AND "),
            args,
        })
    }

    /// `SELECT <cols> FROM <table> [WHERE ...]` plus pagination.
    pub fn select_rows(&self, params: &SelectQueryParams) -> DbResult<BuiltQuery> {
        validate_identifier("table", &params.table)?;
        if !params.schema.is_empty() {
            validate_identifier("schema", &params.schema)?;
        }

        let columns = if params.columns.is_empty() {
            "*".to_string()
        } else {
            params
                .columns
                .iter()
                .map(|c| {
                    validate_identifier("column", c)?;
                    Ok(self.quote(c))
                })
                .collect::<DbResult<Vec<_>>>()?
                .join(", ")
        };

        let order_by = match params.order_by.as_deref().map(str::trim) {
            Some(column) if !column.is_empty() => {
                validate_identifier("column", column)?;
                format!("{} {}", self.quote(column), params.direction.as_sql())
            }
            _ => String::new(),
        };

        let mut sql = format!(
            "SELECT {} FROM {}",
            columns,
            self.qualify_table(&params.schema, &params.table)
        );
        let args = push_where(&mut sql, params.filter.as_ref());
        append_pagination(self.dialect(), &mut sql, &order_by, params.limit, params.offset);

        tracing::debug!(driver = %self.driver(), args = args.len(), "Built select_rows");
        Ok(BuiltQuery { sql, args })
    }

    /// `SELECT COUNT(*) FROM <table> [WHERE ...]`.
    pub fn count_rows(
        &self,
        schema: &str,
        table: &str,
        filter: Option<&WhereClause>,
    ) -> DbResult<BuiltQuery> {
        validate_identifier("table", table)?;
        if !schema.is_empty() {
            validate_identifier("schema", schema)?;
        }
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.qualify_table(schema, table));
        let args = push_where(&mut sql, filter);
        Ok(BuiltQuery { sql, args })
    }
}

fn push_where(sql: &mut String, filter: Option<&WhereClause>) -> Vec<QueryParam> {
    match filter {
        Some(clause) if !clause.is_empty() => {
            sql.push_str(" WHERE ");
            sql.push_str(&clause.sql);
            clause.args.clone()
        }
        _ => Vec::new(),
    }
}

fn resolve_column<'a>(requested: &str, columns: &'a [String]) -> DbResult<&'a str> {
    validate_identifier("column", requested)?;
    columns
        .iter()
        .find(|c| c.eq_ignore_ascii_case(requested))
        .map(String::as_str)
        .ok_or_else(|| {
            DbError::invalid_input(format!("column does not exist: {}", requested))
        })
}
