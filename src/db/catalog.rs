//! Tagged decoding of per-table catalog rows.
//!
//! Server engines answer column, index, foreign-key and primary-key queries
//! with information-schema shaped rows; SQLite answers with `PRAGMA` rows of a
//! different shape. Each catalog kind is a two-variant enum chosen by driver,
//! and callers read it through the accessors after the match.

use crate::dialect::DriverType;
use crate::models::{RowSet, json_as_bool, json_as_i64, json_as_string};
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value as JsonValue;

fn text(row: &[JsonValue], idx: usize) -> Option<String> {
    row.get(idx).and_then(json_as_string)
}

fn text_or_empty(row: &[JsonValue], idx: usize) -> String {
    text(row, idx).unwrap_or_default()
}

fn int(row: &[JsonValue], idx: usize) -> Option<i64> {
    row.get(idx).and_then(json_as_i64)
}

fn flag(row: &[JsonValue], idx: usize) -> bool {
    row.get(idx).is_some_and(json_as_bool)
}

fn is_pragma(driver: DriverType) -> bool {
    driver == DriverType::Sqlite
}

// =============================================================================
// Columns
// =============================================================================

/// Which column query produced the rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnShape {
    /// (name, type, nullable, default, max_length)
    Describe,
    /// (name, type, max_length, nullable, default)
    Columns,
    /// (name, type, max_length, precision, scale, nullable, default, is_primary_key)
    Full,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InformationSchemaColumn {
    pub name: String,
    pub data_type: String,
    pub max_length: Option<i64>,
    pub precision: Option<i64>,
    pub scale: Option<i64>,
    pub nullable: bool,
    pub default: Option<String>,
    pub is_primary_key: bool,
}

/// `PRAGMA table_info` row: (cid, name, type, notnull, dflt_value, pk).
#[derive(Debug, Clone, PartialEq)]
pub struct PragmaColumn {
    pub cid: i64,
    pub name: String,
    pub data_type: String,
    pub not_null: bool,
    pub default: Option<String>,
    /// 1-based position in the primary key, 0 when not part of it
    pub pk: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnRow {
    InformationSchema(InformationSchemaColumn),
    Pragma(PragmaColumn),
}

impl ColumnRow {
    pub fn decode_all(driver: DriverType, shape: ColumnShape, rows: &RowSet) -> Vec<Self> {
        rows.rows
            .iter()
            .map(|row| {
                if is_pragma(driver) {
                    Self::Pragma(PragmaColumn {
                        cid: int(row, 0).unwrap_or_default(),
                        name: text_or_empty(row, 1),
                        data_type: text_or_empty(row, 2),
                        not_null: flag(row, 3),
                        default: text(row, 4),
                        pk: int(row, 5).unwrap_or_default(),
                    })
                } else {
                    Self::InformationSchema(decode_information_schema_column(shape, row))
                }
            })
            .collect()
    }

    pub fn name(&self) -> &str {
        match self {
            Self::InformationSchema(c) => &c.name,
            Self::Pragma(c) => &c.name,
        }
    }

    pub fn data_type(&self) -> &str {
        match self {
            Self::InformationSchema(c) => &c.data_type,
            Self::Pragma(c) => &c.data_type,
        }
    }

    pub fn nullable(&self) -> bool {
        match self {
            Self::InformationSchema(c) => c.nullable,
            // INTEGER PRIMARY KEY is the rowid and never null
            Self::Pragma(c) => !c.not_null && c.pk == 0,
        }
    }

    pub fn default_value(&self) -> Option<&str> {
        match self {
            Self::InformationSchema(c) => c.default.as_deref(),
            Self::Pragma(c) => c.default.as_deref(),
        }
    }

    pub fn max_length(&self) -> Option<i64> {
        match self {
            Self::InformationSchema(c) => c.max_length,
            Self::Pragma(_) => None,
        }
    }

    pub fn precision(&self) -> Option<i64> {
        match self {
            Self::InformationSchema(c) => c.precision,
            Self::Pragma(_) => None,
        }
    }

    pub fn scale(&self) -> Option<i64> {
        match self {
            Self::InformationSchema(c) => c.scale,
            Self::Pragma(_) => None,
        }
    }

    pub fn is_primary_key(&self) -> bool {
        match self {
            Self::InformationSchema(c) => c.is_primary_key,
            Self::Pragma(c) => c.pk > 0,
        }
    }

    pub fn to_info(&self) -> ColumnInfo {
        ColumnInfo {
            name: self.name().to_string(),
            data_type: self.data_type().to_string(),
            nullable: self.nullable(),
            default_value: self.default_value().map(str::to_string),
            max_length: self.max_length(),
            precision: self.precision(),
            scale: self.scale(),
            is_primary_key: self.is_primary_key(),
        }
    }
}

fn decode_information_schema_column(
    shape: ColumnShape,
    row: &[JsonValue],
) -> InformationSchemaColumn {
    let name = text_or_empty(row, 0);
    let data_type = text_or_empty(row, 1);
    match shape {
        ColumnShape::Describe => InformationSchemaColumn {
            name,
            data_type,
            nullable: flag(row, 2),
            default: text(row, 3),
            max_length: int(row, 4),
            precision: None,
            scale: None,
            is_primary_key: false,
        },
        ColumnShape::Columns => InformationSchemaColumn {
            name,
            data_type,
            max_length: int(row, 2),
            nullable: flag(row, 3),
            default: text(row, 4),
            precision: None,
            scale: None,
            is_primary_key: false,
        },
        ColumnShape::Full => InformationSchemaColumn {
            name,
            data_type,
            max_length: int(row, 2),
            precision: int(row, 3),
            scale: int(row, 4),
            nullable: flag(row, 5),
            default: text(row, 6),
            is_primary_key: flag(row, 7),
        },
    }
}

/// Column description returned by the table tools.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<i64>,
    pub is_primary_key: bool,
}

// =============================================================================
// Primary keys
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryKeyRow {
    /// (column)
    InformationSchema { column: String },
    /// `PRAGMA table_info` row with a non-zero pk rank
    Pragma { column: String, rank: i64 },
}

impl PrimaryKeyRow {
    /// Key columns in key order. Pragma rows that are not part of the key are dropped.
    pub fn decode_all(driver: DriverType, rows: &RowSet) -> Vec<Self> {
        if is_pragma(driver) {
            let mut keys: Vec<Self> = rows
                .rows
                .iter()
                .filter_map(|row| {
                    let rank = int(row, 5).unwrap_or_default();
                    (rank > 0).then(|| Self::Pragma {
                        column: text_or_empty(row, 1),
                        rank,
                    })
                })
                .collect();
            keys.sort_by_key(|k| match k {
                Self::Pragma { rank, .. } => *rank,
                Self::InformationSchema { .. } => 0,
            });
            keys
        } else {
            rows.rows
                .iter()
                .map(|row| Self::InformationSchema {
                    column: text_or_empty(row, 0),
                })
                .collect()
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Self::InformationSchema { column } | Self::Pragma { column, .. } => column,
        }
    }
}

// =============================================================================
// Indexes
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum IndexRow {
    /// (name, type, is_unique, column), one row per indexed column
    InformationSchema {
        name: String,
        index_type: String,
        is_unique: bool,
        column: String,
    },
    /// `PRAGMA index_list` row: (seq, name, unique, origin, partial)
    Pragma {
        seq: i64,
        name: String,
        is_unique: bool,
        /// `c` (CREATE INDEX), `u` (UNIQUE constraint) or `pk`
        origin: String,
        partial: bool,
    },
}

impl IndexRow {
    pub fn decode_all(driver: DriverType, rows: &RowSet) -> Vec<Self> {
        rows.rows
            .iter()
            .map(|row| {
                if is_pragma(driver) {
                    Self::Pragma {
                        seq: int(row, 0).unwrap_or_default(),
                        name: text_or_empty(row, 1),
                        is_unique: flag(row, 2),
                        origin: text_or_empty(row, 3),
                        partial: flag(row, 4),
                    }
                } else {
                    Self::InformationSchema {
                        name: text_or_empty(row, 0),
                        index_type: text_or_empty(row, 1),
                        is_unique: flag(row, 2),
                        column: text_or_empty(row, 3),
                    }
                }
            })
            .collect()
    }

    pub fn name(&self) -> &str {
        match self {
            Self::InformationSchema { name, .. } | Self::Pragma { name, .. } => name,
        }
    }

    pub fn index_type(&self) -> &str {
        match self {
            Self::InformationSchema { index_type, .. } => index_type,
            Self::Pragma { origin, .. } => match origin.as_str() {
                "pk" => "PRIMARY KEY",
                "u" => "UNIQUE",
                _ => "BTREE",
            },
        }
    }

    pub fn is_unique(&self) -> bool {
        match self {
            Self::InformationSchema { is_unique, .. } | Self::Pragma { is_unique, .. } => {
                *is_unique
            }
        }
    }

    /// Indexed column; pragma rows list indexes without their columns.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::InformationSchema { column, .. } => Some(column),
            Self::Pragma { .. } => None,
        }
    }
}

/// One index with its columns in index order.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct IndexInfo {
    pub name: String,
    pub index_type: String,
    pub is_unique: bool,
    pub columns: Vec<String>,
}

/// Fold per-column index rows into one entry per index, keeping first-seen order.
pub fn group_indexes(rows: &[IndexRow]) -> Vec<IndexInfo> {
    let mut grouped: Vec<IndexInfo> = Vec::new();
    for row in rows {
        let position = grouped.iter().position(|i| i.name == row.name());
        let entry = match position {
            Some(pos) => &mut grouped[pos],
            None => {
                grouped.push(IndexInfo {
                    name: row.name().to_string(),
                    index_type: row.index_type().to_string(),
                    is_unique: row.is_unique(),
                    columns: Vec::new(),
                });
                let last = grouped.len() - 1;
                &mut grouped[last]
            }
        };
        if let Some(column) = row.column() {
            entry.columns.push(column.to_string());
        }
    }
    grouped
}

// =============================================================================
// Foreign keys
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ForeignKeyRow {
    /// (constraint, column, referenced_schema, referenced_table, referenced_column)
    InformationSchema {
        constraint: String,
        column: String,
        referenced_schema: Option<String>,
        referenced_table: String,
        referenced_column: String,
    },
    /// `PRAGMA foreign_key_list` row:
    /// (id, seq, table, from, to, on_update, on_delete, match)
    Pragma {
        id: i64,
        seq: i64,
        table: String,
        from: String,
        to: Option<String>,
        on_update: String,
        on_delete: String,
    },
}

impl ForeignKeyRow {
    pub fn decode_all(driver: DriverType, rows: &RowSet) -> Vec<Self> {
        rows.rows
            .iter()
            .map(|row| {
                if is_pragma(driver) {
                    Self::Pragma {
                        id: int(row, 0).unwrap_or_default(),
                        seq: int(row, 1).unwrap_or_default(),
                        table: text_or_empty(row, 2),
                        from: text_or_empty(row, 3),
                        to: text(row, 4),
                        on_update: text_or_empty(row, 5),
                        on_delete: text_or_empty(row, 6),
                    }
                } else {
                    Self::InformationSchema {
                        constraint: text_or_empty(row, 0),
                        column: text_or_empty(row, 1),
                        referenced_schema: text(row, 2),
                        referenced_table: text_or_empty(row, 3),
                        referenced_column: text_or_empty(row, 4),
                    }
                }
            })
            .collect()
    }

    pub fn to_info(&self) -> ForeignKeyInfo {
        match self {
            Self::InformationSchema {
                constraint,
                column,
                referenced_schema,
                referenced_table,
                referenced_column,
            } => ForeignKeyInfo {
                constraint_name: constraint.clone(),
                column: column.clone(),
                referenced_schema: referenced_schema.clone(),
                referenced_table: referenced_table.clone(),
                referenced_column: Some(referenced_column.clone()),
                on_update: None,
                on_delete: None,
            },
            Self::Pragma {
                id,
                table,
                from,
                to,
                on_update,
                on_delete,
                ..
            } => ForeignKeyInfo {
                // SQLite constraints are unnamed
                constraint_name: format!("fk_{}", id),
                column: from.clone(),
                referenced_schema: None,
                referenced_table: table.clone(),
                // NULL when the parent's primary key is implied
                referenced_column: to.clone(),
                on_update: Some(on_update.clone()),
                on_delete: Some(on_delete.clone()),
            },
        }
    }
}

/// Foreign key column mapping returned by the table tools.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ForeignKeyInfo {
    pub constraint_name: String,
    pub column: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referenced_schema: Option<String>,
    pub referenced_table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referenced_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_update: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<String>,
}
