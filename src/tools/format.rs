//! Text rendering of query results.
//!
//! `execute_query` can return its rows as structured JSON or pre-rendered as
//! an ASCII table (MySQL CLI style) or a markdown table.

use crate::models::RowSet;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use unicode_width::UnicodeWidthStr;

/// Output format for query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// ASCII table format (like MySQL CLI)
    Table,
    /// Markdown table format
    Markdown,
}

pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(arr) => serde_json::to_string(arr).unwrap_or_default(),
        JsonValue::Object(obj) => serde_json::to_string(obj).unwrap_or_default(),
    }
}

/// Markdown cells cannot contain raw pipes or line breaks.
fn markdown_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

pub fn format_as_table(rows: &RowSet, execution_time_ms: u64) -> String {
    if rows.columns.is_empty() {
        return "Empty set".to_string();
    }

    let mut widths: Vec<usize> = rows.columns.iter().map(|c| c.width()).collect();
    for row in &rows.rows {
        for (i, value) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(format_value(value).width());
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    let mut output = String::new();
    output.push_str(&separator);
    let header: String = rows
        .columns
        .iter()
        .zip(&widths)
        .map(|(name, w)| pad_center(name, *w))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);
    output.push_str(&separator);

    for row in &rows.rows {
        let line: String = widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let value = row.get(i).unwrap_or(&JsonValue::Null);
                let text = format_value(value);
                if matches!(value, JsonValue::Number(_)) {
                    pad_right_aligned(&text, *w)
                } else {
                    pad_left_aligned(&text, *w)
                }
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&line);
    }

    output.push_str(&separator);

    let row_count = rows.len();
    let row_text = if row_count == 1 { "row" } else { "rows" };
    output.push_str(&format!(
        "{} {} in set ({:.2} sec)\n",
        row_count,
        row_text,
        execution_time_ms as f64 / 1000.0
    ));
    if rows.truncated {
        output.push_str("(result truncated)\n");
    }

    output
}

pub fn format_as_markdown(rows: &RowSet) -> String {
    if rows.columns.is_empty() {
        return "*Empty set*".to_string();
    }

    let mut output = String::new();

    let header: String = rows
        .columns
        .iter()
        .map(|c| format!("| {} ", markdown_cell(c)))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);

    let sep: String = rows.columns.iter().map(|_| "|---").collect::<String>() + "|\n";
    output.push_str(&sep);

    for row in &rows.rows {
        let line: String = (0..rows.columns.len())
            .map(|i| {
                let value = row.get(i).unwrap_or(&JsonValue::Null);
                format!("| {} ", markdown_cell(&format_value(value)))
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&line);
    }

    output.push_str(&format!("\n*{} rows*", rows.len()));
    if rows.truncated {
        output.push_str(" *(truncated)*");
    }

    output
}

// `format!` width specifiers count chars, not display columns, so CJK and
// emoji need explicit padding.

fn pad_left_aligned(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(text.width());
    format!("| {}{} ", text, " ".repeat(pad))
}

fn pad_right_aligned(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(text.width());
    format!("| {}{} ", " ".repeat(pad), text)
}

fn pad_center(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(text.width());
    let left = pad / 2;
    format!("| {}{}{} ", " ".repeat(left), text, " ".repeat(pad - left))
}
