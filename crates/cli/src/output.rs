//! Rendering command results as JSON or aligned tables.

use client::MESSAGE_FIELD;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    #[default]
    Table,
}

pub fn render(value: &Value, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        OutputFormat::Table => render_table(value),
    }
}

/// Tabulate a value, unwrapping a `data` envelope first.
///
/// Arrays become one row per item under the first item's keys; objects become
/// key/value rows. Status and message fields follow the table.
pub fn render_table(value: &Value) -> String {
    let body = match value.get("data") {
        Some(data) if !data.is_null() => data,
        _ => value,
    };

    let mut out = match body {
        Value::Null => "No data to display".to_string(),
        Value::Array(items) if items.is_empty() => "No results found".to_string(),
        Value::Array(items) => array_table(items),
        Value::Object(map) => object_table(map),
        other => cell(other),
    };

    if let Some(success) = value.get("success").and_then(Value::as_bool) {
        out.push('\n');
        out.push_str(if success { "Success" } else { "Failed" });
    }
    let message = value
        .get(MESSAGE_FIELD)
        .or_else(|| value.get("message"))
        .and_then(Value::as_str);
    if let Some(message) = message {
        out.push_str("\nMessage: ");
        out.push_str(message);
    }
    out
}

fn array_table(items: &[Value]) -> String {
    let Some(Value::Object(first)) = items.first() else {
        return items.iter().map(cell).collect::<Vec<_>>().join("\n");
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|item| {
            headers
                .iter()
                .map(|key| item.get(key).map(cell).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain([header.chars().count()])
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(row_line(&headers, &widths));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    lines.extend(rows.iter().map(|row| row_line(row, &widths)));
    lines.join("\n")
}

fn object_table(map: &Map<String, Value>) -> String {
    let entries: Vec<(&String, &Value)> =
        map.iter().filter(|(key, _)| *key != MESSAGE_FIELD).collect();
    let width = entries
        .iter()
        .map(|(key, _)| key.chars().count())
        .max()
        .unwrap_or(0);

    entries
        .iter()
        .map(|(key, value)| format!("{key:<width$}  {}", cell(value)).trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn row_line(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
