use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;

use crate::exit::{CliError, CliResult, INTERNAL};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per line.
    Json,
    /// A bordered table.
    Table,
    /// `Column=value` pairs, one row per line.
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Render table rows. Columns follow the row type's field order.
pub fn print_rows<T: Serialize>(rows: &[T], format: OutputFormat) -> CliResult<()> {
    let rows = rows
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<Value>, _>>()
        .map_err(|err| CliError::new(INTERNAL, format!("failed to serialize rows: {err}")))?;

    match format {
        OutputFormat::Json => {
            for row in &rows {
                println!("{row}");
            }
        }
        OutputFormat::Table => {
            if let Some(table) = render_table(&rows) {
                println!("{table}");
            }
        }
        OutputFormat::Pretty => {
            for row in &rows {
                println!("{}", render_pairs(row));
            }
        }
    }
    Ok(())
}

/// Render a single document.
pub fn print_value(value: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{value}"),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!(
                "{}",
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            );
        }
    }
}

fn render_table(rows: &[Value]) -> Option<Table> {
    let header: Vec<String> = rows.first()?.as_object()?.keys().cloned().collect();
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.clone());
    for row in rows {
        table.add_row(
            header
                .iter()
                .map(|column| cell(row.get(column).unwrap_or(&Value::Null)))
                .collect::<Vec<_>>(),
        );
    }
    Some(table)
}

fn render_pairs(row: &Value) -> String {
    match row.as_object() {
        Some(columns) => columns
            .iter()
            .map(|(column, value)| format!("{column}={}", cell(value)))
            .collect::<Vec<_>>()
            .join(" "),
        None => cell(row),
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn pairs_keep_column_order() {
        let row = json!({"Time": 1.5, "Driver": "44", "Position": null});
        assert_eq!(render_pairs(&row), "Time=1.5 Driver=44 Position=");
    }

    #[test]
    fn table_header_comes_from_first_row() {
        let rows = vec![json!({"Driver": "1", "X": 10}), json!({"Driver": "44"})];
        let rendered = render_table(&rows).unwrap().to_string();
        assert!(rendered.contains("Driver"));
        assert!(rendered.contains("44"));
        assert!(render_table(&[]).is_none());
    }
}
