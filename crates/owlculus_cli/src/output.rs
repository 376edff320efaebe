use serde::Serialize;

use crate::cli::OutputFormat;

/// Rows rendered when the table format is selected.
pub struct Table {
    pub headers: &'static [&'static str],
    pub rows: Vec<Vec<String>>,
}

/// Prints `value` as pretty JSON, or the table built by `table`.
pub fn emit<T: Serialize>(
    format: OutputFormat,
    value: &T,
    table: impl FnOnce() -> Table,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Table => {
            let table = table();
            println!("{}", render_table(table.headers, &table.rows));
        }
    }
    Ok(())
}

/// Prints a one-line confirmation, or `value` as JSON.
pub fn message<T: Serialize>(format: OutputFormat, value: &T, text: &str) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Table => println!("{text}"),
    }
    Ok(())
}

/// Renders a left-aligned table with a dashed divider.
#[must_use]
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return String::from("(no rows)");
    }

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(index, header)| {
            rows.iter()
                .filter_map(|row| row.get(index))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
                .max(header.chars().count())
        })
        .collect();

    let format_line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header_line = format_line(headers.to_vec());
    let divider = "-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1));
    let mut lines = vec![header_line, divider];
    for row in rows {
        let cells = (0..headers.len())
            .map(|index| row.get(index).map_or("-", String::as_str))
            .collect();
        lines.push(format_line(cells));
    }
    lines.join("\n")
}

/// Cell text for an optional value.
pub fn or_dash(value: Option<&str>) -> String {
    dash(value.unwrap_or_default())
}

/// Cell text, `-` when empty.
pub fn dash(text: &str) -> String {
    if text.is_empty() {
        "-".to_string()
    } else {
        text.to_string()
    }
}
