//! Rendering result sets for the terminal.

use crate::db::ResultSet;

/// Output format for `qcat run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned plain-text table.
    #[default]
    Table,
    /// JSON array of row objects, keys in column order.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {s}. Expected: table or json")),
        }
    }
}

/// Renders `result` in the requested format.
pub fn render(result: &ResultSet, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => render_table(result),
        OutputFormat::Json => render_json(result),
    }
}

/// Renders an aligned table followed by a row count line.
pub fn render_table(result: &ResultSet) -> String {
    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(|v| v.to_display_string()).collect())
        .collect();

    let mut widths: Vec<usize> = result
        .columns
        .iter()
        .map(|c| c.name.chars().count())
        .collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_line = |values: Vec<&str>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(value, &width)| format!("{value:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(cells.len() + 3);
    lines.push(format_line(result.column_names()));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in &cells {
        lines.push(format_line(row.iter().map(String::as_str).collect()));
    }

    let count = result.row_count();
    lines.push(format!("({} row{})", count, if count == 1 { "" } else { "s" }));
    if let Some(warning) = result.truncation_warning() {
        lines.push(warning);
    }
    lines.join("\n")
}

/// Renders rows as pretty-printed JSON.
pub fn render_json(result: &ResultSet) -> String {
    serde_json::to_string_pretty(&result.to_json()).unwrap_or_else(|_| "[]".to_string())
}
