//! Output formatting for CLI commands.

use comfy_table::{Cell, Color, ContentArrangement, Table};
use latiao_common::types::{Column, ColumnData};
use latiao_core::FieldStatistics;
use latiao_core::coerce::format_number;
use serde::Serialize;

/// Output format selection.
#[derive(Clone, Copy)]
pub enum Format {
    Table,
    Json,
}

impl From<crate::OutputFormat> for Format {
    fn from(f: crate::OutputFormat) -> Self {
        match f {
            crate::OutputFormat::Table => Format::Table,
            crate::OutputFormat::Json => Format::Json,
        }
    }
}

/// Print any serializable value as pretty JSON.
pub fn print_json<T: Serialize>(data: &T, quiet: bool) -> anyhow::Result<()> {
    if !quiet {
        println!("{}", serde_json::to_string_pretty(data)?);
    }
    Ok(())
}

/// Create a styled table with consistent formatting.
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
    table
}

/// Add a header row to a table.
pub fn add_header(table: &mut Table, headers: &[&str]) {
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );
}

fn cell(data: &ColumnData, row: usize) -> String {
    match data {
        ColumnData::Numbers(v) => v.get(row).map(|x| format_number(*x)).unwrap_or_default(),
        ColumnData::Texts(v) => v.get(row).cloned().unwrap_or_default(),
    }
}

/// Print columns side by side, one table row per data row, up to `max_rows`.
pub fn print_columns(columns: &[Column], max_rows: usize, quiet: bool) {
    if quiet || columns.is_empty() {
        return;
    }
    let mut table = create_table();
    table.set_header(
        columns
            .iter()
            .map(|c| Cell::new(format!("{}\n{}", c.token.name, c.token.mode)).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );
    let rows = columns.iter().map(Column::len).max().unwrap_or(0);
    for row in 0..rows.min(max_rows) {
        table.add_row(columns.iter().map(|c| cell(&c.data, row)).collect::<Vec<_>>());
    }
    println!("{table}");
    if rows > max_rows {
        status(&format!("... {} more rows", rows - max_rows), quiet);
    }
}

/// Print per-column statistics.
pub fn print_statistics(stats: &[(String, FieldStatistics)], quiet: bool) {
    if quiet {
        return;
    }
    let mut table = create_table();
    add_header(&mut table, &["Field", "Mode", "Count", "Valid", "Distinct", "Min", "Max", "Mean"]);
    let opt = |v: Option<f64>| v.map(format_number).unwrap_or_else(|| "-".to_string());
    for (name, s) in stats {
        table.add_row(vec![
            Cell::new(name).fg(Color::Green),
            Cell::new(s.mode),
            Cell::new(s.count),
            Cell::new(s.valid),
            Cell::new(s.distinct),
            Cell::new(opt(s.min)),
            Cell::new(opt(s.max)),
            Cell::new(opt(s.mean)),
        ]);
    }
    println!("{table}");
}

/// Print a status message (respects quiet mode).
pub fn status(msg: &str, quiet: bool) {
    if !quiet {
        println!("{msg}");
    }
}

/// Print a success message.
pub fn success(msg: &str, quiet: bool) {
    if !quiet {
        println!("✓ {msg}");
    }
}

/// Print an error message.
pub fn error(msg: &str) {
    eprintln!("✗ {msg}");
}
