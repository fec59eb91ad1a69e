//! Loading origin columns from files.
//!
//! Two formats are understood:
//!
//! - JSON: an array of columns, `[{"fid", "name", "mode", "data"}, ...]`.
//!   The legacy mode names `group` and `collection` are accepted.
//! - CSV with a header row. A header cell may carry a mode hint after a colon
//!   (`price:vec`, `city:text`); without one, a column whose non-empty cells
//!   all parse as numbers is `vec` and anything else is `text`.
//!
//! CSV column ids and names are the header text; empty numeric cells load as
//! NaN.

use std::fs;
use std::io::Read;
use std::path::Path;

use latiao_common::types::{Column, ColumnData, FieldMode, FieldToken};
use latiao_common::utils::error::{Error, Result};
use latiao_core::coerce::parse_number;
use tracing::debug;

/// Dataset file layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// JSON column array.
    Json,
    /// Comma-separated values with a header row.
    Csv,
}

impl Format {
    /// Guesses the format from a file extension, defaulting to JSON.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Json,
        }
    }
}

/// Loads a dataset file, picking the format from its extension.
pub fn load(path: &Path) -> Result<Vec<Column>> {
    let format = Format::from_path(path);
    let text = fs::read_to_string(path)?;
    let columns = parse(&text, format)?;
    debug!(path = %path.display(), columns = columns.len(), "dataset loaded");
    Ok(columns)
}

/// Reads a whole dataset from `reader`.
pub fn read(mut reader: impl Read, format: Format) -> Result<Vec<Column>> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    parse(&text, format)
}

/// Parses dataset text.
pub fn parse(text: &str, format: Format) -> Result<Vec<Column>> {
    let columns = match format {
        Format::Json => serde_json::from_str::<Vec<Column>>(text)?,
        Format::Csv => parse_csv(text)?,
    };
    for column in &columns {
        column.validate()?;
    }
    Ok(columns)
}

fn parse_csv(text: &str) -> Result<Vec<Column>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<(String, Option<FieldMode>)> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(header)
        .collect::<Result<_>>()?;

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        for (i, column) in cells.iter_mut().enumerate() {
            column.push(record.get(i).unwrap_or_default().to_string());
        }
    }

    headers
        .into_iter()
        .zip(cells)
        .map(|((name, hint), cells)| {
            let mode = hint.unwrap_or_else(|| infer_mode(&cells));
            let data = if mode.is_text() {
                ColumnData::Texts(cells)
            } else {
                ColumnData::Numbers(cells.iter().map(|c| cell_number(c)).collect())
            };
            Column::new(FieldToken::origin(name.as_str(), name.as_str(), mode), data)
        })
        .collect()
}

fn header(cell: &str) -> Result<(String, Option<FieldMode>)> {
    let Some((name, hint)) = cell.rsplit_once(':') else {
        return Ok((cell.to_string(), None));
    };
    let mode = serde_json::from_value::<FieldMode>(serde_json::Value::String(hint.trim().to_string()))
        .map_err(|_| Error::Serialization(format!("Unknown mode \"{hint}\" in header \"{cell}\".")))?;
    Ok((name.trim().to_string(), Some(mode)))
}

fn infer_mode(cells: &[String]) -> FieldMode {
    let numeric = cells
        .iter()
        .filter(|c| !c.is_empty())
        .all(|c| !parse_number(c).is_nan());
    if numeric { FieldMode::Vec } else { FieldMode::Text }
}

fn cell_number(cell: &str) -> f64 {
    if cell.is_empty() { f64::NAN } else { parse_number(cell) }
}

fn csv_error(err: csv::Error) -> Error {
    Error::Serialization(format!("Invalid CSV: {err}"))
}
