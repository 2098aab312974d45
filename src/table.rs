//! Tabular rendering of metadata records.
//!
//! Records are projected onto the requested [`Field`]s, sorted by their first
//! column, and rendered as plain text or JSON. Rendering is a pure function
//! of its inputs: no terminal queries and no external tools.

use crate::error::Result;
use crate::metadata::MetadataRecord;
use serde_json::{Map, Value};
use std::fmt;

/// Extra padding after each aligned column in [`OutputMode::PrettyAligned`]
pub const COLUMN_GAP: usize = 5;

/// Number of leading columns padded in [`OutputMode::PrettyAligned`]
const ALIGNED_COLUMNS: usize = 2;

/// One rendered line's cells, in field order
pub type TableRow = Vec<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Field {
    Name,
    Version,
    Summary,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Version => "version",
            Field::Summary => "summary",
        }
    }

    /// Whether showing this field needs a metadata lookup.
    pub fn needs_metadata(&self) -> bool {
        !matches!(self, Field::Name)
    }

    fn extract(&self, record: &MetadataRecord) -> String {
        match self {
            Field::Name => record.name.clone(),
            Field::Version => record.version.clone(),
            Field::Summary => record.summary.clone(),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputMode {
    /// Space separated
    Raw,
    /// Tab separated
    #[default]
    Pretty,
    /// Leading columns padded to a common width
    PrettyAligned,
    /// Array of objects with the selected fields
    Json,
}

/// Drop duplicate fields and move `name` to the front if present.
pub fn normalize_fields(fields: &[Field]) -> Vec<Field> {
    let mut out: Vec<Field> = Vec::with_capacity(fields.len());
    if fields.contains(&Field::Name) {
        out.push(Field::Name);
    }
    for field in fields {
        if !out.contains(field) {
            out.push(*field);
        }
    }
    out
}

/// Project a record onto `fields`.
pub fn project(record: &MetadataRecord, fields: &[Field]) -> TableRow {
    fields.iter().map(|f| f.extract(record)).collect()
}

/// Widest cell per column, in chars. Short rows count as zero-width.
pub fn compute_column_widths(rows: &[TableRow]) -> Vec<usize> {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0; columns];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }
    widths
}

/// Stable ascending sort on the first cell.
pub fn sort_rows(rows: &mut [TableRow]) {
    rows.sort_by(|a, b| a.first().cmp(&b.first()));
}

/// Sort `rows` and format them for output.
///
/// Every line ends in a newline; no rows render as an empty string.
pub fn render(mut rows: Vec<TableRow>, fields: &[Field], mode: OutputMode) -> Result<String> {
    if rows.is_empty() {
        return Ok(String::new());
    }

    sort_rows(&mut rows);

    let mut out = String::new();
    match mode {
        OutputMode::Raw => {
            for row in &rows {
                let cells: Vec<String> = row.iter().map(|c| flatten_separators(c)).collect();
                out.push_str(&cells.join(" "));
                out.push('\n');
            }
        }
        OutputMode::Pretty => {
            for row in &rows {
                out.push_str(&row.join("\t"));
                out.push('\n');
            }
        }
        OutputMode::PrettyAligned => {
            let widths = compute_column_widths(&rows);
            for row in &rows {
                out.push_str(&align_row(row, &widths));
                out.push('\n');
            }
        }
        OutputMode::Json => {
            let documents: Vec<Value> = rows.iter().map(|row| to_document(row, fields)).collect();
            out.push_str(&serde_json::to_string_pretty(&documents)?);
            out.push('\n');
        }
    }

    Ok(out)
}

fn align_row(row: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (i, cell) in row.iter().enumerate() {
        let is_last = i + 1 == row.len();
        if i < ALIGNED_COLUMNS && !is_last {
            let width = widths[i] + COLUMN_GAP;
            let pad = width - cell.chars().count();
            line.push_str(cell);
            line.extend(std::iter::repeat_n(' ', pad));
        } else {
            if i > ALIGNED_COLUMNS {
                line.push(' ');
            }
            line.push_str(cell);
        }
    }
    line
}

fn to_document(row: &[String], fields: &[Field]) -> Value {
    let mut doc = Map::new();
    for (field, cell) in fields.iter().zip(row) {
        doc.insert(field.as_str().to_string(), Value::String(cell.clone()));
    }
    Value::Object(doc)
}

/// Collapse runs of tabs and line breaks into a single space.
fn flatten_separators(cell: &str) -> String {
    let mut out = String::with_capacity(cell.len());
    let mut in_run = false;
    for c in cell.chars() {
        if matches!(c, '\t' | '\n' | '\r' | '\x0b' | '\x0c') {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}
