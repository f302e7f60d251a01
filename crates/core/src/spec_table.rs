//! Static vehicle spec table loaded from CSV.
//!
//! The table is read once at startup and kept in memory. Rows are keyed by
//! the `Name` column; header cells are whitespace-trimmed on load so a header
//! written as `" Name "` still matches. Lookups are exact and case-sensitive.

use std::path::Path;

use serde_json::{Map, Number, Value};

/// Column that identifies a row.
pub const NAME_COLUMN: &str = "Name";

/// One spec row: column name to typed cell value, in header order.
pub type SpecRow = Map<String, Value>;

/// Errors raised while loading the table. A lookup miss is never an error.
#[derive(Debug, thiserror::Error)]
pub enum SpecTableError {
    #[error("failed to read spec table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("spec table is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("spec table has no header row")]
    MissingHeader,

    #[error("spec table has no 'Name' column")]
    MissingNameColumn,
}

/// In-memory spec table.
#[derive(Debug, Clone, Default)]
pub struct SpecTable {
    headers: Vec<String>,
    rows: Vec<SpecRow>,
}

impl SpecTable {
    /// A table with no rows; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read and parse a CSV file.
    pub fn load(path: &Path) -> Result<Self, SpecTableError> {
        let bytes = std::fs::read(path).map_err(|source| SpecTableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_csv(&bytes)
    }

    /// Parse CSV bytes. The first record is the header row.
    pub fn from_csv(data: &[u8]) -> Result<Self, SpecTableError> {
        let text = std::str::from_utf8(data)?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut records = parse_records(text).into_iter();
        let headers: Vec<String> = records
            .next()
            .ok_or(SpecTableError::MissingHeader)?
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();

        if !headers.iter().any(|h| h == NAME_COLUMN) {
            return Err(SpecTableError::MissingNameColumn);
        }

        let rows = records
            .filter(|cells| !(cells.len() == 1 && cells[0].trim().is_empty()))
            .map(|cells| {
                headers
                    .iter()
                    .enumerate()
                    .map(|(i, header)| {
                        let raw = cells.get(i).map(String::as_str).unwrap_or("");
                        let value = if header == NAME_COLUMN {
                            Value::String(raw.to_string())
                        } else {
                            typed_cell(raw)
                        };
                        (header.clone(), value)
                    })
                    .collect::<SpecRow>()
            })
            .collect();

        Ok(Self { headers, rows })
    }

    /// First row whose `Name` equals `label` exactly.
    pub fn lookup(&self, label: &str) -> Option<&SpecRow> {
        self.rows
            .iter()
            .find(|row| matches!(row.get(NAME_COLUMN), Some(Value::String(name)) if name == label))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Type a raw cell: empty becomes `null`, integers and floats become numbers,
/// anything else stays a string. The `Name` column is never typed.
fn typed_cell(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = raw.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(raw.to_string())
}

/// Split CSV text into records of cells.
///
/// Handles double-quoted fields, `""` escapes, and line breaks inside quotes.
/// Accepts both `\n` and `\r\n` record terminators.
fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
            continue;
        }

        match ch {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut current)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut current));
                records.push(std::mem::take(&mut record));
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() || !record.is_empty() {
        record.push(current);
        records.push(record);
    }
    records
}
