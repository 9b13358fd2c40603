//! Tabular Sources
//!
//! The loader only needs "a finite sequence of rows with named columns".
//! Flat CSV files and newline-delimited JSON table snapshots both satisfy it.

pub mod csv_source;
pub mod snapshot;

use crate::records::Value;
use anyhow::{anyhow, Result};

pub use csv_source::CsvSource;
pub use snapshot::{SnapshotSource, TableRef};

/// Anything that can produce a table of rows.
pub trait RowSource {
    /// Human readable description used in log lines.
    fn describe(&self) -> String;

    fn read(&mut self) -> Result<Table>;
}

/// Rows with named columns. Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding short rows with nulls and rejecting long ones.
    pub fn push_row(&mut self, mut row: Vec<Value>) -> Result<()> {
        if row.len() > self.columns.len() {
            return Err(anyhow!(
                "Row {} has {} cells but the table has {} columns",
                self.rows.len() + 1,
                row.len(),
                self.columns.len()
            ));
        }
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| anyhow!("Missing required column '{}' (found: {})", name, self.columns.join(", ")))
    }
}

fn is_null_cell(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan")
}

/// An integer whose text survives a round trip, so `007` and `+7` do not
/// qualify.
fn canonical_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    trimmed.parse::<i64>().ok().filter(|i| i.to_string() == trimmed)
}

/// Parse one textual cell with its column's type: blanks and NaN are null,
/// integer columns yield `Int`, everything else keeps the raw text.
pub fn parse_cell(raw: &str, integer_column: bool) -> Value {
    if is_null_cell(raw) {
        return Value::Null;
    }
    match canonical_int(raw) {
        Some(i) if integer_column => Value::Int(i),
        _ => Value::Text(raw.to_string()),
    }
}

/// Build a table from textual records, choosing one type per column the way
/// a dataframe reader does. A column is integer only if every non-null cell
/// in it is a canonical integer.
pub fn infer_table(columns: Vec<String>, records: Vec<Vec<String>>) -> Result<Table> {
    let integer_columns: Vec<bool> = (0..columns.len())
        .map(|col| {
            records
                .iter()
                .filter_map(|r| r.get(col))
                .filter(|raw| !is_null_cell(raw))
                .all(|raw| canonical_int(raw).is_some())
        })
        .collect();

    let mut table = Table::new(columns);
    for record in records {
        let row = record
            .iter()
            .enumerate()
            .map(|(col, raw)| parse_cell(raw, integer_columns.get(col).copied().unwrap_or(false)))
            .collect();
        table.push_row(row)?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell_inference() {
        assert_eq!(parse_cell("", true), Value::Null);
        assert_eq!(parse_cell("  ", false), Value::Null);
        assert_eq!(parse_cell("NaN", true), Value::Null);
        assert_eq!(parse_cell("42", true), Value::Int(42));
        assert_eq!(parse_cell("42", false), Value::Text("42".to_string()));
        assert_eq!(parse_cell("007", true), Value::Text("007".to_string()));
        assert_eq!(parse_cell("0.75", true), Value::Text("0.75".to_string()));
        assert_eq!(parse_cell("Pump A", false), Value::Text("Pump A".to_string()));
    }

    #[test]
    fn test_infer_table_types_whole_columns() {
        let records = vec![
            vec!["1".to_string(), "007".to_string(), "1.50".to_string()],
            vec!["".to_string(), "7".to_string(), "1e3".to_string()],
        ];
        let table = infer_table(vec!["a".into(), "b".into(), "c".into()], records).unwrap();

        assert_eq!(
            table.rows,
            vec![
                vec![Value::Int(1), Value::Text("007".into()), Value::Text("1.50".into())],
                vec![Value::Null, Value::Text("7".into()), Value::Text("1e3".into())],
            ]
        );
    }

    #[test]
    fn test_push_row_pads_short_rows() {
        let mut table = Table::new(vec!["a".into(), "b".into(), "c".into()]);
        table.push_row(vec![Value::Int(1)]).unwrap();

        assert_eq!(table.rows[0], vec![Value::Int(1), Value::Null, Value::Null]);
    }

    #[test]
    fn test_push_row_rejects_long_rows() {
        let mut table = Table::new(vec!["a".into()]);
        assert!(table.push_row(vec![Value::Int(1), Value::Int(2)]).is_err());
    }

    #[test]
    fn test_require_column_lists_available_columns() {
        let table = Table::new(vec!["ID".into(), "Name".into()]);
        let err = table.require_column("ParentID").unwrap_err();

        assert_eq!(
            err.to_string(),
            "Missing required column 'ParentID' (found: ID, Name)"
        );
    }
}
