use super::{infer_table, RowSource, Table};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads a headered CSV file into a [`Table`].
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RowSource for CsvSource {
    fn describe(&self) -> String {
        format!("CSV file {}", self.path.display())
    }

    fn read(&mut self) -> Result<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("Failed to open CSV file {}", self.path.display()))?;

        let columns: Vec<String> = reader
            .headers()
            .context("Failed to read CSV header")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut records = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("Failed to read CSV record {}", index + 1))?;
            records.push(record.iter().map(str::to_string).collect());
        }
        let table = infer_table(columns, records)?;

        debug!("Read {} rows from {}", table.len(), self.path.display());
        Ok(table)
    }
}
