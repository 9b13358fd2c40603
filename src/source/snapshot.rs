//! Table snapshots exported as newline-delimited JSON, one object per row.
//! A snapshot is addressed either by path or by `catalog.schema.table`
//! relative to a snapshot root (`<root>/<catalog>/<schema>/<table>.jsonl`).

use super::{RowSource, Table};
use crate::records::Value;
use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub catalog: String,
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn snapshot_path(&self, root: &Path) -> PathBuf {
        root.join(&self.catalog)
            .join(&self.schema)
            .join(format!("{}.jsonl", self.table))
    }
}

impl FromStr for TableRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').map(str::trim).collect();
        match parts.as_slice() {
            [catalog, schema, table] if !catalog.is_empty() && !schema.is_empty() && !table.is_empty() => {
                Ok(TableRef {
                    catalog: catalog.to_string(),
                    schema: schema.to_string(),
                    table: table.to_string(),
                })
            }
            _ => Err(anyhow!("Table name '{}' is not of the form catalog.schema.table", s)),
        }
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.catalog, self.schema, self.table)
    }
}

pub struct SnapshotSource {
    path: PathBuf,
    name: String,
}

impl SnapshotSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }

    pub fn from_table(table: &TableRef, root: &Path) -> Self {
        Self {
            path: table.snapshot_path(root),
            name: table.to_string(),
        }
    }
}

fn json_to_value(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        serde_json::Value::String(s) => Value::Text(s),
        other => Value::Text(other.to_string()),
    }
}

impl RowSource for SnapshotSource {
    fn describe(&self) -> String {
        format!("table snapshot {}", self.name)
    }

    fn read(&mut self) -> Result<Table> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open snapshot {}", self.path.display()))?;

        // Columns are the union of keys in first-seen order.
        let mut columns: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut objects = Vec::new();

        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read snapshot line {}", index + 1))?;
            if line.trim().is_empty() {
                continue;
            }
            let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&line)
                .with_context(|| format!("Snapshot line {} is not a JSON object", index + 1))?;
            for key in object.keys() {
                if !positions.contains_key(key) {
                    positions.insert(key.clone(), columns.len());
                    columns.push(key.clone());
                }
            }
            objects.push(object);
        }

        let mut table = Table::new(columns);
        for object in objects {
            let mut row = vec![Value::Null; table.columns.len()];
            for (key, value) in object {
                row[positions[&key]] = json_to_value(value);
            }
            table.push_row(row)?;
        }

        debug!("Read {} rows from {}", table.len(), self.name);
        Ok(table)
    }
}
