//! Configuration
//!
//! Everything comes from the environment (optionally seeded from a `.env`
//! file). The resulting structs are passed explicitly to the pipeline.

use crate::batch::DEFAULT_BATCH_SIZE;
use crate::source::{CsvSource, RowSource, SnapshotSource, TableRef};
use anyhow::{anyhow, Context, Result};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

const DEFAULT_NEO4J_URI: &str = "bolt://localhost:7687";
const DEFAULT_NEO4J_USER: &str = "neo4j";
const DEFAULT_CONNECT_RETRIES: u32 = 4;

/// Connection, batching and logging settings shared by both loaders.
#[derive(Clone)]
pub struct LoaderConfig {
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
    pub batch_size: usize,
    pub log_dir: PathBuf,
    pub connect_retries: u32,
}

impl fmt::Debug for LoaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderConfig")
            .field("neo4j_uri", &self.neo4j_uri)
            .field("neo4j_user", &self.neo4j_user)
            .field("neo4j_password", &"<redacted>")
            .field("batch_size", &self.batch_size)
            .field("log_dir", &self.log_dir)
            .field("connect_retries", &self.connect_retries)
            .finish()
    }
}

impl LoaderConfig {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let neo4j_password = lookup("NEO4J_PASSWORD")
            .filter(|p| !p.is_empty())
            .ok_or_else(|| anyhow!("NEO4J_PASSWORD must be set"))?;

        let batch_size = parse_or("BATCH_SIZE", &lookup, DEFAULT_BATCH_SIZE)?;
        if batch_size == 0 {
            return Err(anyhow!("BATCH_SIZE must be greater than zero"));
        }

        Ok(LoaderConfig {
            neo4j_uri: lookup("NEO4J_URI").unwrap_or_else(|| DEFAULT_NEO4J_URI.to_string()),
            neo4j_user: lookup("NEO4J_USER").unwrap_or_else(|| DEFAULT_NEO4J_USER.to_string()),
            neo4j_password,
            batch_size,
            log_dir: lookup("LOG_DIR").map(PathBuf::from).unwrap_or_else(env::temp_dir),
            connect_retries: parse_or("CONNECT_RETRIES", &lookup, DEFAULT_CONNECT_RETRIES)?,
        })
    }
}

fn parse_or<T>(key: &str, lookup: &impl Fn(&str) -> Option<String>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {} '{}'", key, raw)),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, lookup: &impl Fn(&str) -> Option<String>) -> Result<bool> {
    match lookup(key).as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => Ok(false),
        Some(v) => Err(anyhow!("Invalid {} '{}': expected true or false", key, v)),
    }
}

// ============================================================================
// Sources
// ============================================================================

/// Where a pipeline reads its rows from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Csv(PathBuf),
    Snapshot(PathBuf),
    Table { table: TableRef, root: PathBuf },
}

impl SourceSpec {
    /// Pick the reader from the file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(SourceSpec::Csv(path.to_path_buf())),
            "jsonl" | "ndjson" | "json" => Ok(SourceSpec::Snapshot(path.to_path_buf())),
            _ => Err(anyhow!(
                "Cannot tell the format of {}: expected a .csv or .jsonl file",
                path.display()
            )),
        }
    }

    /// Resolve `<prefix>_SOURCE` (a file) or `<prefix>_TABLE` (a
    /// `catalog.schema.table` under `SNAPSHOT_ROOT`).
    pub fn from_lookup(prefix: &str, lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let source_key = format!("{}_SOURCE", prefix);
        let table_key = format!("{}_TABLE", prefix);

        match (lookup(&source_key), lookup(&table_key)) {
            (Some(_), Some(_)) => Err(anyhow!("Set only one of {} and {}", source_key, table_key)),
            (Some(path), None) => Self::from_path(Path::new(&path)),
            (None, Some(name)) => Ok(SourceSpec::Table {
                table: name.parse()?,
                root: lookup("SNAPSHOT_ROOT").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
            }),
            (None, None) => Err(anyhow!("One of {} or {} must be set", source_key, table_key)),
        }
    }

    pub fn open(&self) -> Box<dyn RowSource> {
        match self {
            SourceSpec::Csv(path) => Box::new(CsvSource::new(path)),
            SourceSpec::Snapshot(path) => Box::new(SnapshotSource::from_path(path)),
            SourceSpec::Table { table, root } => Box::new(SnapshotSource::from_table(table, root)),
        }
    }
}

/// Settings for the physical asset hierarchy loader.
#[derive(Debug, Clone)]
pub struct AssetLoadConfig {
    pub source: SourceSpec,
}

impl AssetLoadConfig {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            source: SourceSpec::from_lookup("ASSET", &lookup)?,
        })
    }
}

/// Settings for the P&ID instrument loader.
#[derive(Debug, Clone)]
pub struct InstrumentLoadConfig {
    pub source: SourceSpec,
    /// Wipe the whole database before loading.
    pub clear_graph: bool,
}

impl InstrumentLoadConfig {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            source: SourceSpec::from_lookup("INSTRUMENT", &lookup)?,
            clear_graph: parse_bool("CLEAR_GRAPH", &lookup)?,
        })
    }
}
