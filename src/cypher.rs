//! Cypher Statements
//!
//! Bulk statements are always `UNWIND $rows AS row ...` with every value
//! passed as a parameter. Labels, relationship types and property keys cannot
//! be parameters in Cypher, so they go through [`SchemaName`] which only
//! admits plain identifiers and renders them backtick-quoted.

use crate::records::PropertyMap;
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Name of the list parameter every bulk statement unwinds.
pub const ROWS_PARAM: &str = "rows";

// ============================================================================
// Schema Names
// ============================================================================

/// A validated label, relationship type or property key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaName(String);

fn schema_name_pattern() -> Result<&'static Regex> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    if let Some(re) = PATTERN.get() {
        return Ok(re);
    }
    let re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").context("Failed to build schema name regex")?;
    Ok(PATTERN.get_or_init(|| re))
}

impl SchemaName {
    pub fn new(name: &str) -> Result<Self> {
        if schema_name_pattern()?.is_match(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(anyhow!("'{}' is not a valid label, relationship type or property key", name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`", self.0)
    }
}

// ============================================================================
// Statements
// ============================================================================

/// A parameterized statement ready to submit: Cypher text plus the batch it
/// unwinds. Empty `rows` means the statement takes no parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub cypher: String,
    pub rows: Vec<PropertyMap>,
}

impl Statement {
    pub fn bare(cypher: impl Into<String>) -> Self {
        Self {
            cypher: cypher.into(),
            rows: Vec::new(),
        }
    }
}

/// Upsert one node per row, keyed on `key`. Existing properties are replaced
/// by the row so repeated loads converge to the last write.
#[derive(Debug, Clone)]
pub struct NodeUpsert {
    pub label: SchemaName,
    pub key: SchemaName,
}

impl NodeUpsert {
    pub fn cypher(&self) -> String {
        format!(
            "UNWIND ${rows} AS row
             MERGE (n:{label} {{{key}: row.{key}}})
             SET n = row",
            rows = ROWS_PARAM,
            label = self.label,
            key = self.key,
        )
    }

    pub fn statement(&self, rows: Vec<PropertyMap>) -> Statement {
        Statement {
            cypher: self.cypher(),
            rows,
        }
    }
}

/// Merge one typed relationship per row between two existing nodes matched on
/// `key`. Rows whose endpoints do not exist produce nothing.
#[derive(Debug, Clone)]
pub struct RelationshipMerge {
    /// Endpoint label; `None` matches nodes of any label.
    pub label: Option<SchemaName>,
    pub key: SchemaName,
    pub rel_type: SchemaName,
    /// Merge on the row's `rel_id` as the relationship's `id` property.
    pub keyed: bool,
}

impl RelationshipMerge {
    pub fn cypher(&self) -> String {
        let label = self
            .label
            .as_ref()
            .map(|l| format!(":{}", l))
            .unwrap_or_default();
        let identity = if self.keyed { " {id: row.rel_id}" } else { "" };
        format!(
            "UNWIND ${rows} AS row
             MATCH (a{label} {{{key}: row.from}})
             MATCH (b{label} {{{key}: row.to}})
             MERGE (a)-[r:{rel}{identity}]->(b)",
            rows = ROWS_PARAM,
            label = label,
            key = self.key,
            rel = self.rel_type,
            identity = identity,
        )
    }

    pub fn statement(&self, rows: Vec<PropertyMap>) -> Statement {
        Statement {
            cypher: self.cypher(),
            rows,
        }
    }
}

/// Remove every node and relationship in the database.
pub fn clear_graph_statement() -> Statement {
    Statement::bare("MATCH (n) DETACH DELETE n")
}
