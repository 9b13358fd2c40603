//! P&ID instruments
//!
//! Columns are positional: 0 id, 1 category, 2 prediction confidence,
//! 5 relationship id, 6 relationship type, 7..=9 destination ids. Header names
//! are ignored.
//!
//! Categories become node labels (`valve-ball` -> `ValveBall`). Rows whose
//! category starts with `link-` describe connectors and are skipped. Link
//! relationship types lose their `link-` prefix and are upper-cased
//! (`link-signal` -> `SIGNAL`).

use super::cell_text;
use crate::cypher::SchemaName;
use crate::records::{EdgeRecord, InstrumentVertex, Value};
use crate::source::Table;
use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use tracing::{debug, warn};

pub const ID_COL: usize = 0;
pub const CATEGORY_COL: usize = 1;
pub const CONFIDENCE_COL: usize = 2;
pub const REL_ID_COL: usize = 5;
pub const REL_TYPE_COL: usize = 6;
pub const DESTINATION_COLS: [usize; 3] = [7, 8, 9];

const LINK_PREFIX: &str = "link-";

static NULL: Value = Value::Null;

fn cell(row: &[Value], index: usize) -> &Value {
    row.get(index).unwrap_or(&NULL)
}

fn is_link_category(category: &str) -> bool {
    category
        .get(..LINK_PREFIX.len())
        .map(|p| p.eq_ignore_ascii_case(LINK_PREFIX))
        .unwrap_or(false)
}

/// `valve-ball` -> `ValveBall`, `process` -> `Process`.
pub fn normalize_label(category: &str) -> Result<SchemaName> {
    let label: String = category
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect();
    SchemaName::new(&label).with_context(|| format!("Invalid instrument category '{}'", category))
}

/// `link-signal` -> `SIGNAL`, `process-flow` -> `PROCESS_FLOW`.
pub fn normalize_relationship_type(raw: &str) -> Result<SchemaName> {
    let trimmed = raw.trim();
    let without_prefix = if is_link_category(trimmed) {
        &trimmed[LINK_PREFIX.len()..]
    } else {
        trimmed
    };
    let rel_type: String = without_prefix
        .chars()
        .map(|c| if c == '-' || c.is_whitespace() { '_' } else { c.to_ascii_uppercase() })
        .collect();
    SchemaName::new(&rel_type).with_context(|| format!("Invalid relationship type '{}'", raw))
}

fn confidence(value: &Value) -> Option<f64> {
    match value {
        Value::Float(f) => Some(*f),
        Value::Int(i) => Some(*i as f64),
        Value::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn require_min_columns(table: &Table) -> Result<()> {
    if table.columns.len() <= CONFIDENCE_COL {
        return Err(anyhow!(
            "Instrument table needs at least {} columns (id, category, confidence), found {}",
            CONFIDENCE_COL + 1,
            table.columns.len()
        ));
    }
    Ok(())
}

/// Category of a row that should be loaded, or `None` for connector rows and
/// rows without a category.
fn instrument_category(row: &[Value]) -> Option<String> {
    cell_text(cell(row, CATEGORY_COL))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty() && !is_link_category(c))
}

/// One vertex per distinct instrument id. The first row for an id wins.
pub fn extract_vertices(table: &Table) -> Result<Vec<InstrumentVertex>> {
    require_min_columns(table)?;

    let mut seen = HashSet::new();
    let mut vertices = Vec::new();
    let mut skipped = 0usize;

    for (index, row) in table.rows.iter().enumerate() {
        let Some(category) = instrument_category(row) else {
            continue;
        };
        let Some(id) = cell(row, ID_COL).to_identifier() else {
            skipped += 1;
            continue;
        };
        if !seen.insert(id.clone()) {
            continue;
        }
        let label = normalize_label(&category).with_context(|| format!("Row {}", index + 1))?;
        vertices.push(InstrumentVertex {
            name: label.as_str().to_string(),
            label: label.as_str().to_string(),
            id,
            confidence: confidence(cell(row, CONFIDENCE_COL)),
        });
    }

    if skipped > 0 {
        warn!("⚠️  Skipped {} instrument rows without an id", skipped);
    }
    debug!("Extracted {} instrument vertices from {} rows", vertices.len(), table.len());
    Ok(vertices)
}

/// One edge per non-empty destination of every row that carries a
/// relationship id. Identical edges are emitted once.
pub fn extract_edges(table: &Table) -> Result<Vec<EdgeRecord>> {
    require_min_columns(table)?;

    let mut seen = HashSet::new();
    let mut edges = Vec::new();

    for (index, row) in table.rows.iter().enumerate() {
        if instrument_category(row).is_none() {
            continue;
        }
        let (Some(from), Some(rel_id)) = (cell(row, ID_COL).to_identifier(), cell(row, REL_ID_COL).to_identifier())
        else {
            continue;
        };
        let raw_type = cell_text(cell(row, REL_TYPE_COL))
            .ok_or_else(|| anyhow!("Row {} has relationship id {} but no relationship type", index + 1, rel_id))?;
        let rel_type = normalize_relationship_type(&raw_type).with_context(|| format!("Row {}", index + 1))?;

        for col in DESTINATION_COLS {
            let Some(to) = cell(row, col).to_identifier() else {
                continue;
            };
            let edge = EdgeRecord {
                from: from.clone(),
                to,
                relationship_type: Some(rel_type.as_str().to_string()),
                relationship_id: Some(rel_id.clone()),
            };
            if seen.insert(edge.clone()) {
                edges.push(edge);
            }
        }
    }

    debug!("Extracted {} instrument edges from {} rows", edges.len(), table.len());
    Ok(edges)
}

/// Distinct labels in first-seen order.
pub fn labels(vertices: &[InstrumentVertex]) -> Vec<String> {
    let mut seen = HashSet::new();
    vertices
        .iter()
        .filter(|v| seen.insert(v.label.as_str()))
        .map(|v| v.label.clone())
        .collect()
}

/// Distinct relationship types in first-seen order.
pub fn relationship_types(edges: &[EdgeRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    edges
        .iter()
        .filter_map(|e| e.relationship_type.as_deref())
        .filter(|t| seen.insert(*t))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Identifier;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn instrument_table(rows: Vec<Vec<Value>>) -> Table {
        let columns = [
            "id", "category", "confidence", "x", "y", "link_id", "link_category", "dest1", "dest2", "dest3",
        ];
        let mut t = Table::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            t.push_row(row).unwrap();
        }
        t
    }

    #[test]
    fn test_label_normalization() {
        assert_eq!(normalize_label("valve-ball").unwrap().as_str(), "ValveBall");
        assert_eq!(normalize_label("PROCESS").unwrap().as_str(), "Process");
        assert_eq!(normalize_label("flow meter").unwrap().as_str(), "FlowMeter");
        assert!(normalize_label("9-way").is_err());
        assert!(normalize_label("valve`) DETACH DELETE (n").is_err());
    }

    #[test]
    fn test_relationship_type_normalization() {
        assert_eq!(normalize_relationship_type("link-signal").unwrap().as_str(), "SIGNAL");
        assert_eq!(normalize_relationship_type("LINK-process-flow").unwrap().as_str(), "PROCESS_FLOW");
        assert_eq!(normalize_relationship_type("piping").unwrap().as_str(), "PIPING");
        assert!(normalize_relationship_type("a]->(b) DELETE b //").is_err());
    }

    #[test]
    fn test_vertices_skip_link_rows_and_dedupe() {
        let t = instrument_table(vec![
            vec![text("V-1"), text("valve-ball"), Value::Float(0.9)],
            vec![text("L-1"), text("link-signal"), Value::Float(0.5)],
            vec![text("V-1"), text("valve-ball"), Value::Float(0.1)],
            vec![text("P-1"), text("pump"), Value::Null],
        ]);

        let vertices = extract_vertices(&t).unwrap();
        assert_eq!(
            vertices,
            vec![
                InstrumentVertex {
                    label: "ValveBall".into(),
                    id: "V-1".into(),
                    name: "ValveBall".into(),
                    confidence: Some(0.9),
                },
                InstrumentVertex {
                    label: "Pump".into(),
                    id: "P-1".into(),
                    name: "Pump".into(),
                    confidence: None,
                },
            ]
        );
        assert_eq!(labels(&vertices), vec!["ValveBall", "Pump"]);
    }

    #[test]
    fn test_edges_fan_out_to_each_destination() {
        let t = instrument_table(vec![vec![
            text("V-1"),
            text("valve"),
            Value::Float(0.9),
            Value::Null,
            Value::Null,
            text("R-7"),
            text("link-signal"),
            text("P-1"),
            Value::Null,
            text("P-3"),
        ]]);

        let edges = extract_edges(&t).unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].from, Identifier::from("V-1"));
        assert_eq!(edges[0].to, Identifier::from("P-1"));
        assert_eq!(edges[1].to, Identifier::from("P-3"));
        assert!(edges.iter().all(|e| e.relationship_type.as_deref() == Some("SIGNAL")));
        assert!(edges.iter().all(|e| e.relationship_id == Some("R-7".into())));
        assert_eq!(relationship_types(&edges), vec!["SIGNAL"]);
    }

    #[test]
    fn test_same_pair_keeps_each_relationship_type() {
        let row = |rel_id: &str, rel_type: &str| {
            vec![
                text("V-1"),
                text("valve"),
                Value::Null,
                Value::Null,
                Value::Null,
                text(rel_id),
                text(rel_type),
                text("P-1"),
            ]
        };
        let t = instrument_table(vec![
            row("R-1", "link-signal"),
            row("R-1", "link-signal"),
            row("R-2", "link-process-flow"),
        ]);

        let edges = extract_edges(&t).unwrap();
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e.from == Identifier::from("V-1") && e.to == Identifier::from("P-1")));
        assert_eq!(relationship_types(&edges), vec!["SIGNAL", "PROCESS_FLOW"]);
    }

    #[test]
    fn test_rows_without_relationship_id_have_no_edges() {
        let t = instrument_table(vec![vec![
            text("V-1"),
            text("valve"),
            Value::Float(0.9),
            Value::Null,
            Value::Null,
            Value::Null,
            text("link-signal"),
            text("P-1"),
        ]]);

        assert!(extract_edges(&t).unwrap().is_empty());
    }

    #[test]
    fn test_relationship_id_without_type_is_an_error() {
        let t = instrument_table(vec![vec![
            text("V-1"),
            text("valve"),
            Value::Null,
            Value::Null,
            Value::Null,
            text("R-1"),
            Value::Null,
            text("P-1"),
        ]]);

        let err = extract_edges(&t).unwrap_err();
        assert!(err.to_string().contains("no relationship type"));
    }

    #[test]
    fn test_too_few_columns() {
        let t = Table::new(vec!["id".into(), "category".into()]);
        assert!(extract_vertices(&t).is_err());
    }
}
