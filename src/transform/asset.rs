//! Physical asset hierarchy
//!
//! Rows carry an `ID` and an optional `ParentID`. Every id seen in either
//! column becomes a vertex; every (parent, child) pair becomes a `HAS` edge.

use super::{cell_text, strip_double_quotes};
use crate::records::{AssetVertex, EdgeRecord, Identifier, Value};
use crate::source::Table;
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

pub const ID_COLUMN: &str = "ID";
pub const PARENT_COLUMN: &str = "ParentID";

/// Column positions resolved once per table. Attribute columns are optional
/// and read as null when absent.
struct AssetColumns {
    id: usize,
    parent_id: usize,
    name: Option<usize>,
    description: Option<usize>,
    group_type: Option<usize>,
    mode: Option<usize>,
    state: Option<usize>,
}

impl AssetColumns {
    fn resolve(table: &Table) -> Result<Self> {
        Ok(Self {
            id: table.require_column(ID_COLUMN)?,
            parent_id: table.require_column(PARENT_COLUMN)?,
            name: table.column_index("Name"),
            description: table.column_index("Description"),
            group_type: table.column_index("GroupType"),
            mode: table.column_index("Mode"),
            state: table.column_index("State"),
        })
    }
}

fn text_at(row: &[Value], index: Option<usize>) -> Option<String> {
    index.and_then(|i| cell_text(&row[i]))
}

fn row_to_vertex(id: Identifier, row: &[Value], cols: &AssetColumns) -> AssetVertex {
    AssetVertex {
        id,
        name: text_at(row, cols.name),
        description: strip_double_quotes(text_at(row, cols.description)),
        group_type: text_at(row, cols.group_type),
        parent_id: row[cols.parent_id].to_identifier(),
        mode: text_at(row, cols.mode),
        state: text_at(row, cols.state),
    }
}

/// Build one vertex per distinct id found in `ID` or `ParentID`.
///
/// Ids that only appear as a parent reference get a vertex with null
/// attributes. When an id has several source rows the first one wins.
pub fn extract_vertices(table: &Table) -> Result<Vec<AssetVertex>> {
    let cols = AssetColumns::resolve(table)?;

    let mut first_row: HashMap<Identifier, usize> = HashMap::new();
    let mut duplicates = 0usize;
    for (index, row) in table.rows.iter().enumerate() {
        if let Some(id) = row[cols.id].to_identifier() {
            if first_row.contains_key(&id) {
                duplicates += 1;
            } else {
                first_row.insert(id, index);
            }
        }
    }
    if duplicates > 0 {
        warn!("⚠️  {} rows repeat an existing {}; keeping the first occurrence", duplicates, ID_COLUMN);
    }

    let ids = table
        .rows
        .iter()
        .map(|row| &row[cols.id])
        .chain(table.rows.iter().map(|row| &row[cols.parent_id]))
        .filter_map(Value::to_identifier);

    let mut seen = HashSet::new();
    let mut vertices = Vec::new();
    for id in ids {
        if !seen.insert(id.clone()) {
            continue;
        }
        let vertex = match first_row.get(&id) {
            Some(&index) => row_to_vertex(id, &table.rows[index], &cols),
            None => AssetVertex::reference_only(id),
        };
        vertices.push(vertex);
    }

    debug!("Extracted {} asset vertices from {} rows", vertices.len(), table.len());
    Ok(vertices)
}

/// Project `(ParentID, ID)` pairs as `(from, to)` edges, dropping pairs with a
/// null endpoint and duplicate pairs.
pub fn extract_edges(table: &Table) -> Result<Vec<EdgeRecord>> {
    let id_col = table.require_column(ID_COLUMN)?;
    let parent_col = table.require_column(PARENT_COLUMN)?;

    let mut seen = HashSet::new();
    let mut edges = Vec::new();
    for row in &table.rows {
        let (Some(from), Some(to)) = (row[parent_col].to_identifier(), row[id_col].to_identifier()) else {
            continue;
        };
        if seen.insert((from.clone(), to.clone())) {
            edges.push(EdgeRecord::new(from, to));
        }
    }

    debug!("Extracted {} asset edges from {} rows", edges.len(), table.len());
    Ok(edges)
}
