//! Load Pipelines
//!
//! Both loaders run the same two phases on one session:
//! read -> vertices -> batches -> write vertices -> edges -> batches -> write
//! edges. Every node batch is written before the first edge batch is sent.

use crate::batch::{create_batches, BatchConfig};
use crate::cypher::{NodeUpsert, RelationshipMerge, SchemaName};
use crate::error::{LoadError, LoadResult};
use crate::neo4j_storage::{clear_graph, merge_relationship_batches, upsert_node_batches, GraphSession};
use crate::records::{EdgeRecord, InstrumentVertex};
use crate::source::{RowSource, Table};
use crate::transform::{asset, instrument};
use serde::Serialize;
use tracing::{error, info};

pub const ASSET_LABEL: &str = "Asset";
pub const ASSET_KEY: &str = "ID";
pub const ASSET_RELATIONSHIP: &str = "HAS";
pub const INSTRUMENT_KEY: &str = "id";

/// Counts reported at the end of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub rows: usize,
    pub vertices: usize,
    pub vertex_batches: usize,
    pub edges: usize,
    pub edge_batches: usize,
}

/// Log a stage failure with its cause and hand it back for propagation.
fn stage_failed(err: LoadError) -> LoadError {
    error!(stage = err.stage(), "{}", err);
    err
}

fn read_source(source: &mut dyn RowSource) -> LoadResult<Table> {
    info!("Reading the {}...", source.describe());
    let table = source.read().map_err(LoadError::Source).map_err(stage_failed)?;
    info!("Read {} rows", table.len());
    Ok(table)
}

fn schema_name(name: &str) -> LoadResult<SchemaName> {
    SchemaName::new(name).map_err(LoadError::Transform).map_err(stage_failed)
}

// ============================================================================
// Physical Asset Hierarchy
// ============================================================================

/// Load the asset hierarchy: one `Asset` node per id, one `HAS` edge per
/// (parent, child) pair.
pub async fn run_asset_load<S: GraphSession>(
    session: &S,
    source: &mut dyn RowSource,
    config: &BatchConfig,
) -> LoadResult<LoadSummary> {
    let table = read_source(source)?;
    let mut summary = LoadSummary {
        rows: table.len(),
        ..Default::default()
    };

    let upsert = NodeUpsert {
        label: schema_name(ASSET_LABEL)?,
        key: schema_name(ASSET_KEY)?,
    };
    let merge = RelationshipMerge {
        label: Some(upsert.label.clone()),
        key: upsert.key.clone(),
        rel_type: schema_name(ASSET_RELATIONSHIP)?,
        keyed: false,
    };

    info!("Creating vertices...");
    let vertices = asset::extract_vertices(&table)
        .map_err(LoadError::Transform)
        .map_err(stage_failed)?;

    info!("Creating batches of vertices...");
    let vertex_batches = create_batches(&vertices, config.batch_size)
        .map_err(LoadError::Batch)
        .map_err(stage_failed)?;

    info!("Creating Nodes in Neo4j...");
    summary.vertices = upsert_node_batches(session, &upsert, &vertex_batches)
        .await
        .map_err(LoadError::Write)
        .map_err(stage_failed)?;
    summary.vertex_batches = vertex_batches.len();

    info!("Creating edges...");
    let edges = asset::extract_edges(&table)
        .map_err(LoadError::Transform)
        .map_err(stage_failed)?;

    info!("Creating batches of edges...");
    let edge_batches = create_batches(&edges, config.batch_size)
        .map_err(LoadError::Batch)
        .map_err(stage_failed)?;

    info!("Creating Relationships in Neo4j...");
    summary.edges = merge_relationship_batches(session, &merge, &edge_batches)
        .await
        .map_err(LoadError::Write)
        .map_err(stage_failed)?;
    summary.edge_batches = edge_batches.len();

    info!("✅ Physical asset graph created in Neo4j");
    Ok(summary)
}

// ============================================================================
// P&ID Instruments
// ============================================================================

pub struct InstrumentOptions {
    pub clear_graph: bool,
}

/// Load instruments: nodes grouped by their category label, relationships
/// grouped by type. The whole table is transformed and every label and type
/// validated before the first statement (including the optional clear) is sent.
pub async fn run_instrument_load<S: GraphSession>(
    session: &S,
    source: &mut dyn RowSource,
    config: &BatchConfig,
    options: &InstrumentOptions,
) -> LoadResult<LoadSummary> {
    let table = read_source(source)?;
    let mut summary = LoadSummary {
        rows: table.len(),
        ..Default::default()
    };
    let key = schema_name(INSTRUMENT_KEY)?;

    info!("Creating vertices...");
    let vertices = instrument::extract_vertices(&table)
        .map_err(LoadError::Transform)
        .map_err(stage_failed)?;

    info!("Creating edges...");
    let edges = instrument::extract_edges(&table)
        .map_err(LoadError::Transform)
        .map_err(stage_failed)?;

    let mut node_groups = Vec::new();
    for label in instrument::labels(&vertices) {
        let group: Vec<&InstrumentVertex> = vertices.iter().filter(|v| v.label == label).collect();
        let upsert = NodeUpsert {
            label: schema_name(&label)?,
            key: key.clone(),
        };
        node_groups.push((upsert, group));
    }

    let mut edge_groups = Vec::new();
    for rel_type in instrument::relationship_types(&edges) {
        let group: Vec<&EdgeRecord> = edges
            .iter()
            .filter(|e| e.relationship_type.as_deref() == Some(rel_type.as_str()))
            .collect();
        let merge = RelationshipMerge {
            label: None,
            key: key.clone(),
            rel_type: schema_name(&rel_type)?,
            keyed: true,
        };
        edge_groups.push((merge, group));
    }

    if options.clear_graph {
        clear_graph(session)
            .await
            .map_err(LoadError::Write)
            .map_err(stage_failed)?;
    }

    info!("Creating Nodes in Neo4j...");
    for (upsert, group) in &node_groups {
        let batches = create_batches(group, config.batch_size)
            .map_err(LoadError::Batch)
            .map_err(stage_failed)?;
        summary.vertices += upsert_node_batches(session, upsert, &batches)
            .await
            .map_err(LoadError::Write)
            .map_err(stage_failed)?;
        summary.vertex_batches += batches.len();
    }

    info!("Creating Relationships in Neo4j...");
    for (merge, group) in &edge_groups {
        let batches = create_batches(group, config.batch_size)
            .map_err(LoadError::Batch)
            .map_err(stage_failed)?;
        summary.edges += merge_relationship_batches(session, merge, &batches)
            .await
            .map_err(LoadError::Write)
            .map_err(stage_failed)?;
        summary.edge_batches += batches.len();
    }

    info!("✅ Instrument graph created in Neo4j");
    Ok(summary)
}
