//! Neo4j Batch Storage
//!
//! Submits bulk `UNWIND` statements, one per batch. Each statement runs as its
//! own auto-commit transaction on the shared session, so a failure part way
//! through leaves the earlier batches in place.

use crate::cypher::{clear_graph_statement, NodeUpsert, RelationshipMerge, Statement, ROWS_PARAM};
use crate::records::{PropertyMap, ToProperties, Value};
use anyhow::{anyhow, Context, Result};
use neo4rs::{query, BoltType};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info, warn};

// ============================================================================
// Session Abstraction
// ============================================================================

/// The one operation the loaders need from the graph store.
#[allow(async_fn_in_trait)]
pub trait GraphSession {
    async fn run(&self, statement: Statement) -> Result<()>;
}

fn to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(neo4rs::BoltNull),
        Value::Bool(b) => (*b).into(),
        Value::Int(i) => (*i).into(),
        Value::Float(f) => (*f).into(),
        Value::Text(s) => s.clone().into(),
    }
}

fn row_to_bolt(row: &PropertyMap) -> HashMap<String, BoltType> {
    row.iter().map(|(k, v)| (k.clone(), to_bolt(v))).collect()
}

impl GraphSession for neo4rs::Graph {
    async fn run(&self, statement: Statement) -> Result<()> {
        let mut q = query(&statement.cypher);
        if !statement.rows.is_empty() {
            let rows: Vec<HashMap<String, BoltType>> = statement.rows.iter().map(row_to_bolt).collect();
            q = q.param(ROWS_PARAM, rows);
        }
        neo4rs::Graph::run(self, q).await.context("Neo4j rejected statement")?;
        Ok(())
    }
}

// ============================================================================
// Batch Writes
// ============================================================================

/// Upsert every batch of vertices. Returns the number of nodes submitted.
pub async fn upsert_node_batches<S, T>(session: &S, upsert: &NodeUpsert, batches: &[&[T]]) -> Result<usize>
where
    S: GraphSession,
    T: ToProperties,
{
    let mut submitted = 0;
    for (index, batch) in batches.iter().enumerate() {
        let rows: Vec<PropertyMap> = batch.iter().map(ToProperties::to_properties).collect();
        session.run(upsert.statement(rows)).await.with_context(|| {
            format!(
                "Failed to batch insert {} nodes (batch {}/{})",
                upsert.label.as_str(),
                index + 1,
                batches.len()
            )
        })?;
        submitted += batch.len();
        debug!("   {} batch {}/{}: {} nodes", upsert.label.as_str(), index + 1, batches.len(), batch.len());
    }

    info!("   Inserted {} {} nodes in {} batches", submitted, upsert.label.as_str(), batches.len());
    Ok(submitted)
}

/// Merge every batch of edges. Edges whose endpoints are missing are
/// silently unmatched by the store, so the count is of submitted edges.
pub async fn merge_relationship_batches<S, T>(session: &S, merge: &RelationshipMerge, batches: &[&[T]]) -> Result<usize>
where
    S: GraphSession,
    T: ToProperties,
{
    let mut submitted = 0;
    for (index, batch) in batches.iter().enumerate() {
        let rows: Vec<PropertyMap> = batch.iter().map(ToProperties::to_properties).collect();
        session.run(merge.statement(rows)).await.with_context(|| {
            format!(
                "Failed to batch insert {} edges (batch {}/{})",
                merge.rel_type.as_str(),
                index + 1,
                batches.len()
            )
        })?;
        submitted += batch.len();
        debug!("   {} batch {}/{}: {} edges", merge.rel_type.as_str(), index + 1, batches.len(), batch.len());
    }

    info!("   Created {} {} edges in {} batches", submitted, merge.rel_type.as_str(), batches.len());
    Ok(submitted)
}

/// Delete every node and relationship.
pub async fn clear_graph<S: GraphSession>(session: &S) -> Result<()> {
    warn!("🧹 Clearing the entire graph database");
    session.run(clear_graph_statement()).await.context("Failed to clear graph")
}

// ============================================================================
// Connection
// ============================================================================

/// 1s, 2s, 4s, 8s, ...
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Connect to Neo4j with exponential backoff retry logic
pub async fn connect_neo4j_with_retry(uri: &str, user: &str, password: &str, max_retries: u32) -> Result<neo4rs::Graph> {
    let max_retries = max_retries.max(1);

    for attempt in 1..=max_retries {
        info!("🔄 Attempting to connect to Neo4j at {}... (attempt {}/{})", uri, attempt, max_retries);

        match neo4rs::Graph::new(uri, user, password).await {
            Ok(graph) => {
                info!("✅ Successfully connected to Neo4j");
                return Ok(graph);
            }
            Err(e) => {
                if attempt < max_retries {
                    let wait_time = backoff_delay(attempt);
                    warn!(
                        "⚠️  Failed to connect to Neo4j: {}. Retrying in {}s (attempt {}/{})...",
                        e,
                        wait_time.as_secs(),
                        attempt,
                        max_retries
                    );
                    tokio::time::sleep(wait_time).await;
                } else {
                    error!("❌ Failed to connect to Neo4j after {} attempts: {}", max_retries, e);
                    return Err(anyhow!("Neo4j connection failed after {} retries: {}", max_retries, e));
                }
            }
        }
    }

    Err(anyhow!("Failed to connect to Neo4j"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::create_batches;
    use crate::cypher::SchemaName;
    use crate::records::{AssetVertex, EdgeRecord, Identifier};
    use std::cell::RefCell;

    /// Records statements instead of sending them; optionally fails the Nth.
    #[derive(Default)]
    struct RecordingSession {
        statements: RefCell<Vec<Statement>>,
        fail_on: Option<usize>,
    }

    impl GraphSession for RecordingSession {
        async fn run(&self, statement: Statement) -> Result<()> {
            let index = self.statements.borrow().len();
            if self.fail_on == Some(index) {
                return Err(anyhow!("connection reset"));
            }
            self.statements.borrow_mut().push(statement);
            Ok(())
        }
    }

    fn asset_upsert() -> NodeUpsert {
        NodeUpsert {
            label: SchemaName::new("Asset").unwrap(),
            key: SchemaName::new("ID").unwrap(),
        }
    }

    fn vertices(n: i64) -> Vec<AssetVertex> {
        (0..n).map(|i| AssetVertex::reference_only(Identifier::Int(i))).collect()
    }

    #[tokio::test]
    async fn test_one_statement_per_batch() {
        let session = RecordingSession::default();
        let records = vertices(5);
        let batches = create_batches(&records, 2).unwrap();

        let submitted = upsert_node_batches(&session, &asset_upsert(), &batches).await.unwrap();

        assert_eq!(submitted, 5);
        let statements = session.statements.borrow();
        let sizes: Vec<usize> = statements.iter().map(|s| s.rows.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert!(statements.iter().all(|s| s.cypher == asset_upsert().cypher()));
        assert_eq!(statements[2].rows[0].get("ID"), Some(&Value::Int(4)));
    }

    #[tokio::test]
    async fn test_failure_names_the_batch_and_stops() {
        let session = RecordingSession {
            fail_on: Some(1),
            ..Default::default()
        };
        let records = vertices(6);
        let batches = create_batches(&records, 2).unwrap();

        let err = upsert_node_batches(&session, &asset_upsert(), &batches).await.unwrap_err();

        assert_eq!(format!("{:#}", err), "Failed to batch insert Asset nodes (batch 2/3): connection reset");
        assert_eq!(session.statements.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_same_batch_twice_is_keyed_merge() {
        let session = RecordingSession::default();
        let records = vertices(3);
        let batches = create_batches(&records, 10).unwrap();

        upsert_node_batches(&session, &asset_upsert(), &batches).await.unwrap();
        upsert_node_batches(&session, &asset_upsert(), &batches).await.unwrap();

        let statements = session.statements.borrow();
        assert_eq!(statements[0], statements[1]);
        assert!(statements[0].cypher.contains("MERGE (n:`Asset` {`ID`: row.`ID`})"));
    }

    #[tokio::test]
    async fn test_relationship_batches() {
        let session = RecordingSession::default();
        let edges = vec![EdgeRecord::new(1.into(), 2.into()), EdgeRecord::new(1.into(), 3.into())];
        let batches = create_batches(&edges, 20_000).unwrap();
        let merge = RelationshipMerge {
            label: Some(SchemaName::new("Asset").unwrap()),
            key: SchemaName::new("ID").unwrap(),
            rel_type: SchemaName::new("HAS").unwrap(),
            keyed: false,
        };

        let submitted = merge_relationship_batches(&session, &merge, &batches).await.unwrap();

        assert_eq!(submitted, 2);
        let statements = session.statements.borrow();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].rows[1].get("to"), Some(&Value::Int(3)));
    }

    #[tokio::test]
    async fn test_no_batches_no_statements() {
        let session = RecordingSession::default();
        let records: Vec<AssetVertex> = Vec::new();
        let batches = create_batches(&records, 10).unwrap();

        let submitted = upsert_node_batches(&session, &asset_upsert(), &batches).await.unwrap();

        assert_eq!(submitted, 0);
        assert!(session.statements.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_clear_graph_has_no_parameters() {
        let session = RecordingSession::default();
        clear_graph(&session).await.unwrap();

        let statements = session.statements.borrow();
        assert_eq!(statements[0].cypher, "MATCH (n) DETACH DELETE n");
        assert!(statements[0].rows.is_empty());
    }

    #[test]
    fn test_exponential_backoff_calculation() {
        let expected = [(1, 1), (2, 2), (3, 4), (4, 8)];
        for (attempt, secs) in expected {
            assert_eq!(backoff_delay(attempt), Duration::from_secs(secs), "attempt {}", attempt);
        }
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
    }

    #[test]
    fn test_null_properties_become_bolt_null() {
        assert!(matches!(to_bolt(&Value::Null), BoltType::Null(_)));
        assert!(matches!(to_bolt(&Value::Int(1)), BoltType::Integer(_)));
        assert!(matches!(to_bolt(&Value::Text("a".into())), BoltType::String(_)));
    }
}
