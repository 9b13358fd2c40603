//! Bulk loading of tabular records into a Neo4j graph.
//!
//! Rows are read from a [`source::RowSource`], reshaped into vertex and edge
//! records, split into batches and written with one parameterized `UNWIND`
//! statement per batch. Vertices are always written before edges.

pub mod batch;
pub mod config;
pub mod cypher;
pub mod error;
pub mod logging;
pub mod neo4j_storage;
pub mod pipeline;
pub mod records;
pub mod source;
pub mod transform;


pub use error::{LoadError, LoadResult};
pub use pipeline::{run_asset_load, run_instrument_load, InstrumentOptions, LoadSummary};
