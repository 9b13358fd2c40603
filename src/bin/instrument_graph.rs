use anyhow::Result;
use graph_loader::batch::BatchConfig;
use graph_loader::config::{InstrumentLoadConfig, LoaderConfig};
use graph_loader::logging;
use graph_loader::neo4j_storage::connect_neo4j_with_retry;
use graph_loader::{run_instrument_load, InstrumentOptions, LoadError};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

const APP_NAME: &str = "instrument-graph";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = LoaderConfig::from_env().map_err(LoadError::Config)?;
    let load_config = InstrumentLoadConfig::from_env().map_err(LoadError::Config)?;

    let (subscriber, log_path) = logging::build_subscriber(APP_NAME, &config.log_dir)?;
    let _guard = tracing::subscriber::set_default(subscriber);

    let run_id = Uuid::new_v4();
    info!("🚀 Instrument graph loader starting (log file: {})", log_path.display());

    let result = run(&config, &load_config)
        .instrument(info_span!("load", %run_id))
        .await;

    if let Err(e) = &result {
        error!(%run_id, "❌ Error in main: {:#}", e);
    }
    result
}

async fn run(config: &LoaderConfig, load_config: &InstrumentLoadConfig) -> Result<()> {
    info!("Connecting to Neo4j server...");
    let graph = connect_neo4j_with_retry(
        &config.neo4j_uri,
        &config.neo4j_user,
        &config.neo4j_password,
        config.connect_retries,
    )
    .await
    .map_err(LoadError::Write)?;

    let mut source = load_config.source.open();
    let batch = BatchConfig {
        batch_size: config.batch_size,
    };
    let options = InstrumentOptions {
        clear_graph: load_config.clear_graph,
    };
    let summary = run_instrument_load(&graph, source.as_mut(), &batch, &options).await?;

    info!("📊 Load summary: {}", serde_json::to_string(&summary)?);
    Ok(())
}
