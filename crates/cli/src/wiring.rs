#![forbid(unsafe_code)]

use config::Config;
use orchestrator::{
    ConsoleSink, EventSink, FileSink, ProcfsEnumerator, ProcfsReader, Services, SqliteSink,
    SystemClock,
};
use tracing::info;

/// Open every sink enabled in the configuration, in a fixed order:
/// console, file, database.
pub async fn build_sinks(
    sinks: &config::Sinks,
) -> Result<Vec<Box<dyn EventSink + Send + Sync>>, orchestrator::Error> {
    let mut built: Vec<Box<dyn EventSink + Send + Sync>> = Vec::new();

    if sinks.console {
        built.push(Box::new(ConsoleSink::stdout(!sinks.plain)));
    }
    if let Some(path) = &sinks.file {
        built.push(Box::new(FileSink::open(path.clone())?));
    }
    if let Some(path) = &sinks.database {
        built.push(Box::new(SqliteSink::new(path.clone()).await?));
    }

    info!(
        sinks = ?built.iter().map(|sink| sink.name()).collect::<Vec<_>>(),
        "event sinks ready"
    );
    Ok(built)
}

/// Assemble the production services for the configured process table.
pub async fn build_services(config: &Config) -> Result<Services, orchestrator::Error> {
    let root = &config.process_table.root;
    Ok(Services {
        enumerator: Box::new(ProcfsEnumerator::new(root.clone())),
        reader: Box::new(ProcfsReader::new(root.clone())),
        sinks: build_sinks(&config.sinks).await?,
        clock: Box::new(SystemClock),
    })
}
