#![forbid(unsafe_code)]

use clap::Parser;
use config::Config;
use orchestrator::SpyEngine;
use procspy::{cli::Cli, signals::ShutdownSignals, wiring::build_services};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // NOTE: The verbosity flag takes precedence over the environment variable
    // for log control. `PROCSPY_LOG=orchestrator=trace procspy -v` logs the
    // engine at trace level and everything else at info level.
    let env_filter = EnvFilter::builder()
        .with_default_directive("sqlx=warn".parse()?)
        .with_env_var("PROCSPY_LOG")
        .from_env()?
        .add_directive(cli.verbosity.log_level_filter().as_str().parse()?);

    // stdout belongs to the console sink
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter)
        .init();

    // load config
    let mut config = match &cli.conffile {
        Some(path) => Config::load(path)?,
        _ => {
            let mut candidates = glob::glob("/etc/procspy/config.d/*.toml")?
                .filter_map(Result::ok)
                .collect::<Vec<_>>();
            candidates.insert(0, "/etc/procspy/config.toml".into());
            trace!(?candidates, "config file candidates");
            Config::load_multiple(candidates)?
        }
    };
    cli.apply(&mut config)?;
    config.validate()?;
    debug!(?config, ?cli);

    // install signal handlers before the first snapshot
    let signals = ShutdownSignals::install()?;
    let cancel = CancellationToken::new();
    tokio::spawn(signals.cancel_on_signal(cancel.clone()));

    let services = build_services(&config).await?;
    let mut engine = SpyEngine::new(config.poll, services);

    if let Err(err) = engine.run_until(cancel).await {
        error!("watcher stopped: {}", err);
        return Err(err.into());
    }
    Ok(())
}
