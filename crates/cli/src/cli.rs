use clap::{Parser, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use config::Config;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// procspy: watch processes come and go
///
/// procspy polls the process table at a fixed cadence and reports every
/// process that appeared or disappeared since the previous poll, without
/// relying on kernel process-event interfaces. Processes that start and exit
/// between two polls are not seen.
#[derive(Debug, Parser, Clone)]
#[command(about, long_about, version)]
pub struct Cli {
    /// Path to configuration file.
    ///
    /// If not provided, the default locations are checked. They are
    /// `/etc/procspy/config.toml` and `/etc/procspy/config.d/*.toml`,
    /// where the latter being a glob pattern. If they don't exist, the default
    /// configuration is used.
    #[arg(short, long, value_parser = validate_file)]
    pub conffile: Option<PathBuf>,

    /// Where to report events, comma separated. Overrides the `[sinks]`
    /// section of the configuration.
    #[arg(short, long, value_enum, value_delimiter = ',')]
    pub modes: Vec<Mode>,

    /// Event log file, required by the `file` mode.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// SQLite database, required by the `db` mode.
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Root of the process table.
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Delay between two polls, in milliseconds.
    #[arg(long, value_parser = validate_interval)]
    pub interval_ms: Option<u64>,

    /// Delay between the baseline snapshot and the first poll, in milliseconds.
    #[arg(long)]
    pub warmup_ms: Option<u64>,

    /// Do not color console output.
    #[arg(long)]
    pub plain: bool,

    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Colored lines on standard output.
    Stdout,
    /// Append-only event log (see `--output`).
    File,
    /// SQLite process history (see `--database`).
    Db,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("An output file must be specified when using file mode (--output)")]
    MissingOutput,

    #[error("A database path must be specified when using db mode (--database)")]
    MissingDatabase,
}

impl Cli {
    /// Layer the command-line overrides on top of a loaded configuration.
    pub fn apply(&self, config: &mut Config) -> Result<(), Error> {
        let sinks = &mut config.sinks;
        if self.modes.is_empty() {
            if let Some(output) = &self.output {
                sinks.file = Some(output.clone());
            }
            if let Some(database) = &self.database {
                sinks.database = Some(database.clone());
            }
        } else {
            sinks.console = self.modes.contains(&Mode::Stdout);
            sinks.file = if self.modes.contains(&Mode::File) {
                Some(
                    self.output
                        .clone()
                        .or_else(|| sinks.file.take())
                        .ok_or(Error::MissingOutput)?,
                )
            } else {
                None
            };
            sinks.database = if self.modes.contains(&Mode::Db) {
                Some(
                    self.database
                        .clone()
                        .or_else(|| sinks.database.take())
                        .ok_or(Error::MissingDatabase)?,
                )
            } else {
                None
            };
        }
        if self.plain {
            sinks.plain = true;
        }

        if let Some(root) = &self.proc_root {
            config.process_table.root = root.clone();
        }
        if let Some(ms) = self.interval_ms {
            config.poll.interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.warmup_ms {
            config.poll.warmup = Duration::from_millis(ms);
        }
        Ok(())
    }
}

/// Check if the file exists.
#[inline(always)]
fn validate_file(file: &str) -> Result<PathBuf, String> {
    let path = Path::new(file);
    if path.exists() {
        Ok(path.to_owned())
    } else {
        Err(format!("File not found: {:?}", path))
    }
}

/// Validate the poll interval.
#[inline(always)]
fn validate_interval(interval: &str) -> Result<u64, String> {
    let interval: u64 = interval
        .parse()
        .map_err(|_| format!("`{interval}` is not a valid number of milliseconds"))?;
    if interval > 0 {
        Ok(interval)
    } else {
        Err("Poll interval must be at least 1 ms".to_string())
    }
}
