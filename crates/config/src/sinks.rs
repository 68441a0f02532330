use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where process events are delivered. Any combination may be enabled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Sinks {
    /// Print colored event lines to standard output.
    pub console: bool,

    /// Disable ANSI colors on the console sink.
    pub plain: bool,

    /// Append event lines to this file. The file is created with a marker
    /// header line if it does not exist yet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Record process lifetimes in this SQLite database.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
}

impl Sinks {
    pub fn any_enabled(&self) -> bool {
        self.console || self.file.is_some() || self.database.is_some()
    }
}

impl Default for Sinks {
    fn default() -> Self {
        Self {
            console: true,
            plain: false,
            file: None,
            database: None,
        }
    }
}
