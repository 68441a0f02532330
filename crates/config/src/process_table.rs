use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProcessTable {
    /// Mount point of the process table. Every numeric entry below it is
    /// treated as one running process.
    pub root: PathBuf,
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/proc"),
        }
    }
}
