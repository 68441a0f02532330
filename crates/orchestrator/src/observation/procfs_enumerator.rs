#![forbid(unsafe_code)]

use crate::domain::{Pid, Snapshot};
use crate::error::Error;
use crate::observation::{Enumerator, is_proc_gone};
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

#[derive(Debug, Clone)]
pub struct ProcfsEnumerator {
    root: PathBuf,
}

impl ProcfsEnumerator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for ProcfsEnumerator {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl Enumerator for ProcfsEnumerator {
    fn snapshot(&self) -> Result<Snapshot, Error> {
        let processes = procfs::process::all_processes_with_root(&self.root).map_err(|source| {
            Error::Enumeration {
                root: self.root.clone(),
                source,
            }
        })?;

        let mut snapshot = Snapshot::new();
        for process in processes {
            let process = match process {
                Ok(p) => p,
                Err(err) if is_proc_gone(&err) => continue,
                Err(err) => {
                    warn!(?err, "failed to read process entry");
                    continue;
                }
            };
            match Pid::try_from(process.pid) {
                Ok(pid) if pid.as_u32() > 0 => {
                    snapshot.insert(pid);
                }
                _ => continue,
            }
        }

        trace!(count = snapshot.len(), "process table enumerated");
        Ok(snapshot)
    }
}
