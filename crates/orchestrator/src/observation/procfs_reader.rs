#![forbid(unsafe_code)]

use crate::domain::{Inspection, Pid, ProcessRecord, Vanished};
use crate::error::Error;
use crate::observation::{OwnerResolver, ProcessReader, SystemOwners, is_gone, is_proc_gone};
use procfs::process::Process;
use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tracing::trace;

/// Join the NUL-separated arguments of a `cmdline` file with spaces.
pub fn normalize_command_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .replace('\0', " ")
        .trim()
        .to_owned()
}

/// Reads process metadata straight from a procfs tree. Every file read is a
/// separate race point: the process may exit between any two of them.
#[derive(Debug, Clone)]
pub struct ProcfsReader<O = SystemOwners> {
    root: PathBuf,
    owners: O,
}

impl ProcfsReader<SystemOwners> {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_owners(root, SystemOwners)
    }
}

impl<O: OwnerResolver> ProcfsReader<O> {
    pub fn with_owners(root: impl Into<PathBuf>, owners: O) -> Self {
        Self {
            root: root.into(),
            owners,
        }
    }

    fn creation_time(meta: &std::fs::Metadata) -> SystemTime {
        let secs = u64::try_from(meta.ctime()).unwrap_or(0);
        let nanos = u32::try_from(meta.ctime_nsec()).unwrap_or(0);
        SystemTime::UNIX_EPOCH + Duration::new(secs, nanos)
    }
}

impl<O: OwnerResolver> ProcessReader for ProcfsReader<O> {
    fn inspect(&self, pid: Pid) -> Result<Inspection, Error> {
        let dir = self.root.join(pid.to_string());

        let meta = match std::fs::metadata(&dir) {
            Ok(meta) => meta,
            Err(err) if is_gone(&err) => return Ok(Inspection::vanished(pid, Vanished::Directory)),
            Err(err) => return Err(err.into()),
        };
        let owner_id = meta.uid();
        let observed_at = Self::creation_time(&meta);

        // Deleted accounts fall back to the numeric id.
        let owner_name = self
            .owners
            .resolve(owner_id)
            .unwrap_or_else(|| owner_id.to_string());

        let raw = match std::fs::read(dir.join("cmdline")) {
            Ok(raw) => raw,
            Err(err) if is_gone(&err) => {
                return Ok(Inspection::vanished(pid, Vanished::CommandLine));
            }
            Err(err) => return Err(err.into()),
        };
        let command_line = normalize_command_line(&raw);
        if command_line.is_empty() {
            trace!(%pid, "empty command line");
            return Ok(Inspection::vanished(pid, Vanished::EmptyCommandLine));
        }

        let stat = match Process::new_with_root(dir).and_then(|process| process.stat()) {
            Ok(stat) => stat,
            Err(err) if is_proc_gone(&err) => return Ok(Inspection::vanished(pid, Vanished::Status)),
            Err(err) => return Err(err.into()),
        };
        let parent_pid = Pid::try_from(stat.ppid).unwrap_or(Pid::new(0));

        Ok(Inspection::Record(ProcessRecord {
            pid,
            parent_pid,
            owner_id,
            owner_name,
            command_line,
            observed_at,
        }))
    }
}
