#![forbid(unsafe_code)]

use crate::domain::Pid;
use std::time::SystemTime;

/// A process as observed at the moment of inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pub pid: Pid,
    /// Parent at read time. Not corrected if the parent id was reused.
    pub parent_pid: Pid,
    pub owner_id: u32,
    /// Account name for `owner_id`, or the numeric id when the account
    /// cannot be resolved.
    pub owner_name: String,
    /// Arguments joined by single spaces, never empty.
    pub command_line: String,
    /// Creation time of the process-table entry, a proxy for start time.
    pub observed_at: SystemTime,
}

/// The point of the read at which the process turned out to be gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vanished {
    /// The process-table entry was missing before metadata could be read.
    Directory,
    /// The entry existed but its command line could no longer be opened.
    CommandLine,
    /// The command line was empty: the kernel already released the identity.
    EmptyCommandLine,
    /// The status record disappeared after the command line was read.
    Status,
}

/// Outcome for a process that exited while it was being inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tombstone {
    pub pid: Pid,
    pub reason: Vanished,
}

/// Result of inspecting one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inspection {
    Record(ProcessRecord),
    Tombstone(Tombstone),
}

impl Inspection {
    pub(crate) fn vanished(pid: Pid, reason: Vanished) -> Self {
        Self::Tombstone(Tombstone { pid, reason })
    }
}
