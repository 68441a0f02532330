#![forbid(unsafe_code)]

mod owners;
mod procfs_enumerator;
mod procfs_reader;

pub use owners::{OwnerResolver, SystemOwners};
pub use procfs_enumerator::ProcfsEnumerator;
pub use procfs_reader::{ProcfsReader, normalize_command_line};

use crate::domain::{Inspection, Pid, Snapshot};
use crate::error::Error;

pub trait Enumerator: Send + Sync {
    /// List every process identifier currently present in the process table.
    fn snapshot(&self) -> Result<Snapshot, Error>;
}

pub trait ProcessReader: Send + Sync {
    /// Read the metadata of one process. A process that exits while being
    /// read yields [`Inspection::Tombstone`], not an error.
    fn inspect(&self, pid: Pid) -> Result<Inspection, Error>;
}

/// Whether an I/O error means the process is gone.
pub(crate) fn is_gone(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::NotFound
        || err.raw_os_error() == Some(nix::errno::Errno::ESRCH as i32)
}

pub(crate) fn is_proc_gone(err: &procfs::ProcError) -> bool {
    match err {
        procfs::ProcError::NotFound(_) => true,
        procfs::ProcError::Io(err, _) => is_gone(err),
        _ => false,
    }
}
