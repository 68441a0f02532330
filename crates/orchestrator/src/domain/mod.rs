#![forbid(unsafe_code)]

mod event;
mod pid;
mod record;
mod snapshot;

pub use event::ProcessEvent;
pub use pid::Pid;
pub use record::{Inspection, ProcessRecord, Tombstone, Vanished};
pub use snapshot::{Diff, Snapshot};
