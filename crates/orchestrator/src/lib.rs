#![forbid(unsafe_code)]

pub mod clock;
pub mod domain;
pub mod engine;
pub mod error;
pub mod observation;
pub mod sinks;

pub use engine::{Cycle, LoopState, Services, SpyEngine, TickReport, step};
pub use observation::{
    Enumerator, OwnerResolver, ProcessReader, ProcfsEnumerator, ProcfsReader, SystemOwners,
    normalize_command_line,
};
pub use sinks::{ConsoleSink, EventSink, FILE_HEADER, FileSink, SqliteSink};

pub use clock::{Clock, SystemClock};
pub use domain::{Diff, Inspection, Pid, ProcessEvent, ProcessRecord, Snapshot, Tombstone, Vanished};
pub use error::Error;
