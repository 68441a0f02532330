#![forbid(unsafe_code)]

mod console;
mod file;
mod sqlite;

pub use console::ConsoleSink;
pub use file::{FILE_HEADER, FileSink};
pub use sqlite::SqliteSink;

use crate::domain::{Pid, ProcessRecord};
use crate::error::Error;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::time::SystemTime;

/// Consumer of process events. Delivery is not transactional across sinks:
/// a failing sink never prevents the others from receiving the event.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;
    async fn started(&self, record: &ProcessRecord) -> Result<(), Error>;
    async fn ended(&self, pid: Pid, ended_at: SystemTime) -> Result<(), Error>;
}

pub(crate) fn local_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format("%Y-%m-%d %H:%M:%S%.6f")
        .to_string()
}
