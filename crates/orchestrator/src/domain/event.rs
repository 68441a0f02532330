#![forbid(unsafe_code)]

use crate::domain::{Pid, ProcessRecord};
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Started(ProcessRecord),
    Ended { pid: Pid, ended_at: SystemTime },
}

impl ProcessEvent {
    pub fn pid(&self) -> Pid {
        match self {
            ProcessEvent::Started(record) => record.pid,
            ProcessEvent::Ended { pid, .. } => *pid,
        }
    }
}
