#![forbid(unsafe_code)]

use crate::domain::{Pid, ProcessRecord};
use crate::error::Error;
use crate::sinks::{EventSink, local_time};
use async_trait::async_trait;
use colored::Colorize;
use std::io::Write;
use std::sync::Mutex;
use std::time::SystemTime;

/// Human-readable event lines, one per event.
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
    color: bool,
}

impl ConsoleSink {
    pub fn stdout(color: bool) -> Self {
        Self::new(Box::new(std::io::stdout()), color)
    }

    pub fn new(out: Box<dyn Write + Send>, color: bool) -> Self {
        Self {
            out: Mutex::new(out),
            color,
        }
    }

    fn started_line(&self, record: &ProcessRecord) -> String {
        let marker = if self.color {
            "[+]".green().bold().to_string()
        } else {
            "[+]".to_owned()
        };
        let command = if self.color {
            record.command_line.bright_white().bold().to_string()
        } else {
            record.command_line.clone()
        };
        format!(
            "{marker} [{}] [PID:{} PPID:{}] {} ({}): {command}",
            local_time(record.observed_at),
            record.pid,
            record.parent_pid,
            record.owner_name,
            record.owner_id,
        )
    }

    fn ended_line(&self, pid: Pid, ended_at: SystemTime) -> String {
        let marker = if self.color {
            "[-]".red().bold().to_string()
        } else {
            "[-]".to_owned()
        };
        format!("{marker} [{}] PID {pid} has terminated.", local_time(ended_at))
    }

    fn write_line(&self, line: &str) -> Result<(), Error> {
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSink")
            .field("color", &self.color)
            .finish()
    }
}

#[async_trait]
impl EventSink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn started(&self, record: &ProcessRecord) -> Result<(), Error> {
        self.write_line(&self.started_line(record))
    }

    async fn ended(&self, pid: Pid, ended_at: SystemTime) -> Result<(), Error> {
        self.write_line(&self.ended_line(pid, ended_at))
    }
}
