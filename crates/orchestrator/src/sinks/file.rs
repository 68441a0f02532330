#![forbid(unsafe_code)]

use crate::domain::{Pid, ProcessRecord};
use crate::error::Error;
use crate::sinks::{EventSink, local_time};
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;
use tracing::debug;

/// First line of every file created by [`FileSink`].
pub const FILE_HEADER: &str = "PROCSPY_FILE_HEADER";

const ENDED_MARKER: &str = "DEADPROC";

/// Append-only, colon-separated event log.
///
/// ```text
/// <time>:<pid>:<ppid>:<uid>:<user>:<cmdline>
/// <time>:<pid>:DEADPROC
/// ```
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    /// Open `path` for appending, creating it with the header line if needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if file.metadata()?.len() == 0 {
            writeln!(file, "{FILE_HEADER}")?;
            debug!(path = %path.display(), "created event log");
        }

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> Result<(), Error> {
        let mut file = match self.file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        };
        writeln!(file, "{line}")?;
        Ok(())
    }
}

#[async_trait]
impl EventSink for FileSink {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn started(&self, record: &ProcessRecord) -> Result<(), Error> {
        self.append(&format!(
            "{}:{}:{}:{}:{}:{}",
            local_time(record.observed_at),
            record.pid,
            record.parent_pid,
            record.owner_id,
            record.owner_name,
            record.command_line,
        ))
    }

    async fn ended(&self, pid: Pid, ended_at: SystemTime) -> Result<(), Error> {
        self.append(&format!("{}:{pid}:{ENDED_MARKER}", local_time(ended_at)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record() -> ProcessRecord {
        ProcessRecord {
            pid: Pid::new(300),
            parent_pid: Pid::new(1),
            owner_id: 0,
            owner_name: "root".into(),
            command_line: "/sbin/agetty -o -p".into(),
            observed_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn new_file_gets_header_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("spy.log");

        let sink = FileSink::open(&path).unwrap();
        sink.started(&record()).await.unwrap();
        sink.ended(Pid::new(100), SystemTime::now()).await.unwrap();
        drop(sink);

        let sink = FileSink::open(&path).unwrap();
        sink.ended(Pid::new(300), SystemTime::now()).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], FILE_HEADER);
        assert!(lines[1].ends_with(":300:1:0:root:/sbin/agetty -o -p"));
        assert!(lines[2].ends_with(":100:DEADPROC"));
        assert!(lines[3].ends_with(":300:DEADPROC"));
    }

    #[test]
    fn existing_file_is_appended_without_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spy.log");
        std::fs::write(&path, "previous line\n").unwrap();

        FileSink::open(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "previous line\n");
    }
}
