#![forbid(unsafe_code)]

use crate::domain::{Pid, ProcessRecord};
use crate::error::Error;
use crate::sinks::EventSink;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::{debug, trace};

/// Keeps one `proc_history` row per observed process lifetime.
#[derive(Debug, Clone)]
pub struct SqliteSink {
    path: PathBuf,
    pool: SqlitePool,
}

impl SqliteSink {
    /// Open (or create) the database file and apply migrations.
    pub async fn new(path: PathBuf) -> Result<Self, Error> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        debug!(path = %path.display(), "process history database ready");
        Ok(Self { path, pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn timestamp(time: SystemTime) -> String {
        DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

#[async_trait]
impl EventSink for SqliteSink {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn started(&self, record: &ProcessRecord) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO proc_history (pid, ppid, uid, user, cmd, start_time) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(i64::from(record.pid.as_u32()))
        .bind(i64::from(record.parent_pid.as_u32()))
        .bind(i64::from(record.owner_id))
        .bind(&record.owner_name)
        .bind(&record.command_line)
        .bind(Self::timestamp(record.observed_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn ended(&self, pid: Pid, ended_at: SystemTime) -> Result<(), Error> {
        // Only the newest open row: older rows with the same pid belong to
        // processes that reused it earlier.
        let result = sqlx::query(
            "UPDATE proc_history SET end_time = ? \
             WHERE id = (SELECT id FROM proc_history \
                         WHERE pid = ? AND end_time IS NULL \
                         ORDER BY id DESC LIMIT 1)",
        )
        .bind(Self::timestamp(ended_at))
        .bind(i64::from(pid.as_u32()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            trace!(%pid, db = %self.path.display(), "no open history row for ended pid");
        }
        Ok(())
    }
}
