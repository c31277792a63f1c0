//! Event log kept in `logs.duckdb` in the profile directory
//!
//! Only event names, the backend mode, the command and error text are
//! stored. Email addresses in error text are masked before the insert;
//! phone numbers, vehicles and issue descriptions never reach this module.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock};

use anyhow::{anyhow, Result};
use chrono::Utc;
use duckdb::{params, Connection};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::Mode;
use crate::log_migrations::LOG_MIGRATIONS;

const BOOTSTRAP_MIGRATION: &str = "000_migrations.sql";

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Millisecond timestamp in the high bits, a wrapping sequence in the low 16
fn next_id(timestamp_ms: i64) -> u64 {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    ((timestamp_ms.max(0) as u64) << 16) | seq
}

fn email_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").ok())
        .as_ref()
}

/// Mask anything that looks like an email address
pub fn redact(text: &str) -> String {
    match email_pattern() {
        Some(pattern) => pattern.replace_all(text, "<email>").into_owned(),
        None => text.to_string(),
    }
}

/// Who is writing to the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Cli,
    /// An application embedding roadside-core directly
    Library,
}

impl EntryPoint {
    fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
            EntryPoint::Library => "library",
        }
    }
}

/// One event to record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl LogEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            mode: None,
            command: None,
            error_message: None,
            error_details: None,
        }
    }

    /// Which backend served the operation
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_error_details(mut self, details: impl Into<String>) -> Self {
        self.error_details = Some(details.into());
        self
    }
}

/// A stored row of `sys_logs`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub mode: Option<String>,
    pub command: Option<String>,
    pub error_message: Option<String>,
    pub error_details: Option<String>,
}

impl LogEntry {
    fn from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            entry_point: row.get(2)?,
            app_version: row.get(3)?,
            platform: row.get(4)?,
            event: row.get(5)?,
            mode: row.get(6)?,
            command: row.get(7)?,
            error_message: row.get(8)?,
            error_details: row.get(9)?,
        })
    }
}

const COLUMNS: &str = "id, timestamp, entry_point, app_version, platform, \
                       event, mode, command, error_message, error_details";

/// Which entries a read returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFilter {
    All,
    Errors,
    Event(String),
}

/// Append-only event log over one DuckDB file
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
    default_mode: Option<Mode>,
}

impl LoggingService {
    /// Open or create `logs.duckdb` in `dir` and bring its schema up to date
    pub fn new(
        dir: &Path,
        entry_point: EntryPoint,
        app_version: impl Into<String>,
    ) -> Result<Self> {
        let db_path = dir.join("logs.duckdb");
        let service = Self {
            conn: Mutex::new(Connection::open(&db_path)?),
            db_path,
            entry_point,
            app_version: app_version.into(),
            default_mode: None,
        };
        service.migrate()?;
        Ok(service)
    }

    /// Mode recorded for events that do not name one
    pub fn with_default_mode(mut self, mode: Mode) -> Self {
        self.default_mode = Some(mode);
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow!("Log database lock poisoned: {}", e))
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;

        let bootstrapped: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM information_schema.tables WHERE table_name = 'sys_migrations'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !bootstrapped {
            if let Some((name, sql)) = LOG_MIGRATIONS
                .iter()
                .find(|(n, _)| *n == BOOTSTRAP_MIGRATION)
            {
                apply(&conn, name, sql)?;
            }
        }

        let applied: Vec<String> = conn
            .prepare("SELECT migration_name FROM sys_migrations")?
            .query_map([], |row| row.get(0))?
            .collect::<duckdb::Result<_>>()?;

        for (name, sql) in LOG_MIGRATIONS {
            if *name != BOOTSTRAP_MIGRATION && !applied.iter().any(|a| a == name) {
                apply(&conn, name, sql)?;
            }
        }
        Ok(())
    }

    /// Record an event; error text is redacted first
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let timestamp = Utc::now().timestamp_millis();
        let mode = event.mode.or(self.default_mode).map(|m| m.to_string());
        let error_message = event.error_message.as_deref().map(redact);
        let error_details = event.error_details.as_deref().map(redact);

        let conn = self.lock()?;
        conn.execute(
            &format!("INSERT INTO sys_logs ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"),
            params![
                next_id(timestamp),
                timestamp,
                self.entry_point.as_str(),
                &self.app_version,
                std::env::consts::OS,
                &event.event,
                &mode,
                &event.command,
                &error_message,
                &error_details,
            ],
        )?;
        Ok(())
    }

    pub fn log_event(&self, event: &str) -> Result<()> {
        self.log(LogEvent::new(event))
    }

    /// One row per CLI invocation
    pub fn log_command(&self, command: &str) -> Result<()> {
        self.log(LogEvent::new("command_executed").with_command(command))
    }

    pub fn log_error(&self, event: &str, message: &str, details: Option<&str>) -> Result<()> {
        let mut entry = LogEvent::new(event).with_error(message);
        if let Some(details) = details {
            entry = entry.with_error_details(details);
        }
        self.log(entry)
    }

    /// Newest first
    pub fn query(&self, filter: &LogFilter, limit: usize) -> Result<Vec<LogEntry>> {
        let conn = self.lock()?;
        let order = "ORDER BY timestamp DESC, id DESC LIMIT ?";
        let limit = limit as i64;

        let entries = match filter {
            LogFilter::All => conn
                .prepare(&format!("SELECT {COLUMNS} FROM sys_logs {order}"))?
                .query_map(params![limit], LogEntry::from_row)?
                .collect::<duckdb::Result<Vec<_>>>()?,
            LogFilter::Errors => conn
                .prepare(&format!(
                    "SELECT {COLUMNS} FROM sys_logs WHERE error_message IS NOT NULL {order}"
                ))?
                .query_map(params![limit], LogEntry::from_row)?
                .collect::<duckdb::Result<Vec<_>>>()?,
            LogFilter::Event(name) => conn
                .prepare(&format!("SELECT {COLUMNS} FROM sys_logs WHERE event = ? {order}"))?
                .query_map(params![name, limit], LogEntry::from_row)?
                .collect::<duckdb::Result<Vec<_>>>()?,
        };
        Ok(entries)
    }

    pub fn get_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query(&LogFilter::All, limit)
    }

    pub fn get_errors(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query(&LogFilter::Errors, limit)
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.lock()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))?)
    }

    pub fn error_count(&self) -> Result<u64> {
        let conn = self.lock()?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM sys_logs WHERE error_message IS NOT NULL",
            [],
            |row| row.get(0),
        )?)
    }

    /// Delete entries older than `timestamp_ms`; returns how many went
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

fn apply(conn: &Connection, name: &str, sql: &str) -> Result<()> {
    conn.execute_batch(sql)
        .map_err(|e| anyhow!("Log migration {} failed: {}", name, e))?;
    conn.execute("INSERT INTO sys_migrations (migration_name) VALUES (?)", [name])?;
    Ok(())
}
