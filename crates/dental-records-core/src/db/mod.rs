//! Database layer for dental-records.

mod schema;
pub mod migrations;
mod sequences;
mod clinics;
mod patients;
mod visits;
mod revenue;
mod appointments;
mod feedback;
mod alerts;

pub use schema::*;
pub use sequences::*;
pub use patients::SUGGESTION_THRESHOLD;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, Row, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::config::StoreConfig;
use crate::models::ValidationError;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

impl DbError {
    /// Whether the caller can fix this by changing the request, as opposed to
    /// a storage or internal failure.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            DbError::NotFound(_)
                | DbError::Validation(_)
                | DbError::Conflict(_)
                | DbError::InvalidCredentials
        )
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
    config: StoreConfig,
}

impl Database {
    /// Open database at path with default settings, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn, StoreConfig::default())
    }

    /// Open the database named by `config.database_path`.
    pub fn open_with_config(config: &StoreConfig) -> DbResult<Self> {
        let conn = Connection::open(&config.database_path)?;
        Self::from_connection(conn, config.clone())
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open_in_memory_with_config(StoreConfig::default())
    }

    /// In-memory database with custom settings.
    pub fn open_in_memory_with_config(config: StoreConfig) -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, config)
    }

    fn from_connection(conn: Connection, config: StoreConfig) -> DbResult<Self> {
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        let db = Self { conn, config };
        db.initialize()?;
        Ok(db)
    }

    /// Create tables, upgrade older layouts, then build indexes.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(TABLES)?;
        migrations::migrate(&self.conn)?;
        self.conn.execute_batch(INDEXES)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Settings this database was opened with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Begin a transaction.
    pub fn transaction(&mut self) -> DbResult<rusqlite::Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    /// Begin a transaction that takes the write lock up front, so concurrent
    /// writers queue on the busy timeout instead of failing mid-transaction.
    pub(crate) fn write_transaction(&self) -> DbResult<Transaction<'_>> {
        Ok(Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?)
    }
}

/// Map SQLite constraint failures onto typed errors: UNIQUE becomes
/// [`DbError::Conflict`] with `message`, CHECK and FOREIGN KEY become
/// [`DbError::Constraint`]. Anything else passes through.
pub(crate) fn classify_constraint(err: rusqlite::Error, message: &str) -> DbError {
    match &err {
        rusqlite::Error::SqliteFailure(e, detail) => match e.extended_code {
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE => DbError::Conflict(message.to_string()),
            rusqlite::ffi::SQLITE_CONSTRAINT_CHECK | rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                DbError::Constraint(detail.clone().unwrap_or_else(|| e.to_string()))
            }
            _ => DbError::Sqlite(err),
        },
        _ => DbError::Sqlite(err),
    }
}

/// Parse a stored date. Older rows may carry a time part after the date.
pub(crate) fn parse_stored_date(text: &str) -> Option<NaiveDate> {
    text.get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

/// Parse a stored date-time. Date-only values mean midnight.
pub(crate) fn parse_stored_datetime(text: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    let text = text.trim().trim_end_matches('Z');
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| parse_stored_date(text).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

/// Date of a ledger row. Rows whose date is missing or unreadable fall back
/// to the day they were created, so one bad row cannot hide the rest.
pub(crate) fn ledger_date_column(
    row: &Row<'_>,
    idx: usize,
    created_idx: usize,
) -> rusqlite::Result<NaiveDate> {
    let text: Option<String> = row.get(idx)?;
    if let Some(date) = text.as_deref().and_then(parse_stored_date) {
        return Ok(date);
    }
    let created: String = row.get(created_idx)?;
    let date = parse_stored_datetime(&created)
        .map(|t| t.date())
        .ok_or_else(|| bad_text(idx, text.as_deref().unwrap_or_default()))?;
    warn!(stored = ?text, fallback = %date, "unreadable ledger date, using creation day");
    Ok(date)
}

pub(crate) fn optional_date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let text: Option<String> = row.get(idx)?;
    Ok(text.as_deref().and_then(parse_stored_date))
}

pub(crate) fn datetime_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let text: String = row.get(idx)?;
    parse_stored_datetime(&text).ok_or_else(|| bad_text(idx, &text))
}

fn bad_text(idx: usize, text: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        format!("unrecognized date {text:?}").into(),
    )
}
