//! Report export: per-patient visit history and the financial ledger, as
//! JSON or CSV.

mod comprehensive;
mod financial;

pub use comprehensive::*;
pub use financial::*;

use thiserror::Error;

use crate::db::{Database, DbError};

/// Export errors.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

impl From<rusqlite::Error> for ExportError {
    fn from(e: rusqlite::Error) -> Self {
        ExportError::Database(DbError::from(e))
    }
}

/// Builds reports for one clinic at a time.
pub struct ReportExporter<'a> {
    db: &'a Database,
}

impl<'a> ReportExporter<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }
}

/// Quote a CSV field when it holds a delimiter, quote or line break.
pub(crate) fn escape_csv(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub(crate) fn opt_csv(value: Option<&str>) -> String {
    value.map(escape_csv).unwrap_or_default()
}
