//! Atomic numbering for clinic and patient codes.
//!
//! A single upsert both reads and increments the counter, so two writers on
//! the same file can never be handed the same number. A counter that does not
//! exist yet is seeded from the current row count, which keeps numbering
//! continuous for databases created before the counter table existed.

use rusqlite::{params, Connection, OptionalExtension};

use super::{Database, DbResult};

/// Which counter to advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKey {
    /// Global clinic numbering
    Clinic,
    /// Patient numbering within one clinic
    Patient { clinic_id: i64 },
}

impl SequenceKey {
    pub fn name(&self) -> String {
        match self {
            SequenceKey::Clinic => "clinic".to_string(),
            SequenceKey::Patient { clinic_id } => format!("patient:{clinic_id}"),
        }
    }
}

/// Advance `key` and return the new value (1 for a fresh database).
///
/// Takes a bare connection so it can run inside a caller's transaction.
pub fn next_sequence_value(conn: &Connection, key: SequenceKey) -> DbResult<i64> {
    let name = key.name();
    let value = match key {
        SequenceKey::Clinic => conn.query_row(
            r#"
            INSERT INTO sequences (name, last_value)
            VALUES (?1, (SELECT COUNT(*) FROM clinics) + 1)
            ON CONFLICT(name) DO UPDATE SET last_value = last_value + 1
            RETURNING last_value
            "#,
            params![name],
            |row| row.get(0),
        )?,
        SequenceKey::Patient { clinic_id } => conn.query_row(
            r#"
            INSERT INTO sequences (name, last_value)
            VALUES (?1, (SELECT COUNT(*) FROM patients WHERE clinic_id = ?2) + 1)
            ON CONFLICT(name) DO UPDATE SET last_value = last_value + 1
            RETURNING last_value
            "#,
            params![name, clinic_id],
            |row| row.get(0),
        )?,
    };
    Ok(value)
}

impl Database {
    /// Last value handed out for `key`, without advancing it.
    pub fn current_sequence_value(&self, key: SequenceKey) -> DbResult<i64> {
        let value: Option<i64> = self
            .conn
            .query_row(
                "SELECT last_value FROM sequences WHERE name = ?",
                [key.name()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.unwrap_or(0))
    }
}
