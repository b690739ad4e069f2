//! In-place upgrades for databases written by the earlier clinic web apps.
//!
//! Those apps created the same tables with fewer columns, kept passwords in
//! plaintext, and stored addresses as one comma-separated string. Each step
//! checks `PRAGMA table_info` before altering, so running it twice is a no-op.

use std::collections::HashSet;

use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use tracing::{debug, info, warn};

use super::{DbResult, INDEXES, SCHEMA_VERSION};
use crate::auth::hash_password;
use crate::models::Address;

/// Columns the current code reads, per table, with the type used when adding
/// them. Added columns carry no constraints (SQLite's ALTER TABLE limits).
const REQUIRED_COLUMNS: &[(&str, &[(&str, &str)])] = &[
    (
        "clinics",
        &[
            ("clinic_code", "TEXT"),
            ("login_id", "TEXT"),
            ("password_hash", "TEXT"),
            ("location", "TEXT"),
            ("incharge", "TEXT"),
            ("email", "TEXT"),
            ("phone", "TEXT"),
            ("reset_token_hash", "TEXT"),
            ("reset_expires_at", "TEXT"),
            ("created_at", "TEXT"),
        ],
    ),
    (
        "patients",
        &[
            ("sex", "TEXT"),
            ("age", "INTEGER"),
            ("dob", "TEXT"),
            ("mobile", "TEXT"),
            ("email", "TEXT"),
            ("address_village_town", "TEXT"),
            ("address_city", "TEXT"),
            ("address_state", "TEXT"),
            ("address_pincode", "TEXT"),
            ("emergency_contact_name", "TEXT"),
            ("emergency_contact_phone", "TEXT"),
            ("medical_history", "TEXT"),
            ("current_medications", "TEXT"),
            ("allergies", "TEXT"),
            ("previous_dental_work", "TEXT"),
            ("chief_complaint", "TEXT"),
            ("pain_level", "INTEGER"),
            ("last_cleaning_date", "TEXT"),
            ("insurance_provider", "TEXT"),
            ("insurance_number", "TEXT"),
            ("treatment", "TEXT"),
            ("preferred_doctor", "TEXT"),
            ("status", "TEXT NOT NULL DEFAULT 'Active'"),
            ("created_at", "TEXT"),
            ("updated_at", "TEXT"),
        ],
    ),
    (
        "patient_analytics",
        &[
            ("symptoms", "TEXT"),
            ("diagnosis", "TEXT"),
            ("treatment_cost", "REAL NOT NULL DEFAULT 0"),
            ("satisfaction_rating", "INTEGER"),
            ("doctor_assigned", "TEXT"),
            ("treatment_given", "TEXT"),
            ("pain_level_before", "INTEGER"),
            ("pain_level_after", "INTEGER"),
            ("payment_mode", "TEXT"),
            ("treatment_success_rate", "REAL"),
            ("created_at", "TEXT"),
        ],
    ),
    (
        "revenue_analytics",
        &[
            ("patient_id", "INTEGER"),
            ("visit_id", "INTEGER"),
            ("service_type", "TEXT"),
            ("base_amount", "REAL NOT NULL DEFAULT 0"),
            ("tax_amount", "REAL NOT NULL DEFAULT 0"),
            ("discount_amount", "REAL NOT NULL DEFAULT 0"),
            ("final_amount", "REAL NOT NULL DEFAULT 0"),
            ("payment_method", "TEXT"),
            ("payment_status", "TEXT NOT NULL DEFAULT 'Completed'"),
            ("created_at", "TEXT"),
        ],
    ),
    (
        "appointments",
        &[
            ("treatment_type", "TEXT"),
            ("notes", "TEXT"),
            ("status", "TEXT NOT NULL DEFAULT 'Scheduled'"),
            ("created_at", "TEXT"),
        ],
    ),
    (
        "patient_feedback",
        &[
            ("feedback_type", "TEXT"),
            ("rating", "INTEGER"),
            ("review_text", "TEXT"),
            ("sentiment_score", "REAL"),
            ("areas_for_improvement", "TEXT"),
            ("would_recommend", "INTEGER NOT NULL DEFAULT 1"),
            ("feedback_date", "TEXT"),
            ("created_at", "TEXT"),
        ],
    ),
    (
        "smart_alerts",
        &[
            ("alert_type", "TEXT"),
            ("alert_message", "TEXT"),
            ("severity", "TEXT NOT NULL DEFAULT 'Medium'"),
            ("is_read", "INTEGER NOT NULL DEFAULT 0"),
            ("action_required", "INTEGER NOT NULL DEFAULT 0"),
            ("related_patient_id", "INTEGER"),
            ("created_at", "TEXT"),
        ],
    ),
];

/// Bring an opened database up to [`SCHEMA_VERSION`]. Tables must exist.
///
/// All steps, the unique indexes and the version bump commit together, so a
/// failed upgrade leaves the file as it was and is retried on the next open.
pub fn migrate(conn: &Connection) -> DbResult<()> {
    let version = user_version(conn)?;
    if version >= SCHEMA_VERSION {
        debug!(version, "schema up to date");
        return Ok(());
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    // Another connection may have finished the upgrade while we waited.
    if user_version(&tx)? >= SCHEMA_VERSION {
        return Ok(());
    }

    debug!(from = version, to = SCHEMA_VERSION, "migrating schema");
    for (table, columns) in REQUIRED_COLUMNS {
        ensure_columns(&tx, table, columns)?;
    }
    backfill_timestamps(&tx)?;
    backfill_mobile(&tx)?;
    backfill_addresses(&tx)?;
    backfill_feedback_and_alerts(&tx)?;
    normalize_clinic_emails(&tx)?;
    hash_plaintext_passwords(&tx)?;
    tx.execute_batch(INDEXES)?;

    tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    tx.commit()?;
    Ok(())
}

pub fn user_version(conn: &Connection) -> DbResult<i64> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Column names of `table`.
pub fn table_columns(conn: &Connection, table: &str) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

fn ensure_columns(conn: &Connection, table: &str, columns: &[(&str, &str)]) -> DbResult<()> {
    let existing = table_columns(conn, table)?;
    for (name, decl) in columns {
        if !existing.iter().any(|c| c == name) {
            conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {name} {decl}"))?;
            info!(table, column = name, "added column");
        }
    }
    Ok(())
}

fn backfill_timestamps(conn: &Connection) -> DbResult<()> {
    for table in [
        "clinics",
        "patients",
        "patient_analytics",
        "revenue_analytics",
        "appointments",
        "patient_feedback",
        "smart_alerts",
    ] {
        conn.execute(
            &format!(
                "UPDATE {table} SET created_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now') WHERE created_at IS NULL"
            ),
            [],
        )?;
    }
    conn.execute(
        "UPDATE patients SET updated_at = created_at WHERE updated_at IS NULL",
        [],
    )?;
    Ok(())
}

/// Older variants called the patient's mobile number `phone`.
fn backfill_mobile(conn: &Connection) -> DbResult<()> {
    if table_columns(conn, "patients")?.iter().any(|c| c == "phone") {
        let n = conn.execute(
            "UPDATE patients SET mobile = phone WHERE mobile IS NULL AND phone IS NOT NULL AND phone != ''",
            [],
        )?;
        debug!(rows = n, "copied legacy phone column into mobile");
    }
    Ok(())
}

/// Split legacy free-text addresses into the structured columns.
fn backfill_addresses(conn: &Connection) -> DbResult<()> {
    if !table_columns(conn, "patients")?.iter().any(|c| c == "address") {
        return Ok(());
    }

    let legacy: Vec<(i64, String)> = {
        let mut stmt = conn.prepare(
            "SELECT id, address FROM patients
             WHERE address IS NOT NULL AND address != ''
               AND address_city IS NULL AND address_state IS NULL",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<Vec<_>, _>>()?
    };

    let mut unparsed = 0usize;
    for (id, text) in legacy {
        match Address::parse_legacy(&text) {
            Some(addr) => {
                conn.execute(
                    "UPDATE patients SET address_village_town = ?2, address_city = ?3,
                         address_state = ?4, address_pincode = ?5
                     WHERE id = ?1",
                    params![id, addr.village_town, addr.city, addr.state, addr.pincode],
                )?;
            }
            None => unparsed += 1,
        }
    }
    if unparsed > 0 {
        warn!(unparsed, "legacy addresses left unstructured");
    }
    Ok(())
}

/// Some older apps wrote `feedback_text`, `severity_level` and `is_resolved`
/// where the current tables have `review_text`, `severity` and `is_read`.
fn backfill_feedback_and_alerts(conn: &Connection) -> DbResult<()> {
    let feedback = table_columns(conn, "patient_feedback")?;
    if feedback.iter().any(|c| c == "feedback_text") {
        conn.execute(
            "UPDATE patient_feedback SET review_text = feedback_text WHERE review_text IS NULL",
            [],
        )?;
    }
    conn.execute(
        "UPDATE patient_feedback SET feedback_date = substr(created_at, 1, 10) WHERE feedback_date IS NULL",
        [],
    )?;

    let alerts = table_columns(conn, "smart_alerts")?;
    if alerts.iter().any(|c| c == "severity_level") {
        conn.execute(
            "UPDATE smart_alerts SET severity = severity_level WHERE severity_level IS NOT NULL AND severity_level != ''",
            [],
        )?;
    }
    if alerts.iter().any(|c| c == "is_resolved") {
        let n = conn.execute("UPDATE smart_alerts SET is_read = 1 WHERE is_resolved", [])?;
        debug!(rows = n, "carried resolved alerts over as read");
    }
    Ok(())
}

/// Lowercase clinic emails so the unique index matches how logins and resets
/// look them up. When two clinics collapse onto one address the older clinic
/// keeps it and the others lose their email.
fn normalize_clinic_emails(conn: &Connection) -> DbResult<()> {
    let stored: Vec<(i64, String)> = {
        let mut stmt = conn.prepare("SELECT id, email FROM clinics WHERE email IS NOT NULL ORDER BY id")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<Vec<_>, _>>()?
    };

    let mut seen = HashSet::new();
    for (id, email) in stored {
        let normalized = email.trim().to_lowercase();
        if normalized.is_empty() || !seen.insert(normalized.clone()) {
            conn.execute("UPDATE clinics SET email = NULL WHERE id = ?", [id])?;
            if !normalized.is_empty() {
                warn!(clinic_id = id, email = %normalized, "duplicate clinic email cleared");
            }
        } else if normalized != email {
            conn.execute("UPDATE clinics SET email = ?2 WHERE id = ?1", params![id, normalized])?;
        }
    }
    Ok(())
}

/// Replace plaintext `password` values with Argon2 hashes.
fn hash_plaintext_passwords(conn: &Connection) -> DbResult<()> {
    if !table_columns(conn, "clinics")?.iter().any(|c| c == "password") {
        return Ok(());
    }

    let plaintext: Vec<(i64, String)> = {
        let mut stmt = conn.prepare(
            "SELECT id, password FROM clinics WHERE password_hash IS NULL AND password IS NOT NULL",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<Vec<_>, _>>()?
    };

    for (id, password) in &plaintext {
        conn.execute(
            "UPDATE clinics SET password_hash = ?2, password = NULL WHERE id = ?1",
            params![id, hash_password(password)?],
        )?;
    }
    if !plaintext.is_empty() {
        info!(count = plaintext.len(), "hashed legacy plaintext passwords");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, TABLES};

    /// Shape of the oldest web-app database.
    const LEGACY: &str = r#"
        CREATE TABLE clinics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            clinic_code TEXT UNIQUE,
            name TEXT NOT NULL,
            login_id TEXT UNIQUE,
            password TEXT
        );
        CREATE TABLE patients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            clinic_id INTEGER NOT NULL,
            patient_code TEXT UNIQUE NOT NULL,
            name TEXT NOT NULL,
            phone TEXT,
            address TEXT
        );
        INSERT INTO clinics (clinic_code, name, login_id, password)
            VALUES ('CLINIC0001', 'Smile', 'USER001', 'plain-pw');
        INSERT INTO patients (clinic_id, patient_code, name, phone, address)
            VALUES (1, 'CLINIC0001-P0001', 'Asha', '9800000000', 'Baner, Pune, Maharashtra, India - 411045');
        INSERT INTO patients (clinic_id, patient_code, name, address)
            VALUES (1, 'CLINIC0001-P0002', 'Ravi', 'Pune');
    "#;

    /// Feedback and alert tables as the working-app variant wrote them.
    const LEGACY_FEEDBACK: &str = r#"
        CREATE TABLE patient_feedback (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            clinic_id INTEGER NOT NULL,
            patient_id INTEGER NOT NULL,
            feedback_text TEXT,
            rating INTEGER,
            sentiment_score REAL,
            feedback_date DATE
        );
        CREATE TABLE smart_alerts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            clinic_id INTEGER NOT NULL,
            alert_type TEXT,
            alert_message TEXT,
            severity_level TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            is_resolved BOOLEAN DEFAULT FALSE
        );
        INSERT INTO patient_feedback (clinic_id, patient_id, feedback_text, rating, sentiment_score, feedback_date)
            VALUES (1, 1, 'Painless filling', 5, 0.9, '2024-03-02');
        INSERT INTO smart_alerts (clinic_id, alert_type, alert_message, severity_level, is_resolved)
            VALUES (1, 'Patient Alert', 'High number of no-shows this week', 'High', 0);
        INSERT INTO smart_alerts (clinic_id, alert_type, alert_message, severity_level, is_resolved)
            VALUES (1, 'Revenue Alert', 'Monthly revenue target achieved', 'Medium', 1);
    "#;

    fn legacy_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(LEGACY).unwrap();
        conn.execute_batch(TABLES).unwrap();
        conn
    }

    #[test]
    fn test_migrate_adds_columns_and_indexes_apply() {
        let conn = legacy_db();
        migrate(&conn).unwrap();

        let cols = table_columns(&conn, "patients").unwrap();
        assert!(cols.contains(&"address_city".to_string()));
        assert!(cols.contains(&"mobile".to_string()));
        assert!(conn.execute_batch(INDEXES).is_ok());
        assert_eq!(user_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_migrate_backfills_legacy_values() {
        let conn = legacy_db();
        migrate(&conn).unwrap();

        let (city, state, pin, mobile): (Option<String>, Option<String>, Option<String>, Option<String>) = conn
            .query_row(
                "SELECT address_city, address_state, address_pincode, mobile FROM patients WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .unwrap();
        assert_eq!(city.as_deref(), Some("Pune"));
        assert_eq!(state.as_deref(), Some("Maharashtra"));
        assert_eq!(pin.as_deref(), Some("411045"));
        assert_eq!(mobile.as_deref(), Some("9800000000"));

        // Unparseable address stays unstructured
        let city: Option<String> = conn
            .query_row("SELECT address_city FROM patients WHERE id = 2", [], |row| row.get(0))
            .unwrap();
        assert_eq!(city, None);
    }

    #[test]
    fn test_migrate_hashes_plaintext_passwords() {
        let conn = legacy_db();
        migrate(&conn).unwrap();

        let (plain, hash): (Option<String>, Option<String>) = conn
            .query_row("SELECT password, password_hash FROM clinics WHERE id = 1", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(plain, None);
        assert!(crate::auth::verify_password("plain-pw", &hash.unwrap()).unwrap());
    }

    #[test]
    fn test_migrate_renames_feedback_and_alert_columns() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(LEGACY).unwrap();
        conn.execute_batch(LEGACY_FEEDBACK).unwrap();
        conn.execute_batch(TABLES).unwrap();
        migrate(&conn).unwrap();

        let (review, recommend): (Option<String>, bool) = conn
            .query_row("SELECT review_text, would_recommend FROM patient_feedback", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(review.as_deref(), Some("Painless filling"));
        assert!(recommend);

        let alerts: Vec<(String, bool)> = conn
            .prepare("SELECT severity, is_read FROM smart_alerts ORDER BY id")
            .unwrap()
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(alerts, vec![("High".to_string(), false), ("Medium".to_string(), true)]);
        assert!(table_columns(&conn, "patient_analytics")
            .unwrap()
            .contains(&"treatment_success_rate".to_string()));
    }

    #[test]
    fn test_migrate_folds_email_case() {
        let conn = legacy_db();
        conn.execute_batch(
            "ALTER TABLE clinics ADD COLUMN email TEXT;
             UPDATE clinics SET email = ' Front@Smile.IN' WHERE id = 1;
             INSERT INTO clinics (clinic_code, name, login_id, password, email)
                 VALUES ('CLINIC0002', 'Smile Annex', 'USER002', 'pw2', 'front@smile.in');
             INSERT INTO clinics (clinic_code, name, login_id, password, email)
                 VALUES ('CLINIC0003', 'Bright', 'USER003', 'pw3', '');",
        )
        .unwrap();
        migrate(&conn).unwrap();

        let emails: Vec<Option<String>> = conn
            .prepare("SELECT email FROM clinics ORDER BY id")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(emails, vec![Some("front@smile.in".to_string()), None, None]);
        assert_eq!(user_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_legacy_file_with_mixed_case_emails_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(LEGACY).unwrap();
            conn.execute_batch(
                "ALTER TABLE clinics ADD COLUMN email TEXT;
                 UPDATE clinics SET email = 'A@x.in' WHERE id = 1;
                 INSERT INTO clinics (clinic_code, name, login_id, password, email)
                     VALUES ('CLINIC0002', 'Annex', 'USER002', 'pw2', 'a@x.in');",
            )
            .unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert!(db.request_password_reset("a@X.in").unwrap().is_some());
        assert!(db.login("USER001", "plain-pw").is_ok());
    }

    #[test]
    fn test_failed_migration_rolls_back() {
        let conn = legacy_db();
        conn.execute_batch(
            "CREATE TRIGGER reject_hash BEFORE UPDATE ON clinics
             BEGIN SELECT RAISE(ABORT, 'hashing refused'); END;",
        )
        .unwrap();
        assert!(migrate(&conn).is_err());

        assert_eq!(user_version(&conn).unwrap(), 0);
        assert!(!table_columns(&conn, "patients").unwrap().contains(&"address_city".to_string()));

        conn.execute_batch("DROP TRIGGER reject_hash").unwrap();
        migrate(&conn).unwrap();
        assert_eq!(user_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = legacy_db();
        migrate(&conn).unwrap();
        conn.pragma_update(None, "user_version", 0).unwrap();
        assert!(migrate(&conn).is_ok());
    }
}
