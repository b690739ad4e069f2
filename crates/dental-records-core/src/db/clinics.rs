//! Clinic registration, login and password management.

use chrono::{Duration, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, info, warn};

use super::{classify_constraint, next_sequence_value, Database, DbError, DbResult, SequenceKey};
use crate::auth::{
    derive_login_id, format_clinic_code, generate_password, generate_reset_token, hash_password,
    hash_token, verify_password,
};
use crate::models::{
    clean_text, now_timestamp, Clinic, ClinicCredentials, ClinicRegistration, ClinicSession,
    PasswordResetTicket, ValidationError,
};

const CLINIC_COLUMNS: &str =
    "id, clinic_code, login_id, name, location, incharge, email, phone, created_at";

fn clinic_from_row(row: &Row<'_>) -> rusqlite::Result<Clinic> {
    Ok(Clinic {
        id: row.get(0)?,
        clinic_code: row.get(1)?,
        login_id: row.get(2)?,
        name: row.get(3)?,
        location: row.get(4)?,
        incharge: row.get(5)?,
        email: row.get(6)?,
        phone: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl Database {
    /// Register a clinic and hand back its generated credentials.
    ///
    /// The plaintext password appears only in the returned value.
    pub fn register_clinic(&self, registration: &ClinicRegistration) -> DbResult<ClinicCredentials> {
        let reg = registration.normalized();
        reg.validate()?;

        let taken: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM clinics WHERE email = ?)",
            [&reg.email],
            |row| row.get(0),
        )?;
        if taken {
            return Err(DbError::Conflict("Email already registered".into()));
        }

        let password = generate_password();
        let password_hash = hash_password(&password)?;

        let tx = self.write_transaction()?;
        let number = next_sequence_value(&tx, SequenceKey::Clinic)?;
        let clinic_code = format_clinic_code(number);
        let login_id = derive_login_id(&reg.name, number);

        tx.execute(
            r#"
            INSERT INTO clinics (
                clinic_code, login_id, password_hash, name, location,
                incharge, email, phone, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                clinic_code,
                login_id,
                password_hash,
                reg.name,
                reg.location,
                reg.incharge,
                reg.email,
                reg.phone,
                now_timestamp(),
            ],
        )
        .map_err(|e| classify_constraint(e, "Clinic code, login ID or email already in use"))?;
        let clinic_id = tx.last_insert_rowid();
        tx.commit()?;

        info!(%clinic_code, %login_id, "registered clinic");
        Ok(ClinicCredentials {
            clinic_id,
            clinic_code,
            login_id,
            password,
        })
    }

    /// Check credentials and open a session.
    ///
    /// An unknown login ID and a wrong password fail identically.
    pub fn login(&self, login_id: &str, password: &str) -> DbResult<ClinicSession> {
        let login_id = login_id.trim();
        if login_id.is_empty() {
            return Err(ValidationError::MissingField("Login ID").into());
        }
        if password.is_empty() {
            return Err(ValidationError::MissingField("Password").into());
        }

        let row: Option<(i64, String, String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT id, clinic_code, name, password_hash FROM clinics WHERE login_id = ?",
                [login_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((clinic_id, clinic_code, clinic_name, Some(stored_hash))) = row else {
            warn!(login_id, "login rejected");
            return Err(DbError::InvalidCredentials);
        };
        if !verify_password(password, &stored_hash)? {
            warn!(login_id, "login rejected");
            return Err(DbError::InvalidCredentials);
        }

        let patient_count = self.count_patients(clinic_id)?;
        debug!(%clinic_code, patient_count, "login accepted");
        Ok(ClinicSession::new(clinic_id, clinic_code, clinic_name, patient_count))
    }

    /// Start a password reset for the clinic registered under `email`.
    ///
    /// Returns `None` for an unknown email, so callers can answer the same
    /// way whether or not the address exists.
    pub fn request_password_reset(&self, email: &str) -> DbResult<Option<PasswordResetTicket>> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(ValidationError::MissingField("Email").into());
        }

        let clinic: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT id, name FROM clinics WHERE email = ?",
                [&email],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((clinic_id, clinic_name)) = clinic else {
            debug!("password reset requested for unknown email");
            return Ok(None);
        };

        let token = generate_reset_token();
        let expires_at = (Utc::now() + Duration::minutes(self.config.reset_token_ttl_minutes))
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        self.conn.execute(
            "UPDATE clinics SET reset_token_hash = ?2, reset_expires_at = ?3 WHERE id = ?1",
            params![clinic_id, hash_token(&token), expires_at],
        )?;

        info!(clinic_id, "password reset requested");
        Ok(Some(PasswordResetTicket {
            clinic_id,
            clinic_name,
            token,
            expires_at,
        }))
    }

    /// Set a new password using a reset token. Tokens work once and expire.
    ///
    /// An unknown, used, or expired token yields [`DbError::InvalidCredentials`].
    pub fn reset_password(&self, token: &str, new_password: &str, confirm: &str) -> DbResult<()> {
        self.check_new_password(new_password, confirm)?;

        let clinic_id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM clinics WHERE reset_token_hash = ?1 AND reset_expires_at > ?2",
                params![hash_token(token.trim()), now_timestamp()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(clinic_id) = clinic_id else {
            warn!("invalid or expired password reset token");
            return Err(DbError::InvalidCredentials);
        };

        self.conn.execute(
            r#"
            UPDATE clinics SET
                password_hash = ?2,
                reset_token_hash = NULL,
                reset_expires_at = NULL
            WHERE id = ?1
            "#,
            params![clinic_id, hash_password(new_password)?],
        )?;
        info!(clinic_id, "password reset completed");
        Ok(())
    }

    /// Change the session clinic's password after verifying the current one.
    pub fn change_password(&self, session: &ClinicSession, current: &str, new_password: &str) -> DbResult<()> {
        self.check_new_password(new_password, new_password)?;

        let stored: Option<String> = self
            .conn
            .query_row(
                "SELECT password_hash FROM clinics WHERE id = ?",
                [session.clinic_id()],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten();
        let verified = match stored {
            Some(hash) => verify_password(current, &hash)?,
            None => false,
        };
        if !verified {
            warn!(clinic_id = session.clinic_id(), "password change rejected");
            return Err(DbError::InvalidCredentials);
        }

        self.conn.execute(
            "UPDATE clinics SET password_hash = ?2 WHERE id = ?1",
            params![session.clinic_id(), hash_password(new_password)?],
        )?;
        info!(clinic_id = session.clinic_id(), "password changed");
        Ok(())
    }

    fn check_new_password(&self, new_password: &str, confirm: &str) -> Result<(), ValidationError> {
        let min = self.config.min_password_length;
        if new_password.chars().count() < min {
            return Err(ValidationError::PasswordTooShort(min));
        }
        if new_password != confirm {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(())
    }

    /// Get a clinic by row ID.
    pub fn get_clinic(&self, clinic_id: i64) -> DbResult<Option<Clinic>> {
        self.conn
            .query_row(
                &format!("SELECT {CLINIC_COLUMNS} FROM clinics WHERE id = ?"),
                [clinic_id],
                clinic_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// All clinics in registration order.
    pub fn list_clinics(&self) -> DbResult<Vec<Clinic>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {CLINIC_COLUMNS} FROM clinics ORDER BY id"))?;
        let rows = stmt.query_map([], clinic_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Update the session clinic's contact details. `None` clears a field.
    pub fn update_clinic_contact(
        &self,
        session: &ClinicSession,
        location: Option<String>,
        incharge: Option<String>,
        phone: Option<String>,
    ) -> DbResult<Clinic> {
        self.conn.execute(
            "UPDATE clinics SET location = ?2, incharge = ?3, phone = ?4 WHERE id = ?1",
            params![
                session.clinic_id(),
                clean_text(location),
                clean_text(incharge),
                clean_text(phone),
            ],
        )?;
        self.get_clinic(session.clinic_id())?
            .ok_or_else(|| DbError::NotFound(format!("Clinic {}", session.clinic_code())))
    }
}
