//! Appointment book.

use chrono::{Local, NaiveDateTime};
use rusqlite::{params, Row};
use tracing::debug;

use super::patients::patient_row_id;
use super::{datetime_column, Database, DbError, DbResult};
use crate::models::{clean_text, now_timestamp, Appointment, AppointmentStatus, ClinicSession};

const APPOINTMENT_SELECT: &str = r#"
    SELECT a.id, a.clinic_id, a.patient_id, p.patient_code, a.appointment_date,
           a.treatment_type, a.notes, a.status, a.created_at
    FROM appointments a
    JOIN patients p ON p.id = a.patient_id
"#;

/// Stored form of an appointment time.
const APPOINTMENT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    let status: Option<String> = row.get(7)?;
    Ok(Appointment {
        id: row.get(0)?,
        clinic_id: row.get(1)?,
        patient_id: row.get(2)?,
        patient_code: row.get(3)?,
        scheduled_for: datetime_column(row, 4)?,
        treatment_type: row.get(5)?,
        notes: row.get(6)?,
        status: status.and_then(|s| s.parse().ok()).unwrap_or_default(),
        created_at: row.get(8)?,
    })
}

impl Database {
    /// Book an appointment for a patient of the session's clinic.
    pub fn schedule_appointment(
        &self,
        session: &ClinicSession,
        patient_code: &str,
        scheduled_for: NaiveDateTime,
        treatment_type: Option<String>,
        notes: Option<String>,
    ) -> DbResult<Appointment> {
        let patient_id = patient_row_id(&self.conn, session.clinic_id(), patient_code)?;
        let treatment_type = clean_text(treatment_type);
        let notes = clean_text(notes);
        let created_at = now_timestamp();
        let status = AppointmentStatus::Scheduled;

        self.conn.execute(
            r#"
            INSERT INTO appointments (
                clinic_id, patient_id, appointment_date, treatment_type, notes, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                session.clinic_id(),
                patient_id,
                scheduled_for.format(APPOINTMENT_FORMAT).to_string(),
                treatment_type,
                notes,
                status.as_str(),
                created_at,
            ],
        )?;
        let id = self.conn.last_insert_rowid();

        debug!(appointment_id = id, patient_id, %scheduled_for, "scheduled appointment");
        Ok(Appointment {
            id,
            clinic_id: session.clinic_id(),
            patient_id,
            patient_code: patient_code.trim().to_string(),
            scheduled_for,
            treatment_type,
            notes,
            status,
            created_at,
        })
    }

    /// Move an appointment of the session's clinic to `status`.
    pub fn set_appointment_status(
        &self,
        session: &ClinicSession,
        appointment_id: i64,
        status: AppointmentStatus,
    ) -> DbResult<Appointment> {
        let rows_affected = self.conn.execute(
            "UPDATE appointments SET status = ?3 WHERE id = ?1 AND clinic_id = ?2",
            params![appointment_id, session.clinic_id(), status.as_str()],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("Appointment {appointment_id}")));
        }

        self.conn
            .query_row(
                &format!("{APPOINTMENT_SELECT} WHERE a.id = ?"),
                [appointment_id],
                appointment_from_row,
            )
            .map_err(Into::into)
    }

    /// The session clinic's appointments.
    ///
    /// With `upcoming_only`, only still-scheduled appointments from now on,
    /// soonest first; otherwise everything, latest first.
    pub fn list_appointments(&self, session: &ClinicSession, upcoming_only: bool) -> DbResult<Vec<Appointment>> {
        let rows = if upcoming_only {
            let now = Local::now().naive_local().format(APPOINTMENT_FORMAT).to_string();
            let mut stmt = self.conn.prepare(&format!(
                r#"{APPOINTMENT_SELECT}
                WHERE a.clinic_id = ?1 AND a.status = ?2 AND a.appointment_date >= ?3
                ORDER BY a.appointment_date ASC, a.id ASC"#
            ))?;
            let rows = stmt.query_map(
                params![session.clinic_id(), AppointmentStatus::Scheduled.as_str(), now],
                appointment_from_row,
            )?;
            rows.collect::<Result<Vec<_>, _>>()?
        } else {
            let mut stmt = self.conn.prepare(&format!(
                "{APPOINTMENT_SELECT} WHERE a.clinic_id = ? ORDER BY a.appointment_date DESC, a.id DESC"
            ))?;
            let rows = stmt.query_map([session.clinic_id()], appointment_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        Ok(rows)
    }

    pub(crate) fn appointments_for_patient(&self, patient_id: i64) -> DbResult<Vec<Appointment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{APPOINTMENT_SELECT} WHERE a.patient_id = ? ORDER BY a.appointment_date DESC, a.id DESC"
        ))?;
        let rows = stmt.query_map([patient_id], appointment_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
