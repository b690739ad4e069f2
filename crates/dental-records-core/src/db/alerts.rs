//! Dashboard alerts (`smart_alerts`).

use rusqlite::{params, Row};
use tracing::{debug, info};

use super::patients::patient_row_id;
use super::{Database, DbError, DbResult};
use crate::models::{now_timestamp, Alert, ClinicSession, NewAlert};

const ALERT_COLUMNS: &str = r#"
    id, clinic_id, COALESCE(alert_type, ''), COALESCE(alert_message, ''), severity,
    COALESCE(is_read, 0), COALESCE(action_required, 0), related_patient_id, created_at
"#;

fn alert_from_row(row: &Row<'_>) -> rusqlite::Result<Alert> {
    let severity: Option<String> = row.get(4)?;
    Ok(Alert {
        id: row.get(0)?,
        clinic_id: row.get(1)?,
        alert_type: row.get(2)?,
        message: row.get(3)?,
        severity: severity.and_then(|s| s.parse().ok()).unwrap_or_default(),
        is_read: row.get(5)?,
        action_required: row.get(6)?,
        related_patient_id: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl Database {
    /// Post an alert to the session clinic's dashboard.
    pub fn raise_alert(&self, session: &ClinicSession, alert: &NewAlert) -> DbResult<Alert> {
        let alert = alert.normalized();
        alert.validate()?;

        let related_patient_id = alert
            .patient_code
            .as_deref()
            .map(|code| patient_row_id(&self.conn, session.clinic_id(), code))
            .transpose()?;
        let created_at = now_timestamp();

        self.conn.execute(
            r#"
            INSERT INTO smart_alerts (
                clinic_id, alert_type, alert_message, severity, is_read,
                action_required, related_patient_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?7)
            "#,
            params![
                session.clinic_id(),
                alert.alert_type,
                alert.message,
                alert.severity.as_str(),
                alert.action_required,
                related_patient_id,
                created_at,
            ],
        )?;
        let id = self.conn.last_insert_rowid();

        info!(alert_id = id, severity = %alert.severity, alert_type = %alert.alert_type, "raised alert");
        Ok(Alert {
            id,
            clinic_id: session.clinic_id(),
            alert_type: alert.alert_type,
            message: alert.message,
            severity: alert.severity,
            is_read: false,
            action_required: alert.action_required,
            related_patient_id,
            created_at,
        })
    }

    /// Unread alerts of the session's clinic, newest first.
    pub fn active_alerts(&self, session: &ClinicSession, limit: u32) -> DbResult<Vec<Alert>> {
        self.unread_alerts(session.clinic_id(), limit)
    }

    pub(crate) fn unread_alerts(&self, clinic_id: i64, limit: u32) -> DbResult<Vec<Alert>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"SELECT {ALERT_COLUMNS} FROM smart_alerts
            WHERE clinic_id = ?1 AND COALESCE(is_read, 0) = 0
            ORDER BY created_at DESC, id DESC
            LIMIT ?2"#
        ))?;
        let rows = stmt.query_map(params![clinic_id, limit], alert_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Hide an alert from the dashboard.
    pub fn mark_alert_read(&self, session: &ClinicSession, alert_id: i64) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            "UPDATE smart_alerts SET is_read = 1 WHERE id = ?1 AND clinic_id = ?2",
            params![alert_id, session.clinic_id()],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("Alert {alert_id}")));
        }
        debug!(alert_id, "alert marked read");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertSeverity, ClinicRegistration, PatientDetails};

    fn clinic(db: &Database, name: &str, email: &str) -> ClinicSession {
        let creds = db.register_clinic(&ClinicRegistration::new(name, email)).unwrap();
        db.login(&creds.login_id, &creds.password).unwrap()
    }

    #[test]
    fn test_raise_list_and_read() {
        let db = Database::open_in_memory().unwrap();
        let session = clinic(&db, "Smile Dental", "front@smile.in");
        let patient = db.add_patient(&session, &PatientDetails::new("Asha"), None).unwrap();

        let first = db
            .raise_alert(&session, &NewAlert::new("Inventory Alert", "Low stock of dental supplies", AlertSeverity::Medium))
            .unwrap();
        let mut no_show = NewAlert::new("Patient Alert", "Missed two appointments", AlertSeverity::High);
        no_show.action_required = true;
        no_show.patient_code = Some(patient.patient_code.clone());
        let second = db.raise_alert(&session, &no_show).unwrap();
        assert_eq!(second.related_patient_id, Some(patient.id));

        let active = db.active_alerts(&session, 5).unwrap();
        assert_eq!(active, vec![second.clone(), first.clone()]);
        assert_eq!(db.active_alerts(&session, 1).unwrap(), vec![second.clone()]);

        db.mark_alert_read(&session, second.id).unwrap();
        assert_eq!(db.active_alerts(&session, 5).unwrap(), vec![first]);
    }

    #[test]
    fn test_alerts_scoped_to_clinic() {
        let db = Database::open_in_memory().unwrap();
        let a = clinic(&db, "Smile Dental", "front@smile.in");
        let b = clinic(&db, "Bright", "desk@bright.in");
        let patient = db.add_patient(&a, &PatientDetails::new("Asha"), None).unwrap();
        let alert = db
            .raise_alert(&a, &NewAlert::new("Revenue Alert", "Target reached", AlertSeverity::Low))
            .unwrap();

        assert!(db.active_alerts(&b, 5).unwrap().is_empty());
        assert!(matches!(db.mark_alert_read(&b, alert.id), Err(DbError::NotFound(_))));

        let mut foreign = NewAlert::new("Patient Alert", "Follow up", AlertSeverity::Medium);
        foreign.patient_code = Some(patient.patient_code);
        assert!(matches!(db.raise_alert(&b, &foreign), Err(DbError::NotFound(_))));
    }
}
