//! Patient feedback (`patient_feedback`).

use chrono::Utc;
use rusqlite::{params, Row};
use tracing::debug;

use super::patients::patient_row_id;
use super::{ledger_date_column, Database, DbResult};
use crate::models::{now_timestamp, ClinicSession, Feedback, NewFeedback};

const FEEDBACK_COLUMNS: &str = r#"
    id, clinic_id, patient_id, feedback_type, rating, review_text, sentiment_score,
    areas_for_improvement, COALESCE(would_recommend, 1), feedback_date, created_at
"#;

fn feedback_from_row(row: &Row<'_>) -> rusqlite::Result<Feedback> {
    let feedback_type: Option<String> = row.get(3)?;
    Ok(Feedback {
        id: row.get(0)?,
        clinic_id: row.get(1)?,
        patient_id: row.get(2)?,
        feedback_type: feedback_type.and_then(|t| t.parse().ok()).unwrap_or_default(),
        rating: row.get(4)?,
        review_text: row.get(5)?,
        sentiment_score: row.get(6)?,
        areas_for_improvement: row.get(7)?,
        would_recommend: row.get(8)?,
        feedback_date: ledger_date_column(row, 9, 10)?,
        created_at: row.get(10)?,
    })
}

impl Database {
    /// Store a review from a patient of the session's clinic.
    pub fn record_feedback(
        &self,
        session: &ClinicSession,
        patient_code: &str,
        feedback: &NewFeedback,
    ) -> DbResult<Feedback> {
        let feedback = feedback.normalized();
        feedback.validate()?;

        let patient_id = patient_row_id(&self.conn, session.clinic_id(), patient_code)?;
        let feedback_date = feedback.feedback_date.unwrap_or_else(|| Utc::now().date_naive());
        let created_at = now_timestamp();

        self.conn.execute(
            r#"
            INSERT INTO patient_feedback (
                clinic_id, patient_id, feedback_type, rating, review_text, sentiment_score,
                areas_for_improvement, would_recommend, feedback_date, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                session.clinic_id(),
                patient_id,
                feedback.feedback_type.as_str(),
                feedback.rating,
                feedback.review_text,
                feedback.sentiment_score,
                feedback.areas_for_improvement,
                feedback.would_recommend,
                feedback_date,
                created_at,
            ],
        )?;
        let id = self.conn.last_insert_rowid();

        debug!(feedback_id = id, patient_id, rating = ?feedback.rating, "recorded feedback");
        Ok(Feedback {
            id,
            clinic_id: session.clinic_id(),
            patient_id,
            feedback_type: feedback.feedback_type,
            rating: feedback.rating,
            review_text: feedback.review_text,
            sentiment_score: feedback.sentiment_score,
            areas_for_improvement: feedback.areas_for_improvement,
            would_recommend: feedback.would_recommend,
            feedback_date,
            created_at,
        })
    }

    /// The session clinic's feedback, most recent first.
    pub fn list_feedback(&self, session: &ClinicSession) -> DbResult<Vec<Feedback>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM patient_feedback WHERE clinic_id = ? ORDER BY feedback_date DESC, id DESC"
        ))?;
        let rows = stmt.query_map([session.clinic_id()], feedback_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::db::DbError;
    use crate::models::{ClinicRegistration, FeedbackType, PatientDetails};

    fn setup() -> (Database, ClinicSession, String) {
        let db = Database::open_in_memory().unwrap();
        let creds = db
            .register_clinic(&ClinicRegistration::new("Smile Dental", "front@smile.in"))
            .unwrap();
        let session = db.login(&creds.login_id, &creds.password).unwrap();
        let patient = db.add_patient(&session, &PatientDetails::new("Asha"), None).unwrap();
        (db, session, patient.patient_code)
    }

    #[test]
    fn test_record_and_list_feedback() {
        let (db, session, code) = setup();
        let mut older = NewFeedback::new(3);
        older.feedback_date = NaiveDate::from_ymd_opt(2024, 1, 5);
        older.would_recommend = false;
        older.areas_for_improvement = Some("Waiting time".into());
        let older = db.record_feedback(&session, &code, &older).unwrap();

        let mut newer = NewFeedback::new(5);
        newer.feedback_type = FeedbackType::Treatment;
        newer.sentiment_score = Some(0.9);
        newer.review_text = Some(" Painless root canal ".into());
        newer.feedback_date = NaiveDate::from_ymd_opt(2024, 2, 1);
        let newer = db.record_feedback(&session, &code, &newer).unwrap();
        assert_eq!(newer.review_text.as_deref(), Some("Painless root canal"));

        assert_eq!(db.list_feedback(&session).unwrap(), vec![newer, older]);
    }

    #[test]
    fn test_feedback_rejected() {
        let (db, session, code) = setup();
        assert!(matches!(
            db.record_feedback(&session, &code, &NewFeedback::new(9)),
            Err(DbError::Validation(_))
        ));
        assert!(matches!(
            db.record_feedback(&session, "CLINIC0001-P0404", &NewFeedback::new(4)),
            Err(DbError::NotFound(_))
        ));
        assert!(db.list_feedback(&session).unwrap().is_empty());
    }
}
