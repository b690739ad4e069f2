//! Visit ledger (`patient_analytics`).

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use tracing::debug;

use super::patients::patient_row_id;
use super::revenue::insert_revenue;
use super::{classify_constraint, ledger_date_column, Database, DbResult};
use crate::models::{now_timestamp, ClinicSession, NewRevenue, NewVisit, PaymentStatus, Visit};

const VISIT_COLUMNS: &str = r#"
    id, clinic_id, patient_id, visit_date, symptoms, diagnosis, treatment_given,
    COALESCE(treatment_cost, 0), satisfaction_rating, doctor_assigned,
    pain_level_before, pain_level_after, payment_mode, created_at, treatment_success_rate
"#;

fn visit_from_row(row: &Row<'_>) -> rusqlite::Result<Visit> {
    let payment_mode: Option<String> = row.get(12)?;
    Ok(Visit {
        id: row.get(0)?,
        clinic_id: row.get(1)?,
        patient_id: row.get(2)?,
        visit_date: ledger_date_column(row, 3, 13)?,
        symptoms: row.get(4)?,
        diagnosis: row.get(5)?,
        treatment_given: row.get(6)?,
        treatment_cost: row.get(7)?,
        satisfaction_rating: row.get(8)?,
        doctor_assigned: row.get(9)?,
        pain_level_before: row.get(10)?,
        pain_level_after: row.get(11)?,
        payment_mode: payment_mode.and_then(|m| m.parse().ok()),
        treatment_success_rate: row.get(14)?,
        created_at: row.get(13)?,
    })
}

/// Insert a validated visit. A billable visit also gets a revenue row.
///
/// Takes a bare connection so callers can include it in their transaction.
pub(crate) fn insert_visit(
    conn: &Connection,
    clinic_id: i64,
    patient_id: i64,
    visit: &NewVisit,
    today: NaiveDate,
) -> DbResult<Visit> {
    let visit_date = visit.visit_date.unwrap_or(today);
    let created_at = now_timestamp();

    conn.execute(
        r#"
        INSERT INTO patient_analytics (
            clinic_id, patient_id, visit_date, symptoms, diagnosis, treatment_given,
            treatment_cost, satisfaction_rating, doctor_assigned,
            pain_level_before, pain_level_after, payment_mode, created_at, treatment_success_rate
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
        params![
            clinic_id,
            patient_id,
            visit_date,
            visit.symptoms,
            visit.diagnosis,
            visit.treatment_given,
            visit.treatment_cost,
            visit.satisfaction_rating,
            visit.doctor_assigned,
            visit.pain_level_before,
            visit.pain_level_after,
            visit.payment_mode.map(|m| m.as_str()),
            created_at,
            visit.treatment_success_rate,
        ],
    )
    .map_err(|e| classify_constraint(e, "Duplicate visit"))?;
    let visit_id = conn.last_insert_rowid();

    if visit.treatment_cost > 0.0 {
        let charge = NewRevenue {
            transaction_date: Some(visit_date),
            visit_id: Some(visit_id),
            service_type: visit.treatment_given.clone().or_else(|| visit.diagnosis.clone()),
            base_amount: visit.treatment_cost,
            tax_amount: 0.0,
            discount_amount: 0.0,
            payment_method: visit.payment_mode,
            payment_status: PaymentStatus::Completed,
        };
        insert_revenue(conn, clinic_id, Some(patient_id), &charge, today)?;
    }

    Ok(Visit {
        id: visit_id,
        clinic_id,
        patient_id,
        visit_date,
        symptoms: visit.symptoms.clone(),
        diagnosis: visit.diagnosis.clone(),
        treatment_given: visit.treatment_given.clone(),
        treatment_cost: visit.treatment_cost,
        satisfaction_rating: visit.satisfaction_rating,
        doctor_assigned: visit.doctor_assigned.clone(),
        pain_level_before: visit.pain_level_before,
        pain_level_after: visit.pain_level_after,
        payment_mode: visit.payment_mode,
        treatment_success_rate: visit.treatment_success_rate,
        created_at,
    })
}

impl Database {
    /// Record a visit for a patient of the session's clinic.
    pub fn record_visit(&self, session: &ClinicSession, patient_code: &str, visit: &NewVisit) -> DbResult<Visit> {
        let visit = visit.normalized();
        visit.validate()?;

        let patient_id = patient_row_id(&self.conn, session.clinic_id(), patient_code)?;
        let tx = self.write_transaction()?;
        let stored = insert_visit(&tx, session.clinic_id(), patient_id, &visit, Utc::now().date_naive())?;
        tx.commit()?;

        debug!(visit_id = stored.id, patient_id, cost = stored.treatment_cost, "recorded visit");
        Ok(stored)
    }

    /// Visits of one patient, most recent first.
    pub fn list_visits(&self, session: &ClinicSession, patient_code: &str) -> DbResult<Vec<Visit>> {
        let patient_id = patient_row_id(&self.conn, session.clinic_id(), patient_code)?;
        self.visits_for_patient(patient_id)
    }

    pub(crate) fn visits_for_patient(&self, patient_id: i64) -> DbResult<Vec<Visit>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {VISIT_COLUMNS} FROM patient_analytics WHERE patient_id = ? ORDER BY visit_date DESC, id DESC"
        ))?;
        let rows = stmt.query_map([patient_id], visit_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
