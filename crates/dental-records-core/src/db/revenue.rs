//! Revenue ledger (`revenue_analytics`).

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use super::patients::patient_row_id;
use super::{classify_constraint, ledger_date_column, Database, DbError, DbResult};
use crate::models::{now_timestamp, ClinicSession, NewRevenue, RevenueRecord};

const REVENUE_COLUMNS: &str = r#"
    id, clinic_id, patient_id, visit_id, transaction_date, service_type,
    COALESCE(base_amount, 0), COALESCE(tax_amount, 0), COALESCE(discount_amount, 0),
    COALESCE(final_amount, 0), payment_method, payment_status, created_at
"#;

fn revenue_from_row(row: &Row<'_>) -> rusqlite::Result<RevenueRecord> {
    let method: Option<String> = row.get(10)?;
    let status: Option<String> = row.get(11)?;
    Ok(RevenueRecord {
        id: row.get(0)?,
        clinic_id: row.get(1)?,
        patient_id: row.get(2)?,
        visit_id: row.get(3)?,
        transaction_date: ledger_date_column(row, 4, 12)?,
        service_type: row.get(5)?,
        base_amount: row.get(6)?,
        tax_amount: row.get(7)?,
        discount_amount: row.get(8)?,
        final_amount: row.get(9)?,
        payment_method: method.and_then(|m| m.parse().ok()),
        payment_status: status.and_then(|s| s.parse().ok()).unwrap_or_default(),
        created_at: row.get(12)?,
    })
}

/// Insert a validated transaction, computing the final amount.
pub(crate) fn insert_revenue(
    conn: &Connection,
    clinic_id: i64,
    patient_id: Option<i64>,
    revenue: &NewRevenue,
    today: NaiveDate,
) -> DbResult<RevenueRecord> {
    let transaction_date = revenue.transaction_date.unwrap_or(today);
    let final_amount = revenue.final_amount();
    let created_at = now_timestamp();

    conn.execute(
        r#"
        INSERT INTO revenue_analytics (
            clinic_id, patient_id, visit_id, transaction_date, service_type,
            base_amount, tax_amount, discount_amount, final_amount,
            payment_method, payment_status, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
        params![
            clinic_id,
            patient_id,
            revenue.visit_id,
            transaction_date,
            revenue.service_type,
            revenue.base_amount,
            revenue.tax_amount,
            revenue.discount_amount,
            final_amount,
            revenue.payment_method.map(|m| m.as_str()),
            revenue.payment_status.as_str(),
            created_at,
        ],
    )
    .map_err(|e| classify_constraint(e, "Duplicate transaction"))?;

    Ok(RevenueRecord {
        id: conn.last_insert_rowid(),
        clinic_id,
        patient_id,
        visit_id: revenue.visit_id,
        transaction_date,
        service_type: revenue.service_type.clone(),
        base_amount: revenue.base_amount,
        tax_amount: revenue.tax_amount,
        discount_amount: revenue.discount_amount,
        final_amount,
        payment_method: revenue.payment_method,
        payment_status: revenue.payment_status,
        created_at,
    })
}

impl Database {
    /// Record a payment from a patient of the session's clinic.
    ///
    /// A `visit_id`, when given, must belong to the same patient.
    pub fn record_payment(
        &self,
        session: &ClinicSession,
        patient_code: &str,
        revenue: &NewRevenue,
    ) -> DbResult<RevenueRecord> {
        let revenue = revenue.normalized();
        revenue.validate()?;

        let patient_id = patient_row_id(&self.conn, session.clinic_id(), patient_code)?;
        if let Some(visit_id) = revenue.visit_id {
            let owned: Option<i64> = self
                .conn
                .query_row(
                    "SELECT id FROM patient_analytics WHERE id = ?1 AND patient_id = ?2",
                    params![visit_id, patient_id],
                    |row| row.get(0),
                )
                .optional()?;
            if owned.is_none() {
                return Err(DbError::NotFound(format!("Visit {visit_id}")));
            }
        }

        let record = insert_revenue(
            &self.conn,
            session.clinic_id(),
            Some(patient_id),
            &revenue,
            Utc::now().date_naive(),
        )?;
        info!(
            transaction_id = record.id,
            amount = record.final_amount,
            status = record.payment_status.as_str(),
            "recorded payment"
        );
        Ok(record)
    }

    /// The session clinic's ledger, most recent first.
    pub fn list_revenue(&self, session: &ClinicSession) -> DbResult<Vec<RevenueRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REVENUE_COLUMNS} FROM revenue_analytics WHERE clinic_id = ? ORDER BY transaction_date DESC, id DESC"
        ))?;
        let rows = stmt.query_map([session.clinic_id()], revenue_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Payments of one patient, most recent first.
    pub fn list_patient_revenue(&self, session: &ClinicSession, patient_code: &str) -> DbResult<Vec<RevenueRecord>> {
        let patient_id = patient_row_id(&self.conn, session.clinic_id(), patient_code)?;
        self.revenue_for_patient(patient_id)
    }

    pub(crate) fn revenue_for_patient(&self, patient_id: i64) -> DbResult<Vec<RevenueRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REVENUE_COLUMNS} FROM revenue_analytics WHERE patient_id = ? ORDER BY transaction_date DESC, id DESC"
        ))?;
        let rows = stmt.query_map([patient_id], revenue_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClinicRegistration, NewVisit, PatientDetails, PaymentMethod, PaymentStatus, ValidationError};

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
    fn test_record_payment_computes_final_amount() {
        let (db, session, code) = setup();
        let mut payment = NewRevenue::new("Crown", 10_000.0);
        payment.tax_amount = 1_800.0;
        payment.discount_amount = 500.0;
        payment.payment_method = Some(PaymentMethod::Card);
        payment.transaction_date = NaiveDate::from_ymd_opt(2024, 5, 2);

        let record = db.record_payment(&session, &code, &payment).unwrap();
        assert_eq!(record.final_amount, 11_300.0);

        let stored = db.list_patient_revenue(&session, &code).unwrap();
        assert_eq!(stored, vec![record]);
    }

    #[test]
    fn test_discount_over_bill_rejected() {
        let (db, session, code) = setup();
        let mut payment = NewRevenue::new("Cleaning", 100.0);
        payment.discount_amount = 200.0;
        assert!(matches!(
            db.record_payment(&session, &code, &payment),
            Err(DbError::Validation(ValidationError::DiscountExceedsTotal { .. }))
        ));
        assert!(db.list_revenue(&session).unwrap().is_empty());
    }

    #[test]
    fn test_payment_against_visit() {
        let (db, session, code) = setup();
        let visit = db.record_visit(&session, &code, &NewVisit::new("Caries", 0.0)).unwrap();

        let mut payment = NewRevenue::new("Filling", 1_200.0);
        payment.visit_id = Some(visit.id);
        payment.payment_status = PaymentStatus::Pending;
        let record = db.record_payment(&session, &code, &payment).unwrap();
        assert_eq!(record.visit_id, Some(visit.id));
        assert_eq!(record.payment_status, PaymentStatus::Pending);

        payment.visit_id = Some(visit.id + 100);
        assert!(matches!(
            db.record_payment(&session, &code, &payment),
            Err(DbError::NotFound(_))
        ));
    }
}
