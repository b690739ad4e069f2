//! Financial report over the revenue ledger.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{escape_csv, opt_csv, ExportResult, ReportExporter};
use crate::db::parse_stored_date;
use crate::models::now_timestamp;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialRow {
    pub transaction_id: i64,
    pub transaction_date: Option<NaiveDate>,
    pub patient_code: Option<String>,
    pub patient_name: Option<String>,
    pub service_type: Option<String>,
    pub base_amount: f64,
    pub tax_amount: f64,
    pub discount_amount: f64,
    pub final_amount: f64,
    pub payment_method: Option<String>,
    pub payment_status: String,
}

/// Ledger rows newest first. Totals leave out refunded transactions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialReport {
    pub clinic_id: i64,
    pub generated_at: String,
    pub transactions: Vec<FinancialRow>,
    pub total_revenue: f64,
    pub transaction_count: usize,
}

impl FinancialReport {
    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        // Header
        csv.push_str(
            "transaction_id,transaction_date,patient_code,patient_name,service_type,\
base_amount,tax_amount,discount_amount,final_amount,payment_method,payment_status\n",
        );

        for row in &self.transactions {
            csv.push_str(&format!(
                "{},{},{},{},{},{:.2},{:.2},{:.2},{:.2},{},{}\n",
                row.transaction_id,
                row.transaction_date.map(|d| d.to_string()).unwrap_or_default(),
                opt_csv(row.patient_code.as_deref()),
                opt_csv(row.patient_name.as_deref()),
                opt_csv(row.service_type.as_deref()),
                row.base_amount,
                row.tax_amount,
                row.discount_amount,
                row.final_amount,
                opt_csv(row.payment_method.as_deref()),
                escape_csv(&row.payment_status),
            ));
        }
        csv
    }
}

impl<'a> ReportExporter<'a> {
    pub fn financial_report(&self, clinic_id: i64) -> ExportResult<FinancialReport> {
        let mut stmt = self.db.conn().prepare(
            r#"
            SELECT r.id, r.transaction_date, p.patient_code, p.name, r.service_type,
                   COALESCE(r.base_amount, 0), COALESCE(r.tax_amount, 0),
                   COALESCE(r.discount_amount, 0), COALESCE(r.final_amount, 0),
                   r.payment_method, COALESCE(r.payment_status, 'Completed')
            FROM revenue_analytics r
            LEFT JOIN patients p ON p.id = r.patient_id
            WHERE r.clinic_id = ?
            ORDER BY r.transaction_date DESC, r.id DESC
            "#,
        )?;
        let transactions = stmt
            .query_map([clinic_id], |row| {
                let date: Option<String> = row.get(1)?;
                Ok(FinancialRow {
                    transaction_id: row.get(0)?,
                    transaction_date: date.as_deref().and_then(parse_stored_date),
                    patient_code: row.get(2)?,
                    patient_name: row.get(3)?,
                    service_type: row.get(4)?,
                    base_amount: row.get(5)?,
                    tax_amount: row.get(6)?,
                    discount_amount: row.get(7)?,
                    final_amount: row.get(8)?,
                    payment_method: row.get(9)?,
                    payment_status: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let total_revenue: f64 = transactions
            .iter()
            .filter(|t| t.payment_status != "Refunded")
            .map(|t| t.final_amount)
            .sum();
        Ok(FinancialReport {
            clinic_id,
            generated_at: now_timestamp(),
            transaction_count: transactions.len(),
            total_revenue,
            transactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{ClinicRegistration, NewRevenue, PatientDetails, PaymentMethod, PaymentStatus};

    #[test]
    fn test_financial_report() {
        let db = Database::open_in_memory().unwrap();
        let creds = db
            .register_clinic(&ClinicRegistration::new("Smile", "a@smile.in"))
            .unwrap();
        let session = db.login(&creds.login_id, &creds.password).unwrap();
        let patient = db.add_patient(&session, &PatientDetails::new("Asha"), None).unwrap();

        let mut crown = NewRevenue::new("Crown", 1000.0);
        crown.tax_amount = 180.0;
        crown.payment_method = Some(PaymentMethod::Upi);
        crown.transaction_date = NaiveDate::from_ymd_opt(2024, 3, 1);
        db.record_payment(&session, &patient.patient_code, &crown).unwrap();

        let mut refund = NewRevenue::new("Cleaning", 300.0);
        refund.payment_status = PaymentStatus::Refunded;
        refund.transaction_date = NaiveDate::from_ymd_opt(2024, 3, 2);
        db.record_payment(&session, &patient.patient_code, &refund).unwrap();

        let report = ReportExporter::new(&db).financial_report(session.clinic_id()).unwrap();
        assert_eq!(report.transaction_count, 2);
        assert_eq!(report.total_revenue, 1180.0);
        assert_eq!(report.transactions[0].payment_status, "Refunded");
        assert_eq!(report.transactions[1].patient_name.as_deref(), Some("Asha"));

        let csv = report.to_csv();
        assert!(csv.contains(",Crown,1000.00,180.00,0.00,1180.00,UPI,Completed\n"));
    }
}
