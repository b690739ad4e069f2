//! Comprehensive report: one row per patient visit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{escape_csv, opt_csv, ExportResult, ReportExporter};
use crate::db::parse_stored_date;
use crate::models::now_timestamp;

/// Patient columns plus one visit. Patients without visits get a single row
/// with the visit columns empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComprehensiveRow {
    pub patient_code: String,
    pub name: String,
    pub sex: Option<String>,
    pub age: Option<u32>,
    pub mobile: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub treatment: Option<String>,
    pub registered_at: String,
    pub visit_date: Option<NaiveDate>,
    pub diagnosis: Option<String>,
    pub treatment_given: Option<String>,
    pub treatment_cost: Option<f64>,
    pub satisfaction_rating: Option<u8>,
    pub doctor_assigned: Option<String>,
    pub payment_mode: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComprehensiveReport {
    pub clinic_id: i64,
    pub generated_at: String,
    pub rows: Vec<ComprehensiveRow>,
}

const CSV_HEADER: &str = "patient_code,name,sex,age,mobile,city,state,treatment,registered_at,\
visit_date,diagnosis,treatment_given,treatment_cost,satisfaction_rating,doctor_assigned,payment_mode\n";

impl ComprehensiveReport {
    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from(CSV_HEADER);
        for row in &self.rows {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}\n",
                escape_csv(&row.patient_code),
                escape_csv(&row.name),
                opt_csv(row.sex.as_deref()),
                row.age.map(|a| a.to_string()).unwrap_or_default(),
                opt_csv(row.mobile.as_deref()),
                opt_csv(row.city.as_deref()),
                opt_csv(row.state.as_deref()),
                opt_csv(row.treatment.as_deref()),
                escape_csv(&row.registered_at),
                row.visit_date.map(|d| d.to_string()).unwrap_or_default(),
                opt_csv(row.diagnosis.as_deref()),
                opt_csv(row.treatment_given.as_deref()),
                row.treatment_cost.map(|c| format!("{c:.2}")).unwrap_or_default(),
                row.satisfaction_rating.map(|r| r.to_string()).unwrap_or_default(),
                opt_csv(row.doctor_assigned.as_deref()),
                opt_csv(row.payment_mode.as_deref()),
            ));
        }
        csv
    }
}

impl<'a> ReportExporter<'a> {
    /// Every patient of the clinic joined with their visits, newest patient
    /// first and latest visit first within a patient.
    pub fn comprehensive_report(&self, clinic_id: i64) -> ExportResult<ComprehensiveReport> {
        let mut stmt = self.db.conn().prepare(
            r#"
            SELECT p.patient_code, p.name, p.sex, p.age, p.mobile,
                   p.address_city, p.address_state, p.treatment, p.created_at,
                   v.visit_date, v.diagnosis, v.treatment_given, v.treatment_cost,
                   v.satisfaction_rating, v.doctor_assigned, v.payment_mode
            FROM patients p
            LEFT JOIN patient_analytics v ON v.patient_id = p.id
            WHERE p.clinic_id = ?
            ORDER BY p.created_at DESC, p.id DESC, v.visit_date DESC, v.id DESC
            "#,
        )?;
        let rows = stmt
            .query_map([clinic_id], |row| {
                let visit_date: Option<String> = row.get(9)?;
                Ok(ComprehensiveRow {
                    patient_code: row.get(0)?,
                    name: row.get(1)?,
                    sex: row.get(2)?,
                    age: row.get(3)?,
                    mobile: row.get(4)?,
                    city: row.get(5)?,
                    state: row.get(6)?,
                    treatment: row.get(7)?,
                    registered_at: row.get(8)?,
                    visit_date: visit_date.as_deref().and_then(parse_stored_date),
                    diagnosis: row.get(10)?,
                    treatment_given: row.get(11)?,
                    treatment_cost: row.get(12)?,
                    satisfaction_rating: row.get(13)?,
                    doctor_assigned: row.get(14)?,
                    payment_mode: row.get(15)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ComprehensiveReport {
            clinic_id,
            generated_at: now_timestamp(),
            rows,
        })
    }
}
