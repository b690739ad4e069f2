//! Patient database operations.
//!
//! Every query is scoped by the session's clinic, so a patient code owned by
//! another clinic behaves exactly like a code that does not exist.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use strsim::jaro_winkler;
use tracing::{debug, info};

use super::{
    classify_constraint, next_sequence_value, optional_date_column, Database, DbError, DbResult,
    SequenceKey,
};
use crate::models::{
    format_patient_code, now_timestamp, Address, ClinicSession, MedicalProfile, NewVisit, Patient,
    PatientDetail, PatientDetails, PatientPatch, PatientSummary, SearchField,
};

/// Minimum Jaro-Winkler similarity for a "did you mean" suggestion.
pub const SUGGESTION_THRESHOLD: f64 = 0.80;

const PATIENT_COLUMNS: &str = r#"
    id, clinic_id, patient_code, name, sex, age, dob, mobile, email,
    address_village_town, address_city, address_state, address_pincode,
    emergency_contact_name, emergency_contact_phone,
    medical_history, current_medications, allergies, previous_dental_work,
    chief_complaint, pain_level, last_cleaning_date,
    insurance_provider, insurance_number, treatment, preferred_doctor,
    status, created_at, updated_at
"#;

const SUMMARY_COLUMNS: &str = "patient_code, name, sex, age, mobile, treatment, created_at";

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    let sex: Option<String> = row.get(4)?;
    let status: Option<String> = row.get(26)?;
    Ok(Patient {
        id: row.get(0)?,
        clinic_id: row.get(1)?,
        patient_code: row.get(2)?,
        details: PatientDetails {
            name: row.get(3)?,
            sex: sex.and_then(|s| s.parse().ok()),
            age: row.get(5)?,
            dob: optional_date_column(row, 6)?,
            mobile: row.get(7)?,
            email: row.get(8)?,
            address: Address {
                village_town: row.get(9)?,
                city: row.get(10)?,
                state: row.get(11)?,
                pincode: row.get(12)?,
            },
            emergency_contact_name: row.get(13)?,
            emergency_contact_phone: row.get(14)?,
            medical: MedicalProfile {
                medical_history: row.get(15)?,
                current_medications: row.get(16)?,
                allergies: row.get(17)?,
                previous_dental_work: row.get(18)?,
                chief_complaint: row.get(19)?,
                pain_level: row.get(20)?,
                last_cleaning_date: optional_date_column(row, 21)?,
            },
            insurance_provider: row.get(22)?,
            insurance_number: row.get(23)?,
            treatment: row.get(24)?,
            preferred_doctor: row.get(25)?,
            status: status.and_then(|s| s.parse().ok()).unwrap_or_default(),
        },
        created_at: row.get(27)?,
        updated_at: row.get(28)?,
    })
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<PatientSummary> {
    let sex: Option<String> = row.get(2)?;
    Ok(PatientSummary {
        patient_code: row.get(0)?,
        name: row.get(1)?,
        sex: sex.and_then(|s| s.parse().ok()),
        age: row.get(3)?,
        mobile: row.get(4)?,
        treatment: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Row ID of `patient_code` within `clinic_id`, or `NotFound`.
pub(crate) fn patient_row_id(conn: &Connection, clinic_id: i64, patient_code: &str) -> DbResult<i64> {
    conn.query_row(
        "SELECT id FROM patients WHERE clinic_id = ?1 AND patient_code = ?2",
        params![clinic_id, patient_code.trim()],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| not_found(patient_code))
}

fn not_found(patient_code: &str) -> DbError {
    DbError::NotFound(format!("Patient {}", patient_code.trim()))
}

impl Database {
    /// Register a patient under the session's clinic, optionally recording
    /// the first visit in the same transaction.
    pub fn add_patient(
        &self,
        session: &ClinicSession,
        details: &PatientDetails,
        initial_visit: Option<&NewVisit>,
    ) -> DbResult<Patient> {
        let today = Utc::now().date_naive();
        let details = details.normalized(today);
        details.validate()?;
        let visit = initial_visit.map(NewVisit::normalized);
        if let Some(visit) = &visit {
            visit.validate()?;
        }

        let clinic_id = session.clinic_id();
        let tx = self.write_transaction()?;
        let number = next_sequence_value(&tx, SequenceKey::Patient { clinic_id })?;
        let patient_code = format_patient_code(session.clinic_code(), number);
        let now = now_timestamp();

        tx.execute(
            r#"
            INSERT INTO patients (
                clinic_id, patient_code, name, sex, age, dob, mobile, email,
                address_village_town, address_city, address_state, address_pincode,
                emergency_contact_name, emergency_contact_phone,
                medical_history, current_medications, allergies, previous_dental_work,
                chief_complaint, pain_level, last_cleaning_date,
                insurance_provider, insurance_number, treatment, preferred_doctor,
                status, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?27
            )
            "#,
            params![
                clinic_id,
                patient_code,
                details.name,
                details.sex.map(|s| s.as_str()),
                details.age,
                details.dob,
                details.mobile,
                details.email,
                details.address.village_town,
                details.address.city,
                details.address.state,
                details.address.pincode,
                details.emergency_contact_name,
                details.emergency_contact_phone,
                details.medical.medical_history,
                details.medical.current_medications,
                details.medical.allergies,
                details.medical.previous_dental_work,
                details.medical.chief_complaint,
                details.medical.pain_level,
                details.medical.last_cleaning_date,
                details.insurance_provider,
                details.insurance_number,
                details.treatment,
                details.preferred_doctor,
                details.status.as_str(),
                now,
            ],
        )
        .map_err(|e| classify_constraint(e, "Patient code already in use"))?;
        let patient_id = tx.last_insert_rowid();

        if let Some(visit) = &visit {
            super::visits::insert_visit(&tx, clinic_id, patient_id, visit, today)?;
        }
        tx.commit()?;

        info!(%patient_code, clinic_id, with_visit = visit.is_some(), "added patient");
        Ok(Patient {
            id: patient_id,
            clinic_id,
            patient_code,
            details,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Get a patient of the session's clinic by code.
    pub fn get_patient(&self, session: &ClinicSession, patient_code: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {PATIENT_COLUMNS} FROM patients WHERE clinic_id = ?1 AND patient_code = ?2"
                ),
                params![session.clinic_id(), patient_code.trim()],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Replace every editable field of a patient.
    ///
    /// Start from [`Patient::to_form`] to change only some fields, or use
    /// [`Database::patch_patient`].
    pub fn update_patient(
        &self,
        session: &ClinicSession,
        patient_code: &str,
        details: &PatientDetails,
    ) -> DbResult<Patient> {
        let details = details.normalized(Utc::now().date_naive());
        details.validate()?;

        let rows_affected = self.conn.execute(
            r#"
            UPDATE patients SET
                name = ?3,
                sex = ?4,
                age = ?5,
                dob = ?6,
                mobile = ?7,
                email = ?8,
                address_village_town = ?9,
                address_city = ?10,
                address_state = ?11,
                address_pincode = ?12,
                emergency_contact_name = ?13,
                emergency_contact_phone = ?14,
                medical_history = ?15,
                current_medications = ?16,
                allergies = ?17,
                previous_dental_work = ?18,
                chief_complaint = ?19,
                pain_level = ?20,
                last_cleaning_date = ?21,
                insurance_provider = ?22,
                insurance_number = ?23,
                treatment = ?24,
                preferred_doctor = ?25,
                status = ?26,
                updated_at = ?27
            WHERE clinic_id = ?1 AND patient_code = ?2
            "#,
            params![
                session.clinic_id(),
                patient_code.trim(),
                details.name,
                details.sex.map(|s| s.as_str()),
                details.age,
                details.dob,
                details.mobile,
                details.email,
                details.address.village_town,
                details.address.city,
                details.address.state,
                details.address.pincode,
                details.emergency_contact_name,
                details.emergency_contact_phone,
                details.medical.medical_history,
                details.medical.current_medications,
                details.medical.allergies,
                details.medical.previous_dental_work,
                details.medical.chief_complaint,
                details.medical.pain_level,
                details.medical.last_cleaning_date,
                details.insurance_provider,
                details.insurance_number,
                details.treatment,
                details.preferred_doctor,
                details.status.as_str(),
                now_timestamp(),
            ],
        )?;
        if rows_affected == 0 {
            return Err(not_found(patient_code));
        }

        debug!(patient_code = patient_code.trim(), "updated patient");
        self.get_patient(session, patient_code)?
            .ok_or_else(|| not_found(patient_code))
    }

    /// Apply only the `Some` fields of `patch`.
    pub fn patch_patient(
        &self,
        session: &ClinicSession,
        patient_code: &str,
        patch: &PatientPatch,
    ) -> DbResult<Patient> {
        let existing = self
            .get_patient(session, patient_code)?
            .ok_or_else(|| not_found(patient_code))?;
        self.update_patient(session, patient_code, &patch.apply(&existing.details))
    }

    /// All patients of the session's clinic, newest first.
    pub fn list_patients(&self, session: &ClinicSession) -> DbResult<Vec<PatientSummary>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM patients WHERE clinic_id = ? ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt.query_map([session.clinic_id()], summary_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Substring search on one column, newest first. A blank query lists
    /// every patient.
    pub fn search_patients(
        &self,
        session: &ClinicSession,
        query: &str,
        field: SearchField,
    ) -> DbResult<Vec<PatientSummary>> {
        let query = query.trim();
        if query.is_empty() {
            return self.list_patients(session);
        }

        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {SUMMARY_COLUMNS} FROM patients
            WHERE clinic_id = ?1 AND {column} LIKE '%' || ?2 || '%' ESCAPE '\'
            ORDER BY created_at DESC, id DESC
            "#,
            column = field.column(),
        ))?;
        let pattern = escape_like(query);
        let rows = stmt.query_map(params![session.clinic_id(), pattern], summary_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Patients whose names are close to `name`, best match first.
    pub fn suggest_patients(
        &self,
        session: &ClinicSession,
        name: &str,
        limit: usize,
    ) -> DbResult<Vec<PatientSummary>> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f64, PatientSummary)> = self
            .list_patients(session)?
            .into_iter()
            .map(|p| (jaro_winkler(&needle, &p.name.to_lowercase()), p))
            .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(scored.into_iter().take(limit).map(|(_, p)| p).collect())
    }

    /// A patient with their visits, payments and appointments.
    pub fn patient_detail(&self, session: &ClinicSession, patient_code: &str) -> DbResult<PatientDetail> {
        let patient = self
            .get_patient(session, patient_code)?
            .ok_or_else(|| not_found(patient_code))?;
        Ok(PatientDetail {
            visits: self.visits_for_patient(patient.id)?,
            payments: self.revenue_for_patient(patient.id)?,
            appointments: self.appointments_for_patient(patient.id)?,
            patient,
        })
    }

    /// Number of patients registered under a clinic.
    pub fn count_patients(&self, clinic_id: i64) -> DbResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM patients WHERE clinic_id = ?",
                [clinic_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}

/// Makes `%`, `_` and `\` match themselves inside a `LIKE ... ESCAPE '\'` pattern.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
