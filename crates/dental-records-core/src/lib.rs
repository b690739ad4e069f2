//! Dental Records Core Library
//!
//! Multi-tenant patient records for dental clinics, with SQL aggregation
//! behind the clinic dashboards and report export.
//!
//! # Architecture
//!
//! ```text
//!   register_clinic ──► credentials (login ID + generated password)
//!                              │
//!                           login
//!                              │
//!                       ClinicSession ──────────────┐
//!                              │                    │
//!        ┌─────────────┬───────┴──────┬─────────────┐│
//!        ▼             ▼              ▼             ▼▼
//!     Patients      Visits        Payments     Appointments
//!        │             │              │             │
//!        └─────────────┴──────┬───────┴─────────────┘
//!                             │  (scoped by clinic_id)
//!                ┌────────────┴────────────┐
//!                ▼                         ▼
//!        MetricsAggregator          ReportExporter
//!        (dashboard, breakdowns)    (JSON / CSV)
//! ```
//!
//! # Tenant isolation
//!
//! Every patient-level operation takes a [`ClinicSession`], which only
//! [`Database::login`] can create. Records of other clinics are invisible
//! through it.
//!
//! # Modules
//!
//! - [`db`]: SQLite layer, schema migrations and atomic numbering
//! - [`models`]: Domain types (Clinic, Patient, Visit, RevenueRecord, ...)
//! - [`auth`]: Credential generation and password hashing
//! - [`analytics`]: Metrics aggregator and dashboard
//! - [`export`]: Comprehensive and financial reports
//! - [`config`]: TOML store configuration

pub mod analytics;
pub mod auth;
pub mod config;
pub mod db;
pub mod export;
pub mod models;

// Re-export commonly used types
pub use analytics::{ClinicDashboard, Dimension, FeedbackSummary, MetricsAggregator};
pub use config::{ConfigError, StoreConfig};
pub use db::{Database, DbError, DbResult};
pub use export::{ComprehensiveReport, ExportError, FinancialReport, ReportExporter};
pub use models::{
    Address, Alert, AlertSeverity, Appointment, AppointmentStatus, Clinic, ClinicCredentials,
    ClinicRegistration, ClinicSession, Feedback, FeedbackType, NewAlert, NewFeedback, NewRevenue,
    NewVisit, PasswordResetTicket, Patient, PatientDetails, PatientPatch, PatientStatus,
    PatientSummary, PaymentMethod, PaymentStatus, RevenueRecord, SearchField, Sex,
    ValidationError, Visit,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum DentalRecordsError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<db::DbError> for DentalRecordsError {
    fn from(e: db::DbError) -> Self {
        match e {
            DbError::NotFound(what) => DentalRecordsError::NotFound(what),
            DbError::Validation(v) => DentalRecordsError::InvalidInput(v.to_string()),
            DbError::Conflict(what) => DentalRecordsError::Conflict(what),
            DbError::InvalidCredentials => DentalRecordsError::Unauthorized("Invalid credentials".into()),
            DbError::Json(err) => DentalRecordsError::SerializationError(err.to_string()),
            other => DentalRecordsError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ValidationError> for DentalRecordsError {
    fn from(e: ValidationError) -> Self {
        DentalRecordsError::InvalidInput(e.to_string())
    }
}

impl From<export::ExportError> for DentalRecordsError {
    fn from(e: export::ExportError) -> Self {
        match e {
            ExportError::Database(err) => err.into(),
            ExportError::Json(err) => err.into(),
        }
    }
}

impl From<serde_json::Error> for DentalRecordsError {
    fn from(e: serde_json::Error) -> Self {
        DentalRecordsError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for DentalRecordsError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        DentalRecordsError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a store at the given path.
#[uniffi::export]
pub fn open_store(path: String) -> Result<Arc<DentalRecordsCore>, DentalRecordsError> {
    let db = Database::open(&path)?;
    Ok(DentalRecordsCore::wrap(db))
}

/// Create an in-memory store (for testing).
#[uniffi::export]
pub fn open_store_in_memory() -> Result<Arc<DentalRecordsCore>, DentalRecordsError> {
    let db = Database::open_in_memory()?;
    Ok(DentalRecordsCore::wrap(db))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe store wrapper for FFI.
///
/// `login` returns an opaque token standing in for the [`ClinicSession`];
/// clinic-scoped calls take that token.
#[derive(uniffi::Object)]
pub struct DentalRecordsCore {
    db: Arc<Mutex<Database>>,
    sessions: Mutex<HashMap<String, ClinicSession>>,
}

impl DentalRecordsCore {
    fn wrap(db: Database) -> Arc<Self> {
        Arc::new(Self {
            db: Arc::new(Mutex::new(db)),
            sessions: Mutex::new(HashMap::new()),
        })
    }

    fn session(&self, token: &str) -> Result<ClinicSession, DentalRecordsError> {
        self.sessions
            .lock()?
            .get(token)
            .cloned()
            .ok_or_else(|| DentalRecordsError::Unauthorized("Unknown or expired session".into()))
    }
}

#[uniffi::export]
impl DentalRecordsCore {
    // =========================================================================
    // Clinic Operations
    // =========================================================================

    /// Register a clinic. The returned password is not stored in clear.
    pub fn register_clinic(
        &self,
        registration: FfiClinicRegistration,
    ) -> Result<FfiClinicCredentials, DentalRecordsError> {
        let db = self.db.lock()?;
        let creds = db.register_clinic(&registration.into())?;
        Ok(creds.into())
    }

    /// Log in and get a session token.
    pub fn login(&self, login_id: String, password: String) -> Result<FfiSession, DentalRecordsError> {
        let session = {
            let db = self.db.lock()?;
            db.login(&login_id, &password)?
        };
        let token = uuid::Uuid::new_v4().to_string();
        let ffi = FfiSession {
            token: token.clone(),
            clinic_id: session.clinic_id(),
            clinic_code: session.clinic_code().to_string(),
            clinic_name: session.clinic_name().to_string(),
            patient_count: session.patient_count(),
        };
        self.sessions.lock()?.insert(token, session);
        Ok(ffi)
    }

    /// Forget a session token.
    pub fn logout(&self, token: String) -> Result<(), DentalRecordsError> {
        self.sessions.lock()?.remove(&token);
        Ok(())
    }

    /// Start a password reset. `None` for an unknown email.
    pub fn request_password_reset(&self, email: String) -> Result<Option<FfiResetTicket>, DentalRecordsError> {
        let db = self.db.lock()?;
        let ticket = db.request_password_reset(&email)?;
        Ok(ticket.map(|t| FfiResetTicket {
            clinic_name: t.clinic_name,
            token: t.token,
            expires_at: t.expires_at,
        }))
    }

    /// Complete a password reset.
    pub fn reset_password(
        &self,
        reset_token: String,
        new_password: String,
        confirm_password: String,
    ) -> Result<(), DentalRecordsError> {
        let db = self.db.lock()?;
        db.reset_password(&reset_token, &new_password, &confirm_password)?;
        Ok(())
    }

    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Register a patient, optionally with a first visit.
    pub fn add_patient(
        &self,
        token: String,
        form: FfiPatientForm,
        initial_visit: Option<FfiNewVisit>,
    ) -> Result<FfiPatient, DentalRecordsError> {
        let session = self.session(&token)?;
        let details = PatientDetails::try_from(form)?;
        let visit = initial_visit.map(NewVisit::try_from).transpose()?;
        let db = self.db.lock()?;
        let patient = db.add_patient(&session, &details, visit.as_ref())?;
        Ok(patient.into())
    }

    /// Get a patient by code.
    pub fn get_patient(&self, token: String, patient_code: String) -> Result<Option<FfiPatient>, DentalRecordsError> {
        let session = self.session(&token)?;
        let db = self.db.lock()?;
        Ok(db.get_patient(&session, &patient_code)?.map(Into::into))
    }

    /// Replace a patient's editable fields.
    pub fn update_patient(
        &self,
        token: String,
        patient_code: String,
        form: FfiPatientForm,
    ) -> Result<FfiPatient, DentalRecordsError> {
        let session = self.session(&token)?;
        let details = PatientDetails::try_from(form)?;
        let db = self.db.lock()?;
        Ok(db.update_patient(&session, &patient_code, &details)?.into())
    }

    /// All patients, newest first.
    pub fn list_patients(&self, token: String) -> Result<Vec<FfiPatientSummary>, DentalRecordsError> {
        let session = self.session(&token)?;
        let db = self.db.lock()?;
        Ok(db.list_patients(&session)?.into_iter().map(Into::into).collect())
    }

    /// Search by `name`, `phone`, `patient_code` or `treatment`.
    pub fn search_patients(
        &self,
        token: String,
        query: String,
        field: String,
    ) -> Result<Vec<FfiPatientSummary>, DentalRecordsError> {
        let session = self.session(&token)?;
        let field: SearchField = field.parse()?;
        let db = self.db.lock()?;
        Ok(db
            .search_patients(&session, &query, field)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    // =========================================================================
    // Visit & Payment Operations
    // =========================================================================

    /// Record a visit; returns the visit ID.
    pub fn record_visit(
        &self,
        token: String,
        patient_code: String,
        visit: FfiNewVisit,
    ) -> Result<i64, DentalRecordsError> {
        let session = self.session(&token)?;
        let visit = NewVisit::try_from(visit)?;
        let db = self.db.lock()?;
        Ok(db.record_visit(&session, &patient_code, &visit)?.id)
    }

    /// Record a payment; returns the stored final amount.
    pub fn record_payment(
        &self,
        token: String,
        patient_code: String,
        payment: FfiNewPayment,
    ) -> Result<f64, DentalRecordsError> {
        let session = self.session(&token)?;
        let payment = NewRevenue::try_from(payment)?;
        let db = self.db.lock()?;
        Ok(db.record_payment(&session, &patient_code, &payment)?.final_amount)
    }

    // =========================================================================
    // Feedback & Alert Operations
    // =========================================================================

    /// Store a patient review; returns its ID.
    pub fn record_feedback(
        &self,
        token: String,
        patient_code: String,
        feedback: FfiNewFeedback,
    ) -> Result<i64, DentalRecordsError> {
        let session = self.session(&token)?;
        let feedback = NewFeedback::try_from(feedback)?;
        let db = self.db.lock()?;
        Ok(db.record_feedback(&session, &patient_code, &feedback)?.id)
    }

    /// Post an alert to the clinic dashboard.
    pub fn raise_alert(&self, token: String, alert: FfiNewAlert) -> Result<FfiAlert, DentalRecordsError> {
        let session = self.session(&token)?;
        let alert = NewAlert::try_from(alert)?;
        let db = self.db.lock()?;
        Ok(db.raise_alert(&session, &alert)?.into())
    }

    /// Unread alerts, newest first.
    pub fn active_alerts(&self, token: String, limit: u32) -> Result<Vec<FfiAlert>, DentalRecordsError> {
        let session = self.session(&token)?;
        let db = self.db.lock()?;
        Ok(db.active_alerts(&session, limit)?.into_iter().map(Into::into).collect())
    }

    pub fn mark_alert_read(&self, token: String, alert_id: i64) -> Result<(), DentalRecordsError> {
        let session = self.session(&token)?;
        let db = self.db.lock()?;
        db.mark_alert_read(&session, alert_id)?;
        Ok(())
    }

    // =========================================================================
    // Metrics & Export Operations
    // =========================================================================

    /// Full dashboard as JSON.
    pub fn dashboard_json(&self, token: String) -> Result<String, DentalRecordsError> {
        let session = self.session(&token)?;
        let db = self.db.lock()?;
        let dashboard = MetricsAggregator::new(&db).dashboard(session.clinic_id())?;
        Ok(serde_json::to_string_pretty(&dashboard)?)
    }

    /// Counts per category of `dimension` (e.g. `city`, `gender`).
    pub fn breakdown(&self, token: String, dimension: String) -> Result<Vec<FfiCategoryCount>, DentalRecordsError> {
        let session = self.session(&token)?;
        let dimension: Dimension = dimension.parse()?;
        let db = self.db.lock()?;
        let rows = MetricsAggregator::new(&db).breakdown_by(session.clinic_id(), dimension)?;
        Ok(rows
            .into_iter()
            .map(|c| FfiCategoryCount {
                category: c.category,
                count: c.count,
            })
            .collect())
    }

    /// Patient-by-visit report as CSV.
    pub fn export_comprehensive_csv(&self, token: String) -> Result<String, DentalRecordsError> {
        let session = self.session(&token)?;
        let db = self.db.lock()?;
        Ok(ReportExporter::new(&db).comprehensive_report(session.clinic_id())?.to_csv())
    }

    /// Financial ledger report as JSON.
    pub fn export_financial_json(&self, token: String) -> Result<String, DentalRecordsError> {
        let session = self.session(&token)?;
        let db = self.db.lock()?;
        let report = ReportExporter::new(&db).financial_report(session.clinic_id())?;
        Ok(report.to_json()?)
    }

    /// Financial ledger report as CSV.
    pub fn export_financial_csv(&self, token: String) -> Result<String, DentalRecordsError> {
        let session = self.session(&token)?;
        let db = self.db.lock()?;
        Ok(ReportExporter::new(&db).financial_report(session.clinic_id())?.to_csv())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

fn parse_ffi_date(field: &'static str, value: Option<String>) -> Result<Option<NaiveDate>, DentalRecordsError> {
    match models::clean_text(value) {
        None => Ok(None),
        Some(text) => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| DentalRecordsError::InvalidInput(format!("{field} must be YYYY-MM-DD, got {text:?}"))),
    }
}

fn parse_ffi_enum<T>(value: Option<String>) -> Result<Option<T>, DentalRecordsError>
where
    T: std::str::FromStr<Err = ValidationError>,
{
    models::clean_text(value)
        .map(|v| v.parse::<T>())
        .transpose()
        .map_err(Into::into)
}

/// FFI-safe clinic registration form.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiClinicRegistration {
    pub name: String,
    pub email: String,
    pub location: Option<String>,
    pub incharge: Option<String>,
    pub phone: Option<String>,
}

impl From<FfiClinicRegistration> for ClinicRegistration {
    fn from(r: FfiClinicRegistration) -> Self {
        ClinicRegistration {
            name: r.name,
            location: r.location,
            incharge: r.incharge,
            email: r.email,
            phone: r.phone,
        }
    }
}

/// FFI-safe credentials, shown once after registration.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiClinicCredentials {
    pub clinic_code: String,
    pub login_id: String,
    pub password: String,
}

impl From<ClinicCredentials> for FfiClinicCredentials {
    fn from(c: ClinicCredentials) -> Self {
        Self {
            clinic_code: c.clinic_code,
            login_id: c.login_id,
            password: c.password,
        }
    }
}

/// FFI-safe session handle.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSession {
    pub token: String,
    pub clinic_id: i64,
    pub clinic_code: String,
    pub clinic_name: String,
    pub patient_count: i64,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiResetTicket {
    pub clinic_name: String,
    pub token: String,
    pub expires_at: String,
}

/// FFI-safe patient form. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiPatientForm {
    pub name: String,
    pub sex: Option<String>,
    pub age: Option<u32>,
    pub dob: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub village_town: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub allergies: Option<String>,
    pub medical_history: Option<String>,
    pub chief_complaint: Option<String>,
    pub pain_level: Option<u8>,
    pub treatment: Option<String>,
    pub preferred_doctor: Option<String>,
    pub status: Option<String>,
}

impl TryFrom<FfiPatientForm> for PatientDetails {
    type Error = DentalRecordsError;

    fn try_from(f: FfiPatientForm) -> Result<Self, Self::Error> {
        let mut details = PatientDetails::new(f.name);
        details.sex = parse_ffi_enum(f.sex)?;
        details.age = f.age;
        details.dob = parse_ffi_date("dob", f.dob)?;
        details.mobile = f.mobile;
        details.email = f.email;
        details.address = Address::new(f.village_town, f.city, f.state, f.pincode);
        details.medical.allergies = f.allergies;
        details.medical.medical_history = f.medical_history;
        details.medical.chief_complaint = f.chief_complaint;
        details.medical.pain_level = f.pain_level;
        details.treatment = f.treatment;
        details.preferred_doctor = f.preferred_doctor;
        details.status = parse_ffi_enum(f.status)?.unwrap_or_default();
        Ok(details)
    }
}

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub patient_code: String,
    pub name: String,
    pub sex: Option<String>,
    pub age: Option<u32>,
    pub dob: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub address: String,
    pub treatment: Option<String>,
    pub preferred_doctor: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Patient> for FfiPatient {
    fn from(p: Patient) -> Self {
        let d = p.details;
        Self {
            patient_code: p.patient_code,
            name: d.name,
            sex: d.sex.map(|s| s.to_string()),
            age: d.age,
            dob: d.dob.map(|d| d.to_string()),
            mobile: d.mobile,
            email: d.email,
            address: d.address.display_line(),
            treatment: d.treatment,
            preferred_doctor: d.preferred_doctor,
            status: d.status.as_str().to_string(),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientSummary {
    pub patient_code: String,
    pub name: String,
    pub sex: Option<String>,
    pub age: Option<u32>,
    pub mobile: Option<String>,
    pub treatment: Option<String>,
    pub created_at: String,
}

impl From<PatientSummary> for FfiPatientSummary {
    fn from(s: PatientSummary) -> Self {
        Self {
            patient_code: s.patient_code,
            name: s.name,
            sex: s.sex.map(|s| s.to_string()),
            age: s.age,
            mobile: s.mobile,
            treatment: s.treatment,
            created_at: s.created_at,
        }
    }
}

/// FFI-safe visit. `visit_date` defaults to today.
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiNewVisit {
    pub visit_date: Option<String>,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment_given: Option<String>,
    pub treatment_cost: f64,
    pub satisfaction_rating: Option<u8>,
    pub doctor_assigned: Option<String>,
    pub payment_mode: Option<String>,
    pub treatment_success_rate: Option<f64>,
}

impl TryFrom<FfiNewVisit> for NewVisit {
    type Error = DentalRecordsError;

    fn try_from(v: FfiNewVisit) -> Result<Self, Self::Error> {
        Ok(NewVisit {
            visit_date: parse_ffi_date("visit_date", v.visit_date)?,
            symptoms: v.symptoms,
            diagnosis: v.diagnosis,
            treatment_given: v.treatment_given,
            treatment_cost: v.treatment_cost,
            satisfaction_rating: v.satisfaction_rating,
            doctor_assigned: v.doctor_assigned,
            payment_mode: parse_ffi_enum(v.payment_mode)?,
            treatment_success_rate: v.treatment_success_rate,
            ..Default::default()
        })
    }
}

/// FFI-safe payment.
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiNewPayment {
    pub transaction_date: Option<String>,
    pub service_type: Option<String>,
    pub base_amount: f64,
    pub tax_amount: f64,
    pub discount_amount: f64,
    pub payment_method: Option<String>,
    pub payment_status: Option<String>,
}

impl TryFrom<FfiNewPayment> for NewRevenue {
    type Error = DentalRecordsError;

    fn try_from(p: FfiNewPayment) -> Result<Self, Self::Error> {
        Ok(NewRevenue {
            transaction_date: parse_ffi_date("transaction_date", p.transaction_date)?,
            visit_id: None,
            service_type: p.service_type,
            base_amount: p.base_amount,
            tax_amount: p.tax_amount,
            discount_amount: p.discount_amount,
            payment_method: parse_ffi_enum(p.payment_method)?,
            payment_status: parse_ffi_enum(p.payment_status)?.unwrap_or_default(),
        })
    }
}

/// FFI-safe feedback form. `feedback_date` defaults to today.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewFeedback {
    pub feedback_type: Option<String>,
    pub rating: Option<u8>,
    pub review_text: Option<String>,
    pub sentiment_score: Option<f64>,
    pub areas_for_improvement: Option<String>,
    pub would_recommend: bool,
    pub feedback_date: Option<String>,
}

impl TryFrom<FfiNewFeedback> for NewFeedback {
    type Error = DentalRecordsError;

    fn try_from(f: FfiNewFeedback) -> Result<Self, Self::Error> {
        Ok(NewFeedback {
            feedback_type: parse_ffi_enum(f.feedback_type)?.unwrap_or_default(),
            rating: f.rating,
            review_text: f.review_text,
            sentiment_score: f.sentiment_score,
            areas_for_improvement: f.areas_for_improvement,
            would_recommend: f.would_recommend,
            feedback_date: parse_ffi_date("feedback_date", f.feedback_date)?,
        })
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewAlert {
    pub alert_type: String,
    pub message: String,
    pub severity: Option<String>,
    pub action_required: bool,
    pub patient_code: Option<String>,
}

impl TryFrom<FfiNewAlert> for NewAlert {
    type Error = DentalRecordsError;

    fn try_from(a: FfiNewAlert) -> Result<Self, Self::Error> {
        Ok(NewAlert {
            alert_type: a.alert_type,
            message: a.message,
            severity: parse_ffi_enum(a.severity)?.unwrap_or_default(),
            action_required: a.action_required,
            patient_code: a.patient_code,
        })
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAlert {
    pub id: i64,
    pub alert_type: String,
    pub message: String,
    pub severity: String,
    pub action_required: bool,
    pub created_at: String,
}

impl From<Alert> for FfiAlert {
    fn from(a: Alert) -> Self {
        Self {
            id: a.id,
            alert_type: a.alert_type,
            message: a.message,
            severity: a.severity.as_str().to_string(),
            action_required: a.action_required,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCategoryCount {
    pub category: String,
    pub count: i64,
}
