//! SQLite schema definition.
//!
//! Table names match the databases written by the earlier clinic web apps
//! (`patient_analytics`, `revenue_analytics`, ...) so those files open in
//! place; see [`super::migrations`] for the column upgrades.

/// Bumped whenever [`super::migrations`] gains a step.
pub const SCHEMA_VERSION: i64 = 3;

/// Tables. Safe to run against an existing database.
pub const TABLES: &str = r#"
-- ============================================================================
-- Clinics (tenants)
-- ============================================================================

CREATE TABLE IF NOT EXISTS clinics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    clinic_code TEXT NOT NULL UNIQUE,            -- CLINIC0001
    login_id TEXT NOT NULL UNIQUE,               -- SMIL001
    password_hash TEXT,                          -- Argon2 PHC string
    name TEXT NOT NULL,
    location TEXT,
    incharge TEXT,
    email TEXT,                                  -- lowercase, unique when present
    phone TEXT,
    reset_token_hash TEXT,                       -- SHA-256 hex of the reset token
    reset_expires_at TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    clinic_id INTEGER NOT NULL REFERENCES clinics(id),
    patient_code TEXT NOT NULL UNIQUE,           -- CLINIC0001-P0001
    name TEXT NOT NULL,
    sex TEXT,
    age INTEGER,
    dob TEXT,
    mobile TEXT,
    email TEXT,
    address_village_town TEXT,
    address_city TEXT,
    address_state TEXT,
    address_pincode TEXT,
    emergency_contact_name TEXT,
    emergency_contact_phone TEXT,
    medical_history TEXT,
    current_medications TEXT,
    allergies TEXT,
    previous_dental_work TEXT,
    chief_complaint TEXT,
    pain_level INTEGER CHECK (pain_level IS NULL OR pain_level BETWEEN 0 AND 10),
    last_cleaning_date TEXT,
    insurance_provider TEXT,
    insurance_number TEXT,
    treatment TEXT,
    preferred_doctor TEXT,
    status TEXT NOT NULL DEFAULT 'Active',
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

-- ============================================================================
-- Visits (one row per encounter)
-- ============================================================================

CREATE TABLE IF NOT EXISTS patient_analytics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    clinic_id INTEGER NOT NULL REFERENCES clinics(id),
    patient_id INTEGER NOT NULL REFERENCES patients(id),
    visit_date TEXT NOT NULL,
    symptoms TEXT,
    diagnosis TEXT,
    treatment_given TEXT,
    treatment_cost REAL NOT NULL DEFAULT 0 CHECK (treatment_cost >= 0),
    satisfaction_rating INTEGER CHECK (satisfaction_rating IS NULL OR satisfaction_rating BETWEEN 1 AND 5),
    doctor_assigned TEXT,
    pain_level_before INTEGER,
    pain_level_after INTEGER,
    payment_mode TEXT,
    treatment_success_rate REAL CHECK (treatment_success_rate IS NULL OR treatment_success_rate BETWEEN 0 AND 100),
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

-- ============================================================================
-- Revenue ledger
-- ============================================================================

CREATE TABLE IF NOT EXISTS revenue_analytics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    clinic_id INTEGER NOT NULL REFERENCES clinics(id),
    patient_id INTEGER REFERENCES patients(id),
    visit_id INTEGER REFERENCES patient_analytics(id),
    transaction_date TEXT NOT NULL,
    service_type TEXT,
    base_amount REAL NOT NULL DEFAULT 0,
    tax_amount REAL NOT NULL DEFAULT 0,
    discount_amount REAL NOT NULL DEFAULT 0,
    final_amount REAL NOT NULL DEFAULT 0,
    payment_method TEXT,
    payment_status TEXT NOT NULL DEFAULT 'Completed',
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
    CHECK (base_amount >= 0 AND tax_amount >= 0 AND discount_amount >= 0),
    CHECK (abs(final_amount - (base_amount + tax_amount - discount_amount)) < 0.005)
);

-- ============================================================================
-- Appointments
-- ============================================================================

CREATE TABLE IF NOT EXISTS appointments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    clinic_id INTEGER NOT NULL REFERENCES clinics(id),
    patient_id INTEGER NOT NULL REFERENCES patients(id),
    appointment_date TEXT NOT NULL,
    treatment_type TEXT,
    notes TEXT,
    status TEXT NOT NULL DEFAULT 'Scheduled',
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

-- ============================================================================
-- Patient feedback
-- ============================================================================

CREATE TABLE IF NOT EXISTS patient_feedback (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    clinic_id INTEGER NOT NULL REFERENCES clinics(id),
    patient_id INTEGER NOT NULL REFERENCES patients(id),
    feedback_type TEXT,
    rating INTEGER CHECK (rating IS NULL OR rating BETWEEN 1 AND 5),
    review_text TEXT,
    sentiment_score REAL CHECK (sentiment_score IS NULL OR sentiment_score BETWEEN -1 AND 1),
    areas_for_improvement TEXT,
    would_recommend INTEGER NOT NULL DEFAULT 1,
    feedback_date TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

-- ============================================================================
-- Alerts shown on the dashboard until read
-- ============================================================================

CREATE TABLE IF NOT EXISTS smart_alerts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    clinic_id INTEGER NOT NULL REFERENCES clinics(id),
    alert_type TEXT NOT NULL,
    alert_message TEXT NOT NULL,
    severity TEXT NOT NULL DEFAULT 'Medium',
    is_read INTEGER NOT NULL DEFAULT 0,
    action_required INTEGER NOT NULL DEFAULT 0,
    related_patient_id INTEGER REFERENCES patients(id),
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

-- ============================================================================
-- Sequences (clinic numbers, per-clinic patient numbers)
-- ============================================================================

CREATE TABLE IF NOT EXISTS sequences (
    name TEXT PRIMARY KEY,                       -- 'clinic' or 'patient:<clinic_id>'
    last_value INTEGER NOT NULL
);
"#;

/// Indexes. Run after column migrations since they may name added columns.
pub const INDEXES: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_clinics_email ON clinics(email);
CREATE INDEX IF NOT EXISTS idx_clinics_reset_token ON clinics(reset_token_hash);

CREATE INDEX IF NOT EXISTS idx_patients_clinic ON patients(clinic_id, created_at);
CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(clinic_id, name);
CREATE INDEX IF NOT EXISTS idx_patients_city ON patients(clinic_id, address_city);

CREATE INDEX IF NOT EXISTS idx_visits_clinic ON patient_analytics(clinic_id, visit_date);
CREATE INDEX IF NOT EXISTS idx_visits_patient ON patient_analytics(patient_id);
CREATE INDEX IF NOT EXISTS idx_visits_doctor ON patient_analytics(clinic_id, doctor_assigned);

CREATE INDEX IF NOT EXISTS idx_revenue_clinic ON revenue_analytics(clinic_id, transaction_date);
CREATE INDEX IF NOT EXISTS idx_revenue_patient ON revenue_analytics(patient_id);

CREATE INDEX IF NOT EXISTS idx_appointments_clinic ON appointments(clinic_id, appointment_date);

CREATE INDEX IF NOT EXISTS idx_feedback_clinic ON patient_feedback(clinic_id, feedback_date);
CREATE INDEX IF NOT EXISTS idx_alerts_clinic ON smart_alerts(clinic_id, is_read, created_at);
"#;
