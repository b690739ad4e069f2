//! Clinic (tenant) models.

use serde::{Deserialize, Serialize};

use super::{clean_text, ValidationError};
use crate::auth::is_valid_email;

/// A registered clinic. The password hash never leaves the db layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clinic {
    /// Row ID
    pub id: i64,
    /// Human-readable code, e.g. `CLINIC0001`
    pub clinic_code: String,
    /// Generated login identifier, e.g. `SMIL001`
    pub login_id: String,
    /// Clinic name
    pub name: String,
    /// Location / address line
    pub location: Option<String>,
    /// Doctor or manager in charge
    pub incharge: Option<String>,
    /// Contact email (stored lowercase)
    pub email: Option<String>,
    /// Contact phone
    pub phone: Option<String>,
    /// Creation timestamp
    pub created_at: String,
}

/// Registration form submitted by a new clinic.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClinicRegistration {
    pub name: String,
    pub location: Option<String>,
    pub incharge: Option<String>,
    pub email: String,
    pub phone: Option<String>,
}

impl ClinicRegistration {
    /// Create a registration with the required fields.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Default::default()
        }
    }

    /// Trim all fields and lowercase the email.
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            location: clean_text(self.location.clone()),
            incharge: clean_text(self.incharge.clone()),
            email: self.email.trim().to_lowercase(),
            phone: clean_text(self.phone.clone()),
        }
    }

    /// Check required fields. Call on the normalized form.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::MissingField("Clinic name"));
        }
        if !is_valid_email(&self.email) {
            return Err(ValidationError::InvalidEmail(self.email.clone()));
        }
        Ok(())
    }
}

/// Credentials handed back exactly once, at registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClinicCredentials {
    pub clinic_id: i64,
    pub clinic_code: String,
    pub login_id: String,
    /// Plaintext password; only its hash is persisted
    pub password: String,
}

/// Proof of a successful login. Tenant-scoped operations require one.
///
/// Only the db layer can construct a session, so holding one means the
/// credentials were checked.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClinicSession {
    clinic_id: i64,
    clinic_code: String,
    clinic_name: String,
    patient_count: i64,
}

impl ClinicSession {
    pub(crate) fn new(clinic_id: i64, clinic_code: String, clinic_name: String, patient_count: i64) -> Self {
        Self {
            clinic_id,
            clinic_code,
            clinic_name,
            patient_count,
        }
    }

    pub fn clinic_id(&self) -> i64 {
        self.clinic_id
    }

    pub fn clinic_code(&self) -> &str {
        &self.clinic_code
    }

    pub fn clinic_name(&self) -> &str {
        &self.clinic_name
    }

    /// Patient count at login time.
    pub fn patient_count(&self) -> i64 {
        self.patient_count
    }
}

/// Issued by a password-reset request. In production the token is mailed;
/// callers here receive it directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PasswordResetTicket {
    pub clinic_id: i64,
    pub clinic_name: String,
    pub token: String,
    pub expires_at: String,
}
