//! Patient models.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{check_range, clean_text, Address, Appointment, RevenueRecord, ValidationError, Visit};

/// Patient sex as recorded on the intake form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Sex {
    Male,
    Female,
    Other,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
            Sex::Other => "Other",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sex {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Sex::Male),
            "female" | "f" => Ok(Sex::Female),
            "other" | "o" => Ok(Sex::Other),
            _ => Err(ValidationError::UnknownVariant {
                kind: "sex",
                value: s.to_string(),
            }),
        }
    }
}

/// Whether the patient is still under care. Patients are never deleted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum PatientStatus {
    #[default]
    Active,
    Inactive,
}

impl PatientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatientStatus::Active => "Active",
            PatientStatus::Inactive => "Inactive",
        }
    }
}

impl FromStr for PatientStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(PatientStatus::Active),
            "inactive" => Ok(PatientStatus::Inactive),
            _ => Err(ValidationError::UnknownVariant {
                kind: "patient status",
                value: s.to_string(),
            }),
        }
    }
}

/// Free-text dental and medical history captured at intake.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MedicalProfile {
    pub medical_history: Option<String>,
    pub current_medications: Option<String>,
    pub allergies: Option<String>,
    pub previous_dental_work: Option<String>,
    pub chief_complaint: Option<String>,
    /// Self-reported pain, 0..=10
    pub pain_level: Option<u8>,
    pub last_cleaning_date: Option<NaiveDate>,
}

/// The editable part of a patient record: everything the add/edit form holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientDetails {
    pub name: String,
    pub sex: Option<Sex>,
    /// Explicit age; replaced by the age derived from `dob` when both are given
    pub age: Option<u32>,
    pub dob: Option<NaiveDate>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub address: Address,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub medical: MedicalProfile,
    pub insurance_provider: Option<String>,
    pub insurance_number: Option<String>,
    /// Treatment type, e.g. "Root Canal"
    pub treatment: Option<String>,
    pub preferred_doctor: Option<String>,
    pub status: PatientStatus,
}

impl PatientDetails {
    /// Create details with only the required name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Trim text fields and derive the age from the date of birth.
    pub fn normalized(&self, today: NaiveDate) -> Self {
        let medical = &self.medical;
        Self {
            name: self.name.trim().to_string(),
            sex: self.sex,
            age: self.dob.map(|dob| age_on(dob, today)).or(self.age),
            dob: self.dob,
            mobile: clean_text(self.mobile.clone()),
            email: clean_text(self.email.clone()).map(|e| e.to_lowercase()),
            address: Address::new(
                self.address.village_town.clone(),
                self.address.city.clone(),
                self.address.state.clone(),
                self.address.pincode.clone(),
            ),
            emergency_contact_name: clean_text(self.emergency_contact_name.clone()),
            emergency_contact_phone: clean_text(self.emergency_contact_phone.clone()),
            medical: MedicalProfile {
                medical_history: clean_text(medical.medical_history.clone()),
                current_medications: clean_text(medical.current_medications.clone()),
                allergies: clean_text(medical.allergies.clone()),
                previous_dental_work: clean_text(medical.previous_dental_work.clone()),
                chief_complaint: clean_text(medical.chief_complaint.clone()),
                pain_level: medical.pain_level,
                last_cleaning_date: medical.last_cleaning_date,
            },
            insurance_provider: clean_text(self.insurance_provider.clone()),
            insurance_number: clean_text(self.insurance_number.clone()),
            treatment: clean_text(self.treatment.clone()),
            preferred_doctor: clean_text(self.preferred_doctor.clone()),
            status: self.status,
        }
    }

    /// Check required fields and ranges. Call on the normalized form.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::MissingField("Patient name"));
        }
        if let Some(age) = self.age {
            if age > 150 {
                return Err(ValidationError::OutOfRange {
                    field: "age",
                    min: 0,
                    max: 150,
                    value: age.into(),
                });
            }
        }
        check_range("pain level", self.medical.pain_level, 0, 10)
    }
}

/// A stored patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Row ID
    pub id: i64,
    /// Owning clinic
    pub clinic_id: i64,
    /// Clinic-scoped code, e.g. `CLINIC0001-P0007`
    pub patient_code: String,
    /// Editable record
    pub details: PatientDetails,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Patient {
    /// The stored record as an edit form.
    pub fn to_form(&self) -> PatientDetails {
        self.details.clone()
    }

    pub fn name(&self) -> &str {
        &self.details.name
    }
}

/// Partial edit: only `Some` fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientPatch {
    pub name: Option<String>,
    pub sex: Option<Sex>,
    pub dob: Option<NaiveDate>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub address: Option<Address>,
    pub treatment: Option<String>,
    pub preferred_doctor: Option<String>,
    pub allergies: Option<String>,
    pub medical_history: Option<String>,
    pub pain_level: Option<u8>,
    pub status: Option<PatientStatus>,
}

impl PatientPatch {
    /// Apply onto a copy of `details`.
    pub fn apply(&self, details: &PatientDetails) -> PatientDetails {
        let mut out = details.clone();
        if let Some(name) = &self.name {
            out.name = name.clone();
        }
        if self.sex.is_some() {
            out.sex = self.sex;
        }
        if self.dob.is_some() {
            out.dob = self.dob;
        }
        if self.mobile.is_some() {
            out.mobile = self.mobile.clone();
        }
        if self.email.is_some() {
            out.email = self.email.clone();
        }
        if let Some(address) = &self.address {
            out.address = address.clone();
        }
        if self.treatment.is_some() {
            out.treatment = self.treatment.clone();
        }
        if self.preferred_doctor.is_some() {
            out.preferred_doctor = self.preferred_doctor.clone();
        }
        if self.allergies.is_some() {
            out.medical.allergies = self.allergies.clone();
        }
        if self.medical_history.is_some() {
            out.medical.medical_history = self.medical_history.clone();
        }
        if self.pain_level.is_some() {
            out.medical.pain_level = self.pain_level;
        }
        if let Some(status) = self.status {
            out.status = status;
        }
        out
    }
}

/// Row shown in patient lists and search results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientSummary {
    pub patient_code: String,
    pub name: String,
    pub sex: Option<Sex>,
    pub age: Option<u32>,
    pub mobile: Option<String>,
    pub treatment: Option<String>,
    pub created_at: String,
}

/// Patient plus everything recorded against them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientDetail {
    pub patient: Patient,
    pub visits: Vec<Visit>,
    pub payments: Vec<RevenueRecord>,
    pub appointments: Vec<Appointment>,
}

/// Column a patient search matches against.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum SearchField {
    #[default]
    Name,
    Phone,
    PatientCode,
    Treatment,
}

impl SearchField {
    pub(crate) fn column(&self) -> &'static str {
        match self {
            SearchField::Name => "name",
            SearchField::Phone => "mobile",
            SearchField::PatientCode => "patient_code",
            SearchField::Treatment => "treatment",
        }
    }
}

impl FromStr for SearchField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(SearchField::Name),
            "phone" | "mobile" => Ok(SearchField::Phone),
            "patient_code" | "code" => Ok(SearchField::PatientCode),
            "treatment" => Ok(SearchField::Treatment),
            _ => Err(ValidationError::UnknownVariant {
                kind: "search field",
                value: s.to_string(),
            }),
        }
    }
}

/// Whole years between `dob` and `today`.
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

/// Format the clinic-scoped patient code.
pub fn format_patient_code(clinic_code: &str, number: i64) -> String {
    format!("{clinic_code}-P{number:04}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_on() {
        assert_eq!(age_on(date(1990, 6, 15), date(2024, 6, 14)), 33);
        assert_eq!(age_on(date(1990, 6, 15), date(2024, 6, 15)), 34);
        assert_eq!(age_on(date(2030, 1, 1), date(2024, 1, 1)), 0);
    }

    #[test]
    fn test_normalized_derives_age_from_dob() {
        let mut details = PatientDetails::new("  Asha Rao ");
        details.age = Some(99);
        details.dob = Some(date(2000, 1, 10));
        details.mobile = Some(" ".into());

        let norm = details.normalized(date(2024, 1, 9));
        assert_eq!(norm.name, "Asha Rao");
        assert_eq!(norm.age, Some(23));
        assert_eq!(norm.mobile, None);
    }

    #[test]
    fn test_validate() {
        assert_eq!(
            PatientDetails::new("").validate(),
            Err(ValidationError::MissingField("Patient name"))
        );

        let mut details = PatientDetails::new("Ravi");
        details.medical.pain_level = Some(11);
        assert!(matches!(
            details.validate(),
            Err(ValidationError::OutOfRange { field: "pain level", .. })
        ));
    }

    #[test]
    fn test_patch_only_touches_some_fields() {
        let mut details = PatientDetails::new("Ravi");
        details.treatment = Some("Cleaning".into());
        details.mobile = Some("9800000000".into());

        let patch = PatientPatch {
            name: Some("Ravi Kumar".into()),
            ..Default::default()
        };
        let out = patch.apply(&details);
        assert_eq!(out.name, "Ravi Kumar");
        assert_eq!(out.treatment.as_deref(), Some("Cleaning"));
        assert_eq!(out.mobile.as_deref(), Some("9800000000"));
    }

    #[test]
    fn test_sex_parsing() {
        assert_eq!("female".parse::<Sex>().unwrap(), Sex::Female);
        assert_eq!(" M ".parse::<Sex>().unwrap(), Sex::Male);
        assert!("unknown".parse::<Sex>().is_err());
    }

    #[test]
    fn test_format_patient_code() {
        assert_eq!(format_patient_code("CLINIC0001", 7), "CLINIC0001-P0007");
        assert_eq!(format_patient_code("CLINIC0012", 12345), "CLINIC0012-P12345");
    }
}
