//! Clinic registration, login and password reset through the public API.

use dental_records_core::db::{Database, DbError};
use dental_records_core::models::{ClinicRegistration, PatientDetails, PatientPatch, Sex, ValidationError};

fn registration(name: &str, email: &str) -> ClinicRegistration {
    let mut reg = ClinicRegistration::new(name, email);
    reg.location = Some("Pune".into());
    reg.incharge = Some("Dr. Kulkarni".into());
    reg
}

#[test]
fn test_sequential_clinic_codes() {
    let db = Database::open_in_memory().unwrap();
    let first = db.register_clinic(&registration("Smile Dental", "a@smile.in")).unwrap();
    let second = db.register_clinic(&registration("Smile Dental", "b@smile.in")).unwrap();

    assert_eq!(first.clinic_code, "CLINIC0001");
    assert_eq!(second.clinic_code, "CLINIC0002");
    assert_eq!(first.login_id, "SMIL001");
    assert_eq!(second.login_id, "SMIL002");
    assert_ne!(first.password, second.password);
}

#[test]
fn test_duplicate_email_rejected() {
    let db = Database::open_in_memory().unwrap();
    db.register_clinic(&registration("Smile Dental", "a@smile.in")).unwrap();
    let err = db
        .register_clinic(&registration("Other Clinic", "a@smile.in"))
        .unwrap_err();
    assert!(matches!(err, DbError::Conflict(_)));
    assert!(err.is_user_error());
    assert_eq!(db.list_clinics().unwrap().len(), 1);
}

#[test]
fn test_invalid_registration_rejected() {
    let db = Database::open_in_memory().unwrap();
    assert!(matches!(
        db.register_clinic(&registration("Smile", "not-an-email")),
        Err(DbError::Validation(ValidationError::InvalidEmail(_)))
    ));
    assert!(matches!(
        db.register_clinic(&registration("  ", "a@smile.in")),
        Err(DbError::Validation(ValidationError::MissingField(_)))
    ));
}

#[test]
fn test_password_not_stored_in_clear() {
    let db = Database::open_in_memory().unwrap();
    let creds = db.register_clinic(&registration("Smile", "a@smile.in")).unwrap();
    let stored: String = db
        .conn()
        .query_row(
            "SELECT password_hash FROM clinics WHERE id = ?",
            [creds.clinic_id],
            |row| row.get(0),
        )
        .unwrap();
    assert_ne!(stored, creds.password);
    assert!(stored.starts_with("$argon2"));
}

#[test]
fn test_login_counts_patients() {
    let db = Database::open_in_memory().unwrap();
    let creds = db.register_clinic(&registration("Smile", "a@smile.in")).unwrap();
    let session = db.login(&creds.login_id, &creds.password).unwrap();
    assert_eq!(session.patient_count(), 0);

    db.add_patient(&session, &PatientDetails::new("Asha"), None).unwrap();
    let session = db.login(&creds.login_id, &creds.password).unwrap();
    assert_eq!(session.patient_count(), 1);
    assert_eq!(session.clinic_name(), "Smile");

    assert!(matches!(
        db.login(&creds.login_id, "wrong-password"),
        Err(DbError::InvalidCredentials)
    ));
    assert!(matches!(
        db.login("NOPE999", &creds.password),
        Err(DbError::InvalidCredentials)
    ));
}

#[test]
fn test_reset_token_single_use() {
    let db = Database::open_in_memory().unwrap();
    let creds = db.register_clinic(&registration("Smile", "a@smile.in")).unwrap();

    assert!(db.request_password_reset("nobody@smile.in").unwrap().is_none());
    let ticket = db.request_password_reset("a@smile.in").unwrap().unwrap();
    assert_eq!(ticket.clinic_id, creds.clinic_id);

    assert!(matches!(
        db.reset_password(&ticket.token, "new-secret", "other-secret"),
        Err(DbError::Validation(ValidationError::PasswordMismatch))
    ));
    db.reset_password(&ticket.token, "new-secret", "new-secret").unwrap();
    assert!(matches!(
        db.reset_password(&ticket.token, "again-secret", "again-secret"),
        Err(DbError::InvalidCredentials)
    ));

    assert!(db.login(&creds.login_id, &creds.password).is_err());
    db.login(&creds.login_id, "new-secret").unwrap();
}

#[test]
fn test_expired_reset_token_rejected() {
    let db = Database::open_in_memory().unwrap();
    db.register_clinic(&registration("Smile", "a@smile.in")).unwrap();
    let ticket = db.request_password_reset("a@smile.in").unwrap().unwrap();
    db.conn()
        .execute(
            "UPDATE clinics SET reset_expires_at = '2000-01-01T00:00:00Z'",
            [],
        )
        .unwrap();

    assert!(matches!(
        db.reset_password(&ticket.token, "new-secret", "new-secret"),
        Err(DbError::InvalidCredentials)
    ));
}

#[test]
fn test_edit_name_keeps_other_fields() {
    let db = Database::open_in_memory().unwrap();
    let creds = db.register_clinic(&registration("Smile", "a@smile.in")).unwrap();
    let session = db.login(&creds.login_id, &creds.password).unwrap();

    let mut details = PatientDetails::new("Asha");
    details.sex = Some(Sex::Female);
    details.mobile = Some("9876543210".into());
    details.treatment = Some("Root canal".into());
    let patient = db.add_patient(&session, &details, None).unwrap();

    let patch = PatientPatch {
        name: Some("Asha Rao".into()),
        ..Default::default()
    };
    db.patch_patient(&session, &patient.patient_code, &patch).unwrap();

    let stored = db.get_patient(&session, &patient.patient_code).unwrap().unwrap();
    assert_eq!(stored.details.name, "Asha Rao");
    assert_eq!(stored.details.sex, Some(Sex::Female));
    assert_eq!(stored.details.mobile.as_deref(), Some("9876543210"));
    assert_eq!(stored.details.treatment.as_deref(), Some("Root canal"));
    assert_eq!(stored.patient_code, patient.patient_code);
    assert_eq!(stored.created_at, patient.created_at);
}

#[test]
fn test_file_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clinic.db");

    let creds = {
        let db = Database::open(&path).unwrap();
        let creds = db.register_clinic(&registration("Smile", "a@smile.in")).unwrap();
        let session = db.login(&creds.login_id, &creds.password).unwrap();
        db.add_patient(&session, &PatientDetails::new("Asha"), None).unwrap();
        creds
    };

    let db = Database::open(&path).unwrap();
    let session = db.login(&creds.login_id, &creds.password).unwrap();
    assert_eq!(session.patient_count(), 1);
    let next = db.add_patient(&session, &PatientDetails::new("Ravi"), None).unwrap();
    assert_eq!(next.patient_code, "CLINIC0001-P0002");
    let second = db.register_clinic(&registration("Bright", "b@bright.in")).unwrap();
    assert_eq!(second.clinic_code, "CLINIC0002");
}
