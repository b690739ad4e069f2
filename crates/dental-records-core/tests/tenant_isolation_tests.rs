//! Clinic isolation: one clinic's session never reaches another's records.

use dental_records_core::analytics::{Dimension, MetricsAggregator};
use dental_records_core::db::{Database, DbError};
use dental_records_core::export::ReportExporter;
use dental_records_core::models::{
    Address, AppointmentStatus, ClinicRegistration, ClinicSession, NewRevenue, NewVisit,
    PatientDetails, PatientPatch, SearchField,
};

fn clinic(db: &Database, name: &str, email: &str) -> ClinicSession {
    let creds = db.register_clinic(&ClinicRegistration::new(name, email)).unwrap();
    db.login(&creds.login_id, &creds.password).unwrap()
}

fn patient_in(city: &str, name: &str) -> PatientDetails {
    let mut details = PatientDetails::new(name);
    details.address = Address::new(None, Some(city.to_string()), None, None);
    details
}

#[test]
fn test_patient_codes_are_clinic_scoped() {
    let db = Database::open_in_memory().unwrap();
    let a = clinic(&db, "Smile Dental", "a@smile.in");
    let b = clinic(&db, "Bright Teeth", "b@bright.in");

    let a1 = db.add_patient(&a, &PatientDetails::new("Asha"), None).unwrap();
    let b1 = db.add_patient(&b, &PatientDetails::new("Ravi"), None).unwrap();
    let a2 = db.add_patient(&a, &PatientDetails::new("Meena"), None).unwrap();

    assert_eq!(a1.patient_code, "CLINIC0001-P0001");
    assert_eq!(a2.patient_code, "CLINIC0001-P0002");
    assert_eq!(b1.patient_code, "CLINIC0002-P0001");
    assert_eq!(db.count_patients(a.clinic_id()).unwrap(), 2);
    assert_eq!(db.count_patients(b.clinic_id()).unwrap(), 1);
}

#[test]
fn test_foreign_patient_invisible() {
    let db = Database::open_in_memory().unwrap();
    let a = clinic(&db, "Smile Dental", "a@smile.in");
    let b = clinic(&db, "Bright Teeth", "b@bright.in");
    let asha = db.add_patient(&a, &PatientDetails::new("Asha"), None).unwrap();

    assert!(db.get_patient(&b, &asha.patient_code).unwrap().is_none());
    assert!(db.list_patients(&b).unwrap().is_empty());
    assert!(db
        .search_patients(&b, "Asha", SearchField::Name)
        .unwrap()
        .is_empty());
    assert!(db.suggest_patients(&b, "Asha", 5).unwrap().is_empty());
    assert!(matches!(
        db.patient_detail(&b, &asha.patient_code),
        Err(DbError::NotFound(_))
    ));
}

#[test]
fn test_foreign_patient_not_editable() {
    let db = Database::open_in_memory().unwrap();
    let a = clinic(&db, "Smile Dental", "a@smile.in");
    let b = clinic(&db, "Bright Teeth", "b@bright.in");
    let asha = db.add_patient(&a, &PatientDetails::new("Asha"), None).unwrap();

    let renamed = PatientDetails::new("Hijacked");
    assert!(matches!(
        db.update_patient(&b, &asha.patient_code, &renamed),
        Err(DbError::NotFound(_))
    ));
    let patch = PatientPatch {
        name: Some("Hijacked".into()),
        ..Default::default()
    };
    assert!(matches!(
        db.patch_patient(&b, &asha.patient_code, &patch),
        Err(DbError::NotFound(_))
    ));
    assert!(matches!(
        db.record_visit(&b, &asha.patient_code, &NewVisit::new("Caries", 100.0)),
        Err(DbError::NotFound(_))
    ));
    assert!(matches!(
        db.record_payment(&b, &asha.patient_code, &NewRevenue::new("Crown", 100.0)),
        Err(DbError::NotFound(_))
    ));

    let unchanged = db.get_patient(&a, &asha.patient_code).unwrap().unwrap();
    assert_eq!(unchanged.details.name, "Asha");
    assert!(db.list_visits(&a, &asha.patient_code).unwrap().is_empty());
}

#[test]
fn test_foreign_appointment_not_editable() {
    let db = Database::open_in_memory().unwrap();
    let a = clinic(&db, "Smile Dental", "a@smile.in");
    let b = clinic(&db, "Bright Teeth", "b@bright.in");
    let asha = db.add_patient(&a, &PatientDetails::new("Asha"), None).unwrap();
    let when = chrono::NaiveDate::from_ymd_opt(2030, 1, 15)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();

    assert!(matches!(
        db.schedule_appointment(&b, &asha.patient_code, when, None, None),
        Err(DbError::NotFound(_))
    ));
    let appt = db
        .schedule_appointment(&a, &asha.patient_code, when, Some("Cleaning".into()), None)
        .unwrap();
    assert!(matches!(
        db.set_appointment_status(&b, appt.id, AppointmentStatus::Cancelled),
        Err(DbError::NotFound(_))
    ));
    assert!(db.list_appointments(&b, false).unwrap().is_empty());
    assert_eq!(db.list_appointments(&a, true).unwrap().len(), 1);
}

#[test]
fn test_metrics_and_reports_scoped() {
    let db = Database::open_in_memory().unwrap();
    let a = clinic(&db, "Smile Dental", "a@smile.in");
    let b = clinic(&db, "Bright Teeth", "b@bright.in");

    db.add_patient(&a, &patient_in("Pune", "Asha"), Some(&NewVisit::new("Caries", 500.0)))
        .unwrap();
    db.add_patient(&b, &patient_in("Nagpur", "Ravi"), Some(&NewVisit::new("Abscess", 50.0)))
        .unwrap();

    let metrics = MetricsAggregator::new(&db);
    assert_eq!(metrics.total_revenue(a.clinic_id()).unwrap(), 500.0);
    assert_eq!(metrics.total_revenue(b.clinic_id()).unwrap(), 50.0);

    let cities = metrics.breakdown_by(b.clinic_id(), Dimension::City).unwrap();
    assert_eq!(cities.len(), 1);
    assert_eq!(cities[0].category, "Nagpur");

    let exporter = ReportExporter::new(&db);
    let report = exporter.comprehensive_report(a.clinic_id()).unwrap();
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].name, "Asha");

    let ledger = exporter.financial_report(b.clinic_id()).unwrap();
    assert_eq!(ledger.transaction_count, 1);
    assert_eq!(ledger.total_revenue, 50.0);
}
