//! dentalctl: command-line access to a dental records store.
//!
//! Usage:
//!   dentalctl register-clinic --name <name> --email <email>
//!   dentalctl add-patient --login-id <id> --password <pw> --name <name> [--city <city>]
//!   dentalctl dashboard --login-id <id> --password <pw>
//!   dentalctl report financial --format csv --output ledger.csv
//!
//! Results are printed as JSON on stdout; logs go to stderr (`RUST_LOG`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use dental_records_core::{
    Address, AlertSeverity, AppointmentStatus, ClinicRegistration, ClinicSession, Database,
    Dimension, FeedbackType, MetricsAggregator, NewAlert, NewFeedback, NewRevenue, NewVisit,
    PasswordResetTicket, PatientDetails, PatientPatch, PatientStatus, PaymentMethod,
    PaymentStatus, ReportExporter, SearchField, Sex, StoreConfig,
};

const SUGGESTION_LIMIT: usize = 5;

#[derive(Parser)]
#[command(name = "dentalctl")]
#[command(version)]
#[command(about = "Manage dental clinic patient records and reports", long_about = None)]
struct Cli {
    /// TOML settings file
    #[arg(long, env = "DENTAL_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// SQLite database file (overrides the config file)
    #[arg(long, env = "DENTAL_DB", global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Credentials {
    /// Clinic login ID issued at registration
    #[arg(long, env = "DENTAL_LOGIN_ID")]
    login_id: String,

    #[arg(long, env = "DENTAL_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new clinic and print its credentials
    RegisterClinic {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        location: Option<String>,
        /// Person in charge
        #[arg(long)]
        incharge: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },

    /// Check credentials and print the clinic session
    Login {
        #[command(flatten)]
        creds: Credentials,
    },

    /// Issue a password-reset token for a clinic email
    ///
    /// The answer is the same whether or not the email is registered. The
    /// ticket itself is written to the outbox directory.
    ResetRequest {
        email: String,
        /// Directory that receives reset tickets for delivery
        #[arg(long, env = "DENTAL_RESET_OUTBOX")]
        outbox: Option<PathBuf>,
    },

    /// Set a new password using a reset token
    ResetPassword {
        token: String,
        #[arg(long)]
        new_password: String,
        #[arg(long)]
        confirm: String,
    },

    /// Change the password of a logged-in clinic
    ChangePassword {
        #[command(flatten)]
        creds: Credentials,
        #[arg(long)]
        new_password: String,
    },

    /// Update the clinic's contact details
    UpdateClinic {
        #[command(flatten)]
        creds: Credentials,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        incharge: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },

    /// Register a patient, optionally with a first visit
    AddPatient {
        #[command(flatten)]
        creds: Credentials,
        #[command(flatten)]
        patient: PatientArgs,
        #[command(flatten)]
        visit: VisitArgs,
    },

    /// Change selected fields of a patient
    EditPatient {
        #[command(flatten)]
        creds: Credentials,
        patient_code: String,
        #[command(flatten)]
        patch: PatchArgs,
    },

    /// Print a patient with visits, payments and appointments
    ShowPatient {
        #[command(flatten)]
        creds: Credentials,
        patient_code: String,
    },

    /// List all patients, newest first
    ListPatients {
        #[command(flatten)]
        creds: Credentials,
    },

    /// Search patients; name searches with no hits print close matches
    SearchPatients {
        #[command(flatten)]
        creds: Credentials,
        query: String,
        /// name, phone, patient_code or treatment
        #[arg(long, default_value = "name")]
        field: SearchField,
    },

    /// Record a visit for a patient
    RecordVisit {
        #[command(flatten)]
        creds: Credentials,
        patient_code: String,
        #[command(flatten)]
        visit: VisitArgs,
    },

    /// Record a payment for a patient
    RecordPayment {
        #[command(flatten)]
        creds: Credentials,
        patient_code: String,
        #[arg(long)]
        service: Option<String>,
        #[arg(long)]
        amount: f64,
        #[arg(long, default_value_t = 0.0)]
        tax: f64,
        #[arg(long, default_value_t = 0.0)]
        discount: f64,
        /// Cash, Card, UPI, Insurance or Other
        #[arg(long)]
        method: Option<PaymentMethod>,
        #[arg(long, default_value = "completed")]
        status: PaymentStatus,
        /// Transaction date, YYYY-MM-DD (default today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Visit this payment settles
        #[arg(long)]
        visit_id: Option<i64>,
    },

    /// Book an appointment
    Schedule {
        #[command(flatten)]
        creds: Credentials,
        patient_code: String,
        /// "YYYY-MM-DD HH:MM"
        #[arg(value_parser = parse_when)]
        when: NaiveDateTime,
        #[arg(long)]
        treatment: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// List appointments
    Appointments {
        #[command(flatten)]
        creds: Credentials,
        /// Only future appointments still scheduled
        #[arg(long)]
        upcoming: bool,
    },

    /// Mark an appointment completed, cancelled or no-show
    SetAppointment {
        #[command(flatten)]
        creds: Credentials,
        appointment_id: i64,
        status: AppointmentStatus,
    },

    /// Record a patient's review
    AddFeedback {
        #[command(flatten)]
        creds: Credentials,
        patient_code: String,
        /// 1-5
        #[arg(long)]
        rating: Option<u8>,
        /// treatment, service, facility or overall
        #[arg(long, default_value = "overall")]
        kind: FeedbackType,
        #[arg(long)]
        review: Option<String>,
        /// -1 (negative) to 1 (positive)
        #[arg(long, allow_negative_numbers = true)]
        sentiment: Option<f64>,
        #[arg(long)]
        improve: Option<String>,
        #[arg(long)]
        not_recommended: bool,
        /// Feedback date, YYYY-MM-DD (default today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// List reviews, newest first, with their summary
    Feedback {
        #[command(flatten)]
        creds: Credentials,
    },

    /// Post an alert to the clinic dashboard
    RaiseAlert {
        #[command(flatten)]
        creds: Credentials,
        /// Category, e.g. "Inventory Alert"
        alert_type: String,
        message: String,
        /// low, medium or high
        #[arg(long, default_value = "medium")]
        severity: AlertSeverity,
        #[arg(long)]
        action_required: bool,
        /// Patient the alert is about
        #[arg(long)]
        patient: Option<String>,
    },

    /// List unread alerts
    Alerts {
        #[command(flatten)]
        creds: Credentials,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },

    /// Mark an alert read
    ReadAlert {
        #[command(flatten)]
        creds: Credentials,
        alert_id: i64,
    },

    /// Print all clinic metrics
    Dashboard {
        #[command(flatten)]
        creds: Credentials,
    },

    /// Count patients or visits per category
    Breakdown {
        #[command(flatten)]
        creds: Credentials,
        /// gender, treatment, diagnosis, payment_method, city, state or village_town
        dimension: Dimension,
    },

    /// Patients, visits, revenue and rating per doctor
    Doctors {
        #[command(flatten)]
        creds: Credentials,
    },

    /// Export a report
    Report {
        #[command(flatten)]
        creds: Credentials,
        #[arg(value_enum)]
        kind: ReportKind,
        #[arg(long, value_enum, default_value = "json")]
        format: ReportFormat,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct PatientArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    sex: Option<Sex>,
    /// Ignored when --dob is given
    #[arg(long)]
    age: Option<u32>,
    /// Date of birth, YYYY-MM-DD
    #[arg(long)]
    dob: Option<NaiveDate>,
    #[arg(long)]
    mobile: Option<String>,
    #[arg(long)]
    email: Option<String>,
    /// Free-text "village, city, state[, India - pincode]"
    #[arg(long, conflicts_with_all = ["village_town", "city", "state", "pincode"])]
    address: Option<String>,
    #[arg(long)]
    village_town: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    pincode: Option<String>,
    #[arg(long)]
    allergies: Option<String>,
    #[arg(long)]
    medical_history: Option<String>,
    #[arg(long)]
    chief_complaint: Option<String>,
    /// 0-10
    #[arg(long)]
    pain_level: Option<u8>,
    #[arg(long)]
    treatment: Option<String>,
    #[arg(long)]
    doctor: Option<String>,
}

impl PatientArgs {
    fn into_details(self) -> Result<PatientDetails> {
        let mut details = PatientDetails::new(self.name);
        details.sex = self.sex;
        details.age = self.age;
        details.dob = self.dob;
        details.mobile = self.mobile;
        details.email = self.email;
        details.address = match self.address {
            Some(text) => parse_address(&text)?,
            None => Address::new(self.village_town, self.city, self.state, self.pincode),
        };
        details.medical.allergies = self.allergies;
        details.medical.medical_history = self.medical_history;
        details.medical.chief_complaint = self.chief_complaint;
        details.medical.pain_level = self.pain_level;
        details.treatment = self.treatment;
        details.preferred_doctor = self.doctor;
        Ok(details)
    }
}

#[derive(Args)]
struct PatchArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    sex: Option<Sex>,
    #[arg(long)]
    dob: Option<NaiveDate>,
    #[arg(long)]
    mobile: Option<String>,
    #[arg(long)]
    email: Option<String>,
    /// Replaces the whole address
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    treatment: Option<String>,
    #[arg(long)]
    doctor: Option<String>,
    #[arg(long)]
    allergies: Option<String>,
    #[arg(long)]
    medical_history: Option<String>,
    #[arg(long)]
    pain_level: Option<u8>,
    /// active or inactive
    #[arg(long)]
    status: Option<PatientStatus>,
}

impl PatchArgs {
    fn into_patch(self) -> Result<PatientPatch> {
        Ok(PatientPatch {
            name: self.name,
            sex: self.sex,
            dob: self.dob,
            mobile: self.mobile,
            email: self.email,
            address: self.address.as_deref().map(parse_address).transpose()?,
            treatment: self.treatment,
            preferred_doctor: self.doctor,
            allergies: self.allergies,
            medical_history: self.medical_history,
            pain_level: self.pain_level,
            status: self.status,
        })
    }
}

#[derive(Args)]
struct VisitArgs {
    /// Visit date, YYYY-MM-DD (default today)
    #[arg(long)]
    visit_date: Option<NaiveDate>,
    #[arg(long)]
    symptoms: Option<String>,
    #[arg(long)]
    diagnosis: Option<String>,
    #[arg(long)]
    treatment_given: Option<String>,
    #[arg(long)]
    cost: Option<f64>,
    /// 1-5
    #[arg(long)]
    rating: Option<u8>,
    #[arg(long)]
    visit_doctor: Option<String>,
    #[arg(long)]
    payment_mode: Option<PaymentMethod>,
    /// Treatment outcome, 0-100 percent
    #[arg(long)]
    success_rate: Option<f64>,
}

impl VisitArgs {
    fn is_empty(&self) -> bool {
        self.diagnosis.is_none() && self.treatment_given.is_none() && self.symptoms.is_none() && self.cost.is_none()
    }

    fn into_visit(self) -> NewVisit {
        NewVisit {
            visit_date: self.visit_date,
            symptoms: self.symptoms,
            diagnosis: self.diagnosis,
            treatment_given: self.treatment_given,
            treatment_cost: self.cost.unwrap_or(0.0),
            satisfaction_rating: self.rating,
            doctor_assigned: self.visit_doctor,
            payment_mode: self.payment_mode,
            treatment_success_rate: self.success_rate,
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportKind {
    /// One row per patient visit
    Comprehensive,
    /// Revenue ledger with totals
    Financial,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Json,
    Csv,
}

fn parse_when(s: &str) -> Result<NaiveDateTime, String> {
    ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s.trim(), fmt).ok())
        .ok_or_else(|| format!("expected \"YYYY-MM-DD HH:MM\", got {s:?}"))
}

fn parse_address(text: &str) -> Result<Address> {
    match Address::parse_legacy(text) {
        Some(address) => Ok(address),
        None => bail!("address must look like \"village, city, state[, India - pincode]\": {text:?}"),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Debug, PartialEq, Serialize)]
struct ResetAcknowledgement {
    requested: bool,
    message: &'static str,
}

/// Drops the ticket into the outbox, if any, and returns the reply shown to
/// the caller. The reply never depends on whether a ticket was issued.
fn deliver_reset_ticket(
    ticket: Option<&PasswordResetTicket>,
    outbox: Option<&Path>,
) -> Result<ResetAcknowledgement> {
    match (ticket, outbox) {
        (Some(ticket), Some(dir)) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating outbox {}", dir.display()))?;
            let path = dir.join(format!("reset-{}.json", ticket.clinic_id));
            fs::write(&path, serde_json::to_string_pretty(ticket)?)
                .with_context(|| format!("writing {}", path.display()))?;
            debug!(clinic_id = ticket.clinic_id, "reset ticket queued");
        }
        (Some(ticket), None) => {
            debug!(clinic_id = ticket.clinic_id, "no outbox configured, reset ticket dropped");
        }
        (None, _) => {}
    }
    Ok(ResetAcknowledgement {
        requested: true,
        message: "if the email belongs to a clinic, a reset token has been sent",
    })
}

fn login(db: &Database, creds: &Credentials) -> Result<ClinicSession> {
    db.login(&creds.login_id, &creds.password)
        .with_context(|| format!("login as {} failed", creds.login_id))
}

fn load_config(cli: &Cli) -> Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.database_path = db.clone();
    }
    Ok(config)
}

fn run(db: &Database, command: Commands) -> Result<()> {
    match command {
        Commands::RegisterClinic {
            name,
            email,
            location,
            incharge,
            phone,
        } => {
            let registration = ClinicRegistration {
                name,
                location,
                incharge,
                email,
                phone,
            };
            let creds = db.register_clinic(&registration).context("registration failed")?;
            print_json(&creds)
        }

        Commands::Login { creds } => print_json(&login(db, &creds)?),

        Commands::ResetRequest { email, outbox } => {
            let ticket = db.request_password_reset(&email)?;
            print_json(&deliver_reset_ticket(ticket.as_ref(), outbox.as_deref())?)
        }

        Commands::ResetPassword {
            token,
            new_password,
            confirm,
        } => {
            db.reset_password(&token, &new_password, &confirm)
                .context("password reset failed")?;
            info!("password reset");
            print_json(&serde_json::json!({ "reset": true }))
        }

        Commands::ChangePassword { creds, new_password } => {
            let session = login(db, &creds)?;
            db.change_password(&session, &creds.password, &new_password)?;
            print_json(&serde_json::json!({ "changed": true }))
        }

        Commands::UpdateClinic {
            creds,
            location,
            incharge,
            phone,
        } => {
            let session = login(db, &creds)?;
            print_json(&db.update_clinic_contact(&session, location, incharge, phone)?)
        }

        Commands::AddPatient { creds, patient, visit } => {
            let session = login(db, &creds)?;
            let details = patient.into_details()?;
            let visit = (!visit.is_empty()).then(|| visit.into_visit());
            let patient = db.add_patient(&session, &details, visit.as_ref())?;
            print_json(&patient)
        }

        Commands::EditPatient {
            creds,
            patient_code,
            patch,
        } => {
            let session = login(db, &creds)?;
            let patient = db.patch_patient(&session, &patient_code, &patch.into_patch()?)?;
            print_json(&patient)
        }

        Commands::ShowPatient { creds, patient_code } => {
            let session = login(db, &creds)?;
            print_json(&db.patient_detail(&session, &patient_code)?)
        }

        Commands::ListPatients { creds } => {
            let session = login(db, &creds)?;
            print_json(&db.list_patients(&session)?)
        }

        Commands::SearchPatients { creds, query, field } => {
            let session = login(db, &creds)?;
            let results = db.search_patients(&session, &query, field)?;
            if results.is_empty() && field == SearchField::Name {
                let suggestions = db.suggest_patients(&session, &query, SUGGESTION_LIMIT)?;
                debug!(count = suggestions.len(), "no exact match, offering suggestions");
                return print_json(&serde_json::json!({
                    "results": results,
                    "suggestions": suggestions,
                }));
            }
            print_json(&serde_json::json!({ "results": results }))
        }

        Commands::RecordVisit {
            creds,
            patient_code,
            visit,
        } => {
            let session = login(db, &creds)?;
            print_json(&db.record_visit(&session, &patient_code, &visit.into_visit())?)
        }

        Commands::RecordPayment {
            creds,
            patient_code,
            service,
            amount,
            tax,
            discount,
            method,
            status,
            date,
            visit_id,
        } => {
            let session = login(db, &creds)?;
            let payment = NewRevenue {
                transaction_date: date,
                visit_id,
                service_type: service,
                base_amount: amount,
                tax_amount: tax,
                discount_amount: discount,
                payment_method: method,
                payment_status: status,
            };
            print_json(&db.record_payment(&session, &patient_code, &payment)?)
        }

        Commands::Schedule {
            creds,
            patient_code,
            when,
            treatment,
            notes,
        } => {
            let session = login(db, &creds)?;
            print_json(&db.schedule_appointment(&session, &patient_code, when, treatment, notes)?)
        }

        Commands::Appointments { creds, upcoming } => {
            let session = login(db, &creds)?;
            print_json(&db.list_appointments(&session, upcoming)?)
        }

        Commands::SetAppointment {
            creds,
            appointment_id,
            status,
        } => {
            let session = login(db, &creds)?;
            print_json(&db.set_appointment_status(&session, appointment_id, status)?)
        }

        Commands::AddFeedback {
            creds,
            patient_code,
            rating,
            kind,
            review,
            sentiment,
            improve,
            not_recommended,
            date,
        } => {
            let session = login(db, &creds)?;
            let feedback = NewFeedback {
                feedback_type: kind,
                rating,
                review_text: review,
                sentiment_score: sentiment,
                areas_for_improvement: improve,
                would_recommend: !not_recommended,
                feedback_date: date,
            };
            print_json(&db.record_feedback(&session, &patient_code, &feedback)?)
        }

        Commands::Feedback { creds } => {
            let session = login(db, &creds)?;
            let summary = MetricsAggregator::new(db).feedback_summary(session.clinic_id())?;
            print_json(&serde_json::json!({
                "summary": summary,
                "feedback": db.list_feedback(&session)?,
            }))
        }

        Commands::RaiseAlert {
            creds,
            alert_type,
            message,
            severity,
            action_required,
            patient,
        } => {
            let session = login(db, &creds)?;
            let alert = NewAlert {
                alert_type,
                message,
                severity,
                action_required,
                patient_code: patient,
            };
            print_json(&db.raise_alert(&session, &alert)?)
        }

        Commands::Alerts { creds, limit } => {
            let session = login(db, &creds)?;
            print_json(&db.active_alerts(&session, limit)?)
        }

        Commands::ReadAlert { creds, alert_id } => {
            let session = login(db, &creds)?;
            db.mark_alert_read(&session, alert_id)?;
            print_json(&serde_json::json!({ "read": alert_id }))
        }

        Commands::Dashboard { creds } => {
            let session = login(db, &creds)?;
            print_json(&MetricsAggregator::new(db).dashboard(session.clinic_id())?)
        }

        Commands::Breakdown { creds, dimension } => {
            let session = login(db, &creds)?;
            print_json(&MetricsAggregator::new(db).breakdown_by(session.clinic_id(), dimension)?)
        }

        Commands::Doctors { creds } => {
            let session = login(db, &creds)?;
            print_json(&MetricsAggregator::new(db).doctor_performance(session.clinic_id())?)
        }

        Commands::Report {
            creds,
            kind,
            format,
            output,
        } => {
            let session = login(db, &creds)?;
            let exporter = ReportExporter::new(db);
            let text = match (kind, format) {
                (ReportKind::Comprehensive, ReportFormat::Json) => {
                    exporter.comprehensive_report(session.clinic_id())?.to_json()?
                }
                (ReportKind::Comprehensive, ReportFormat::Csv) => {
                    exporter.comprehensive_report(session.clinic_id())?.to_csv()
                }
                (ReportKind::Financial, ReportFormat::Json) => {
                    exporter.financial_report(session.clinic_id())?.to_json()?
                }
                (ReportKind::Financial, ReportFormat::Csv) => {
                    exporter.financial_report(session.clinic_id())?.to_csv()
                }
            };
            match output {
                Some(path) => {
                    fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
                    info!(path = %path.display(), "report written");
                }
                None => print!("{text}"),
            }
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let db = Database::open_with_config(&config)
        .with_context(|| format!("opening database {}", config.database_path.display()))?;
    run(&db, cli.command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_when() {
        let when = parse_when("2024-05-01 09:30").unwrap();
        assert_eq!(when.to_string(), "2024-05-01 09:30:00");
        assert!(parse_when("2024-05-01T09:30").is_ok());
        assert!(parse_when("tomorrow").is_err());
    }

    #[test]
    fn test_free_text_address() {
        let args = Cli::try_parse_from([
            "dentalctl",
            "add-patient",
            "--login-id",
            "SMIL001",
            "--password",
            "secret",
            "--name",
            "Asha",
            "--address",
            "Baner, Pune, Maharashtra, India - 411045",
        ])
        .unwrap();
        let Commands::AddPatient { patient, visit, .. } = args.command else {
            panic!("expected add-patient");
        };
        assert!(visit.is_empty());
        let details = patient.into_details().unwrap();
        assert_eq!(details.address.city.as_deref(), Some("Pune"));
        assert_eq!(details.address.pincode.as_deref(), Some("411045"));
    }

    #[test]
    fn test_two_part_address_rejected() {
        assert!(parse_address("Pune, Maharashtra").is_err());
    }

    #[test]
    fn test_reset_reply_is_uniform() {
        let outbox = tempfile::tempdir().unwrap();
        let ticket = PasswordResetTicket {
            clinic_id: 7,
            clinic_name: "Smile Care".into(),
            token: "abc123".into(),
            expires_at: "2024-05-01T10:00:00".into(),
        };

        let known = deliver_reset_ticket(Some(&ticket), Some(outbox.path())).unwrap();
        let unknown = deliver_reset_ticket(None, Some(outbox.path())).unwrap();
        assert_eq!(known, unknown);
        assert_eq!(
            serde_json::to_string(&known).unwrap(),
            serde_json::to_string(&unknown).unwrap()
        );
        assert!(!serde_json::to_string(&known).unwrap().contains("abc123"));

        let queued = fs::read_to_string(outbox.path().join("reset-7.json")).unwrap();
        assert!(queued.contains("abc123"));
        assert_eq!(fs::read_dir(outbox.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_feedback_and_alert_args() {
        let args = Cli::try_parse_from([
            "dentalctl",
            "add-feedback",
            "--login-id",
            "SMIL001",
            "--password",
            "secret",
            "CLINIC0001-P0001",
            "--rating",
            "4",
            "--kind",
            "treatment",
            "--sentiment",
            "-0.25",
            "--not-recommended",
        ])
        .unwrap();
        let Commands::AddFeedback {
            rating,
            kind,
            sentiment,
            not_recommended,
            ..
        } = args.command
        else {
            panic!("expected add-feedback");
        };
        assert_eq!(rating, Some(4));
        assert_eq!(kind, FeedbackType::Treatment);
        assert_eq!(sentiment, Some(-0.25));
        assert!(not_recommended);

        let args = Cli::try_parse_from([
            "dentalctl",
            "raise-alert",
            "--login-id",
            "SMIL001",
            "--password",
            "secret",
            "Inventory Alert",
            "Low stock of dental supplies",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Commands::RaiseAlert {
                severity: AlertSeverity::Medium,
                action_required: false,
                ..
            }
        ));
    }

    #[test]
    fn test_value_parsers() {
        let args = Cli::try_parse_from([
            "dentalctl",
            "breakdown",
            "--login-id",
            "SMIL001",
            "--password",
            "secret",
            "payment_method",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Commands::Breakdown {
                dimension: Dimension::PaymentMethod,
                ..
            }
        ));
        assert!(Cli::try_parse_from(["dentalctl", "breakdown", "--login-id", "x", "--password", "y", "planet"]).is_err());
    }
}
