//! Metric queries.

use rusqlite::params;
use tracing::debug;

use super::{
    percentage, round_to, AppointmentStats, CategoryCount, Demographics, Dimension,
    DiagnosisPattern, DoctorPerformance, FeedbackSummary, LocationSummary, MethodTotal,
    MonthlyCount, MonthlyRevenue, Retention, RevenueSummary,
};
use crate::db::{Database, DbResult};

/// Read-only metrics over one database.
pub struct MetricsAggregator<'a> {
    db: &'a Database,
}

impl<'a> MetricsAggregator<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub(crate) fn db(&self) -> &'a Database {
        self.db
    }

    /// Patients registered under the clinic.
    pub fn total_patients(&self, clinic_id: i64) -> DbResult<i64> {
        self.db.count_patients(clinic_id)
    }

    /// Visits recorded for the clinic.
    pub fn total_visits(&self, clinic_id: i64) -> DbResult<i64> {
        let n = self.db.conn().query_row(
            "SELECT COUNT(*) FROM patient_analytics WHERE clinic_id = ?",
            [clinic_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    /// Sum of visit costs; 0 with no visits.
    pub fn total_revenue(&self, clinic_id: i64) -> DbResult<f64> {
        let total = self.db.conn().query_row(
            "SELECT COALESCE(SUM(treatment_cost), 0.0) FROM patient_analytics WHERE clinic_id = ?",
            [clinic_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Mean satisfaction over rated visits; 0 when nothing is rated.
    pub fn average_rating(&self, clinic_id: i64) -> DbResult<f64> {
        let avg: Option<f64> = self.db.conn().query_row(
            "SELECT AVG(satisfaction_rating) FROM patient_analytics
             WHERE clinic_id = ? AND satisfaction_rating IS NOT NULL",
            [clinic_id],
            |row| row.get(0),
        )?;
        Ok(avg.unwrap_or(0.0))
    }

    /// Counts per category, largest first. Blank categories are skipped.
    pub fn breakdown_by(&self, clinic_id: i64, dimension: Dimension) -> DbResult<Vec<CategoryCount>> {
        let (table, column) = dimension.source();
        debug!(clinic_id, %dimension, "breakdown");
        let mut stmt = self.db.conn().prepare(&format!(
            r#"
            SELECT TRIM({column}) AS category, COUNT(*) AS n
            FROM {table}
            WHERE clinic_id = ?1 AND {column} IS NOT NULL AND TRIM({column}) != ''
            GROUP BY category
            ORDER BY n DESC, category ASC
            "#
        ))?;
        let rows = stmt.query_map([clinic_id], |row| {
            Ok(CategoryCount {
                category: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Per-doctor figures, highest revenue first.
    pub fn doctor_performance(&self, clinic_id: i64) -> DbResult<Vec<DoctorPerformance>> {
        let mut stmt = self.db.conn().prepare(
            r#"
            SELECT doctor_assigned,
                   COUNT(DISTINCT patient_id),
                   COUNT(*),
                   COALESCE(SUM(treatment_cost), 0.0) AS revenue,
                   AVG(satisfaction_rating)
            FROM patient_analytics
            WHERE clinic_id = ?1 AND doctor_assigned IS NOT NULL AND TRIM(doctor_assigned) != ''
            GROUP BY doctor_assigned
            ORDER BY revenue DESC, doctor_assigned ASC
            "#,
        )?;
        let rows = stmt.query_map([clinic_id], |row| {
            Ok(DoctorPerformance {
                doctor: row.get(0)?,
                patients: row.get(1)?,
                visits: row.get(2)?,
                revenue: row.get(3)?,
                average_rating: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn demographics(&self, clinic_id: i64) -> DbResult<Demographics> {
        self.db
            .conn()
            .query_row(
                r#"
                SELECT COUNT(*),
                       AVG(age),
                       COUNT(CASE WHEN LOWER(sex) IN ('male', 'm') THEN 1 END),
                       COUNT(CASE WHEN LOWER(sex) IN ('female', 'f') THEN 1 END),
                       COUNT(CASE WHEN LOWER(sex) IN ('other', 'o') THEN 1 END)
                FROM patients
                WHERE clinic_id = ?
                "#,
                [clinic_id],
                |row| {
                    Ok(Demographics {
                        total_patients: row.get(0)?,
                        average_age: round_to(row.get::<_, Option<f64>>(1)?.unwrap_or(0.0), 1),
                        male: row.get(2)?,
                        female: row.get(3)?,
                        other: row.get(4)?,
                    })
                },
            )
            .map_err(Into::into)
    }

    /// Registrations per month, newest month first, at most `months` rows.
    pub fn monthly_registrations(&self, clinic_id: i64, months: u32) -> DbResult<Vec<MonthlyCount>> {
        let mut stmt = self.db.conn().prepare(
            r#"
            SELECT strftime('%Y-%m', created_at) AS month, COUNT(*)
            FROM patients
            WHERE clinic_id = ?1 AND created_at IS NOT NULL
            GROUP BY month
            HAVING month IS NOT NULL
            ORDER BY month DESC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![clinic_id, months], |row| {
            Ok(MonthlyCount {
                month: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Visit revenue per month, newest month first, at most `months` rows.
    pub fn monthly_revenue(&self, clinic_id: i64, months: u32) -> DbResult<Vec<MonthlyRevenue>> {
        let mut stmt = self.db.conn().prepare(
            r#"
            SELECT strftime('%Y-%m', visit_date) AS month,
                   COALESCE(SUM(treatment_cost), 0.0),
                   COUNT(*)
            FROM patient_analytics
            WHERE clinic_id = ?1 AND visit_date IS NOT NULL
            GROUP BY month
            HAVING month IS NOT NULL
            ORDER BY month DESC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![clinic_id, months], |row| {
            Ok(MonthlyRevenue {
                month: row.get(0)?,
                revenue: row.get(1)?,
                visits: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Totals over the revenue ledger, excluding refunds.
    pub fn revenue_summary(&self, clinic_id: i64) -> DbResult<RevenueSummary> {
        let conn = self.db.conn();
        let (total, average, transactions): (f64, Option<f64>, i64) = conn.query_row(
            r#"
            SELECT COALESCE(SUM(final_amount), 0.0), AVG(final_amount), COUNT(*)
            FROM revenue_analytics
            WHERE clinic_id = ?1 AND COALESCE(payment_status, 'Completed') != 'Refunded'
            "#,
            [clinic_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let mut stmt = conn.prepare(
            r#"
            SELECT payment_method, COALESCE(SUM(final_amount), 0.0) AS total, COUNT(*)
            FROM revenue_analytics
            WHERE clinic_id = ?1
              AND COALESCE(payment_status, 'Completed') != 'Refunded'
              AND payment_method IS NOT NULL AND TRIM(payment_method) != ''
            GROUP BY payment_method
            ORDER BY total DESC, payment_method ASC
            "#,
        )?;
        let by_method = stmt
            .query_map([clinic_id], |row| {
                Ok(MethodTotal {
                    method: row.get(0)?,
                    total: row.get(1)?,
                    transactions: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RevenueSummary {
            total,
            average_transaction: round_to(average.unwrap_or(0.0), 2),
            transactions,
            by_method,
        })
    }

    /// Most frequent diagnoses with their cost, rating and success rate.
    pub fn diagnosis_patterns(&self, clinic_id: i64, limit: u32) -> DbResult<Vec<DiagnosisPattern>> {
        let mut stmt = self.db.conn().prepare(
            r#"
            SELECT TRIM(diagnosis) AS d, COUNT(*) AS n, AVG(treatment_cost), AVG(satisfaction_rating),
                   AVG(treatment_success_rate)
            FROM patient_analytics
            WHERE clinic_id = ?1 AND diagnosis IS NOT NULL AND TRIM(diagnosis) != ''
            GROUP BY d
            ORDER BY n DESC, d ASC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![clinic_id, limit], |row| {
            Ok(DiagnosisPattern {
                diagnosis: row.get(0)?,
                frequency: row.get(1)?,
                average_cost: round_to(row.get::<_, Option<f64>>(2)?.unwrap_or(0.0), 2),
                average_rating: round_to(row.get::<_, Option<f64>>(3)?.unwrap_or(0.0), 2),
                success_rate: round_to(row.get::<_, Option<f64>>(4)?.unwrap_or(0.0), 1),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Ratings, sentiment and recommendations across all reviews.
    pub fn feedback_summary(&self, clinic_id: i64) -> DbResult<FeedbackSummary> {
        let mut summary = self.db.conn().query_row(
            r#"
            SELECT COUNT(*), AVG(rating), AVG(sentiment_score),
                   COUNT(CASE WHEN COALESCE(would_recommend, 1) != 0 THEN 1 END)
            FROM patient_feedback
            WHERE clinic_id = ?
            "#,
            [clinic_id],
            |row| {
                Ok(FeedbackSummary {
                    total_feedback: row.get(0)?,
                    average_rating: round_to(row.get::<_, Option<f64>>(1)?.unwrap_or(0.0), 2),
                    average_sentiment: round_to(row.get::<_, Option<f64>>(2)?.unwrap_or(0.0), 2),
                    recommendations: row.get(3)?,
                    recommendation_rate: 0.0,
                })
            },
        )?;
        summary.recommendation_rate = percentage(summary.recommendations, summary.total_feedback);
        Ok(summary)
    }

    /// How many patients come back, and what they spend.
    pub fn retention(&self, clinic_id: i64) -> DbResult<Retention> {
        let total_patients = self.total_patients(clinic_id)?;
        let total_visits = self.total_visits(clinic_id)?;
        let total_revenue = self.total_revenue(clinic_id)?;
        let returning_patients: i64 = self.db.conn().query_row(
            r#"
            SELECT COUNT(*) FROM (
                SELECT patient_id FROM patient_analytics
                WHERE clinic_id = ?
                GROUP BY patient_id
                HAVING COUNT(*) > 1
            )
            "#,
            [clinic_id],
            |row| row.get(0),
        )?;

        let per_patient = |value: f64| {
            if total_patients == 0 {
                0.0
            } else {
                round_to(value / total_patients as f64, 2)
            }
        };
        Ok(Retention {
            total_patients,
            returning_patients,
            retention_rate: percentage(returning_patients, total_patients),
            average_visits: per_patient(total_visits as f64),
            average_spend: per_patient(total_revenue),
        })
    }

    pub fn appointment_stats(&self, clinic_id: i64) -> DbResult<AppointmentStats> {
        let mut stats = self.db.conn().query_row(
            r#"
            SELECT COUNT(*),
                   COUNT(CASE WHEN status = 'Scheduled' THEN 1 END),
                   COUNT(CASE WHEN status = 'Completed' THEN 1 END),
                   COUNT(CASE WHEN status = 'Cancelled' THEN 1 END),
                   COUNT(CASE WHEN REPLACE(REPLACE(status, '-', ''), ' ', '') = 'NoShow' THEN 1 END)
            FROM appointments
            WHERE clinic_id = ?
            "#,
            [clinic_id],
            |row| {
                Ok(AppointmentStats {
                    total: row.get(0)?,
                    scheduled: row.get(1)?,
                    completed: row.get(2)?,
                    cancelled: row.get(3)?,
                    no_shows: row.get(4)?,
                    completion_rate: 0.0,
                })
            },
        )?;
        stats.completion_rate = percentage(stats.completed, stats.total);
        Ok(stats)
    }

    /// Per-city patient counts with visit cost and rating, busiest first.
    pub fn location_summary(&self, clinic_id: i64, limit: u32) -> DbResult<Vec<LocationSummary>> {
        let mut stmt = self.db.conn().prepare(
            r#"
            SELECT TRIM(p.address_city) AS city,
                   COUNT(DISTINCT p.id) AS n,
                   AVG(v.treatment_cost),
                   AVG(v.satisfaction_rating)
            FROM patients p
            LEFT JOIN patient_analytics v ON v.patient_id = p.id
            WHERE p.clinic_id = ?1 AND p.address_city IS NOT NULL AND TRIM(p.address_city) != ''
            GROUP BY city
            ORDER BY n DESC, city ASC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![clinic_id, limit], |row| {
            Ok(LocationSummary {
                city: row.get(0)?,
                patients: row.get(1)?,
                average_cost: round_to(row.get::<_, Option<f64>>(2)?.unwrap_or(0.0), 2),
                average_rating: round_to(row.get::<_, Option<f64>>(3)?.unwrap_or(0.0), 2),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::models::{
        Address, AppointmentStatus, ClinicRegistration, ClinicSession, NewFeedback, NewRevenue,
        NewVisit, PatientDetails, PaymentMethod, PaymentStatus, Sex,
    };

    fn clinic(db: &Database, name: &str, email: &str) -> ClinicSession {
        let creds = db.register_clinic(&ClinicRegistration::new(name, email)).unwrap();
        db.login(&creds.login_id, &creds.password).unwrap()
    }

    fn patient(db: &Database, session: &ClinicSession, name: &str, sex: Sex, age: u32, city: &str) -> String {
        let mut details = PatientDetails::new(name);
        details.sex = Some(sex);
        details.age = Some(age);
        details.address = Address::new(None, Some(city.into()), Some("Maharashtra".into()), None);
        db.add_patient(session, &details, None).unwrap().patient_code
    }

    fn visit(diagnosis: &str, cost: f64, doctor: &str, rating: Option<u8>) -> NewVisit {
        let mut v = NewVisit::new(diagnosis, cost);
        v.doctor_assigned = Some(doctor.into());
        v.satisfaction_rating = rating;
        v.payment_mode = Some(PaymentMethod::Cash);
        v.visit_date = NaiveDate::from_ymd_opt(2024, 4, 15);
        v
    }

    #[test]
    fn test_empty_clinic_is_all_zeros() {
        let db = Database::open_in_memory().unwrap();
        let s = clinic(&db, "Smile", "a@smile.in");
        let m = MetricsAggregator::new(&db);

        assert_eq!(m.total_patients(s.clinic_id()).unwrap(), 0);
        assert_eq!(m.total_revenue(s.clinic_id()).unwrap(), 0.0);
        assert_eq!(m.average_rating(s.clinic_id()).unwrap(), 0.0);
        assert!(m.breakdown_by(s.clinic_id(), Dimension::City).unwrap().is_empty());
        assert!(m.doctor_performance(s.clinic_id()).unwrap().is_empty());
        assert_eq!(m.demographics(s.clinic_id()).unwrap(), Demographics::default());
        assert_eq!(m.retention(s.clinic_id()).unwrap(), Retention::default());
        assert_eq!(m.appointment_stats(s.clinic_id()).unwrap(), AppointmentStats::default());
        assert_eq!(m.revenue_summary(s.clinic_id()).unwrap(), RevenueSummary::default());
        assert_eq!(m.feedback_summary(s.clinic_id()).unwrap(), FeedbackSummary::default());
    }

    #[test]
    fn test_revenue_and_rating_totals() {
        let db = Database::open_in_memory().unwrap();
        let s = clinic(&db, "Smile", "a@smile.in");
        let code = patient(&db, &s, "Asha", Sex::Female, 30, "Pune");
        db.record_visit(&s, &code, &visit("Caries", 100.0, "Dr. B", Some(4))).unwrap();
        db.record_visit(&s, &code, &visit("Caries", 200.0, "Dr. A", None)).unwrap();
        db.record_visit(&s, &code, &visit("Abscess", 300.0, "Dr. A", Some(5))).unwrap();

        let m = MetricsAggregator::new(&db);
        assert_eq!(m.total_revenue(s.clinic_id()).unwrap(), 600.0);
        assert_eq!(m.total_visits(s.clinic_id()).unwrap(), 3);
        assert_eq!(m.average_rating(s.clinic_id()).unwrap(), 4.5);

        let doctors = m.doctor_performance(s.clinic_id()).unwrap();
        assert_eq!(doctors[0].doctor, "Dr. A");
        assert_eq!(doctors[0].revenue, 500.0);
        assert_eq!(doctors[0].visits, 2);
        assert_eq!(doctors[0].patients, 1);
        assert_eq!(doctors[0].average_rating, 5.0);
        assert_eq!(doctors[1].doctor, "Dr. B");
        assert_eq!(doctors[1].average_rating, 4.0);

        let diagnoses = m.diagnosis_patterns(s.clinic_id(), 10).unwrap();
        assert_eq!(diagnoses[0].diagnosis, "Caries");
        assert_eq!(diagnoses[0].frequency, 2);
        assert_eq!(diagnoses[0].average_cost, 150.0);

        let monthly = m.monthly_revenue(s.clinic_id(), 6).unwrap();
        assert_eq!(monthly.len(), 1);
        assert_eq!(monthly[0].month, "2024-04");
        assert_eq!(monthly[0].revenue, 600.0);
    }

    #[test]
    fn test_diagnosis_success_rate() {
        let db = Database::open_in_memory().unwrap();
        let s = clinic(&db, "Smile", "a@smile.in");
        let code = patient(&db, &s, "Asha", Sex::Female, 30, "Pune");
        for (diagnosis, success) in [("Caries", Some(90.0)), ("Caries", Some(75.0)), ("Caries", None), ("Abscess", None)] {
            let mut v = visit(diagnosis, 100.0, "Dr. A", None);
            v.treatment_success_rate = success;
            db.record_visit(&s, &code, &v).unwrap();
        }

        let diagnoses = MetricsAggregator::new(&db).diagnosis_patterns(s.clinic_id(), 10).unwrap();
        assert_eq!(diagnoses[0].diagnosis, "Caries");
        assert_eq!(diagnoses[0].success_rate, 82.5);
        assert_eq!(diagnoses[1].diagnosis, "Abscess");
        assert_eq!(diagnoses[1].success_rate, 0.0);
    }

    #[test]
    fn test_feedback_summary() {
        let db = Database::open_in_memory().unwrap();
        let s = clinic(&db, "Smile", "a@smile.in");
        let other = clinic(&db, "Bright", "b@bright.in");
        let code = patient(&db, &s, "Asha", Sex::Female, 30, "Pune");
        let other_code = patient(&db, &other, "Ravi", Sex::Male, 25, "Pune");

        for (rating, sentiment, recommend) in [(5, Some(0.9), true), (4, Some(0.5), true), (2, None, false)] {
            let mut feedback = NewFeedback::new(rating);
            feedback.sentiment_score = sentiment;
            feedback.would_recommend = recommend;
            db.record_feedback(&s, &code, &feedback).unwrap();
        }
        db.record_feedback(&other, &other_code, &NewFeedback::new(1)).unwrap();

        let summary = MetricsAggregator::new(&db).feedback_summary(s.clinic_id()).unwrap();
        assert_eq!(summary.total_feedback, 3);
        assert_eq!(summary.average_rating, 3.67);
        assert_eq!(summary.average_sentiment, 0.7);
        assert_eq!(summary.recommendations, 2);
        assert_eq!(summary.recommendation_rate, 66.7);
    }

    #[test]
    fn test_breakdowns_and_demographics() {
        let db = Database::open_in_memory().unwrap();
        let s = clinic(&db, "Smile", "a@smile.in");
        patient(&db, &s, "Asha", Sex::Female, 30, "Pune");
        patient(&db, &s, "Meera", Sex::Female, 41, "Mumbai");
        patient(&db, &s, "Ravi", Sex::Male, 25, "Pune");

        let m = MetricsAggregator::new(&db);
        let cities = m.breakdown_by(s.clinic_id(), Dimension::City).unwrap();
        assert_eq!(
            cities,
            vec![
                CategoryCount { category: "Pune".into(), count: 2 },
                CategoryCount { category: "Mumbai".into(), count: 1 },
            ]
        );
        let genders = m.breakdown_by(s.clinic_id(), Dimension::Gender).unwrap();
        assert_eq!(genders[0].category, "Female");
        assert!(m.breakdown_by(s.clinic_id(), Dimension::VillageTown).unwrap().is_empty());

        let demo = m.demographics(s.clinic_id()).unwrap();
        assert_eq!(demo.total_patients, 3);
        assert_eq!(demo.female, 2);
        assert_eq!(demo.male, 1);
        assert_eq!(demo.average_age, 32.0);

        let months = m.monthly_registrations(s.clinic_id(), 12).unwrap();
        assert_eq!(months.iter().map(|c| c.count).sum::<i64>(), 3);

        let locations = m.location_summary(s.clinic_id(), 10).unwrap();
        assert_eq!(locations[0].city, "Pune");
        assert_eq!(locations[0].patients, 2);
        assert_eq!(locations[0].average_cost, 0.0);
    }

    #[test]
    fn test_metrics_are_scoped_to_clinic() {
        let db = Database::open_in_memory().unwrap();
        let a = clinic(&db, "Smile", "a@smile.in");
        let b = clinic(&db, "Bright", "b@bright.in");
        let code = patient(&db, &a, "Asha", Sex::Female, 30, "Pune");
        db.record_visit(&a, &code, &visit("Caries", 500.0, "Dr. A", Some(3))).unwrap();

        let m = MetricsAggregator::new(&db);
        assert_eq!(m.total_patients(b.clinic_id()).unwrap(), 0);
        assert_eq!(m.total_revenue(b.clinic_id()).unwrap(), 0.0);
        assert!(m.breakdown_by(b.clinic_id(), Dimension::Diagnosis).unwrap().is_empty());
    }

    #[test]
    fn test_retention_and_ledger() {
        let db = Database::open_in_memory().unwrap();
        let s = clinic(&db, "Smile", "a@smile.in");
        let asha = patient(&db, &s, "Asha", Sex::Female, 30, "Pune");
        let ravi = patient(&db, &s, "Ravi", Sex::Male, 25, "Pune");
        db.record_visit(&s, &asha, &visit("Caries", 100.0, "Dr. A", None)).unwrap();
        db.record_visit(&s, &asha, &visit("Caries", 100.0, "Dr. A", None)).unwrap();
        db.record_visit(&s, &ravi, &visit("Checkup", 0.0, "Dr. A", None)).unwrap();

        let mut refund = NewRevenue::new("Refund", 50.0);
        refund.payment_status = PaymentStatus::Refunded;
        db.record_payment(&s, &ravi, &refund).unwrap();
        let mut card = NewRevenue::new("Whitening", 400.0);
        card.payment_method = Some(PaymentMethod::Card);
        db.record_payment(&s, &ravi, &card).unwrap();

        let m = MetricsAggregator::new(&db);
        let retention = m.retention(s.clinic_id()).unwrap();
        assert_eq!(retention.returning_patients, 1);
        assert_eq!(retention.retention_rate, 50.0);
        assert_eq!(retention.average_visits, 1.5);
        assert_eq!(retention.average_spend, 100.0);

        let summary = m.revenue_summary(s.clinic_id()).unwrap();
        assert_eq!(summary.transactions, 3);
        assert_eq!(summary.total, 600.0);
        assert_eq!(summary.by_method[0].method, "Card");
        assert_eq!(summary.by_method[1].method, "Cash");
        assert_eq!(summary.by_method[1].transactions, 2);
    }

    #[test]
    fn test_appointment_stats() {
        let db = Database::open_in_memory().unwrap();
        let s = clinic(&db, "Smile", "a@smile.in");
        let code = patient(&db, &s, "Asha", Sex::Female, 30, "Pune");
        let when = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(10, 0, 0).unwrap();
        for status in [
            AppointmentStatus::Completed,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::NoShow,
        ] {
            let appt = db.schedule_appointment(&s, &code, when, None, None).unwrap();
            db.set_appointment_status(&s, appt.id, status).unwrap();
        }

        let stats = MetricsAggregator::new(&db).appointment_stats(s.clinic_id()).unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.no_shows, 1);
        assert_eq!(stats.scheduled, 0);
        assert_eq!(stats.completion_rate, 50.0);
    }
}
