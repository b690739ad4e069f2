//! Everything a clinic dashboard page shows, in one value.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    AppointmentStats, CategoryCount, Demographics, DiagnosisPattern, Dimension, DoctorPerformance,
    FeedbackSummary, LocationSummary, MetricsAggregator, MonthlyCount, MonthlyRevenue, Retention,
    RevenueSummary,
};
use crate::db::DbResult;
use crate::models::{now_timestamp, Alert};

/// Unread alerts shown on a dashboard.
pub const DASHBOARD_ALERTS: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClinicDashboard {
    pub clinic_id: i64,
    pub generated_at: String,
    pub total_patients: i64,
    pub total_visits: i64,
    pub total_revenue: f64,
    pub average_rating: f64,
    pub demographics: Demographics,
    pub genders: Vec<CategoryCount>,
    pub treatments: Vec<CategoryCount>,
    pub payment_methods: Vec<CategoryCount>,
    pub cities: Vec<CategoryCount>,
    pub states: Vec<CategoryCount>,
    pub doctors: Vec<DoctorPerformance>,
    pub monthly_registrations: Vec<MonthlyCount>,
    pub monthly_revenue: Vec<MonthlyRevenue>,
    pub revenue: RevenueSummary,
    pub diagnoses: Vec<DiagnosisPattern>,
    pub retention: Retention,
    pub appointments: AppointmentStats,
    pub locations: Vec<LocationSummary>,
    pub feedback: FeedbackSummary,
    /// Newest unread alerts
    pub alerts: Vec<Alert>,
}

impl<'a> MetricsAggregator<'a> {
    /// All metrics for one clinic. Trend length and list sizes come from the
    /// database's [`crate::StoreConfig`].
    pub fn dashboard(&self, clinic_id: i64) -> DbResult<ClinicDashboard> {
        let config = self.db().config();
        let months = config.dashboard_months;
        let top_n = config.top_n;
        let top = |mut rows: Vec<CategoryCount>| {
            rows.truncate(top_n as usize);
            rows
        };

        debug!(clinic_id, months, top_n, "building dashboard");
        Ok(ClinicDashboard {
            clinic_id,
            generated_at: now_timestamp(),
            total_patients: self.total_patients(clinic_id)?,
            total_visits: self.total_visits(clinic_id)?,
            total_revenue: self.total_revenue(clinic_id)?,
            average_rating: self.average_rating(clinic_id)?,
            demographics: self.demographics(clinic_id)?,
            genders: self.breakdown_by(clinic_id, Dimension::Gender)?,
            treatments: top(self.breakdown_by(clinic_id, Dimension::Treatment)?),
            payment_methods: self.breakdown_by(clinic_id, Dimension::PaymentMethod)?,
            cities: top(self.breakdown_by(clinic_id, Dimension::City)?),
            states: top(self.breakdown_by(clinic_id, Dimension::State)?),
            doctors: self.doctor_performance(clinic_id)?,
            monthly_registrations: self.monthly_registrations(clinic_id, months)?,
            monthly_revenue: self.monthly_revenue(clinic_id, months)?,
            revenue: self.revenue_summary(clinic_id)?,
            diagnoses: self.diagnosis_patterns(clinic_id, top_n)?,
            retention: self.retention(clinic_id)?,
            appointments: self.appointment_stats(clinic_id)?,
            locations: self.location_summary(clinic_id, top_n)?,
            feedback: self.feedback_summary(clinic_id)?,
            alerts: self.db().unread_alerts(clinic_id, DASHBOARD_ALERTS)?,
        })
    }
}
