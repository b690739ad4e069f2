//! Clinic metrics: SQL `GROUP BY` summaries behind the dashboards.
//!
//! Every metric is scoped to one clinic and degrades to zeros or empty lists
//! when there is no data.

mod aggregator;
mod dashboard;

pub use aggregator::*;
pub use dashboard::*;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::ValidationError;

/// Attribute a [`MetricsAggregator::breakdown_by`] groups on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Dimension {
    Gender,
    Treatment,
    Diagnosis,
    PaymentMethod,
    City,
    State,
    VillageTown,
}

impl Dimension {
    pub const ALL: [Dimension; 7] = [
        Dimension::Gender,
        Dimension::Treatment,
        Dimension::Diagnosis,
        Dimension::PaymentMethod,
        Dimension::City,
        Dimension::State,
        Dimension::VillageTown,
    ];

    /// Table and column holding the category.
    pub(crate) fn source(&self) -> (&'static str, &'static str) {
        match self {
            Dimension::Gender => ("patients", "sex"),
            Dimension::Treatment => ("patients", "treatment"),
            Dimension::Diagnosis => ("patient_analytics", "diagnosis"),
            Dimension::PaymentMethod => ("patient_analytics", "payment_mode"),
            Dimension::City => ("patients", "address_city"),
            Dimension::State => ("patients", "address_state"),
            Dimension::VillageTown => ("patients", "address_village_town"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Gender => "gender",
            Dimension::Treatment => "treatment",
            Dimension::Diagnosis => "diagnosis",
            Dimension::PaymentMethod => "payment_method",
            Dimension::City => "city",
            Dimension::State => "state",
            Dimension::VillageTown => "village_town",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace(['-', ' '], "_");
        match key.as_str() {
            "gender" | "sex" => Ok(Dimension::Gender),
            "treatment" => Ok(Dimension::Treatment),
            "diagnosis" => Ok(Dimension::Diagnosis),
            "payment_method" | "payment" => Ok(Dimension::PaymentMethod),
            "city" => Ok(Dimension::City),
            "state" => Ok(Dimension::State),
            "village_town" | "village" | "town" => Ok(Dimension::VillageTown),
            _ => Err(ValidationError::UnknownVariant {
                kind: "dimension",
                value: s.to_string(),
            }),
        }
    }
}

/// One group of a breakdown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// Per-doctor workload and outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorPerformance {
    pub doctor: String,
    /// Distinct patients seen
    pub patients: i64,
    pub visits: i64,
    pub revenue: f64,
    /// Mean satisfaction, 0 when unrated
    pub average_rating: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Demographics {
    pub total_patients: i64,
    /// Mean of known ages to one decimal, 0 when none known
    pub average_age: f64,
    pub male: i64,
    pub female: i64,
    pub other: i64,
}

/// Count for a `YYYY-MM` month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyCount {
    pub month: String,
    pub count: i64,
}

/// Visit revenue for a `YYYY-MM` month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyRevenue {
    pub month: String,
    pub revenue: f64,
    pub visits: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MethodTotal {
    pub method: String,
    pub total: f64,
    pub transactions: i64,
}

/// Ledger totals. Refunded transactions are left out.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RevenueSummary {
    pub total: f64,
    pub average_transaction: f64,
    pub transactions: i64,
    pub by_method: Vec<MethodTotal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisPattern {
    pub diagnosis: String,
    pub frequency: i64,
    pub average_cost: f64,
    pub average_rating: f64,
    /// Mean treatment success percentage, 0 when no visit was assessed
    pub success_rate: f64,
}

/// Review totals for a clinic.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FeedbackSummary {
    pub total_feedback: i64,
    pub average_rating: f64,
    /// Mean sentiment in -1..=1, 0 when none scored
    pub average_sentiment: f64,
    pub recommendations: i64,
    /// Percentage of reviews that would recommend, one decimal
    pub recommendation_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Retention {
    pub total_patients: i64,
    /// Patients with more than one visit
    pub returning_patients: i64,
    /// Percentage, one decimal
    pub retention_rate: f64,
    pub average_visits: f64,
    pub average_spend: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppointmentStats {
    pub total: i64,
    pub scheduled: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub no_shows: i64,
    /// Percentage, one decimal
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationSummary {
    pub city: String,
    pub patients: i64,
    pub average_cost: f64,
    pub average_rating: f64,
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `part / whole` as a percentage to one decimal; 0 for an empty whole.
pub(crate) fn percentage(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round_to(part as f64 * 100.0 / whole as f64, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_parsing() {
        for dim in Dimension::ALL {
            assert_eq!(dim.as_str().parse::<Dimension>().unwrap(), dim);
        }
        assert_eq!("Payment Method".parse::<Dimension>().unwrap(), Dimension::PaymentMethod);
        assert!("zodiac".parse::<Dimension>().is_err());
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(2, 2), 100.0);
    }
}
