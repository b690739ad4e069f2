//! Visit (per-encounter analytics) models.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{check_range, check_score, clean_text, ValidationError};

/// How a visit or transaction was paid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    Insurance,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Card",
            PaymentMethod::Upi => "UPI",
            PaymentMethod::Insurance => "Insurance",
            PaymentMethod::Other => "Other",
        }
    }

    pub const ALL: [PaymentMethod; 5] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::Upi,
        PaymentMethod::Insurance,
        PaymentMethod::Other,
    ];
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" | "credit card" | "debit card" => Ok(PaymentMethod::Card),
            "upi" => Ok(PaymentMethod::Upi),
            "insurance" => Ok(PaymentMethod::Insurance),
            "other" => Ok(PaymentMethod::Other),
            _ => Err(ValidationError::UnknownVariant {
                kind: "payment method",
                value: s.to_string(),
            }),
        }
    }
}

/// A recorded patient encounter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Visit {
    pub id: i64,
    pub clinic_id: i64,
    pub patient_id: i64,
    pub visit_date: NaiveDate,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment_given: Option<String>,
    /// Always >= 0
    pub treatment_cost: f64,
    /// 1..=5 when given
    pub satisfaction_rating: Option<u8>,
    pub doctor_assigned: Option<String>,
    pub pain_level_before: Option<u8>,
    pub pain_level_after: Option<u8>,
    pub payment_mode: Option<PaymentMethod>,
    /// Outcome as judged by the doctor, 0..=100 percent
    pub treatment_success_rate: Option<f64>,
    pub created_at: String,
}

/// Visit form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewVisit {
    /// Defaults to today
    pub visit_date: Option<NaiveDate>,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment_given: Option<String>,
    pub treatment_cost: f64,
    pub satisfaction_rating: Option<u8>,
    pub doctor_assigned: Option<String>,
    pub pain_level_before: Option<u8>,
    pub pain_level_after: Option<u8>,
    pub payment_mode: Option<PaymentMethod>,
    pub treatment_success_rate: Option<f64>,
}

impl NewVisit {
    pub fn new(diagnosis: impl Into<String>, treatment_cost: f64) -> Self {
        Self {
            diagnosis: Some(diagnosis.into()),
            treatment_cost,
            ..Default::default()
        }
    }

    /// Trim text fields.
    pub fn normalized(&self) -> Self {
        Self {
            visit_date: self.visit_date,
            symptoms: clean_text(self.symptoms.clone()),
            diagnosis: clean_text(self.diagnosis.clone()),
            treatment_given: clean_text(self.treatment_given.clone()),
            treatment_cost: self.treatment_cost,
            satisfaction_rating: self.satisfaction_rating,
            doctor_assigned: clean_text(self.doctor_assigned.clone()),
            pain_level_before: self.pain_level_before,
            pain_level_after: self.pain_level_after,
            payment_mode: self.payment_mode,
            treatment_success_rate: self.treatment_success_rate,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.treatment_cost >= 0.0) {
            return Err(ValidationError::NegativeAmount("treatment cost"));
        }
        check_range("satisfaction rating", self.satisfaction_rating, 1, 5)?;
        check_range("pain level before", self.pain_level_before, 0, 10)?;
        check_range("pain level after", self.pain_level_after, 0, 10)?;
        check_score("treatment success rate", self.treatment_success_rate, 0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_cost_rejected() {
        let visit = NewVisit::new("Caries", -1.0);
        assert_eq!(visit.validate(), Err(ValidationError::NegativeAmount("treatment cost")));

        let visit = NewVisit::new("Caries", f64::NAN);
        assert!(visit.validate().is_err());
    }

    #[test]
    fn test_rating_range() {
        let mut visit = NewVisit::new("Caries", 500.0);
        visit.satisfaction_rating = Some(0);
        assert!(visit.validate().is_err());
        visit.satisfaction_rating = Some(4);
        assert!(visit.validate().is_ok());
    }

    #[test]
    fn test_success_rate_is_a_percentage() {
        let mut visit = NewVisit::new("Caries", 500.0);
        visit.treatment_success_rate = Some(92.5);
        assert!(visit.validate().is_ok());
        visit.treatment_success_rate = Some(120.0);
        assert!(matches!(
            visit.validate(),
            Err(ValidationError::ScoreOutOfRange { field: "treatment success rate", .. })
        ));
    }

    #[test]
    fn test_payment_method_round_trip_names() {
        for method in PaymentMethod::ALL {
            assert_eq!(method.as_str().parse::<PaymentMethod>().unwrap(), method);
        }
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }
}
