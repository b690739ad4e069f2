//! Revenue ledger models.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{clean_text, PaymentMethod, ValidationError};

/// Settlement state of a transaction.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    #[default]
    Completed,
    Pending,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Completed => "Completed",
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Refunded => "Refunded",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "completed" => Ok(PaymentStatus::Completed),
            "pending" => Ok(PaymentStatus::Pending),
            "refunded" => Ok(PaymentStatus::Refunded),
            _ => Err(ValidationError::UnknownVariant {
                kind: "payment status",
                value: s.to_string(),
            }),
        }
    }
}

/// A stored financial transaction. `final_amount = base + tax - discount`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevenueRecord {
    pub id: i64,
    pub clinic_id: i64,
    pub patient_id: Option<i64>,
    pub visit_id: Option<i64>,
    pub transaction_date: NaiveDate,
    pub service_type: Option<String>,
    pub base_amount: f64,
    pub tax_amount: f64,
    pub discount_amount: f64,
    pub final_amount: f64,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: PaymentStatus,
    pub created_at: String,
}

/// Payment form. The final amount is always derived, never entered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewRevenue {
    /// Defaults to today
    pub transaction_date: Option<NaiveDate>,
    pub visit_id: Option<i64>,
    pub service_type: Option<String>,
    pub base_amount: f64,
    pub tax_amount: f64,
    pub discount_amount: f64,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: PaymentStatus,
}

impl NewRevenue {
    pub fn new(service_type: impl Into<String>, base_amount: f64) -> Self {
        Self {
            service_type: Some(service_type.into()),
            base_amount,
            ..Default::default()
        }
    }

    pub fn final_amount(&self) -> f64 {
        self.base_amount + self.tax_amount - self.discount_amount
    }

    pub fn normalized(&self) -> Self {
        Self {
            service_type: clean_text(self.service_type.clone()),
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("base amount", self.base_amount),
            ("tax amount", self.tax_amount),
            ("discount amount", self.discount_amount),
        ] {
            if !(value >= 0.0) {
                return Err(ValidationError::NegativeAmount(field));
            }
        }
        let billed = self.base_amount + self.tax_amount;
        if self.discount_amount > billed {
            return Err(ValidationError::DiscountExceedsTotal {
                discount: self.discount_amount,
                billed,
            });
        }
        Ok(())
    }
}
