//! Appointment models.

use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::ValidationError;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "Scheduled",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
            AppointmentStatus::NoShow => "NoShow",
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" | "canceled" => Ok(AppointmentStatus::Cancelled),
            "noshow" => Ok(AppointmentStatus::NoShow),
            _ => Err(ValidationError::UnknownVariant {
                kind: "appointment status",
                value: s.to_string(),
            }),
        }
    }
}

/// A booked visit slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: i64,
    pub clinic_id: i64,
    pub patient_id: i64,
    pub patient_code: String,
    pub scheduled_for: NaiveDateTime,
    pub treatment_type: Option<String>,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!("No-Show".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::NoShow);
        assert_eq!("no_show".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::NoShow);
        assert_eq!("No Show".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::NoShow);
        assert_eq!("canceled".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::Cancelled);
        assert_eq!(
            AppointmentStatus::Completed.as_str().parse::<AppointmentStatus>().unwrap(),
            AppointmentStatus::Completed
        );
        assert!("maybe".parse::<AppointmentStatus>().is_err());
    }
}
