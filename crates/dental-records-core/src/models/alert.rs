//! Dashboard alerts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{clean_text, ValidationError};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlertSeverity {
    Low,
    #[default]
    Medium,
    High,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "Low",
            AlertSeverity::Medium => "Medium",
            AlertSeverity::High => "High",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertSeverity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(AlertSeverity::Low),
            "medium" | "normal" => Ok(AlertSeverity::Medium),
            "high" | "critical" => Ok(AlertSeverity::High),
            _ => Err(ValidationError::UnknownVariant {
                kind: "alert severity",
                value: s.to_string(),
            }),
        }
    }
}

/// A notice for the clinic, shown until marked read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: i64,
    pub clinic_id: i64,
    pub alert_type: String,
    pub message: String,
    pub severity: AlertSeverity,
    pub is_read: bool,
    pub action_required: bool,
    pub related_patient_id: Option<i64>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewAlert {
    /// Short category such as "Revenue Alert"
    pub alert_type: String,
    pub message: String,
    pub severity: AlertSeverity,
    pub action_required: bool,
    /// Patient the alert is about, if any
    pub patient_code: Option<String>,
}

impl NewAlert {
    pub fn new(alert_type: impl Into<String>, message: impl Into<String>, severity: AlertSeverity) -> Self {
        Self {
            alert_type: alert_type.into(),
            message: message.into(),
            severity,
            ..Default::default()
        }
    }

    pub fn normalized(&self) -> Self {
        Self {
            alert_type: self.alert_type.trim().to_string(),
            message: self.message.trim().to_string(),
            severity: self.severity,
            action_required: self.action_required,
            patient_code: clean_text(self.patient_code.clone()),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.alert_type.is_empty() {
            return Err(ValidationError::MissingField("Alert type"));
        }
        if self.message.is_empty() {
            return Err(ValidationError::MissingField("Alert message"));
        }
        Ok(())
    }
}
