//! Patient feedback models.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{check_range, check_score, clean_text, ValidationError};

/// What a piece of feedback is about.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FeedbackType {
    Treatment,
    Service,
    Facility,
    #[default]
    Overall,
}

impl FeedbackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackType::Treatment => "Treatment",
            FeedbackType::Service => "Service",
            FeedbackType::Facility => "Facility",
            FeedbackType::Overall => "Overall",
        }
    }
}

impl fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "treatment" => Ok(FeedbackType::Treatment),
            "service" => Ok(FeedbackType::Service),
            "facility" => Ok(FeedbackType::Facility),
            "overall" | "general" => Ok(FeedbackType::Overall),
            _ => Err(ValidationError::UnknownVariant {
                kind: "feedback type",
                value: s.to_string(),
            }),
        }
    }
}

/// A stored review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub id: i64,
    pub clinic_id: i64,
    pub patient_id: i64,
    pub feedback_type: FeedbackType,
    pub rating: Option<u8>,
    pub review_text: Option<String>,
    /// -1 (negative) ..= 1 (positive)
    pub sentiment_score: Option<f64>,
    pub areas_for_improvement: Option<String>,
    pub would_recommend: bool,
    pub feedback_date: NaiveDate,
    pub created_at: String,
}

/// Feedback form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewFeedback {
    pub feedback_type: FeedbackType,
    pub rating: Option<u8>,
    pub review_text: Option<String>,
    pub sentiment_score: Option<f64>,
    pub areas_for_improvement: Option<String>,
    pub would_recommend: bool,
    /// Defaults to today
    pub feedback_date: Option<NaiveDate>,
}

impl Default for NewFeedback {
    fn default() -> Self {
        Self {
            feedback_type: FeedbackType::default(),
            rating: None,
            review_text: None,
            sentiment_score: None,
            areas_for_improvement: None,
            would_recommend: true,
            feedback_date: None,
        }
    }
}

impl NewFeedback {
    pub fn new(rating: u8) -> Self {
        Self {
            rating: Some(rating),
            ..Default::default()
        }
    }

    pub fn normalized(&self) -> Self {
        Self {
            review_text: clean_text(self.review_text.clone()),
            areas_for_improvement: clean_text(self.areas_for_improvement.clone()),
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.rating.is_none() && self.review_text.is_none() {
            return Err(ValidationError::MissingField("Rating or review"));
        }
        check_range("rating", self.rating, 1, 5)?;
        check_score("sentiment score", self.sentiment_score, -1.0, 1.0)
    }
}
