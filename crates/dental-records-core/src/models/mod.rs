//! Domain models for the dental-records system.

mod address;
mod alert;
mod appointment;
mod clinic;
mod feedback;
mod patient;
mod revenue;
mod visit;

pub use address::*;
pub use alert::*;
pub use appointment::*;
pub use clinic::*;
pub use feedback::*;
pub use patient::*;
pub use revenue::*;
pub use visit::*;

use thiserror::Error;

/// Input validation failures raised before anything touches the database.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },

    #[error("{field} must be between {min} and {max}, got {value}")]
    ScoreOutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("{0} cannot be negative")]
    NegativeAmount(&'static str),

    #[error("Discount {discount} exceeds billed amount {billed}")]
    DiscountExceedsTotal { discount: f64, billed: f64 },

    #[error("Valid email is required: {0:?}")]
    InvalidEmail(String),

    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error("Passwords don't match")]
    PasswordMismatch,

    #[error("Unknown {kind}: {value:?}")]
    UnknownVariant { kind: &'static str, value: String },
}

/// Current UTC time as an RFC 3339 string with second precision.
///
/// Second precision keeps the value readable by SQLite's date functions.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Trim a free-text form value, mapping blank input to `None`.
pub fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn check_range(field: &'static str, value: Option<u8>, min: u8, max: u8) -> Result<(), ValidationError> {
    match value {
        Some(v) if v < min || v > max => Err(ValidationError::OutOfRange {
            field,
            min: min.into(),
            max: max.into(),
            value: v.into(),
        }),
        _ => Ok(()),
    }
}

/// Like [`check_range`] for fractional scores. NaN is rejected.
pub(crate) fn check_score(field: &'static str, value: Option<f64>, min: f64, max: f64) -> Result<(), ValidationError> {
    match value {
        Some(v) if !(min..=max).contains(&v) => Err(ValidationError::ScoreOutOfRange {
            field,
            min,
            max,
            value: v,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text(Some("  Pune ".into())), Some("Pune".into()));
        assert_eq!(clean_text(Some("   ".into())), None);
        assert_eq!(clean_text(None), None);
    }

    #[test]
    fn test_check_range() {
        assert!(check_range("rating", Some(5), 1, 5).is_ok());
        assert!(check_range("rating", None, 1, 5).is_ok());
        assert_eq!(
            check_range("rating", Some(6), 1, 5),
            Err(ValidationError::OutOfRange {
                field: "rating",
                min: 1,
                max: 5,
                value: 6
            })
        );
    }

    #[test]
    fn test_check_score() {
        assert!(check_score("success rate", Some(100.0), 0.0, 100.0).is_ok());
        assert!(check_score("success rate", None, 0.0, 100.0).is_ok());
        assert!(check_score("success rate", Some(100.5), 0.0, 100.0).is_err());
        assert!(check_score("sentiment", Some(f64::NAN), -1.0, 1.0).is_err());
    }

    #[test]
    fn test_timestamp_is_sqlite_friendly() {
        let ts = now_timestamp();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), 20);
    }
}
