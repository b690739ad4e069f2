//! Credential generation and verification for clinic logins.
//!
//! Passwords are stored as Argon2 PHC strings. Password-reset tokens are
//! stored as SHA-256 hex digests so a leaked database cannot be used to reset
//! an account.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db::{DbError, DbResult};

/// Length of generated clinic passwords.
pub const GENERATED_PASSWORD_LEN: usize = 11;

const URL_SAFE_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

/// Loose email shape check: `local@domain.tld`.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// `CLINIC0001`, `CLINIC0002`, ...
pub fn format_clinic_code(number: i64) -> String {
    format!("CLINIC{number:04}")
}

/// First four letters of the upper-cased clinic name plus the clinic number,
/// e.g. `"Smile Dental"`, 1 → `SMIL001`. Names without letters use `CL`.
pub fn derive_login_id(clinic_name: &str, number: i64) -> String {
    let prefix: String = clinic_name
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(4)
        .collect();
    let prefix = if prefix.is_empty() { "CL".to_string() } else { prefix };
    format!("{prefix}{number:03}")
}

/// Random URL-safe password handed to a newly registered clinic.
pub fn generate_password() -> String {
    random_bytes()
        .into_iter()
        .take(GENERATED_PASSWORD_LEN)
        .map(|b| URL_SAFE_ALPHABET[(b % 64) as usize] as char)
        .collect()
}

/// 256-bit random reset token, hex encoded.
pub fn generate_reset_token() -> String {
    format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

/// SHA-256 hex digest of a reset token.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Hash a password into an Argon2 PHC string.
pub fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| DbError::PasswordHash(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DbError::PasswordHash(e.to_string()))
}

/// Check a password against a stored PHC string. A mismatch is `Ok(false)`;
/// an unparseable stored hash is an error.
pub fn verify_password(password: &str, stored_hash: &str) -> DbResult<bool> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| DbError::PasswordHash(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(DbError::PasswordHash(e.to_string())),
    }
}

/// Bytes from two v4 UUIDs, skipping the version and variant bytes.
fn random_bytes() -> Vec<u8> {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    a.as_bytes()
        .iter()
        .chain(b.as_bytes().iter())
        .enumerate()
        .filter(|(i, _)| !matches!(i % 16, 6 | 8))
        .map(|(_, b)| *b)
        .collect()
}
