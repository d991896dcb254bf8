//! Identifier and email shape checks, plus uuid generation.

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::constants::{EMAIL_PATTERN, USER_UUID_PATTERN, USER_UUID_PREFIX};
use crate::error::{DomainError, DomainResult};

static USER_UUID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(USER_UUID_PATTERN).expect("user uuid pattern is valid"));

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(EMAIL_PATTERN).expect("email pattern is valid"));

/// Generate a fresh `USER-` identifier from a random v4 uuid.
pub fn generate_user_uuid() -> String {
    format!(
        "{}{}",
        USER_UUID_PREFIX,
        Uuid::new_v4().simple().to_string().to_uppercase()
    )
}

/// Check that a candidate is a well-formed user uuid.
pub fn check_user_uuid(candidate: &str) -> DomainResult<()> {
    if USER_UUID_RE.is_match(candidate) {
        Ok(())
    } else {
        Err(DomainError::InvalidUuid(candidate.to_string()))
    }
}

/// Check that a candidate has a local-part@domain.tld shape.
pub fn check_email(candidate: &str) -> DomainResult<()> {
    if EMAIL_RE.is_match(candidate) {
        Ok(())
    } else {
        Err(DomainError::InvalidEmail(candidate.to_string()))
    }
}

/// Normalize an email to its dedup-key form.
pub fn normalize_email(email: &str) -> String {
    email.to_lowercase()
}
