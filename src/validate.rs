use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result, ValidationErrorCode};
use crate::punycode;

/// Maximum length of a domain name in its ASCII form
pub const MAX_DOMAIN_LENGTH: usize = 255;

/// Maximum length of a single label in its ASCII form
pub const MAX_LABEL_LENGTH: usize = 63;

/// Characters allowed in a label under strict validation
static LABEL_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9\-]+$").expect("LABEL_CHARS: hardcoded regex is invalid")
});

/// How strictly hostnames are checked before lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Only empty labels are rejected (`LABEL_TOO_SHORT`).
    #[default]
    Relaxed,
    /// RFC 1034/1123 length, dash and charset checks on the ASCII form.
    Strict,
}

/// Validate a lowercased domain under `policy`.
pub fn validate(domain: &str, policy: ValidationPolicy) -> Result<()> {
    match policy {
        ValidationPolicy::Relaxed => validate_relaxed(domain),
        ValidationPolicy::Strict => validate_strict(domain),
    }
}

fn validate_relaxed(domain: &str) -> Result<()> {
    if domain.split('.').any(str::is_empty) {
        return Err(DomainError::validation(
            domain,
            ValidationErrorCode::LabelTooShort,
        ));
    }
    Ok(())
}

fn validate_strict(domain: &str) -> Result<()> {
    let ascii = punycode::to_ascii(domain)?;
    let fail = |code| Err(DomainError::validation(domain, code));

    if ascii.is_empty() {
        return fail(ValidationErrorCode::DomainTooShort);
    }
    if ascii.len() > MAX_DOMAIN_LENGTH {
        return fail(ValidationErrorCode::DomainTooLong);
    }

    for label in ascii.split('.') {
        if label.is_empty() {
            return fail(ValidationErrorCode::LabelTooShort);
        }
        if label.len() > MAX_LABEL_LENGTH {
            return fail(ValidationErrorCode::LabelTooLong);
        }
        if label.starts_with('-') {
            return fail(ValidationErrorCode::LabelStartsWithDash);
        }
        if label.ends_with('-') {
            return fail(ValidationErrorCode::LabelEndsWithDash);
        }
        if !LABEL_CHARS.is_match(label) {
            return fail(ValidationErrorCode::LabelInvalidChars);
        }
    }

    Ok(())
}
