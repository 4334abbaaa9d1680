use serde::Serialize;
use thiserror::Error;

/// Classifies hostname validation failures for programmatic matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationErrorCode {
    /// Domain name is empty
    DomainTooShort,
    /// Domain name exceeds 255 octets
    DomainTooLong,
    /// A label begins with `-`
    LabelStartsWithDash,
    /// A label ends with `-`
    LabelEndsWithDash,
    /// A label exceeds 63 octets
    LabelTooLong,
    /// A label is empty (e.g. `a..b`, leading or trailing dot)
    LabelTooShort,
    /// A label contains characters outside `[a-z0-9-]`
    LabelInvalidChars,
}

impl ValidationErrorCode {
    /// Wire name of the code, e.g. `LABEL_TOO_SHORT`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationErrorCode::DomainTooShort => "DOMAIN_TOO_SHORT",
            ValidationErrorCode::DomainTooLong => "DOMAIN_TOO_LONG",
            ValidationErrorCode::LabelStartsWithDash => "LABEL_STARTS_WITH_DASH",
            ValidationErrorCode::LabelEndsWithDash => "LABEL_ENDS_WITH_DASH",
            ValidationErrorCode::LabelTooLong => "LABEL_TOO_LONG",
            ValidationErrorCode::LabelTooShort => "LABEL_TOO_SHORT",
            ValidationErrorCode::LabelInvalidChars => "LABEL_INVALID_CHARS",
        }
    }

    /// Human readable message for the code.
    pub fn message(&self) -> &'static str {
        match self {
            ValidationErrorCode::DomainTooShort => "Domain name too short.",
            ValidationErrorCode::DomainTooLong => {
                "Domain name too long. It should be no more than 255 chars."
            }
            ValidationErrorCode::LabelStartsWithDash => {
                "Domain name label can not start with a dash."
            }
            ValidationErrorCode::LabelEndsWithDash => "Domain name label can not end with a dash.",
            ValidationErrorCode::LabelTooLong => {
                "Domain name label should be at most 63 chars long."
            }
            ValidationErrorCode::LabelTooShort => {
                "Domain name label should be at least 1 character long."
            }
            ValidationErrorCode::LabelInvalidChars => {
                "Domain name label can only contain alphanumeric characters or dashes."
            }
        }
    }
}

/// Domain engine error types
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid domain '{input}': {message} ({})", .code.as_str())]
    Validation {
        input: String,
        code: ValidationErrorCode,
        message: String,
    },

    #[error("Overflow: input needs wider integers to process")]
    Overflow,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Rule list error: {0}")]
    RuleList(String),
}

impl DomainError {
    /// Build a validation error for `input` carrying the default message for `code`.
    pub fn validation(input: impl Into<String>, code: ValidationErrorCode) -> Self {
        DomainError::Validation {
            input: input.into(),
            code,
            message: code.message().to_string(),
        }
    }

    /// Validation code, if this is a validation error.
    pub fn code(&self) -> Option<ValidationErrorCode> {
        match self {
            DomainError::Validation { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// JSON payload of the error: `{"input": .., "error": {"message": .., "code": ..}}`.
    ///
    /// Errors other than validation failures carry no input and use `code: null`.
    pub fn to_json(&self) -> String {
        let payload = match self {
            DomainError::Validation {
                input,
                code,
                message,
            } => ErrorPayload {
                input: Some(input),
                error: ErrorBody {
                    message: message.clone(),
                    code: Some(*code),
                },
            },
            other => ErrorPayload {
                input: None,
                error: ErrorBody {
                    message: other.to_string(),
                    code: None,
                },
            },
        };
        serde_json::to_string(&payload).unwrap_or_else(|_| "{}".to_string())
    }
}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    input: Option<&'a str>,
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: Option<ValidationErrorCode>,
}

pub type Result<T> = std::result::Result<T, DomainError>;
