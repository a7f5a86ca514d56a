use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} with this {field} already exists")]
    AlreadyExists {
        entity: &'static str,
        field: &'static str,
    },
    #[error("unknown field `{field}` on entity `{entity}`")]
    UnknownField { entity: String, field: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A transport payload that could not be mapped onto a request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid `{field}`: {reason}")]
pub struct BindError {
    pub field: &'static str,
    pub reason: String,
}

impl BindError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Every business rule a request broke. Never empty.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("validation failed: {}", describe(.violations))]
pub struct ValidationError {
    violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn check(violations: Vec<FieldViolation>) -> Result<(), ValidationError> {
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations })
        }
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }
}

fn describe(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|violation| format!("{}: {}", violation.field, violation.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum CreateUserError {
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
