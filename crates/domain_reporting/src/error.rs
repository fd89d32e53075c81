//! Reporting domain errors

use std::path::PathBuf;
use thiserror::Error;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

/// Errors that can occur in the reporting domain
#[derive(Debug, Error)]
pub enum ReportingError {
    #[error("Template not found: {0}")]
    TemplateMissing(PathBuf),

    #[error("Render failure: {0}")]
    RenderFailure(String),

    #[error("Invalid report number: {0}")]
    InvalidReportNumber(String),

    #[error("Invalid branch code: {0}")]
    InvalidBranchCode(String),

    #[error("Report sequence exhausted for the month: {0}")]
    SequenceExhausted(u32),

    #[error("Form validation failed: {} violation(s)", .0.len())]
    FieldValidation(Vec<FieldViolation>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
