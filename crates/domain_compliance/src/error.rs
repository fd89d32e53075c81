//! Compliance domain errors

use thiserror::Error;

/// Errors that can occur in the compliance domain
#[derive(Debug, Error)]
pub enum ComplianceError {
    #[error("Invalid rule expression: {0}")]
    InvalidExpression(String),

    #[error("Unknown report type: {0}")]
    UnknownReportType(String),

    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),
}
