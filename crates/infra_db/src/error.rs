//! Database error types
//!
//! This module defines the error types that can occur during database
//! operations, providing meaningful error messages and proper error
//! chaining. Concurrency transients (lock timeouts, sequence contention,
//! deadlocks) are distinguished so the services can retry them.

use thiserror::Error;

/// Errors that can occur during database operations
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Entity not found in database
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// A row lock could not be obtained within the statement timeout
    #[error("Row lock timed out: {0}")]
    RowLockTimeout(String),

    /// Deadlock detected and this transaction was chosen as the victim
    #[error("Deadlock detected: {0}")]
    Deadlock(String),

    /// Sequence allocation kept colliding past the retry bound
    #[error("Sequence allocation contention on {0}")]
    SequenceContention(String),

    /// Transaction error
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Pool exhaustion - no available connections
    #[error("Connection pool exhausted")]
    PoolExhausted,
}

impl DatabaseError {
    /// Creates a not found error for a specific entity type and identifier
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        DatabaseError::NotFound(format!("{} with id '{}' not found", entity, id))
    }

    /// Checks if this error indicates a record was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound(_))
    }

    /// Checks if this error is a unique-constraint violation
    pub fn is_duplicate(&self) -> bool {
        matches!(self, DatabaseError::DuplicateEntry(_))
    }

    /// Checks if retrying the enclosing transaction can succeed
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            DatabaseError::RowLockTimeout(_)
                | DatabaseError::Deadlock(_)
                | DatabaseError::SequenceContention(_)
                | DatabaseError::DuplicateEntry(_)
                | DatabaseError::PoolExhausted
        )
    }
}

/// Converts SQLx errors to more specific DatabaseError variants
///
/// Maps PostgreSQL error codes onto the taxonomy:
/// 23505 unique, 23503 foreign key, 23514 check, 55P03 lock not
/// available, 57014 statement timeout, 40P01 deadlock.
impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    match code.as_ref() {
                        "23505" => DatabaseError::DuplicateEntry(db_err.message().to_string()),
                        "23503" => {
                            DatabaseError::ForeignKeyViolation(db_err.message().to_string())
                        }
                        "23514" => {
                            DatabaseError::ConstraintViolation(db_err.message().to_string())
                        }
                        "55P03" => DatabaseError::RowLockTimeout(db_err.message().to_string()),
                        "57014" => DatabaseError::RowLockTimeout(db_err.message().to_string()),
                        "40P01" => DatabaseError::Deadlock(db_err.message().to_string()),
                        _ => DatabaseError::QueryFailed(db_err.message().to_string()),
                    }
                } else {
                    DatabaseError::QueryFailed(db_err.message().to_string())
                }
            }
            _ => DatabaseError::QueryFailed(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_classification() {
        assert!(DatabaseError::RowLockTimeout("x".into()).is_retriable());
        assert!(DatabaseError::Deadlock("x".into()).is_retriable());
        assert!(DatabaseError::SequenceContention("x".into()).is_retriable());
        assert!(DatabaseError::DuplicateEntry("x".into()).is_retriable());
        assert!(!DatabaseError::NotFound("x".into()).is_retriable());
        assert!(!DatabaseError::ConstraintViolation("x".into()).is_retriable());
    }

    #[test]
    fn test_not_found_helper() {
        let err = DatabaseError::not_found("Reservation", "RSV-42");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("Reservation"));
    }
}
