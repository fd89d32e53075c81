//! Transactional services
//!
//! The operations the HTTP layer calls: trade validation/execution, the
//! reservation audit workflow, and the filing drivers. Each service owns a
//! pool and composes repositories inside caller-invisible transactions;
//! either the whole operation commits or none of it does.

pub mod audit;
pub mod config;
pub mod executor;
pub mod filing;

pub use audit::{ApprovalOutcome, AuditService};
pub use executor::ExecutorService;
pub use filing::FilingService;

use thiserror::Error;

use crate::error::DatabaseError;

/// Error surface of the service layer
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Exchange(#[from] domain_exchange::ExchangeError),

    #[error(transparent)]
    Reservation(#[from] domain_reservation::ReservationError),

    #[error(transparent)]
    Compliance(#[from] domain_compliance::ComplianceError),

    #[error(transparent)]
    Reporting(#[from] domain_reporting::ReportingError),

    #[error(transparent)]
    Money(#[from] core_kernel::MoneyError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl ServiceError {
    /// True when retrying the whole operation can succeed (lock timeouts,
    /// sequence contention, transient duplicates)
    pub fn is_retriable(&self) -> bool {
        matches!(self, ServiceError::Database(e) if e.is_retriable())
    }
}
