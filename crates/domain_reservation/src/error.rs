//! Reservation domain errors

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur in the reservation domain
#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Amount exceeds the approved envelope: approved {approved}, requested {requested}")]
    AmountExceedsApproved {
        approved: Decimal,
        requested: Decimal,
    },

    #[error("Reservation already consumed by a transaction")]
    AlreadyConsumed,

    #[error("Rejection requires a non-empty reason")]
    EmptyRejectionReason,

    #[error("Reservation not found: {0}")]
    NotFound(String),
}
