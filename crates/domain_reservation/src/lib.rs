//! Reservation domain - the pre-approval gate for large and suspicious trades
//!
//! A trade that trips a blocking AMLO rule cannot execute until an auditor
//! approves a reservation: the customer's identification, the proposed
//! amounts, and the fully filled report form, held under an approved
//! local-amount envelope. The executed trade later consumes the envelope,
//! at or below the approved amount, atomically with its own commit.

pub mod error;
pub mod reservation;

pub use error::ReservationError;
pub use reservation::{Reservation, ReservationStatus, SaveReservation, SaveResult};
