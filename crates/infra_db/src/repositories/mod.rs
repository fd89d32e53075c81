//! Repository implementations
//!
//! One repository per aggregate. Methods that must commit atomically with
//! other work take `&mut PgConnection` from a caller-owned transaction;
//! read paths take the pool.

pub mod balances;
pub mod master;
pub mod rates;
pub mod reports;
pub mod reservations;
pub mod rules;
pub mod sequences;
pub mod transactions;

pub use balances::BalanceRepository;
pub use master::MasterDataRepository;
pub use rates::RateRepository;
pub use reports::ReportRepository;
pub use reservations::ReservationRepository;
pub use rules::RuleRepository;
pub use sequences::{AllocatedNumber, SequenceLedger};
pub use transactions::TransactionRepository;
