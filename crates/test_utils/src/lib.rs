//! Shared test utilities for the exchange platform
//!
//! Fixtures with predictable values, with-method builders, assertion
//! helpers, and the Postgres testcontainer harness used by the ignored
//! database integration suites.

pub mod assertions;
pub mod builders;
pub mod database;
pub mod fixtures;

pub use assertions::{assert_decimal_eq, assert_valid_amlo_number, assert_valid_bot_number};
pub use builders::{ExecuteRequestBuilder, RuleBuilder, SaveReservationBuilder};
pub use database::{create_isolated_test_database, TestDatabase};
pub use fixtures::{BranchFixtures, CustomerFixtures, RuleFixtures};
